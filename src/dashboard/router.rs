use super::handlers;
use super::state::AppState;
use crate::utils::error::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Uploaded workbooks can be larger than axum's default body limit.
const UPLOAD_LIMIT: usize = 50 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/dashboard", get(handlers::dashboard_json))
        .route("/export.csv", get(handlers::export_csv))
        .route("/import", post(handlers::upload))
        .route("/refresh", post(handlers::refresh))
        .route("/sync", post(handlers::sync))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let app = create_router(state);
    let listener = TcpListener::bind(bind).await?;

    tracing::info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
