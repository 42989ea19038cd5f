use crate::utils::error::{ErrorCategory, EtlError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Etl(#[from] EtlError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, code) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "BAD_REQUEST"),
            AppError::Etl(EtlError::UnknownMarketplace(_)) => {
                (StatusCode::NOT_FOUND, self.to_string(), "UNKNOWN_MARKETPLACE")
            }
            AppError::Etl(e) => match e.category() {
                ErrorCategory::Network => {
                    (StatusCode::BAD_GATEWAY, e.user_friendly_message(), "UPSTREAM_ERROR")
                }
                ErrorCategory::Configuration => {
                    (StatusCode::BAD_REQUEST, e.user_friendly_message(), "CONFIG_ERROR")
                }
                ErrorCategory::Data => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    e.user_friendly_message(),
                    "DATA_ERROR",
                ),
                ErrorCategory::Storage => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                ),
            },
            AppError::Template(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "INTERNAL_ERROR",
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
