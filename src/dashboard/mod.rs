//! Web dashboard: filters, KPIs, trend chart, top products and imports.

pub mod chart;
pub mod error;
pub mod handlers;
pub mod query;
pub mod router;
pub mod state;
pub mod view;

pub use error::AppError;
pub use router::{create_router, serve};
pub use state::AppState;
