pub mod adapters;
pub mod analytics;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};

pub use adapters::store::SqliteSalesStore;
pub use config::AppConfig;
pub use self::core::{etl::EtlEngine, RunSummary};
pub use utils::error::{EtlError, Result};
