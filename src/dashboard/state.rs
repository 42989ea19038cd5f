use crate::adapters::store::SqliteSalesStore;
use crate::config::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteSalesStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: SqliteSalesStore, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
