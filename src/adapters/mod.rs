// Adapters layer: concrete implementations for external systems (marketplace APIs, workbooks, storage, sqlite)

pub mod csv_export;
pub mod marketplace;
pub mod sources;
pub mod storage;
pub mod store;
pub mod xlsx;
