pub mod etl;
pub mod import_pipeline;
pub mod jobs;
pub mod sync_pipeline;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{Pipeline, SalesRepository, Storage};
pub use crate::utils::error::Result;
pub use etl::{EtlEngine, RunSummary};
pub use import_pipeline::{ImportInput, ImportPipeline};
pub use sync_pipeline::SyncPipeline;
