//! Pipeline runs shared by the CLI and the dashboard.

use crate::adapters::marketplace;
use crate::adapters::sources::{collect_sources, SourceDocument, SourceLocation};
use crate::config::toml_config::{AppConfig, ImportConfig};
use crate::core::etl::{EtlEngine, RunSummary};
use crate::core::import_pipeline::{ImportInput, ImportPipeline};
use crate::core::sync_pipeline::SyncPipeline;
use crate::domain::model::DateRange;
use crate::domain::ports::SalesRepository;
use crate::utils::error::Result;

pub async fn import_locations<R: SalesRepository>(
    repository: R,
    locations: Vec<SourceLocation>,
) -> Result<RunSummary> {
    tracing::info!("Importing {} workbook source(s)", locations.len());
    let pipeline = ImportPipeline::new(repository, ImportInput::Locations(locations))?;
    EtlEngine::new(pipeline).run().await
}

pub async fn import_documents<R: SalesRepository>(
    repository: R,
    documents: Vec<SourceDocument>,
) -> Result<RunSummary> {
    tracing::info!("Importing {} uploaded workbook(s)", documents.len());
    let pipeline = ImportPipeline::new(repository, ImportInput::Documents(documents))?;
    EtlEngine::new(pipeline).run().await
}

/// Imports the configured folder, links file and links.
pub async fn refresh_sources<R: SalesRepository>(
    repository: R,
    import: &ImportConfig,
) -> Result<RunSummary> {
    let locations = collect_sources(
        &[],
        import.folder.as_deref(),
        import.links_file.as_deref(),
        &import.links,
    )?;
    if locations.is_empty() {
        tracing::warn!("No import sources configured");
        return Ok(RunSummary::default());
    }
    import_locations(repository, locations).await
}

pub async fn sync_marketplace<R: SalesRepository>(
    repository: R,
    config: &AppConfig,
    name: &str,
    range: DateRange,
) -> Result<RunSummary> {
    let api = marketplace::get_api(name, &config.marketplaces)?;
    let pipeline =
        SyncPipeline::new(api, repository, range).with_skip_statuses(&config.sync.skip_statuses);
    EtlEngine::new(pipeline).run().await
}

