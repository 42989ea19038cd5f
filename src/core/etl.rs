use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use serde::Serialize;

/// Row counts of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub extracted: usize,
    pub transformed: usize,
    pub skipped: usize,
    /// Rows that were new to the store.
    pub inserted: usize,
}

impl RunSummary {
    pub fn duplicates(&self) -> usize {
        self.transformed.saturating_sub(self.inserted)
    }
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting ETL process...");

        // Extract
        tracing::debug!("Extracting data...");
        let raw_data = self.pipeline.extract().await?;
        let extracted = raw_data.len();
        tracing::info!("Extracted {} records", extracted);

        // Transform
        tracing::debug!("Transforming data...");
        let result = self.pipeline.transform(raw_data).await?;
        let transformed = result.records.len();
        let skipped = result.skipped;
        if skipped > 0 {
            tracing::warn!("Skipped {} records", skipped);
        }
        tracing::info!("Transformed {} records", transformed);

        // Load
        tracing::debug!("Loading data...");
        let inserted = self.pipeline.load(result).await?;
        tracing::info!(
            "Inserted {} new rows ({} already stored)",
            inserted,
            transformed.saturating_sub(inserted)
        );

        Ok(RunSummary {
            extracted,
            transformed,
            skipped,
            inserted,
        })
    }
}
