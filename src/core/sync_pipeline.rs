//! Partner API orders into the `sales` table.

use crate::adapters::marketplace::MarketplaceApi;
use crate::domain::model::{DateRange, Record, TransformResult};
use crate::domain::ports::{Pipeline, SalesRepository};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub struct SyncPipeline<R: SalesRepository> {
    api: Box<dyn MarketplaceApi>,
    repository: R,
    range: DateRange,
    skip_statuses: Vec<String>,
}

impl<R: SalesRepository> SyncPipeline<R> {
    pub fn new(api: Box<dyn MarketplaceApi>, repository: R, range: DateRange) -> Self {
        Self {
            api,
            repository,
            range,
            skip_statuses: Vec::new(),
        }
    }

    /// Order states (e.g. `CANCELED`) whose lines are not stored.
    pub fn with_skip_statuses(mut self, statuses: &[String]) -> Self {
        self.skip_statuses = statuses.iter().map(|s| s.to_ascii_uppercase()).collect();
        self
    }

    fn is_skipped_status(&self, status: &str) -> bool {
        self.skip_statuses.contains(&status.trim().to_ascii_uppercase())
    }
}

#[async_trait]
impl<R: SalesRepository> Pipeline for SyncPipeline<R> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::info!(
            "Fetching {} orders from {} to {}",
            self.api.name(),
            self.range.start,
            self.range.end
        );
        let orders = self.api.fetch_orders(self.range).await?;

        Ok(orders
            .into_iter()
            .map(|order| Record {
                source: self.api.name().to_string(),
                sheet: String::new(),
                data: match order {
                    Value::Object(map) => map.into_iter().collect(),
                    _ => Default::default(),
                },
            })
            .collect())
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let orders: Vec<Value> = data
            .into_iter()
            .map(|r| Value::Object(r.data.into_iter().collect()))
            .collect();
        let normalized = self.api.normalize(&orders);

        let mut result = TransformResult {
            records: Vec::with_capacity(normalized.lines.len()),
            skipped: normalized.skipped,
        };
        for line in normalized.lines {
            if self.is_skipped_status(&line.order_status) {
                tracing::debug!("Skipping order {} ({})", line.order_id, line.order_status);
                result.skipped += 1;
                continue;
            }
            result.records.push(line.into_sale_record(self.api.name()));
        }
        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<usize> {
        self.repository.insert_new(result.records).await
    }
}
