use crate::domain::model::{Record, SaleRecord, SalesFilter, DateRange, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    /// Returns the number of rows that were new to the store.
    async fn load(&self, result: TransformResult) -> Result<usize>;
}

#[async_trait]
pub trait SalesRepository: Send + Sync {
    async fn insert_new(&self, records: Vec<SaleRecord>) -> Result<usize>;
    async fn load(&self, filter: &SalesFilter) -> Result<Vec<SaleRecord>>;
    async fn marketplaces(&self) -> Result<Vec<String>>;
    async fn date_bounds(&self) -> Result<Option<DateRange>>;
    async fn count(&self) -> Result<usize>;
}
