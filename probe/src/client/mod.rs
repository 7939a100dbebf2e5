mod hda;

pub use hda::HdaClient;

use crate::models::{DatasetEntry, MetadataDocument, Query, SearchResult};
use async_trait::async_trait;
use common::Result;

/// The remote catalog, seen as a black box. Failures are recorded by the
/// caller, never retried here.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_datasets(&self) -> Result<Vec<DatasetEntry>>;
    async fn get_metadata(&self, dataset_id: &str) -> Result<MetadataDocument>;
    async fn search(&self, query: &Query) -> Result<SearchResult>;

    /// Version string reported in run metadata.
    fn version(&self) -> String;
}
