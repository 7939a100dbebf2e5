mod parquet_store;

pub use parquet_store::ParquetRunStore;

use crate::schema::Table;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use common::config::{StoreBackend, StoreConfig};
use common::{Error, Result};
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use probe::recorder::AvailabilityRecord;
use probe::run_info::TestRun;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent history of probe runs.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Stores the run summary under a freshly generated id.
    async fn insert_run(&self, run: &TestRun) -> Result<Uuid>;
    async fn insert_datasets(&self, run_id: Uuid, records: &[AvailabilityRecord]) -> Result<usize>;
    async fn load_table(&self, table: Table) -> Result<Vec<RecordBatch>>;
}

pub fn build_object_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StoreBackend::Local => {
            std::fs::create_dir_all(&config.path)?;
            Ok(Arc::new(LocalFileSystem::new_with_prefix(&config.path)?))
        }
        StoreBackend::S3 => {
            let bucket = config
                .bucket
                .as_deref()
                .ok_or_else(|| Error::InvalidInput("store.bucket is required for the s3 backend".into()))?;

            let mut builder = AmazonS3Builder::new()
                .with_bucket_name(bucket)
                .with_region(&config.region);
            if let Some(endpoint) = &config.endpoint {
                builder = builder.with_endpoint(endpoint).with_allow_http(true);
            }
            if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
                builder = builder
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key);
            }
            Ok(Arc::new(builder.build()?))
        }
        StoreBackend::Memory => Ok(Arc::new(InMemory::new())),
    }
}

/// Object store plus the key prefix tables live under. A local store is
/// already rooted at `path`, so it gets no prefix.
pub fn build_run_store(config: &StoreConfig) -> Result<Arc<dyn RunStore>> {
    let store = build_object_store(config)?;
    let prefix = match config.backend {
        StoreBackend::Local => "",
        StoreBackend::S3 | StoreBackend::Memory => config.path.as_str(),
    };
    Ok(Arc::new(ParquetRunStore::new(store, prefix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_s3_backend_requires_bucket() {
        let config = StoreConfig {
            backend: StoreBackend::S3,
            ..StoreConfig::default()
        };
        assert!(matches!(build_object_store(&config), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_local_backend_creates_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested/history");
        let config = StoreConfig {
            backend: StoreBackend::Local,
            path: root.to_string_lossy().into_owned(),
            ..StoreConfig::default()
        };
        build_run_store(&config).unwrap();
        assert!(root.is_dir());
    }
}
