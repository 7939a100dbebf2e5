use crate::client::CatalogClient;
use common::Result;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

pub const METADATA_CHECK_FILE: &str = "Datasets_metadata_check.csv";

#[derive(Debug, Clone, Serialize)]
pub struct MetadataCheckRow {
    #[serde(rename = "Dataset_id")]
    pub dataset_id: String,
    #[serde(rename = "Metadata Accessible")]
    pub accessible: bool,
    #[serde(rename = "Error")]
    pub error: Option<String>,
    #[serde(rename = "Metadata")]
    pub metadata: Option<String>,
}

/// Fetches only the metadata of every dataset, to tell catalog-side failures
/// apart from search failures.
pub async fn check_metadata(client: &dyn CatalogClient) -> Result<Vec<MetadataCheckRow>> {
    let datasets = client.list_datasets().await?;
    let mut rows = Vec::with_capacity(datasets.len());

    for entry in datasets {
        let row = match client.get_metadata(&entry.dataset_id).await {
            Ok(document) => MetadataCheckRow {
                dataset_id: entry.dataset_id,
                accessible: true,
                error: None,
                metadata: Some(serde_json::to_string(&document)?),
            },
            Err(e) => {
                warn!(dataset_id = %entry.dataset_id, error = %e, "Metadata not accessible");
                MetadataCheckRow {
                    dataset_id: entry.dataset_id,
                    accessible: false,
                    error: Some(e.to_string()),
                    metadata: None,
                }
            }
        };
        rows.push(row);
    }

    info!(
        datasets = rows.len(),
        accessible = rows.iter().filter(|r| r.accessible).count(),
        "Metadata check finished"
    );
    Ok(rows)
}

pub fn write_metadata_check(dir: &Path, rows: &[MetadataCheckRow]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut writer = csv::Writer::from_writer(File::create(dir.join(METADATA_CHECK_FILE))?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatasetEntry, MetadataDocument, Query, SearchResult};
    use async_trait::async_trait;
    use common::Error;
    use tempfile::tempdir;

    struct TwoDatasets;

    #[async_trait]
    impl CatalogClient for TwoDatasets {
        async fn list_datasets(&self) -> Result<Vec<DatasetEntry>> {
            Ok(vec![
                DatasetEntry { dataset_id: "EO:OK:DAT".to_string() },
                DatasetEntry { dataset_id: "EO:BROKEN:DAT".to_string() },
            ])
        }

        async fn get_metadata(&self, dataset_id: &str) -> Result<MetadataDocument> {
            if dataset_id.contains("BROKEN") {
                return Err(Error::Api { status: 500, message: "boom".to_string() });
            }
            Ok(MetadataDocument::default())
        }

        async fn search(&self, _query: &Query) -> Result<SearchResult> {
            unreachable!("metadata check never searches")
        }

        fn version(&self) -> String {
            "fake".to_string()
        }
    }

    #[tokio::test]
    async fn test_check_metadata_records_each_dataset() {
        let rows = check_metadata(&TwoDatasets).await.unwrap();
        assert_eq!(rows.len(), 2);

        assert!(rows[0].accessible);
        assert!(rows[0].error.is_none());
        assert!(rows[0].metadata.is_some());

        assert!(!rows[1].accessible);
        assert!(rows[1].error.as_deref().unwrap().contains("boom"));
        assert!(rows[1].metadata.is_none());
    }

    #[tokio::test]
    async fn test_write_metadata_check_has_header() {
        let dir = tempdir().unwrap();
        let rows = check_metadata(&TwoDatasets).await.unwrap();
        write_metadata_check(dir.path(), &rows).unwrap();

        let contents = std::fs::read_to_string(dir.path().join(METADATA_CHECK_FILE)).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Dataset_id,Metadata Accessible,Error,Metadata"));
        assert_eq!(contents.lines().count(), 3);
    }
}
