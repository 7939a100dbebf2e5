use super::RunStore;
use crate::convert::{records_to_batch, run_to_batch};
use crate::schema::Table;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use common::Result;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use probe::recorder::AvailabilityRecord;
use probe::run_info::TestRun;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Each insert lands as one Parquet object: `{prefix}/{table}/{run_id}.parquet`.
pub struct ParquetRunStore {
    store: Arc<dyn ObjectStore>,
    prefix: Path,
}

impl ParquetRunStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            store,
            prefix: Path::from(prefix),
        }
    }

    fn table_dir(&self, table: Table) -> Path {
        self.prefix.child(table.name())
    }

    fn object_path(&self, table: Table, run_id: Uuid) -> Path {
        self.table_dir(table).child(format!("{}.parquet", run_id))
    }

    async fn write_batch(&self, path: &Path, batch: &RecordBatch) -> Result<()> {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut buffer: Vec<u8> = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;

        self.store.put(path, PutPayload::from(buffer)).await?;
        debug!(%path, rows = batch.num_rows(), "Wrote parquet object");
        Ok(())
    }

    async fn read_batches(&self, path: &Path, table: Table) -> Result<Vec<RecordBatch>> {
        let bytes = self.store.get(path).await?.bytes().await?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)?.build()?;

        let schema = table.schema();
        let mut batches = Vec::new();
        for batch in reader {
            // Rebind to the table schema so file-level metadata never leaks into queries.
            let batch = batch?;
            batches.push(RecordBatch::try_new(Arc::clone(&schema), batch.columns().to_vec())?);
        }
        Ok(batches)
    }
}

#[async_trait]
impl RunStore for ParquetRunStore {
    async fn insert_run(&self, run: &TestRun) -> Result<Uuid> {
        let run_id = Uuid::new_v4();
        let batch = run_to_batch(run_id, run)?;
        self.write_batch(&self.object_path(Table::TestRuns, run_id), &batch).await?;

        info!(%run_id, datasets = run.numbers_of_datasets, "Stored test run");
        Ok(run_id)
    }

    async fn insert_datasets(&self, run_id: Uuid, records: &[AvailabilityRecord]) -> Result<usize> {
        let batch = records_to_batch(run_id, records)?;
        self.write_batch(&self.object_path(Table::TestRunDatasets, run_id), &batch)
            .await?;

        info!(%run_id, rows = records.len(), "Stored test run datasets");
        Ok(records.len())
    }

    async fn load_table(&self, table: Table) -> Result<Vec<RecordBatch>> {
        let dir = self.table_dir(table);
        let mut objects: Vec<Path> = self
            .store
            .list(Some(&dir))
            .map_ok(|meta| meta.location)
            .try_filter(|location| futures::future::ready(location.as_ref().ends_with(".parquet")))
            .try_collect()
            .await?;
        objects.sort();

        let mut batches = Vec::new();
        for path in &objects {
            batches.extend(self.read_batches(path, table).await?);
        }

        debug!(table = table.name(), files = objects.len(), "Loaded table");
        Ok(batches)
    }
}
