use crate::schema::Table;
use crate::storage::RunStore;
use crate::udf::{DATASET_PROVIDER, register_udfs};
use crate::utils::arrow::batches_to_json;
use common::{Error, Result};
use datafusion::dataframe::DataFrame;
use datafusion::datasource::MemTable;
use datafusion::prelude::{SessionContext, col, lit};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Read side of the run history. Every call snapshots the store into a
/// fresh DataFusion context, so newly ingested runs are visible immediately.
pub struct HistoryService {
    store: Arc<dyn RunStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }

    async fn context(&self) -> Result<SessionContext> {
        let ctx = SessionContext::new();
        register_udfs(&ctx);

        for table in Table::ALL {
            let batches = self.store.load_table(table).await?;
            let mem = MemTable::try_new(table.schema(), vec![batches])?;
            ctx.register_table(table.name(), Arc::new(mem))?;
        }
        Ok(ctx)
    }

    async fn collect_json(df: DataFrame) -> Result<Vec<Value>> {
        let batches = df.collect().await?;
        batches_to_json(&batches)
    }

    async fn ensure_run(&self, ctx: &SessionContext, run_id: Uuid) -> Result<()> {
        let matches = ctx
            .table(Table::TestRuns.name())
            .await?
            .filter(col("id").eq(lit(run_id.to_string())))?
            .count()
            .await?;

        if matches == 0 {
            return Err(Error::NotFound(format!("Test run {} does not exist", run_id)));
        }
        Ok(())
    }

    async fn datasets_of(&self, run_id: Uuid, errors_only: bool) -> Result<Vec<Value>> {
        let ctx = self.context().await?;
        self.ensure_run(&ctx, run_id).await?;

        let mut df = ctx
            .table(Table::TestRunDatasets.name())
            .await?
            .filter(col("test_id").eq(lit(run_id.to_string())))?;
        if errors_only {
            df = df.filter(col("available").eq(lit(false)))?;
        }

        Self::collect_json(df.sort(vec![col("dataset_id").sort(true, false)])?).await
    }

    /// Most recent run first.
    pub async fn list_runs(&self) -> Result<Vec<Value>> {
        let ctx = self.context().await?;
        let df = ctx
            .table(Table::TestRuns.name())
            .await?
            .sort(vec![col("start_time").sort(false, false)])?;
        Self::collect_json(df).await
    }

    pub async fn run_datasets(&self, run_id: Uuid) -> Result<Vec<Value>> {
        self.datasets_of(run_id, false).await
    }

    pub async fn run_errors(&self, run_id: Uuid) -> Result<Vec<Value>> {
        self.datasets_of(run_id, true).await
    }

    /// Availability of one run grouped by the provider segment of the dataset id.
    pub async fn provider_summary(&self, run_id: Uuid) -> Result<Vec<Value>> {
        let ctx = self.context().await?;
        self.ensure_run(&ctx, run_id).await?;

        let sql = format!(
            "SELECT {udf}(dataset_id) AS provider, \
                    COUNT(*) AS datasets, \
                    SUM(CASE WHEN available THEN 1 ELSE 0 END) AS available_count \
             FROM {table} \
             WHERE test_id = '{run_id}' \
             GROUP BY {udf}(dataset_id) \
             ORDER BY provider",
            udf = DATASET_PROVIDER,
            table = Table::TestRunDatasets.name(),
            run_id = run_id,
        );
        debug!(%sql, "Provider summary");
        Self::collect_json(ctx.sql(&sql).await?).await
    }

    /// Availability across all runs sharing the same version triple.
    pub async fn version_summary(&self) -> Result<Vec<Value>> {
        let ctx = self.context().await?;
        let sql = format!(
            "SELECT r.linux_version, r.client_version, r.script_version, \
                    COUNT(DISTINCT r.id) AS runs, \
                    COUNT(d.id) AS datasets, \
                    SUM(CASE WHEN d.available THEN 1 ELSE 0 END) AS available_count \
             FROM {runs} r \
             JOIN {datasets} d ON d.test_id = r.id \
             GROUP BY r.linux_version, r.client_version, r.script_version \
             ORDER BY r.client_version, r.script_version, r.linux_version",
            runs = Table::TestRuns.name(),
            datasets = Table::TestRunDatasets.name(),
        );
        Self::collect_json(ctx.sql(&sql).await?).await
    }
}
