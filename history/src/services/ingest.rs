use crate::storage::RunStore;
use common::Result;
use probe::recorder::{AVAILABILITY_FILE, read_records};
use probe::run_info::TestRun;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Stores the run found in `data_dir` (`test_info.json` plus the
/// availability CSV): the run first, then its rows under the new run id.
pub async fn ingest_run(store: &dyn RunStore, data_dir: &Path) -> Result<Uuid> {
    let run = TestRun::read(data_dir)?;
    let records = read_records(&data_dir.join(AVAILABILITY_FILE))?;

    if records.len() != run.numbers_of_datasets {
        warn!(
            expected = run.numbers_of_datasets,
            found = records.len(),
            "Row count differs from run summary"
        );
    }

    let run_id = store.insert_run(&run).await?;
    store.insert_datasets(run_id, &records).await?;

    info!(%run_id, dir = %data_dir.display(), rows = records.len(), "Ingested run");
    Ok(run_id)
}
