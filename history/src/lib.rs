pub mod api;
pub mod convert;
pub mod schema;
pub mod services;
pub mod storage;
pub mod udf;
pub mod utils;

use common::Result;
use common::config::Settings;
use common::telemetry;
use services::HistoryService;
use services::ingest::ingest_run;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

/// Loads the probe output in `data_dir` (the configured output directory by
/// default) into the history store.
pub async fn run_ingest(config_path: &str, data_dir: Option<&str>) -> Result<Uuid> {
    let settings = Settings::new(config_path)?;
    telemetry::init(&settings.logging);

    let store = storage::build_run_store(&settings.store)?;
    let data_dir = data_dir.unwrap_or(&settings.output.data_dir);
    ingest_run(store.as_ref(), Path::new(data_dir)).await
}

/// Serves the history API until the process is stopped.
pub async fn run_history_api(config_path: &str) -> Result<()> {
    let settings = Settings::new(config_path)?;
    telemetry::init(&settings.logging);

    let store = storage::build_run_store(&settings.store)?;
    let service = Arc::new(HistoryService::new(store));
    let api_router = api::routes(service);

    let addr = SocketAddr::from(([127, 0, 0, 1], settings.api_port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "History API listening");
    axum::serve(listener, api_router).await?;

    Ok(())
}
