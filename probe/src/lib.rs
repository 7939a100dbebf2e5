pub mod client;
pub mod exceptions;
pub mod metadata_check;
pub mod models;
pub mod pipeline;
pub mod recorder;
pub mod run_info;
pub mod runner;
pub mod synthesizer;

use client::HdaClient;
use common::config::Settings;
use common::{Result, telemetry};
use exceptions::{ExceptionRegistry, load_rules_file};
use pipeline::{AvailabilityProbe, RunReport};
use regex::Regex;
use runner::BoundedProbeRunner;
use std::path::Path;
use std::sync::Arc;
use synthesizer::QueryOptions;
use tracing::info;

/// Built-in exception table plus the rules file named in the configuration.
pub fn build_registry(settings: &Settings) -> Result<ExceptionRegistry> {
    let mut registry = ExceptionRegistry::builtin()?;
    if let Some(path) = &settings.probe.exceptions_file {
        let loaded = load_rules_file(&mut registry, path)?;
        info!(path = %path, loaded, "Loaded exception rules file");
    }
    Ok(registry)
}

pub fn build_probe(settings: &Settings) -> Result<AvailabilityProbe> {
    let client = Arc::new(HdaClient::new(&settings.catalog)?);
    let probe = AvailabilityProbe::new(
        client,
        build_registry(settings)?,
        BoundedProbeRunner::new(settings.probe.timeout()),
        QueryOptions::from_config(&settings.probe),
    );

    match &settings.probe.dataset_filter {
        Some(pattern) => Ok(probe.with_dataset_filter(Regex::new(pattern)?)),
        None => Ok(probe),
    }
}

pub async fn run_availability_check(config_path: &str) -> Result<RunReport> {
    let settings = Settings::new(config_path)?;
    telemetry::init(&settings.logging);

    let probe = build_probe(&settings)?;
    let report = probe.run().await?;

    report.write(Path::new(&settings.output.data_dir))?;
    Ok(report)
}

pub async fn run_metadata_check(config_path: &str) -> Result<usize> {
    let settings = Settings::new(config_path)?;
    telemetry::init(&settings.logging);

    let client = HdaClient::new(&settings.catalog)?;
    let rows = metadata_check::check_metadata(&client).await?;
    metadata_check::write_metadata_check(Path::new(&settings.output.data_dir), &rows)?;

    Ok(rows.len())
}
