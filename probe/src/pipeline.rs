use crate::client::CatalogClient;
use crate::exceptions::ExceptionRegistry;
use crate::models::{MetadataDocument, Query};
use crate::recorder::{AvailabilityRecord, AvailabilityRecorder, ProbeFailure, ProbeSuccess};
use crate::run_info::{TestRun, Versions};
use crate::runner::BoundedProbeRunner;
use crate::synthesizer::{QueryOptions, missing_required, synthesize};
use chrono::Utc;
use common::Result;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub run: TestRun,
    pub recorder: AvailabilityRecorder,
}

impl RunReport {
    pub fn rows(&self) -> &[AvailabilityRecord] {
        self.recorder.rows()
    }

    pub fn available_count(&self) -> usize {
        self.rows().iter().filter(|row| row.available).count()
    }

    /// Writes the CSV outputs and `test_info.json` into `dir`.
    pub fn write(&self, dir: &Path) -> Result<usize> {
        let written = self.recorder.flush(dir)?;
        self.run.write(dir)?;
        Ok(written)
    }
}

/// Probes every dataset of the catalog, one at a time.
pub struct AvailabilityProbe {
    client: Arc<dyn CatalogClient>,
    registry: ExceptionRegistry,
    runner: BoundedProbeRunner,
    options: QueryOptions,
    dataset_filter: Option<Regex>,
}

impl AvailabilityProbe {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        registry: ExceptionRegistry,
        runner: BoundedProbeRunner,
        options: QueryOptions,
    ) -> Self {
        Self {
            client,
            registry,
            runner,
            options,
            dataset_filter: None,
        }
    }

    pub fn with_dataset_filter(mut self, filter: Regex) -> Self {
        self.dataset_filter = Some(filter);
        self
    }

    fn candidate_query(&self, dataset_id: &str, document: &MetadataDocument) -> Query {
        let query = synthesize(document, &self.options);

        let missing = missing_required(document, &query);
        if !missing.is_empty() {
            debug!(dataset_id, ?missing, "Declared required fields not resolved from schema");
        }
        query
    }

    /// Builds the final query for one dataset from its metadata.
    pub fn build_query(&self, dataset_id: &str, document: &MetadataDocument) -> Result<Query> {
        self.registry.apply(dataset_id, self.candidate_query(dataset_id, document))
    }

    /// Metadata fetch, synthesis, exceptions and the bounded search for one
    /// dataset. Every failure stays scoped to this dataset.
    pub async fn probe_dataset(&self, dataset_id: &str) -> std::result::Result<ProbeSuccess, ProbeFailure> {
        let document = self.client.get_metadata(dataset_id).await?;
        let candidate = self.candidate_query(dataset_id, &document);
        let query = self
            .registry
            .apply(dataset_id, candidate.clone())
            .map_err(|error| ProbeFailure {
                error,
                query: Some(candidate),
            })?;

        let client = Arc::clone(&self.client);
        let matches = self
            .runner
            .run(move |q: Query| async move { client.search(&q).await }, query.clone())
            .await
            .map_err(|error| ProbeFailure {
                error,
                query: Some(query.clone()),
            })?;

        Ok(ProbeSuccess {
            coverage: document.coverage(),
            volume_bytes: matches.volume_bytes(),
            query,
        })
    }

    pub async fn run(&self) -> Result<RunReport> {
        let start_time = Utc::now();
        let datasets = self.client.list_datasets().await?;

        let dataset_ids: Vec<String> = datasets
            .into_iter()
            .map(|entry| entry.dataset_id)
            .filter(|id| self.dataset_filter.as_ref().is_none_or(|filter| filter.is_match(id)))
            .collect();

        info!(count = dataset_ids.len(), "Starting availability run");
        let mut recorder = AvailabilityRecorder::new();

        for (position, dataset_id) in dataset_ids.iter().enumerate() {
            let outcome = self.probe_dataset(dataset_id).await;
            let row = recorder.record(dataset_id, outcome);

            match (&row.error, row.volume_gb) {
                (Some(error), _) => warn!(dataset_id = %dataset_id, %error, "Dataset unavailable"),
                (None, volume) => info!(
                    dataset_id = %dataset_id,
                    volume_gb = ?volume,
                    position = position + 1,
                    total = dataset_ids.len(),
                    "Dataset available"
                ),
            }
        }

        let end_time = Utc::now();
        let run = TestRun::new(
            start_time,
            end_time,
            recorder.len(),
            Versions::detect(&self.client.version()),
        );

        let report = RunReport { run, recorder };
        info!(
            datasets = report.rows().len(),
            available = report.available_count(),
            duration_secs = report.run.run_duration_seconds,
            "Availability run finished"
        );
        Ok(report)
    }
}
