use crate::models::{BoundingBox, Coverage, Query};
use common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const AVAILABILITY_FILE: &str = "Datasets_availability.csv";
pub const ERRORS_FILE: &str = "Datasets_with_errors.csv";

const BYTES_PER_GIGABYTE: f64 = 1e9;

/// What the probe learned about a dataset it could query.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSuccess {
    pub coverage: Coverage,
    pub volume_bytes: Option<f64>,
    pub query: Query,
}

/// Why a dataset could not be probed, plus the query if one was built.
#[derive(Debug)]
pub struct ProbeFailure {
    pub error: Error,
    pub query: Option<Query>,
}

impl From<Error> for ProbeFailure {
    fn from(error: Error) -> Self {
        Self { error, query: None }
    }
}

/// One dataset of one run. Failed rows carry nulls for coverage and volume.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRecord {
    pub id: Uuid,
    pub dataset_id: String,
    pub available: bool,
    pub error: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub volume_gb: Option<u64>,
    pub query: Option<Query>,
}

/// Whole gigabytes, rounded down. Negative or non-finite volumes are unreadable.
pub fn volume_in_gb(volume_bytes: Option<f64>) -> Option<u64> {
    volume_bytes
        .filter(|bytes| bytes.is_finite() && *bytes >= 0.0)
        .map(|bytes| (bytes / BYTES_PER_GIGABYTE).floor() as u64)
}

impl AvailabilityRecord {
    pub fn success(dataset_id: &str, success: ProbeSuccess) -> Self {
        Self {
            id: Uuid::new_v4(),
            dataset_id: dataset_id.to_string(),
            available: true,
            error: None,
            bbox: success.coverage.bbox,
            start: success.coverage.start,
            end: success.coverage.end,
            volume_gb: volume_in_gb(success.volume_bytes),
            query: Some(success.query),
        }
    }

    pub fn failure(dataset_id: &str, failure: ProbeFailure) -> Self {
        Self {
            id: Uuid::new_v4(),
            dataset_id: dataset_id.to_string(),
            available: false,
            error: Some(failure.error.to_string()),
            bbox: None,
            start: None,
            end: None,
            volume_gb: None,
            query: failure.query,
        }
    }
}

/// Flat CSV shape of an [`AvailabilityRecord`].
#[derive(Debug, Serialize, Deserialize)]
pub struct CsvRow {
    pub id: String,
    #[serde(rename = "Dataset_id")]
    pub dataset_id: String,
    #[serde(rename = "Available")]
    pub available: bool,
    #[serde(rename = "Error")]
    pub error: Option<String>,
    #[serde(rename = "Min Lon")]
    pub min_lon: Option<f64>,
    #[serde(rename = "Max Lon")]
    pub max_lon: Option<f64>,
    #[serde(rename = "Min Lat")]
    pub min_lat: Option<f64>,
    #[serde(rename = "Max Lat")]
    pub max_lat: Option<f64>,
    #[serde(rename = "Start")]
    pub start: Option<String>,
    #[serde(rename = "End")]
    pub end: Option<String>,
    #[serde(rename = "Volume (GB)")]
    pub volume_gb: Option<u64>,
    #[serde(rename = "Query")]
    pub query: Option<String>,
}

impl TryFrom<&AvailabilityRecord> for CsvRow {
    type Error = Error;

    fn try_from(record: &AvailabilityRecord) -> Result<Self> {
        Ok(Self {
            id: record.id.to_string(),
            dataset_id: record.dataset_id.clone(),
            available: record.available,
            error: record.error.clone(),
            min_lon: record.bbox.map(|b| b.min_lon),
            max_lon: record.bbox.map(|b| b.max_lon),
            min_lat: record.bbox.map(|b| b.min_lat),
            max_lat: record.bbox.map(|b| b.max_lat),
            start: record.start.clone(),
            end: record.end.clone(),
            volume_gb: record.volume_gb,
            query: record.query.as_ref().map(Query::to_json_string).transpose()?,
        })
    }
}

impl TryFrom<CsvRow> for AvailabilityRecord {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::InvalidInput(format!("Invalid row id '{}': {}", row.id, e)))?;

        let bbox = match (row.min_lon, row.max_lon, row.min_lat, row.max_lat) {
            (Some(min_lon), Some(max_lon), Some(min_lat), Some(max_lat)) => Some(BoundingBox {
                min_lon,
                max_lon,
                min_lat,
                max_lat,
            }),
            _ => None,
        };

        let query = row
            .query
            .filter(|q| !q.is_empty())
            .map(|q| serde_json::from_str::<Query>(&q))
            .transpose()?;

        Ok(Self {
            id,
            dataset_id: row.dataset_id,
            available: row.available,
            error: row.error.filter(|e| !e.is_empty()),
            bbox,
            start: row.start.filter(|s| !s.is_empty()),
            end: row.end.filter(|s| !s.is_empty()),
            volume_gb: row.volume_gb,
            query,
        })
    }
}

pub fn write_records<'a, I>(path: &Path, records: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a AvailabilityRecord>,
{
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    let mut written = 0;

    for record in records {
        writer.serialize(CsvRow::try_from(record)?)?;
        written += 1;
    }

    if written == 0 {
        // serde only emits the header alongside the first row.
        writer.write_record([
            "id", "Dataset_id", "Available", "Error", "Min Lon", "Max Lon", "Min Lat", "Max Lat",
            "Start", "End", "Volume (GB)", "Query",
        ])?;
    }

    writer.flush()?;
    Ok(written)
}

pub fn read_records(path: &Path) -> Result<Vec<AvailabilityRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<CsvRow>()
        .map(|row| AvailabilityRecord::try_from(row?))
        .collect()
}

/// Accumulates one row per dataset; rows are never touched after being appended.
#[derive(Debug, Default)]
pub struct AvailabilityRecorder {
    rows: Vec<AvailabilityRecord>,
}

impl AvailabilityRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        dataset_id: &str,
        outcome: std::result::Result<ProbeSuccess, ProbeFailure>,
    ) -> &AvailabilityRecord {
        let row = match outcome {
            Ok(success) => AvailabilityRecord::success(dataset_id, success),
            Err(failure) => AvailabilityRecord::failure(dataset_id, failure),
        };
        self.rows.push(row);
        &self.rows[self.rows.len() - 1]
    }

    pub fn rows(&self) -> &[AvailabilityRecord] {
        &self.rows
    }

    pub fn errors(&self) -> impl Iterator<Item = &AvailabilityRecord> {
        self.rows.iter().filter(|row| !row.available)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes every row and the error-only subset into `dir`. Returns the
    /// number of rows in the main file.
    pub fn flush(&self, dir: &Path) -> Result<usize> {
        std::fs::create_dir_all(dir)?;

        let written = write_records(&dir.join(AVAILABILITY_FILE), &self.rows)?;
        let errors = write_records(&dir.join(ERRORS_FILE), self.errors())?;

        info!(
            dir = %dir.display(),
            rows = written,
            errors,
            "Wrote availability results"
        );
        Ok(written)
    }
}
