use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use once_cell::sync::Lazy;
use std::sync::Arc;

pub fn test_runs_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("start_time", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("end_time", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("run_duration_seconds", DataType::Int64, false),
        Field::new("numbers_of_datasets", DataType::Int64, false),
        Field::new("linux_version", DataType::Utf8, false),
        Field::new("client_version", DataType::Utf8, false),
        Field::new("script_version", DataType::Utf8, false),
    ])
}

/// One row per probed dataset. Coverage and volume are null on failed rows.
pub fn test_run_datasets_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("test_id", DataType::Utf8, false),
        Field::new("dataset_id", DataType::Utf8, false),
        Field::new("available", DataType::Boolean, false),
        Field::new("error", DataType::Utf8, true),
        Field::new("min_lon", DataType::Float64, true),
        Field::new("max_lon", DataType::Float64, true),
        Field::new("min_lat", DataType::Float64, true),
        Field::new("max_lat", DataType::Float64, true),
        Field::new("start", DataType::Timestamp(TimeUnit::Millisecond, None), true),
        Field::new("end", DataType::Timestamp(TimeUnit::Millisecond, None), true),
        Field::new("volume", DataType::Int64, true),
        Field::new("query", DataType::Utf8, true),
    ])
}

static TEST_RUNS_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| Arc::new(test_runs_schema()));
static TEST_RUN_DATASETS_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| Arc::new(test_run_datasets_schema()));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    TestRuns,
    TestRunDatasets,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::TestRuns, Table::TestRunDatasets];

    pub fn name(&self) -> &'static str {
        match self {
            Table::TestRuns => "test_runs",
            Table::TestRunDatasets => "test_run_datasets",
        }
    }

    pub fn schema(&self) -> SchemaRef {
        match self {
            Table::TestRuns => Arc::clone(&TEST_RUNS_SCHEMA),
            Table::TestRunDatasets => Arc::clone(&TEST_RUN_DATASETS_SCHEMA),
        }
    }
}
