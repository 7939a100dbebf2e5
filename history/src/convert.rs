use crate::schema::Table;
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate};
use common::Result;
use probe::models::Query;
use probe::recorder::AvailabilityRecord;
use probe::run_info::TestRun;
use std::sync::Arc;
use uuid::Uuid;

/// Coverage dates arrive as catalog strings; anything that is neither
/// RFC 3339 nor a plain date is stored as null.
pub fn parse_coverage_date(value: &str) -> Option<i64> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.timestamp_millis());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp_millis())
}

pub fn run_to_batch(run_id: Uuid, run: &TestRun) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![run_id.to_string()])),
        Arc::new(TimestampMillisecondArray::from(vec![run.start_time.timestamp_millis()])),
        Arc::new(TimestampMillisecondArray::from(vec![run.end_time.timestamp_millis()])),
        Arc::new(Int64Array::from(vec![run.run_duration_seconds])),
        Arc::new(Int64Array::from(vec![run.numbers_of_datasets as i64])),
        Arc::new(StringArray::from(vec![run.versions.linux_version.as_str()])),
        Arc::new(StringArray::from(vec![run.versions.client_version.as_str()])),
        Arc::new(StringArray::from(vec![run.versions.script_version.as_str()])),
    ];

    RecordBatch::try_new(Table::TestRuns.schema(), columns).map_err(Into::into)
}

pub fn records_to_batch(run_id: Uuid, records: &[AvailabilityRecord]) -> Result<RecordBatch> {
    let test_id = run_id.to_string();
    let bbox_column = |pick: fn(&probe::models::BoundingBox) -> f64| -> ArrayRef {
        Arc::new(
            records
                .iter()
                .map(|r| r.bbox.as_ref().map(pick))
                .collect::<Float64Array>(),
        )
    };

    let queries = records
        .iter()
        .map(|r| r.query.as_ref().map(Query::to_json_string).transpose())
        .collect::<Result<Vec<_>>>()?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.id.to_string()))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|_| test_id.as_str()))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.dataset_id.as_str()))),
        Arc::new(records.iter().map(|r| Some(r.available)).collect::<BooleanArray>()),
        Arc::new(records.iter().map(|r| r.error.as_deref()).collect::<StringArray>()),
        bbox_column(|b| b.min_lon),
        bbox_column(|b| b.max_lon),
        bbox_column(|b| b.min_lat),
        bbox_column(|b| b.max_lat),
        Arc::new(
            records
                .iter()
                .map(|r| r.start.as_deref().and_then(parse_coverage_date))
                .collect::<TimestampMillisecondArray>(),
        ),
        Arc::new(
            records
                .iter()
                .map(|r| r.end.as_deref().and_then(parse_coverage_date))
                .collect::<TimestampMillisecondArray>(),
        ),
        Arc::new(
            records
                .iter()
                .map(|r| r.volume_gb.and_then(|v| i64::try_from(v).ok()))
                .collect::<Int64Array>(),
        ),
        Arc::new(queries.iter().map(Option::as_deref).collect::<StringArray>()),
    ];

    RecordBatch::try_new(Table::TestRunDatasets.schema(), columns).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use chrono::{TimeZone, Utc};
    use probe::models::{BoundingBox, Coverage};
    use probe::recorder::{ProbeFailure, ProbeSuccess};
    use probe::run_info::Versions;

    #[test]
    fn test_parse_coverage_date() {
        assert_eq!(parse_coverage_date("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(parse_coverage_date("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_coverage_date("not a date"), None);
        assert_eq!(parse_coverage_date(""), None);
    }

    #[test]
    fn test_run_to_batch() {
        let run = TestRun::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 5, 0).unwrap(),
            4,
            Versions {
                linux_version: "Debian 12".to_string(),
                client_version: "hda-broker/v1".to_string(),
                script_version: "0.1.0".to_string(),
            },
        );
        let batch = run_to_batch(Uuid::new_v4(), &run).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 8);

        let duration = batch.column(3).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(duration.value(0), 300);
    }

    #[test]
    fn test_failed_rows_convert_to_nulls() {
        let mut query = Query::new();
        query.insert("dataset_id", "EO:A:DAT:1");
        let ok = AvailabilityRecord::success(
            "EO:A:DAT:1",
            ProbeSuccess {
                coverage: Coverage {
                    bbox: Some(BoundingBox { min_lon: -1.0, max_lon: 1.0, min_lat: -2.0, max_lat: 2.0 }),
                    start: Some("2020-01-01T00:00:00Z".to_string()),
                    end: Some("garbage".to_string()),
                },
                volume_bytes: Some(3.2e9),
                query,
            },
        );
        let failed = AvailabilityRecord::failure("EO:B:DAT:2", ProbeFailure::from(common::Error::Forbidden));

        let batch = records_to_batch(Uuid::new_v4(), &[ok, failed]).unwrap();
        assert_eq!(batch.num_rows(), 2);

        let min_lon = batch.column(5).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(min_lon.value(0), -1.0);
        assert!(min_lon.is_null(1));

        let end = batch.column(10);
        assert!(end.is_null(0));

        let volume = batch.column(11).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(volume.value(0), 3);
        assert!(volume.is_null(1));

        let query = batch.column(12).as_any().downcast_ref::<StringArray>().unwrap();
        assert!(query.value(0).contains("EO:A:DAT:1"));
        assert!(query.is_null(1));
    }
}
