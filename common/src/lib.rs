use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use parquet::errors::ParquetError;
use std::time::Duration;
use thiserror::Error;
use url::ParseError;

pub mod config;
pub mod telemetry;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] rquest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Forbidden - Access denied")]
    Forbidden,

    #[error("Gateway timeout")]
    GatewayTimeout,

    #[error("{dataset_id} requires non-empty {field}")]
    RequireNonEmpty { dataset_id: String, field: String },

    #[error("Dataset check exceeded {} seconds", .0.as_secs_f64())]
    ProbeTimeout(Duration),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] DataFusionError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        Error::Storage(format!("Object store error: {}", err))
    }
}

impl From<object_store::path::Error> for Error {
    fn from(err: object_store::path::Error) -> Self {
        Error::Storage(format!("Invalid object path: {}", err))
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::InvalidInput(format!("URL parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_empty_message_names_dataset_and_field() {
        let err = Error::RequireNonEmpty {
            dataset_id: "EO:ESA:DAT:SENTINEL-3".to_string(),
            field: "startdate".to_string(),
        };
        assert_eq!(err.to_string(), "EO:ESA:DAT:SENTINEL-3 requires non-empty startdate");
    }

    #[test]
    fn test_probe_timeout_message_carries_bound() {
        let err = Error::ProbeTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Dataset check exceeded 30 seconds");
    }
}
