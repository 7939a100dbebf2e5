use config::{Config, ConfigError, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_catalog_page_size")]
    pub page_size: u32,
    /// Sent with every request, e.g. `Authorization = "Bearer ..."`.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
    #[serde(default)]
    pub start_index: u32,
    pub startdate: Option<String>,
    pub enddate: Option<String>,
    /// JSON file of extra exception rules registered on top of the built-in table.
    pub exceptions_file: Option<String>,
    /// Only dataset ids matching this pattern are probed.
    pub dataset_filter: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Local,
    S3,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: String,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default = "default_s3_region")]
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
            page_size: default_catalog_page_size(),
            headers: HashMap::new(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout_secs(),
            items_per_page: default_items_per_page(),
            start_index: 0,
            startdate: None,
            enddate: None,
            exceptions_file: None,
            dataset_filter: None,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
            bucket: None,
            endpoint: None,
            region: default_s3_region(),
            access_key: None,
            secret_key: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_base_url() -> String {
    "https://gateway.prod.wekeo2.eu/hda-broker/api/v1".to_string()
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_catalog_page_size() -> u32 {
    100
}

fn default_probe_timeout_secs() -> u64 {
    30
}

fn default_items_per_page() -> u32 {
    200
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Local
}

fn default_store_path() -> String {
    "history".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_port() -> u16 {
    3000
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;

        if let Ok(headers) = config.get_table("catalog.headers") {
            debug!(header_count = headers.len(), "Loaded catalog headers from configuration");
        }

        let settings: Settings = config.try_deserialize()?;

        debug!(
            base_url = %settings.catalog.base_url,
            timeout_secs = settings.probe.timeout_secs,
            "Parsed settings"
        );

        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_empty_file() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.probe.timeout_secs, 30);
        assert_eq!(settings.probe.items_per_page, 200);
        assert_eq!(settings.probe.start_index, 0);
        assert_eq!(settings.output.data_dir, "data");
        assert_eq!(settings.store.backend, StoreBackend::Local);
        assert_eq!(settings.api_port, 3000);
    }

    #[test]
    fn test_sections_override_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            api_port = 8080

            [catalog]
            base_url = "http://localhost:9999/api"

            [probe]
            timeout_secs = 5
            startdate = "2024-01-01T00:00:00.000Z"

            [store]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(settings.catalog.base_url, "http://localhost:9999/api");
        assert_eq!(settings.probe.timeout(), Duration::from_secs(5));
        assert_eq!(settings.probe.startdate.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert_eq!(settings.api_port, 8080);
    }
}
