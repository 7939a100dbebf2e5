use super::CatalogClient;
use crate::models::{DatasetEntry, DatasetListResponse, MetadataDocument, Query, SearchResult};
use async_trait::async_trait;
use common::config::CatalogConfig;
use common::{Error, Result};
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Client for the Harmonized Data Access broker API.
pub struct HdaClient {
    http: rquest::Client,
    base_url: Url,
    api_version: String,
    page_size: u32,
}

impl HdaClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let http = rquest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(build_headers(config)?)
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(config.base_url.trim_end_matches('/'))?,
            api_version: config.api_version.clone(),
            page_size: config.page_size,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidInput(format!("Base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self.http.get(url.as_str()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        check_status(status, &body)?;
        serde_json::from_str(&body).map_err(Into::into)
    }
}

fn build_headers(config: &CatalogConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidInput(format!("Invalid value for header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    match status {
        StatusCode::FORBIDDEN => Err(Error::Forbidden),
        StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimit),
        StatusCode::GATEWAY_TIMEOUT => Err(Error::GatewayTimeout),
        _ => Err(Error::Api {
            status: status.as_u16(),
            message: error_message(body),
        }),
    }
}

/// The broker reports errors as `{"detail": ...}` or `{"message": ...}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["detail", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Walks the dataset listing page by page until `totalResults` (or a short
/// page) says it is done. A page that repeats the previous one also ends the
/// walk, since a server ignoring `startIndex` would otherwise loop forever.
async fn collect_pages<F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<DatasetEntry>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<DatasetListResponse>>,
{
    let mut datasets = Vec::new();
    let mut start_index = 0u64;
    let mut previous_first: Option<String> = None;

    loop {
        let page = fetch(start_index).await?;
        let first = page.features.first().map(|entry| entry.dataset_id.clone());
        if first.is_some() && first == previous_first {
            warn!(start_index, "Catalog returned the same page twice, stopping pagination");
            break;
        }

        let fetched = page.features.len() as u64;
        datasets.extend(page.features);
        start_index += fetched;

        let exhausted = match page.properties.total_results {
            Some(total) => start_index >= total,
            None => fetched < u64::from(page_size),
        };
        if fetched == 0 || exhausted {
            break;
        }
        previous_first = first;
    }

    Ok(datasets)
}

/// Coverage comes from the `metadata` key of the dataset description. A
/// description without it leaves the document untouched.
fn merge_description(document: &mut MetadataDocument, description: &Value) {
    if let Some(metadata) = description.get("metadata") {
        document.metadata = Some(metadata.clone());
    }
}

#[async_trait]
impl CatalogClient for HdaClient {
    async fn list_datasets(&self) -> Result<Vec<DatasetEntry>> {
        let datasets = collect_pages(self.page_size, |start_index| async move {
            let mut url = self.endpoint(&["datasets"])?;
            url.query_pairs_mut()
                .append_pair("startIndex", &start_index.to_string())
                .append_pair("itemsPerPage", &self.page_size.to_string());
            self.get_json::<DatasetListResponse>(url).await
        })
        .await?;

        debug!(count = datasets.len(), "Listed catalog datasets");
        Ok(datasets)
    }

    async fn get_metadata(&self, dataset_id: &str) -> Result<MetadataDocument> {
        let mut document: MetadataDocument = self
            .get_json(self.endpoint(&["dataaccess", "queryable", dataset_id])?)
            .await?;

        // Coverage lives in the dataset description; losing it only loses coverage.
        match self.get_json::<Value>(self.endpoint(&["datasets", dataset_id])?).await {
            Ok(description) => merge_description(&mut document, &description),
            Err(e) => warn!(dataset_id, error = %e, "Dataset description unavailable"),
        }

        Ok(document)
    }

    async fn search(&self, query: &Query) -> Result<SearchResult> {
        let url = self.endpoint(&["dataaccess", "search"])?;
        debug!(%url, query = ?query, "POST");

        let response = self
            .http
            .post(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(query)?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        check_status(status, &body)?;
        serde_json::from_str(&body).map_err(Into::into)
    }

    fn version(&self) -> String {
        format!("hda-broker/{}", self.api_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultProperties;
    use serde_json::json;
    use std::collections::HashMap;

    fn config() -> CatalogConfig {
        CatalogConfig {
            base_url: "https://broker.example.org/api/v1/".to_string(),
            headers: HashMap::from([("Authorization".to_string(), "Bearer token".to_string())]),
            ..CatalogConfig::default()
        }
    }

    #[test]
    fn test_endpoint_joins_and_encodes_segments() {
        let client = HdaClient::new(&config()).unwrap();
        let url = client.endpoint(&["dataaccess", "queryable", "EO:CNES:DAT:SWH:SPOT5"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://broker.example.org/api/v1/dataaccess/queryable/EO:CNES:DAT:SWH:SPOT5"
        );

        let odd = client.endpoint(&["datasets", "EO:X/Y Z"]).unwrap();
        assert_eq!(odd.as_str(), "https://broker.example.org/api/v1/datasets/EO:X%2FY%20Z");
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(StatusCode::OK, "").is_ok());
        assert!(matches!(check_status(StatusCode::FORBIDDEN, ""), Err(Error::Forbidden)));
        assert!(matches!(check_status(StatusCode::TOO_MANY_REQUESTS, ""), Err(Error::RateLimit)));
        assert!(matches!(check_status(StatusCode::GATEWAY_TIMEOUT, ""), Err(Error::GatewayTimeout)));

        match check_status(StatusCode::BAD_REQUEST, r#"{"detail": "Invalid bbox"}"#) {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid bbox");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("  upstream exploded \n"), "upstream exploded");
        assert_eq!(error_message(r#"{"message": {"code": 7}}"#), r#"{"code":7}"#);
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let mut cfg = config();
        cfg.headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(HdaClient::new(&cfg), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_version_names_api() {
        let client = HdaClient::new(&config()).unwrap();
        assert_eq!(client.version(), "hda-broker/v1");
    }

    fn page(ids: &[&str], total: Option<u64>) -> DatasetListResponse {
        DatasetListResponse {
            features: ids
                .iter()
                .map(|id| DatasetEntry { dataset_id: id.to_string() })
                .collect(),
            properties: ResultProperties { total_results: total },
        }
    }

    #[tokio::test]
    async fn test_pages_follow_start_index_until_total() {
        let mut calls = Vec::new();
        let datasets = collect_pages(2, |start| {
            calls.push(start);
            let ids: &[&str] = match start {
                0 => &["EO:A:DAT:1", "EO:A:DAT:2"],
                2 => &["EO:B:DAT:3", "EO:B:DAT:4"],
                _ => &["EO:C:DAT:5"],
            };
            std::future::ready(Ok(page(ids, Some(5))))
        })
        .await
        .unwrap();

        assert_eq!(calls, vec![0, 2, 4]);
        let ids: Vec<_> = datasets.iter().map(|d| d.dataset_id.as_str()).collect();
        assert_eq!(ids, vec!["EO:A:DAT:1", "EO:A:DAT:2", "EO:B:DAT:3", "EO:B:DAT:4", "EO:C:DAT:5"]);
    }

    #[tokio::test]
    async fn test_server_ignoring_start_index_stops_after_first_page() {
        let mut calls = 0;
        let datasets = collect_pages(2, |_| {
            calls += 1;
            std::future::ready(Ok(page(&["EO:A:DAT:1", "EO:A:DAT:2"], None)))
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(datasets.len(), 2);
    }

    #[tokio::test]
    async fn test_page_error_is_returned() {
        let result = collect_pages(2, |_| std::future::ready(Err(Error::RateLimit))).await;
        assert!(matches!(result, Err(Error::RateLimit)));
    }

    #[test]
    fn test_description_without_metadata_keeps_document() {
        let mut document = MetadataDocument {
            metadata: Some(json!({"extent": {"temporal": {"interval": [["2020-01-01", null]]}}})),
            ..MetadataDocument::default()
        };

        merge_description(&mut document, &json!({"datasetId": "EO:A:DAT:1"}));
        assert!(document.metadata.is_some());

        merge_description(&mut document, &json!({"metadata": {"abstract": "x"}}));
        assert_eq!(document.metadata, Some(json!({"abstract": "x"})));
    }
}
