use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntry {
    pub dataset_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultProperties {
    #[serde(rename = "totalResults")]
    pub total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetListResponse {
    #[serde(default)]
    pub features: Vec<DatasetEntry>,
    #[serde(default)]
    pub properties: ResultProperties,
}

/// Matches returned by the search endpoint for one query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub features: Vec<Value>,
    #[serde(default)]
    pub properties: ResultProperties,
}

impl SearchResult {
    pub fn total_results(&self) -> Option<u64> {
        self.properties.total_results
    }

    /// Total size in bytes of every matched product. `None` as soon as one
    /// feature lacks a numeric `properties.size`.
    pub fn volume_bytes(&self) -> Option<f64> {
        self.features.iter().try_fold(0.0, |acc, feature| {
            feature
                .pointer("/properties/size")
                .and_then(Value::as_f64)
                .map(|size| acc + size)
        })
    }
}
