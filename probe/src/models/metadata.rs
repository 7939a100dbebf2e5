use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A catalog entry's self-description: query schema plus descriptive side channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// What a successful probe reports about a dataset's extent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    pub bbox: Option<BoundingBox>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl MetadataDocument {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Reads `metadata._source.location.coordinates`, stored as two corner
    /// pairs `[[min_lon, max_lat], [max_lon, min_lat]]`. All four values or none.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let coords = self
            .metadata
            .as_ref()?
            .pointer("/_source/location/coordinates")?
            .as_array()?;

        let corner = |idx: usize, axis: usize| -> Option<f64> { coords.get(idx)?.get(axis)?.as_f64() };

        Some(BoundingBox {
            min_lon: corner(0, 0)?,
            max_lon: corner(1, 0)?,
            min_lat: corner(1, 1)?,
            max_lat: corner(0, 1)?,
        })
    }

    /// Default coverage dates advertised for the `startdate`/`enddate` fields.
    pub fn default_dates(&self) -> (Option<String>, Option<String>) {
        let default_of = |field: &str| {
            self.property(field)
                .and_then(|prop| prop.get("default"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        (default_of("startdate"), default_of("enddate"))
    }

    pub fn coverage(&self) -> Coverage {
        let (start, end) = self.default_dates();
        Coverage {
            bbox: self.bounding_box(),
            start,
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> MetadataDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_bounding_box_from_corner_pairs() {
        let doc = document(json!({
            "properties": {},
            "metadata": {"_source": {"location": {"coordinates": [[-10.5, 60.0], [12.0, 40.25]]}}}
        }));

        assert_eq!(
            doc.bounding_box(),
            Some(BoundingBox {
                min_lon: -10.5,
                max_lon: 12.0,
                min_lat: 40.25,
                max_lat: 60.0,
            })
        );
    }

    #[test]
    fn test_bounding_box_absent_or_partial() {
        assert_eq!(document(json!({"properties": {}})).bounding_box(), None);

        let partial = document(json!({
            "metadata": {"_source": {"location": {"coordinates": [[-10.5, 60.0]]}}}
        }));
        assert_eq!(partial.bounding_box(), None);

        let non_numeric = document(json!({
            "metadata": {"_source": {"location": {"coordinates": [["a", 60.0], [1.0, 2.0]]}}}
        }));
        assert_eq!(non_numeric.bounding_box(), None);
    }

    #[test]
    fn test_default_dates() {
        let doc = document(json!({
            "properties": {
                "startdate": {"default": "2020-01-01T00:00:00.000Z", "minimum": "1990-01-01T00:00:00.000Z"},
                "enddate": {"default": ""}
            }
        }));

        let (start, end) = doc.default_dates();
        assert_eq!(start.as_deref(), Some("2020-01-01T00:00:00.000Z"));
        assert_eq!(end, None);
    }
}
