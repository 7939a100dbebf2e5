use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One value of a search payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<QueryValue>),
}

impl QueryValue {
    /// Converts a JSON value. Objects have no query representation and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(QueryValue::Null),
            Value::Bool(b) => Some(QueryValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(QueryValue::Integer)
                .or_else(|| n.as_f64().map(QueryValue::Float)),
            Value::String(s) => Some(QueryValue::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(QueryValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(QueryValue::List),
            Value::Object(_) => None,
        }
    }

    /// Null, the empty string and the empty list count as empty. Numbers and
    /// booleans never do, so an explicit `0` survives a required-field check.
    pub fn is_empty(&self) -> bool {
        match self {
            QueryValue::Null => true,
            QueryValue::Text(s) => s.is_empty(),
            QueryValue::List(items) => items.is_empty(),
            QueryValue::Bool(_) | QueryValue::Integer(_) | QueryValue::Float(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Integer(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<Vec<f64>> for QueryValue {
    fn from(values: Vec<f64>) -> Self {
        QueryValue::List(values.into_iter().map(QueryValue::Float).collect())
    }
}

/// The exact parameter set sent to the search endpoint for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&QueryValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<QueryValue> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// True when the field is present and not empty.
    pub fn has_value(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json_string(&self) -> common::Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

impl FromIterator<(String, QueryValue)> for Query {
    fn from_iter<I: IntoIterator<Item = (String, QueryValue)>>(iter: I) -> Self {
        Query(iter.into_iter().collect())
    }
}
