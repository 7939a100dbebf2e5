//! Builds a minimal search query from a dataset's declared schema.
//!
//! The declared schema is known to be unreliable, so resolution is best-effort:
//! a field whose schema cannot be turned into a value is left out rather than
//! failing the dataset. Exception rules patch up the rest.

use crate::models::{MetadataDocument, Query, QueryValue};
use serde_json::Value;
use tracing::debug;

const START_FIELD: &str = "startdate";
const END_FIELD: &str = "enddate";
const BBOX_FIELD: &str = "bbox";

pub const ITEMS_PER_PAGE_FIELD: &str = "itemsPerPage";
pub const START_INDEX_FIELD: &str = "startIndex";

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub startdate: Option<String>,
    pub enddate: Option<String>,
    pub items_per_page: u32,
    pub start_index: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            startdate: None,
            enddate: None,
            items_per_page: 200,
            start_index: 0,
        }
    }
}

impl QueryOptions {
    pub fn from_config(config: &common::config::ProbeConfig) -> Self {
        Self {
            startdate: config.startdate.clone(),
            enddate: config.enddate.clone(),
            items_per_page: config.items_per_page,
            start_index: config.start_index,
        }
    }
}

/// The shape a field schema takes. Shapes are checked in declaration order
/// and the first one present wins, even if it then fails to resolve.
#[derive(Debug)]
enum FieldShape<'a> {
    OneOf(&'a Value),
    ItemsOneOf(&'a Value),
    Default(&'a Value),
    Unresolvable,
}

impl<'a> FieldShape<'a> {
    fn classify(schema: &'a Value) -> Self {
        if let Some(choices) = schema.get("oneOf") {
            return FieldShape::OneOf(choices);
        }
        if let Some(choices) = schema.get("items").and_then(|items| items.get("oneOf")) {
            return FieldShape::ItemsOneOf(choices);
        }
        match schema.get("default") {
            Some(default) if !is_empty_json(default) => FieldShape::Default(default),
            _ => FieldShape::Unresolvable,
        }
    }

    fn resolve(self) -> Option<QueryValue> {
        match self {
            FieldShape::OneOf(choices) | FieldShape::ItemsOneOf(choices) => first_const(choices),
            FieldShape::Default(default) => QueryValue::from_json(default),
            FieldShape::Unresolvable => None,
        }
    }
}

fn first_const(choices: &Value) -> Option<QueryValue> {
    choices
        .as_array()?
        .first()?
        .get("const")
        .and_then(QueryValue::from_json)
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Resolves one field schema to a value, or `None` to omit the field.
pub fn resolve_field(schema: &Value) -> Option<QueryValue> {
    FieldShape::classify(schema).resolve()
}

/// Override first, then the property's `default`, then its range bound.
fn resolve_date(
    document: &MetadataDocument,
    field: &str,
    bound: &str,
    override_value: Option<&str>,
) -> Option<QueryValue> {
    if let Some(value) = override_value.filter(|v| !v.is_empty()) {
        return Some(QueryValue::from(value));
    }

    let prop = document.property(field)?;
    ["default", bound]
        .iter()
        .filter_map(|key| prop.get(*key))
        .find(|value| !is_empty_json(value))
        .and_then(QueryValue::from_json)
}

pub fn synthesize(document: &MetadataDocument, options: &QueryOptions) -> Query {
    let mut query = Query::new();

    for (field, schema) in &document.properties {
        if matches!(field.as_str(), START_FIELD | END_FIELD | BBOX_FIELD) {
            continue;
        }

        match resolve_field(schema) {
            Some(value) => query.insert(field.as_str(), value),
            None => debug!(field = %field, "Omitting field with no resolvable value"),
        }
    }

    if let Some(start) = resolve_date(document, START_FIELD, "minimum", options.startdate.as_deref()) {
        query.insert(START_FIELD, start);
    }
    if let Some(end) = resolve_date(document, END_FIELD, "maximum", options.enddate.as_deref()) {
        query.insert(END_FIELD, end);
    }

    query.insert(ITEMS_PER_PAGE_FIELD, options.items_per_page);
    query.insert(START_INDEX_FIELD, options.start_index);

    query
}

/// Fields the document marks as required but the query does not carry.
pub fn missing_required<'a>(document: &'a MetadataDocument, query: &Query) -> Vec<&'a str> {
    document
        .required
        .iter()
        .map(String::as_str)
        .filter(|field| !query.has_value(field))
        .collect()
}
