use super::{ExceptionRegistry, ExceptionRule, MISSING_PLACEHOLDER, Position};
use crate::models::QueryValue;
use common::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Required fields may be listed by name (placeholder `"MISSING"`) or mapped
/// to an explicit placeholder.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequiredFields {
    Names(Vec<String>),
    WithPlaceholders(BTreeMap<String, QueryValue>),
}

impl Default for RequiredFields {
    fn default() -> Self {
        RequiredFields::Names(Vec::new())
    }
}

/// One entry of a JSON rules file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleFileEntry {
    pub pattern: String,
    #[serde(default)]
    pub position: Position,
    pub notes: Option<String>,
    #[serde(default)]
    pub force_fields: BTreeMap<String, QueryValue>,
    #[serde(default)]
    pub remove_fields: Vec<String>,
    #[serde(default)]
    pub required_fields: RequiredFields,
    #[serde(default)]
    pub require_non_empty: Vec<String>,
}

impl RuleFileEntry {
    pub fn into_rule(self) -> (String, Position, ExceptionRule) {
        let required_fields = match self.required_fields {
            RequiredFields::Names(names) => names
                .into_iter()
                .map(|name| (name, QueryValue::from(MISSING_PLACEHOLDER)))
                .collect(),
            RequiredFields::WithPlaceholders(map) => map,
        };

        let rule = ExceptionRule {
            notes: self.notes,
            force_fields: self.force_fields,
            remove_fields: self.remove_fields,
            required_fields,
            require_non_empty: self.require_non_empty,
        };
        (self.pattern, self.position, rule)
    }
}

pub fn parse_rules(contents: &str) -> Result<Vec<RuleFileEntry>> {
    serde_json::from_str(contents).map_err(Into::into)
}

/// Registers every rule of the file into `registry`, in file order.
pub fn load_rules_file(registry: &mut ExceptionRegistry, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let entries = parse_rules(&contents)?;
    let count = entries.len();

    // Front entries are inserted in reverse so the file's order is kept among them.
    let (front, back): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .map(RuleFileEntry::into_rule)
        .partition(|(_, position, _)| *position == Position::Front);

    for (pattern, position, rule) in front.into_iter().rev().chain(back) {
        registry.register(&pattern, rule, position)?;
    }

    info!(path = %path.display(), count, "Registered exception rules from file");
    Ok(count)
}
