//! Dataset-specific corrections to synthesized queries.
//!
//! The catalog's declared schemas are often wrong for individual datasets or
//! whole families of them. Each [`ExceptionRule`] is attached to a regular
//! expression searched (unanchored) against the dataset id; exact-id rules
//! anchor themselves with `^...$`. Every matching rule applies, in registry
//! order.

mod builtin;
mod file;

pub use builtin::builtin_rules;
pub use file::{RuleFileEntry, load_rules_file};

use crate::models::{Query, QueryValue};
use common::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

pub const MISSING_PLACEHOLDER: &str = "MISSING";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExceptionRule {
    pub notes: Option<String>,
    pub force_fields: BTreeMap<String, QueryValue>,
    pub remove_fields: Vec<String>,
    /// Field name to the placeholder written when the field is missing or empty.
    pub required_fields: BTreeMap<String, QueryValue>,
    pub require_non_empty: Vec<String>,
}

impl ExceptionRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn force(mut self, field: &str, value: impl Into<QueryValue>) -> Self {
        self.force_fields.insert(field.to_string(), value.into());
        self
    }

    pub fn remove(mut self, field: &str) -> Self {
        self.remove_fields.push(field.to_string());
        self
    }

    /// Requires `field`, filling it with [`MISSING_PLACEHOLDER`] when absent.
    pub fn require(self, field: &str) -> Self {
        self.require_with(field, MISSING_PLACEHOLDER)
    }

    pub fn require_with(mut self, field: &str, placeholder: impl Into<QueryValue>) -> Self {
        self.required_fields.insert(field.to_string(), placeholder.into());
        self
    }

    pub fn require_non_empty(mut self, field: &str) -> Self {
        self.require_non_empty.push(field.to_string());
        self
    }

    /// Force, then remove, then fill placeholders, then validate.
    fn apply_to(&self, dataset_id: &str, query: &mut Query) -> Result<()> {
        for (field, value) in &self.force_fields {
            query.insert(field.as_str(), value.clone());
        }

        for field in &self.remove_fields {
            query.remove(field);
        }

        for (field, placeholder) in &self.required_fields {
            if !query.has_value(field) {
                query.insert(field.as_str(), placeholder.clone());
            }
        }

        if let Some(field) = self.require_non_empty.iter().find(|field| !query.has_value(field)) {
            return Err(Error::RequireNonEmpty {
                dataset_id: dataset_id.to_string(),
                field: field.clone(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Checked before every existing rule.
    #[default]
    Front,
    /// Checked after every existing rule.
    Back,
}

#[derive(Debug, Clone)]
struct RegisteredRule {
    pattern: Regex,
    rule: ExceptionRule,
}

#[derive(Debug, Clone, Default)]
pub struct ExceptionRegistry {
    rules: Vec<RegisteredRule>,
}

impl ExceptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles a static table, keeping its order.
    pub fn from_table<I>(table: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'static str, ExceptionRule)>,
    {
        let mut registry = Self::new();
        for (pattern, rule) in table {
            registry.register(pattern, rule, Position::Back)?;
        }
        Ok(registry)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_table(builtin_rules())
    }

    pub fn register(&mut self, pattern: &str, rule: ExceptionRule, position: Position) -> Result<()> {
        let entry = RegisteredRule {
            pattern: Regex::new(pattern)?,
            rule,
        };

        match position {
            Position::Front => self.rules.insert(0, entry),
            Position::Back => self.rules.push(entry),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules whose pattern matches `dataset_id`, in registry order.
    pub fn matching<'a>(&'a self, dataset_id: &'a str) -> impl Iterator<Item = &'a ExceptionRule> + 'a {
        self.rules
            .iter()
            .filter(move |entry| entry.pattern.is_match(dataset_id))
            .map(|entry| &entry.rule)
    }

    /// Applies every matching rule in order. A failed `require_non_empty`
    /// check stops at that rule and fails only this dataset.
    pub fn apply(&self, dataset_id: &str, mut query: Query) -> Result<Query> {
        for entry in self.rules.iter().filter(|entry| entry.pattern.is_match(dataset_id)) {
            info!(
                dataset_id,
                pattern = entry.pattern.as_str(),
                notes = entry.rule.notes.as_deref().unwrap_or(""),
                "Applying exception rules"
            );
            entry.rule.apply_to(dataset_id, &mut query)?;
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_with(fields: &[(&str, &str)]) -> Query {
        let mut query = Query::new();
        for (field, value) in fields {
            query.insert(*field, *value);
        }
        query
    }

    #[test]
    fn test_force_is_idempotent() {
        let rule = ExceptionRule::new().force("productionStatus", "ARCHIVED");
        let mut registry = ExceptionRegistry::new();
        registry.register("^EO:X$", rule, Position::Back).unwrap();

        let once = registry
            .apply("EO:X", query_with(&[("productionStatus", "CANCELLED")]))
            .unwrap();
        let twice = registry.apply("EO:X", once.clone()).unwrap();

        assert_eq!(once.get("productionStatus"), Some(&QueryValue::from("ARCHIVED")));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rules_apply_in_registry_order() {
        let remove_x = ExceptionRule::new().remove("x");
        let force_x = ExceptionRule::new().force("x", "forced");

        let mut remove_then_force = ExceptionRegistry::new();
        remove_then_force.register("^EO:A", remove_x.clone(), Position::Back).unwrap();
        remove_then_force.register("^EO:A:1$", force_x.clone(), Position::Back).unwrap();
        let query = remove_then_force.apply("EO:A:1", query_with(&[("x", "orig")])).unwrap();
        assert_eq!(query.get("x"), Some(&QueryValue::from("forced")));

        let mut force_then_remove = ExceptionRegistry::new();
        force_then_remove.register("^EO:A:1$", force_x, Position::Back).unwrap();
        force_then_remove.register("^EO:A", remove_x, Position::Back).unwrap();
        let query = force_then_remove.apply("EO:A:1", query_with(&[("x", "orig")])).unwrap();
        assert!(!query.contains("x"));
    }

    #[test]
    fn test_front_registration_runs_first() {
        let mut registry = ExceptionRegistry::new();
        registry
            .register("^EO:A$", ExceptionRule::new().force("x", "back"), Position::Back)
            .unwrap();
        registry
            .register("^EO:A$", ExceptionRule::new().remove("x"), Position::Front)
            .unwrap();

        // Front rule removes first, then the back rule forces.
        let query = registry.apply("EO:A", Query::new()).unwrap();
        assert_eq!(query.get("x"), Some(&QueryValue::from("back")));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_required_fields_fill_only_missing_or_empty() {
        let rule = ExceptionRule::new().require("a").require("b").require_with("c", "2");
        let mut registry = ExceptionRegistry::new();
        registry.register("EO:", rule, Position::Back).unwrap();

        let query = registry
            .apply("EO:Y", query_with(&[("a", "kept"), ("b", "")]))
            .unwrap();

        assert_eq!(query.get("a"), Some(&QueryValue::from("kept")));
        assert_eq!(query.get("b"), Some(&QueryValue::from(MISSING_PLACEHOLDER)));
        assert_eq!(query.get("c"), Some(&QueryValue::from("2")));
    }

    #[test]
    fn test_require_non_empty_failure_names_dataset_and_field() {
        let rule = ExceptionRule::new().require_non_empty("startdate").require_non_empty("enddate");
        let mut registry = ExceptionRegistry::new();
        registry.register("^EO:ESA:DAT:SENTINEL-3$", rule, Position::Back).unwrap();

        let err = registry
            .apply("EO:ESA:DAT:SENTINEL-3", query_with(&[("enddate", "2024-01-01")]))
            .unwrap_err();

        assert!(matches!(err, Error::RequireNonEmpty { .. }));
        let message = err.to_string();
        assert!(message.contains("EO:ESA:DAT:SENTINEL-3"));
        assert!(message.contains("startdate"));
    }

    #[test]
    fn test_require_non_empty_passes_when_present() {
        let rule = ExceptionRule::new().require_non_empty("startdate");
        let mut registry = ExceptionRegistry::new();
        registry.register("^EO:B$", rule, Position::Back).unwrap();

        let query = query_with(&[("startdate", "2024-01-01")]);
        assert_eq!(registry.apply("EO:B", query.clone()).unwrap(), query);
    }

    #[test]
    fn test_unanchored_patterns_match_substrings() {
        let mut registry = ExceptionRegistry::new();
        registry
            .register("NWSHELF", ExceptionRule::new().remove("bbox"), Position::Back)
            .unwrap();
        assert_eq!(registry.matching("EO:MO:DAT:NWSHELF_MULTIYEAR").count(), 1);
        assert_eq!(registry.matching("EO:MO:DAT:BALTIC").count(), 0);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut registry = ExceptionRegistry::new();
        let err = registry
            .register("^EO:(unclosed", ExceptionRule::new(), Position::Back)
            .unwrap_err();
        assert!(matches!(err, Error::Pattern(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_builtin_nwshelf_drops_bbox_only() {
        let registry = ExceptionRegistry::builtin().unwrap();
        let mut query = query_with(&[("dataset_id", "EO:MO:DAT:NWSHELF"), ("startdate", "2024-01-01")]);
        query.insert("bbox", vec![40.0, 41.0, 40.0, 41.0]);
        query.insert("itemsPerPage", 200u32);

        let result = registry.apply("EO:MO:DAT:NWSHELF", query.clone()).unwrap();

        assert!(!result.contains("bbox"));
        query.remove("bbox");
        assert_eq!(result, query);
    }

    #[test]
    fn test_builtin_exact_rule_does_not_overmatch() {
        let registry = ExceptionRegistry::builtin().unwrap();
        let mut query = Query::new();
        query.insert("bbox", vec![1.0, 2.0, 3.0, 4.0]);

        let result = registry.apply("EO:MO:DAT:NWSHELF_OTHER", query.clone()).unwrap();
        assert_eq!(result, query);
    }

    #[test]
    fn test_builtin_eumetsat_family_gets_repeat_cycle() {
        let registry = ExceptionRegistry::builtin().unwrap();
        let query = query_with(&[("dataset_id", "EO:EUM:DAT:0601")]);

        let result = registry.apply("EO:EUM:DAT:0601", query).unwrap();

        assert_eq!(result.get("repeatCycleIdentifier"), Some(&QueryValue::from("2")));
        assert_eq!(result.get("dataset_id"), Some(&QueryValue::from("EO:EUM:DAT:0601")));
    }

    #[test]
    fn test_builtin_sentinel3_requires_dates() {
        let registry = ExceptionRegistry::builtin().unwrap();
        let err = registry.apply("EO:ESA:DAT:SENTINEL-3", Query::new()).unwrap_err();
        assert_eq!(err.to_string(), "EO:ESA:DAT:SENTINEL-3 requires non-empty startdate");
    }
}
