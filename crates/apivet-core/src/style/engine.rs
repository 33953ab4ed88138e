//! Rule engine contract
//!
//! The pipeline treats rule evaluation as a black box: an engine receives the
//! document and the enabled rules, and returns loosely typed violations that
//! the [`super::StyleLintAdapter`] normalizes.

use crate::diagnostics::Severity;
use apivet_schemas::{Document, PathSegment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rule an engine can evaluate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDescriptor {
    pub code: &'static str,
    pub default_severity: Severity,
    pub description: &'static str,
}

/// The enabled rules and the numeric severity each one reports with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: BTreeMap<String, Severity>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, code: impl Into<String>, severity: Severity) {
        self.rules.insert(code.into(), severity);
    }

    pub fn is_enabled(&self, code: &str) -> bool {
        self.rules.contains_key(code)
    }

    pub fn severity(&self, code: &str) -> Option<Severity> {
        self.rules.get(code).copied()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<(String, Severity)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (String, Severity)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// What an engine lints
///
/// `resolved` is the dereferenced view of `raw`; the pipeline has already
/// proven it acyclic, so engines never resolve references themselves.
#[derive(Debug, Clone, Copy)]
pub struct LintInput<'a> {
    pub raw: &'a Document,
    pub resolved: &'a Document,
}

/// A violation as an engine reports it
///
/// Every field is optional and the severity is an arbitrary JSON value, so
/// output from out-of-process engines deserializes straight into this type.
/// The adapter drops entries that lack what a diagnostic needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawViolation {
    pub code: Option<String>,
    pub message: Option<String>,
    pub path: Option<Vec<PathSegment>>,
    pub severity: Option<serde_json::Value>,
    /// External document holding the node, when it is not the validated one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl RawViolation {
    /// A well-formed violation with a numeric severity
    pub fn new(
        code: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        path: Vec<PathSegment>,
    ) -> Self {
        let numeric = match severity {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
            Severity::Hint => 3,
        };
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
            path: Some(path),
            severity: Some(serde_json::Value::from(numeric)),
            document: None,
        }
    }

    pub fn in_document(mut self, document: Option<String>) -> Self {
        self.document = document;
        self
    }
}

/// Executes a ruleset against a document
pub trait RuleEngine: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Every rule this engine knows, with its default severity
    fn catalog(&self) -> Vec<RuleDescriptor>;

    /// Evaluate the enabled rules
    fn run(&self, input: &LintInput<'_>, rules: &RuleSet) -> Vec<RawViolation>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_violation_from_engine_json() {
        let raw: RawViolation = serde_json::from_value(json!({
            "code": "operation-operationId",
            "message": "Operation must have \"operationId\".",
            "path": ["paths", "/pets", "get"],
            "severity": 1
        }))
        .unwrap();
        assert_eq!(raw.code.as_deref(), Some("operation-operationId"));
        assert_eq!(raw.path.as_ref().map(Vec::len), Some(3));
        assert_eq!(raw.severity, Some(json!(1)));

        let partial: RawViolation = serde_json::from_value(json!({"message": "x"})).unwrap();
        assert!(partial.code.is_none());
        assert!(partial.path.is_none());
    }

    #[test]
    fn test_ruleset() {
        let rules: RuleSet = vec![("info-contact".to_string(), Severity::Info)].into_iter().collect();
        assert!(rules.is_enabled("info-contact"));
        assert_eq!(rules.severity("info-contact"), Some(Severity::Info));
        assert!(!rules.is_enabled("no-ref-siblings"));
    }
}
