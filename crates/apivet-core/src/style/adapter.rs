//! Turning rule engine output into diagnostics

use super::engine::{LintInput, RawViolation, RuleEngine};
use crate::config::ValidationConfig;
use crate::diagnostics::{Diagnostic, Severity};
use apivet_schemas::{NodePath, Origin};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Runs a [`RuleEngine`] and normalizes its violations
#[derive(Clone)]
pub struct StyleLintAdapter {
    engine: Arc<dyn RuleEngine>,
}

impl std::fmt::Debug for StyleLintAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleLintAdapter")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl StyleLintAdapter {
    pub fn new(engine: Arc<dyn RuleEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &dyn RuleEngine {
        self.engine.as_ref()
    }

    /// Evaluate the configured rules against `input`
    pub fn lint(&self, input: &LintInput<'_>, config: &ValidationConfig) -> Vec<RawViolation> {
        self.engine.run(input, &config.to_ruleset())
    }

    /// Lint and normalize in one step
    #[instrument(skip_all, fields(engine = self.engine.name()))]
    pub fn check(&self, input: &LintInput<'_>, config: &ValidationConfig) -> Vec<Diagnostic> {
        let raw = self.lint(input, config);
        let total = raw.len();
        let diagnostics: Vec<Diagnostic> = raw
            .into_iter()
            .filter_map(|violation| normalize(violation, config))
            .collect();
        debug!(total, kept = diagnostics.len(), "style rules evaluated");
        diagnostics
    }
}

/// Map one raw violation to a diagnostic
///
/// Returns `None` for parse-level codes, malformed entries and excluded
/// paths. Malformed entries are logged when `config.debug` is set and are
/// never reported.
pub fn normalize(violation: RawViolation, config: &ValidationConfig) -> Option<Diagnostic> {
    if let Some(code) = violation.code.as_deref() {
        if config.is_discarded(code) {
            return None;
        }
    }

    let numeric = violation.severity.as_ref().and_then(serde_json::Value::as_i64);
    let (code, message, segments, engine_severity) = match (
        violation.code.as_deref(),
        violation.message.as_deref(),
        violation.path.as_ref(),
        numeric.and_then(Severity::from_code),
    ) {
        (Some(code), Some(message), Some(path), Some(severity)) => (code, message, path, severity),
        _ => {
            if config.debug {
                debug!(
                    violation = %serde_json::to_string(&violation).unwrap_or_default(),
                    "dropping malformed rule engine result"
                );
            }
            return None;
        }
    };

    let path = NodePath::new(segments.clone());
    if config.is_excluded(code, &path) {
        return None;
    }

    let severity = config
        .rule(code)
        .map(|setting| setting.severity)
        .unwrap_or(engine_severity);
    let origin = Origin {
        document: violation.document.as_deref().map(Arc::from),
        path,
    };
    Some(Diagnostic::style(code, severity, message, &origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use crate::style::{builtin_catalog, RuleDescriptor, RuleSet};
    use apivet_schemas::Document;
    use serde_json::json;

    struct Canned(Vec<RawViolation>);

    impl RuleEngine for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn catalog(&self) -> Vec<RuleDescriptor> {
            builtin_catalog()
        }

        fn run(&self, _input: &LintInput<'_>, _rules: &RuleSet) -> Vec<RawViolation> {
            self.0.clone()
        }
    }

    fn raw(value: serde_json::Value) -> RawViolation {
        serde_json::from_value(value).unwrap()
    }

    fn check(violations: Vec<RawViolation>, config: &ValidationConfig) -> Vec<Diagnostic> {
        let document = Document::from_value(&json!({}), None);
        let input = LintInput { raw: &document, resolved: &document };
        StyleLintAdapter::new(Arc::new(Canned(violations))).check(&input, config)
    }

    #[test]
    fn test_severity_mapping_and_drops() {
        let mut config = ConfigResolver::new(vec![]).defaults();
        config.debug = true;
        let diagnostics = check(
            vec![
                raw(json!({"code": "a", "message": "m", "path": ["info"], "severity": 0})),
                raw(json!({"code": "b", "message": "m", "path": ["info"], "severity": 3})),
                raw(json!({"code": "c", "message": "m", "path": ["info"], "severity": 4})),
                raw(json!({"code": "d", "message": "m", "path": ["info"], "severity": "1"})),
                raw(json!({"code": "e", "path": ["info"], "severity": 1})),
                raw(json!({"code": "f", "message": "m", "severity": 1})),
                raw(json!({"message": "m", "path": [], "severity": 1})),
                raw(json!({"code": "parser", "message": "m", "path": [], "severity": 0})),
            ],
            &config,
        );
        let kept: Vec<(&str, Severity)> = diagnostics.iter().map(|d| (d.code.as_str(), d.severity)).collect();
        assert_eq!(kept, vec![("a", Severity::Error), ("b", Severity::Hint)]);
    }

    #[test]
    fn test_configured_severity_and_exclusions() {
        let resolved = ConfigResolver::new(builtin_catalog()).resolve_text(
            "rules:\n  info-contact: error\n  operation-operationId:\n    exclude: ['/paths/~1internal']\n",
        );
        let diagnostics = check(
            vec![
                raw(json!({"code": "info-contact", "message": "m", "path": ["info"], "severity": 2})),
                raw(json!({"code": "operation-operationId", "message": "m", "path": ["paths", "/internal", "get"], "severity": 1})),
                raw(json!({"code": "operation-operationId", "message": "m", "path": ["paths", "/public", "get"], "severity": 1})),
            ],
            &resolved.config,
        );
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[1].path.to_pointer(), "/paths/~1public/get");
    }

    #[test]
    fn test_external_document_is_kept() {
        let config = ConfigResolver::new(vec![]).defaults();
        let diagnostics = check(
            vec![raw(json!({
                "code": "x", "message": "m", "path": ["Pet"], "severity": 1,
                "document": "file:///specs/common.yaml"
            }))],
            &config,
        );
        assert_eq!(diagnostics[0].location(), "file:///specs/common.yaml#/Pet");
    }
}
