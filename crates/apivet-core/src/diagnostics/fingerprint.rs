//! Diagnostic fingerprints
//!
//! Two diagnostics with equal fingerprints are duplicates, whichever
//! validator produced them.

use super::Diagnostic;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Which fields take part in a fingerprint besides the rule code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintScope {
    /// Code and path: one diagnostic per rule per location
    Path,
    /// Code, path and message
    #[default]
    PathAndMessage,
}

/// Configurable fingerprint narrowing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FingerprintPolicy {
    /// Rule code → canonical code shared by equivalent rules
    pub aliases: BTreeMap<String, String>,
    pub default_scope: FingerprintScope,
    /// Per canonical code scope
    pub overrides: BTreeMap<String, FingerprintScope>,
}

impl FingerprintPolicy {
    /// The code used for fingerprinting `code`
    pub fn canonical_code<'a>(&'a self, code: &'a str) -> &'a str {
        self.aliases.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn scope_for(&self, canonical_code: &str) -> FingerprintScope {
        self.overrides
            .get(canonical_code)
            .copied()
            .unwrap_or(self.default_scope)
    }

    /// Fingerprint of `diagnostic` under this policy
    pub fn fingerprint(&self, diagnostic: &Diagnostic) -> Fingerprint {
        let code = self.canonical_code(&diagnostic.code);
        let mut hasher = Sha256::new();

        update_field(&mut hasher, code.as_bytes());
        update_field(&mut hasher, diagnostic.document.as_deref().unwrap_or("").as_bytes());
        hasher.update((diagnostic.path.len() as u64).to_be_bytes());
        // `/0` names the same node whether parsed as a key or an index
        for segment in diagnostic.path.segments() {
            update_field(&mut hasher, segment.as_text().as_bytes());
        }
        if self.scope_for(code) == FingerprintScope::PathAndMessage {
            update_field(&mut hasher, diagnostic.message.as_bytes());
        }

        let hash = hasher.finalize();
        Fingerprint(hex::encode(&hash[..16]))
    }
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Hex SHA-256 digest truncated to 128 bits
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use apivet_schemas::{NodePath, Origin};

    fn at(pointer: &str) -> Origin {
        Origin::local(NodePath::from_pointer(pointer).unwrap())
    }

    #[test]
    fn test_fingerprint_shape_and_stability() {
        let policy = FingerprintPolicy::default();
        let a = Diagnostic::style("info-contact", Severity::Info, "missing contact", &at("/info"));
        let b = Diagnostic::structural("info-contact", "missing contact", &at("/info"));

        assert_eq!(policy.fingerprint(&a).as_str().len(), 32);
        assert_eq!(policy.fingerprint(&a), policy.fingerprint(&b), "producer is not part of the fingerprint");
    }

    #[test]
    fn test_message_scope() {
        let a = Diagnostic::style("operation-operationId", Severity::Warning, "one", &at("/paths/~1a/get"));
        let b = Diagnostic::style("operation-operationId", Severity::Warning, "two", &at("/paths/~1a/get"));

        let default = FingerprintPolicy::default();
        assert_ne!(default.fingerprint(&a), default.fingerprint(&b));

        let mut narrowed = FingerprintPolicy::default();
        narrowed
            .overrides
            .insert("operation-operationId".to_string(), FingerprintScope::Path);
        assert_eq!(narrowed.fingerprint(&a), narrowed.fingerprint(&b));
    }

    #[test]
    fn test_aliases_share_a_fingerprint() {
        let mut policy = FingerprintPolicy {
            default_scope: FingerprintScope::Path,
            ..Default::default()
        };
        policy
            .aliases
            .insert("schema.required".to_string(), "required-field".to_string());

        let structural = Diagnostic::structural("schema.required", "\"version\" is a required property", &at("/info"));
        let style = Diagnostic::style("required-field", Severity::Warning, "Info needs a version", &at("/info"));
        assert_eq!(policy.fingerprint(&structural), policy.fingerprint(&style));
    }

    #[test]
    fn test_paths_are_compared_by_segment() {
        let policy = FingerprintPolicy::default();
        let joined = Diagnostic::style("r", Severity::Hint, "m", &at("/a~1b"));
        let split = Diagnostic::style("r", Severity::Hint, "m", &at("/a/b"));
        let index = Diagnostic::style(
            "r",
            Severity::Hint,
            "m",
            &Origin::local(NodePath::new(vec!["tags".into(), 0.into()])),
        );
        let key = Diagnostic::style("r", Severity::Hint, "m", &at("/tags/0"));

        assert_ne!(policy.fingerprint(&joined), policy.fingerprint(&split));
        assert_eq!(policy.fingerprint(&index), policy.fingerprint(&key));
    }

    #[test]
    fn test_policy_deserializes_from_yaml() {
        let policy: FingerprintPolicy = serde_yaml::from_str(
            "default-scope: path\naliases:\n  a: b\noverrides:\n  b: path-and-message\n",
        )
        .unwrap();
        assert_eq!(policy.default_scope, FingerprintScope::Path);
        assert_eq!(policy.canonical_code("a"), "b");
        assert_eq!(policy.scope_for("b"), FingerprintScope::PathAndMessage);
    }
}
