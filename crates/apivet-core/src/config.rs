//! Validation configuration
//!
//! [`ConfigResolver`] merges a user source over the rule catalog's defaults.
//! Nothing in here fails: unknown rule codes, bad values and unparsable
//! sources become [`ConfigNotice`]s and the affected parts keep their
//! defaults.

use crate::diagnostics::{FingerprintPolicy, Severity};
use crate::error::ConfigError;
use crate::style::{RuleDescriptor, RuleSet};
use apivet_schemas::NodePath;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Rule code the rule engine uses for format/parse-level findings
pub const PARSER_CODE: &str = "parser";

/// Effective setting of one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSetting {
    pub enabled: bool,
    pub severity: Severity,
    #[serde(serialize_with = "serialize_pointers", skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<NodePath>,
}

/// Resolved configuration, read-only for the rest of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidationConfig {
    pub rules: BTreeMap<String, RuleSetting>,
    /// Path prefixes excluded for every rule
    #[serde(serialize_with = "serialize_pointers")]
    pub exclude: Vec<NodePath>,
    /// Violations with these codes are parse-level and never reported
    pub discard_codes: BTreeSet<String>,
    pub fingerprint: FingerprintPolicy,
    /// Log malformed engine output
    pub debug: bool,
}

impl ValidationConfig {
    /// Enabled rules with their severities
    pub fn to_ruleset(&self) -> RuleSet {
        self.rules
            .iter()
            .filter(|(_, setting)| setting.enabled)
            .map(|(code, setting)| (code.clone(), setting.severity))
            .collect()
    }

    pub fn rule(&self, code: &str) -> Option<&RuleSetting> {
        self.rules.get(code)
    }

    pub fn is_discarded(&self, code: &str) -> bool {
        self.discard_codes.contains(code)
    }

    /// Whether a violation of `code` at `path` is excluded globally or for that rule
    pub fn is_excluded(&self, code: &str, path: &NodePath) -> bool {
        let rule_excludes = self
            .rules
            .get(code)
            .map(|setting| setting.exclude.as_slice())
            .unwrap_or_default();
        self.exclude
            .iter()
            .chain(rule_excludes)
            .any(|prefix| path.starts_with(prefix))
    }
}

fn serialize_pointers<S: Serializer>(paths: &[NodePath], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(NodePath::to_pointer))
}

/// User-supplied configuration as written in `.apivet.yaml`
///
/// ```yaml
/// rules:
///   info-contact: off
///   operation-operationId: error
///   content-entry-contains-schema:
///     severity: hint
///     exclude: ["/paths/~1internal"]
/// exclude: ["/x-internal"]
/// discard-codes: [parser]
/// fingerprint:
///   default-scope: path-and-message
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConfigSource {
    pub rules: BTreeMap<String, RuleSource>,
    pub exclude: Vec<String>,
    pub discard_codes: Option<Vec<String>>,
    pub fingerprint: FingerprintPolicy,
    pub debug: bool,
}

/// One rule entry: a toggle, a severity (or `off`), or a full table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RuleSource {
    Toggle(bool),
    Level(String),
    Detailed(RuleDetail),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuleDetail {
    pub enabled: Option<bool>,
    pub severity: Option<String>,
    pub exclude: Vec<String>,
}

impl ConfigSource {
    /// Read each top-level setting and each rule entry on its own
    ///
    /// An unreadable part becomes an [`ConfigNotice::InvalidValue`] and is
    /// left out, so everything readable still applies.
    pub fn from_fields(fields: Map<String, Value>) -> (Self, Vec<ConfigNotice>) {
        let mut source = Self::default();
        let mut notices = Vec::new();

        for (key, value) in fields {
            let applied = match key.as_str() {
                "rules" => read_rules(value, &mut notices).map(|rules| source.rules = rules),
                "exclude" => read_field(value).map(|exclude| source.exclude = exclude),
                "discard-codes" => read_field(value).map(|codes| source.discard_codes = Some(codes)),
                "fingerprint" => read_field(value).map(|policy| source.fingerprint = policy),
                "debug" => read_field(value).map(|debug| source.debug = debug),
                _ => Err("unknown setting".to_string()),
            };
            if let Err(reason) = applied {
                notices.push(ConfigNotice::InvalidValue(ConfigError::InvalidSetting { key, reason }));
            }
        }

        (source, notices)
    }
}

fn read_field<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|err| err.to_string())
}

fn read_rules(value: Value, notices: &mut Vec<ConfigNotice>) -> Result<BTreeMap<String, RuleSource>, String> {
    let Value::Object(entries) = value else {
        return Err("expected a mapping of rule codes".to_string());
    };
    let mut rules = BTreeMap::new();
    for (code, entry) in entries {
        match serde_json::from_value::<RuleSource>(entry) {
            Ok(rule) => {
                rules.insert(code, rule);
            }
            Err(_) => notices.push(ConfigNotice::InvalidValue(ConfigError::InvalidRule {
                code,
                reason: "expected true/false, a severity or a table with enabled/severity/exclude"
                    .to_string(),
            })),
        }
    }
    Ok(rules)
}

/// A non-fatal configuration problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNotice {
    /// No configuration source was found
    Missing,
    /// A rule code the engine does not know
    UnknownRule { code: String },
    /// The whole source was unreadable; defaults are in effect
    Unparsable(ConfigError),
    /// One value was unreadable; its default is in effect
    InvalidValue(ConfigError),
}

impl ConfigNotice {
    /// Everything but a missing source deserves a warning
    pub fn is_warning(&self) -> bool {
        !matches!(self, ConfigNotice::Missing)
    }
}

impl fmt::Display for ConfigNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigNotice::Missing => f.write_str("No configuration found, using defaults"),
            ConfigNotice::UnknownRule { code } => write!(f, "Unknown rule '{}' in configuration, ignored", code),
            ConfigNotice::Unparsable(err) => write!(f, "{}; using defaults", err),
            ConfigNotice::InvalidValue(err) => write!(f, "{}; using its default", err),
        }
    }
}

/// A configuration plus the notices produced while resolving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub config: ValidationConfig,
    pub notices: Vec<ConfigNotice>,
}

impl ResolvedConfig {
    pub fn warnings(&self) -> impl Iterator<Item = &ConfigNotice> {
        self.notices.iter().filter(|notice| notice.is_warning())
    }
}

/// Builds [`ValidationConfig`]s against a rule catalog
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    catalog: Vec<RuleDescriptor>,
}

impl ConfigResolver {
    pub fn new(catalog: Vec<RuleDescriptor>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &[RuleDescriptor] {
        &self.catalog
    }

    /// Every catalog rule enabled at its default severity
    pub fn defaults(&self) -> ValidationConfig {
        let rules = self
            .catalog
            .iter()
            .map(|rule| {
                (
                    rule.code.to_string(),
                    RuleSetting {
                        enabled: true,
                        severity: rule.default_severity,
                        exclude: Vec::new(),
                    },
                )
            })
            .collect();
        ValidationConfig {
            rules,
            exclude: Vec::new(),
            discard_codes: BTreeSet::from([PARSER_CODE.to_string()]),
            fingerprint: FingerprintPolicy::default(),
            debug: false,
        }
    }

    /// Defaults, deliberately chosen; no notice
    pub fn resolve_defaults(&self) -> ResolvedConfig {
        ResolvedConfig {
            config: self.defaults(),
            notices: Vec::new(),
        }
    }

    /// Resolve an optional source text; `None` means no source was found
    pub fn resolve(&self, text: Option<&str>) -> ResolvedConfig {
        match text {
            Some(text) => self.resolve_text(text),
            None => ResolvedConfig {
                config: self.defaults(),
                notices: vec![ConfigNotice::Missing],
            },
        }
    }

    /// Resolve YAML or JSON text
    pub fn resolve_text(&self, text: &str) -> ResolvedConfig {
        if text.trim().is_empty() {
            return self.resolve_source(ConfigSource::default());
        }
        let parsed = serde_yaml::from_str::<serde_yaml::Value>(text)
            .map_err(|err| err.to_string())
            .and_then(|yaml| serde_json::to_value(yaml).map_err(|err| err.to_string()));
        match parsed {
            Ok(value) => self.resolve_value(value),
            Err(reason) => self.unparsable(reason),
        }
    }

    /// Resolve an already parsed value
    ///
    /// Only a source that is not a mapping at all falls back to defaults as a
    /// whole; otherwise unreadable parts keep their defaults one by one.
    pub fn resolve_value(&self, value: Value) -> ResolvedConfig {
        match value {
            Value::Null => self.resolve_source(ConfigSource::default()),
            Value::Object(fields) => {
                let (source, mut notices) = ConfigSource::from_fields(fields);
                let mut resolved = self.resolve_source(source);
                notices.append(&mut resolved.notices);
                resolved.notices = notices;
                resolved
            }
            other => self.unparsable(format!("expected a mapping at the top level, found {}", kind_of(&other))),
        }
    }

    fn unparsable(&self, reason: String) -> ResolvedConfig {
        debug!(%reason, "configuration unparsable");
        ResolvedConfig {
            config: self.defaults(),
            notices: vec![ConfigNotice::Unparsable(ConfigError::Parse { reason })],
        }
    }

    pub fn resolve_source(&self, source: ConfigSource) -> ResolvedConfig {
        let mut config = self.defaults();
        let mut notices = Vec::new();

        for (code, rule) in source.rules {
            let Some(setting) = config.rules.get_mut(&code) else {
                notices.push(ConfigNotice::UnknownRule { code });
                continue;
            };
            match rule {
                RuleSource::Toggle(enabled) => setting.enabled = enabled,
                RuleSource::Level(level) => {
                    if is_off(&level) {
                        setting.enabled = false;
                    } else {
                        match parse_severity(&code, &level) {
                            Ok(severity) => {
                                setting.enabled = true;
                                setting.severity = severity;
                            }
                            Err(err) => notices.push(ConfigNotice::InvalidValue(err)),
                        }
                    }
                }
                RuleSource::Detailed(detail) => {
                    if let Some(enabled) = detail.enabled {
                        setting.enabled = enabled;
                    }
                    if let Some(level) = detail.severity {
                        match parse_severity(&code, &level) {
                            Ok(severity) => setting.severity = severity,
                            Err(err) => notices.push(ConfigNotice::InvalidValue(err)),
                        }
                    }
                    setting.exclude = parse_prefixes(&detail.exclude, &mut notices);
                }
            }
        }

        config.exclude = parse_prefixes(&source.exclude, &mut notices);
        if let Some(codes) = source.discard_codes {
            config.discard_codes = codes.into_iter().collect();
        }
        config.fingerprint = source.fingerprint;
        config.debug = source.debug;

        ResolvedConfig { config, notices }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn is_off(level: &str) -> bool {
    matches!(level.trim().to_ascii_lowercase().as_str(), "off" | "false" | "disabled")
}

fn parse_severity(code: &str, level: &str) -> Result<Severity, ConfigError> {
    level.parse().map_err(|_| ConfigError::InvalidSeverity {
        code: code.to_string(),
        value: level.to_string(),
    })
}

/// Exclusion prefixes are JSON pointers, optionally written with a leading `#`
fn parse_prefixes(values: &[String], notices: &mut Vec<ConfigNotice>) -> Vec<NodePath> {
    values
        .iter()
        .filter_map(|value| {
            let pointer = value.strip_prefix('#').unwrap_or(value);
            match NodePath::from_pointer(pointer) {
                Some(path) => Some(path),
                None => {
                    notices.push(ConfigNotice::InvalidValue(ConfigError::InvalidPath {
                        value: value.clone(),
                        reason: "expected a JSON pointer such as '/paths/~1pets'".to_string(),
                    }));
                    None
                }
            }
        })
        .collect()
}
