//! Diagnostics produced by the validators and merged by the aggregator
//!
//! A [`Diagnostic`] is created by a validator, normalized and possibly merged
//! by the [`DiagnosticAggregator`], and never mutated afterwards.

pub mod aggregator;
pub mod fingerprint;

pub use aggregator::{DiagnosticAggregator, DiagnosticGroup, DiagnosticSet, Summary};
pub use fingerprint::{Fingerprint, FingerprintPolicy, FingerprintScope};

use apivet_schemas::{NodePath, Origin};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity levels, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Error, Severity::Warning, Severity::Info, Severity::Hint];

    /// Translate a rule engine's numeric severity
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Severity::Error),
            1 => Some(Severity::Warning),
            2 => Some(Severity::Info),
            3 => Some(Severity::Hint),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "0" => Ok(Severity::Error),
            "warning" | "warn" | "1" => Ok(Severity::Warning),
            "info" | "information" | "2" => Ok(Severity::Info),
            "hint" | "3" => Ok(Severity::Hint),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Which validator produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticOrigin {
    Structural,
    Style,
}

impl fmt::Display for DiagnosticOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticOrigin::Structural => f.write_str("structural"),
            DiagnosticOrigin::Style => f.write_str("style"),
        }
    }
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub origin: DiagnosticOrigin,
    pub severity: Severity,
    /// Path inside the document where the offending node is defined
    pub path: NodePath,
    /// External document holding that node; `None` for the validated document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// 1-based line in that document's text, when it was parsed from text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
    pub code: String,
}

impl Diagnostic {
    /// A meta-schema violation; always an error
    pub fn structural(code: impl Into<String>, message: impl Into<String>, location: &Origin) -> Self {
        Self {
            origin: DiagnosticOrigin::Structural,
            severity: Severity::Error,
            path: location.path.clone(),
            document: location.document.as_deref().map(str::to_string),
            line: None,
            message: message.into(),
            code: code.into(),
        }
    }

    /// A style rule violation at its configured severity
    pub fn style(
        code: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: &Origin,
    ) -> Self {
        Self {
            origin: DiagnosticOrigin::Style,
            severity,
            path: location.path.clone(),
            document: location.document.as_deref().map(str::to_string),
            line: None,
            message: message.into(),
            code: code.into(),
        }
    }

    /// Top-level document section the diagnostic belongs to (`""` for the root)
    pub fn section(&self) -> String {
        self.path
            .first()
            .map(|segment| segment.as_text().into_owned())
            .unwrap_or_default()
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// `document#/json/pointer`, or just the pointer for the validated document
    pub fn location(&self) -> String {
        match &self.document {
            Some(document) => format!("{}{}", document, self.path),
            None => self.path.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} [{}]",
            self.location(),
            self.severity,
            self.message,
            self.code
        )
    }
}

/// Pass/fail outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("pass"),
            Verdict::Fail => f.write_str("fail"),
        }
    }
}
