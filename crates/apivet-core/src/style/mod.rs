//! Style linting
//!
//! A [`RuleEngine`] evaluates rules; the [`StyleLintAdapter`] turns its loosely
//! typed output into [`crate::Diagnostic`]s under a [`crate::ValidationConfig`].

pub mod adapter;
pub mod engine;
pub mod rules;

pub use adapter::{normalize, StyleLintAdapter};
pub use engine::{LintInput, RawViolation, RuleDescriptor, RuleEngine, RuleSet};
pub use rules::{builtin_catalog, BuiltinEngine};
