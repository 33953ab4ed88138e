//! Apivet Core - validation pipeline for OpenAPI and Swagger documents
//!
//! The pipeline resolves every `$ref` of a document (stopping on cycles),
//! runs structural validation against the meta-schema and style linting
//! side by side, and merges both into one deduplicated [`DiagnosticSet`]
//! with a pass/fail [`Verdict`].
//!
//! ```rust,no_run
//! use apivet_core::{builtin_catalog, BuiltinEngine, ConfigResolver, RunOutcome, ValidationPipeline};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigResolver::new(builtin_catalog()).resolve(None).config;
//! let pipeline = ValidationPipeline::new(config, Arc::new(BuiltinEngine::new()))?;
//!
//! match pipeline.run_file("openapi.yaml".as_ref()).await? {
//!     RunOutcome::Completed { diagnostics, verdict } => {
//!         for diagnostic in diagnostics.iter() {
//!             println!("{}", diagnostic);
//!         }
//!         println!("{}", verdict);
//!     }
//!     RunOutcome::Circular(report) => println!("{}", report),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod structural;
pub mod style;

pub use config::{ConfigNotice, ConfigResolver, ConfigSource, ResolvedConfig, RuleSetting, ValidationConfig};
pub use diagnostics::{
    Diagnostic, DiagnosticAggregator, DiagnosticGroup, DiagnosticOrigin, DiagnosticSet, Fingerprint,
    FingerprintPolicy, FingerprintScope, Severity, Summary, Verdict,
};
pub use error::{ConfigError, PipelineError, PipelineResult};
pub use fetch::{DefaultSource, ExternalSource, DEFAULT_TIMEOUT};
pub use pipeline::{RunOutcome, ValidationPipeline};
pub use style::{builtin_catalog, BuiltinEngine, LintInput, RawViolation, RuleDescriptor, RuleEngine, RuleSet, StyleLintAdapter};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
