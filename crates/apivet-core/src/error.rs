//! Error types for the validation pipeline
//!
//! Input errors are fatal to one document and are caught at the document
//! boundary; they never abort other documents in the same invocation.

use apivet_schemas::{LoaderError, SchemaError};
use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The document, or something it references, could not be loaded
    #[error(transparent)]
    Input(#[from] LoaderError),

    /// A meta-schema could not be prepared
    #[error("Meta-schema error: {0}")]
    MetaSchema(#[from] SchemaError),

    /// A validation task stopped unexpectedly
    #[error("Validation task failed: {message}")]
    Task { message: String },
}

/// Convenience type alias for pipeline results
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    /// Whether the error is the user's input rather than the tool itself
    pub fn is_input_error(&self) -> bool {
        matches!(self, PipelineError::Input(_))
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Task {
            message: err.to_string(),
        }
    }
}

/// Configuration errors
///
/// The resolver never returns these to callers; they degrade into
/// [`crate::config::ConfigNotice`] values plus defaults. They are public so
/// strict callers can parse sources themselves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },

    #[error("Invalid severity '{value}' for rule '{code}'")]
    InvalidSeverity { code: String, value: String },

    #[error("Invalid path prefix '{value}': {reason}")]
    InvalidPath { value: String, reason: String },

    #[error("Invalid setting for rule '{code}': {reason}")]
    InvalidRule { code: String, reason: String },

    #[error("Invalid configuration setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::from(LoaderError::NotAnObject {
            location: "api.yaml".to_string(),
        });
        assert!(err.is_input_error());
        assert_eq!(err.to_string(), "The given input in 'api.yaml' is not a valid object");

        let task = PipelineError::task("style task panicked");
        assert!(!task.is_input_error());
        assert_eq!(task.to_string(), "Validation task failed: style task panicked");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidSeverity {
            code: "info-contact".to_string(),
            value: "loud".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid severity 'loud' for rule 'info-contact'");
    }
}
