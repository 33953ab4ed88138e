//! Error types and handling for the CLI
//!
//! Errors end the invocation. Problems confined to one document are not
//! errors here; the validate handler reports them and moves on.

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for a passing run
pub const EXIT_PASS: i32 = 0;
/// Exit code when validation found errors or reference cycles
pub const EXIT_VALIDATION_FAILURE: i32 = 1;
/// Exit code for usage and input errors
pub const EXIT_USAGE: i32 = 2;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from the validation pipeline
    #[error("{0}")]
    Pipeline(#[from] apivet_core::PipelineError),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// None of the given arguments could be validated
    #[error("None of the given arguments are valid files")]
    NoValidFiles,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    ///
    /// Every error is a usage or input error; validation failures are not
    /// errors and never reach this.
    pub fn exit_code(&self) -> i32 {
        EXIT_USAGE
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::NoValidFiles)
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::NoValidFiles.exit_code(), EXIT_USAGE);
        assert_eq!(Error::other("bad").exit_code(), EXIT_USAGE);
        assert!(Error::NoValidFiles.should_show_help());
        assert!(!Error::other("x").should_show_help());
    }

    #[test]
    fn test_format_error_without_color() {
        let err = Error::FileNotFound {
            path: PathBuf::from("missing.yaml"),
        };
        assert_eq!(format_error(&err, false), "Error: File not found: missing.yaml");
    }
}
