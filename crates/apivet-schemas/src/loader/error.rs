//! Error types for document loading and reference resolution
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Everything that can go wrong between raw text and a resolved document.
///
/// All variants are input errors: they are fatal to the document being
/// loaded but never to other documents processed in the same invocation.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// File I/O errors
    #[error("Failed to read '{location}': {source}")]
    IoError {
        location: String,
        source: std::io::Error,
    },

    /// YAML parsing errors
    #[error("Failed to parse YAML in '{location}': {source}")]
    YamlParseError {
        location: String,
        source: serde_yaml::Error,
    },

    /// JSON parsing errors
    #[error("Failed to parse JSON in '{location}': {source}")]
    JsonParseError {
        location: String,
        source: serde_json::Error,
    },

    /// Unsupported file format
    #[error("Unsupported file format for '{}'. Expected .yaml, .yml, or .json", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The root of the document is not a mapping
    #[error("The given input in '{location}' is not a valid object")]
    NotAnObject { location: String },

    /// A `$ref` could not be followed
    #[error("Failed to resolve reference '{reference}' at '{source_path}': {reason}")]
    ReferenceError {
        reference: String,
        source_path: String,
        reason: String,
    },

    /// An external location could not be fetched
    #[error("Failed to fetch external document '{location}': {reason}")]
    FetchError { location: String, reason: String },

    /// A location string is not a usable URL or path
    #[error("Invalid document location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },
}

impl LoaderError {
    /// Create an I/O error with location context
    pub fn io_error(location: impl Into<String>, error: std::io::Error) -> Self {
        Self::IoError {
            location: location.into(),
            source: error,
        }
    }

    /// Create a YAML parsing error with location context
    pub fn yaml_parse_error(location: impl Into<String>, error: serde_yaml::Error) -> Self {
        Self::YamlParseError {
            location: location.into(),
            source: error,
        }
    }

    /// Create a JSON parsing error with location context
    pub fn json_parse_error(location: impl Into<String>, error: serde_json::Error) -> Self {
        Self::JsonParseError {
            location: location.into(),
            source: error,
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(path: PathBuf) -> Self {
        Self::UnsupportedFormat { path }
    }

    /// Create a reference resolution error
    pub fn reference_error(
        reference: impl Into<String>,
        source_path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ReferenceError {
            reference: reference.into(),
            source_path: source_path.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch error
    pub fn fetch_error(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchError {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid location error
    pub fn invalid_location(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Get the document location associated with this error, if any
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::IoError { location, .. }
            | Self::YamlParseError { location, .. }
            | Self::JsonParseError { location, .. }
            | Self::NotAnObject { location }
            | Self::FetchError { location, .. }
            | Self::InvalidLocation { location, .. } => Some(location),
            Self::ReferenceError { .. } | Self::UnsupportedFormat { .. } => None,
        }
    }

    /// Whether the error came from the document's own text rather than from
    /// something it points at
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::YamlParseError { .. } | Self::JsonParseError { .. } | Self::NotAnObject { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let io_err = LoaderError::io_error(
            "api.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
        );
        assert!(matches!(io_err, LoaderError::IoError { .. }));
        assert_eq!(io_err.location(), Some("api.yaml"));

        let ref_err = LoaderError::reference_error("#/missing", "/paths", "Property 'missing' not found");
        assert!(ref_err.to_string().contains("#/missing"));
        assert_eq!(ref_err.location(), None);
    }

    #[test]
    fn test_parse_error_classification() {
        let parse_err = LoaderError::yaml_parse_error(
            "api.yaml",
            serde_yaml::from_str::<serde_yaml::Value>("{").unwrap_err(),
        );
        assert!(parse_err.is_parse_error());

        let fetch_err = LoaderError::fetch_error("https://example.com/a.yaml", "404");
        assert!(!fetch_err.is_parse_error());
    }
}
