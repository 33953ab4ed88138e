//! Validation error and violation types
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::document::{NodePath, Origin};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure to prepare a meta-schema
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The embedded asset is not valid JSON
    #[error("Meta-schema '{name}' is not valid JSON: {source}")]
    InvalidAsset {
        name: &'static str,
        source: serde_json::Error,
    },

    /// The asset is JSON but not a usable JSON Schema
    #[error("Meta-schema '{name}' failed to compile: {reason}")]
    Compile { name: &'static str, reason: String },
}

/// Result type for meta-schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// One meta-schema violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// Failing schema keyword (`required`, `type`, `additionalProperties`, ...)
    pub keyword: String,
    /// The schema validator's explanation
    pub message: String,
    /// Location in the resolved document
    pub instance_path: NodePath,
    /// JSON pointer into the meta-schema
    pub schema_path: String,
    /// Where the offending node was written
    pub origin: Origin,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.origin, self.message, self.keyword)
    }
}
