//! Apivet Schemas - document loading, reference resolution and meta-schemas
//!
//! This crate turns OpenAPI and Swagger text into validated trees:
//! - **Loader**: JSON and YAML parsing into an arena document that remembers
//!   where every node was written, with duplicate-key detection
//! - **Resolver**: `$ref` substitution across local and external documents,
//!   reporting the reference cycles it closes instead of a partial result
//! - **Validation**: compact OpenAPI 3.x and Swagger 2.0 meta-schemas checked
//!   with `jsonschema`
//!
//! ## Quick Start
//!
//! ```rust
//! use apivet_schemas::{DocumentLoader, Format, ReferenceResolver, StructuralValidator};
//!
//! let loader = DocumentLoader::new();
//! let document = loader.parse_str(
//!     r#"{"openapi": "3.0.3", "info": {"title": "Pets"}, "paths": {}}"#,
//!     Format::Json,
//!     None,
//! )?;
//! let resolved = ReferenceResolver::new().resolve(&document)?.resolved().unwrap();
//!
//! let validator = StructuralValidator::new()?;
//! let violations = validator.check_detected(resolved.document());
//! assert_eq!(violations[0].keyword, "required");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

pub mod loader;
pub mod validation;

// Re-export commonly used types for convenience
pub use loader::{
    CircularChain, CircularReferenceReport, Document, DocumentLoader, DocumentParser, DocumentSet,
    Format, LineIndex, LoaderError, LoaderResult, Node, NodeId, NodePath, Origin, PathSegment,
    RefTarget, ReferencePointer, ReferenceResolver, Resolution, ResolvedDocument, Scalar,
};
pub use validation::{
    MetaSchema, MetaSchemaKind, MetaSchemaSet, SchemaError, SchemaResult, SchemaViolation,
    StructuralValidator,
};
