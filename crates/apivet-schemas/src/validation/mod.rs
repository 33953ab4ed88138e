//! Structural validation of resolved documents
//!
//! The meta-schemas are static JSON assets compiled once per validator.
//! Violations carry both the instance path inside the resolved document and
//! the origin where the offending node was written.
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

pub mod error;
pub mod meta_schema;
pub mod structural;

pub use error::{SchemaError, SchemaResult, SchemaViolation};
pub use meta_schema::{MetaSchema, MetaSchemaKind, MetaSchemaSet};
pub use structural::StructuralValidator;
