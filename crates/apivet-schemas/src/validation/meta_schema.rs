//! Embedded meta-schemas for OpenAPI 3.x and Swagger 2.0
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::document::Document;
use crate::validation::error::{SchemaError, SchemaResult};
use serde_json::Value;
use std::fmt;

const OPENAPI_3_SCHEMA: &str = include_str!("../../schemas/openapi-3.x.schema.json");
const SWAGGER_2_SCHEMA: &str = include_str!("../../schemas/swagger-2.0.schema.json");

/// Document families with a meta-schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaSchemaKind {
    OpenApi3,
    Swagger2,
}

impl MetaSchemaKind {
    /// Pick the family from the document's version key
    ///
    /// A document carrying `swagger` is Swagger 2.0; anything else is checked
    /// as OpenAPI 3.x, so a document with neither key gets the missing
    /// `openapi` field reported.
    pub fn detect(document: &Document) -> Self {
        let root = document.root();
        if document.get(root, "swagger").is_some() && document.get(root, "openapi").is_none() {
            MetaSchemaKind::Swagger2
        } else {
            MetaSchemaKind::OpenApi3
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetaSchemaKind::OpenApi3 => "openapi-3.x",
            MetaSchemaKind::Swagger2 => "swagger-2.0",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            MetaSchemaKind::OpenApi3 => OPENAPI_3_SCHEMA,
            MetaSchemaKind::Swagger2 => SWAGGER_2_SCHEMA,
        }
    }
}

impl fmt::Display for MetaSchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled meta-schema
pub struct MetaSchema {
    kind: MetaSchemaKind,
    validator: jsonschema::Validator,
}

impl MetaSchema {
    /// Compile the embedded schema for `kind`
    pub fn compile(kind: MetaSchemaKind) -> SchemaResult<Self> {
        let schema: Value = serde_json::from_str(kind.source()).map_err(|source| {
            SchemaError::InvalidAsset {
                name: kind.name(),
                source,
            }
        })?;
        Self::from_value(kind, &schema)
    }

    /// Compile a caller-supplied schema under a family label
    pub fn from_value(kind: MetaSchemaKind, schema: &Value) -> SchemaResult<Self> {
        let validator = jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile {
            name: kind.name(),
            reason: e.to_string(),
        })?;
        Ok(Self { kind, validator })
    }

    pub fn kind(&self) -> MetaSchemaKind {
        self.kind
    }

    pub(crate) fn validator(&self) -> &jsonschema::Validator {
        &self.validator
    }
}

impl fmt::Debug for MetaSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaSchema").field("kind", &self.kind).finish()
    }
}

/// Both meta-schemas, compiled once
#[derive(Debug)]
pub struct MetaSchemaSet {
    openapi3: MetaSchema,
    swagger2: MetaSchema,
}

impl MetaSchemaSet {
    pub fn compile() -> SchemaResult<Self> {
        Ok(Self {
            openapi3: MetaSchema::compile(MetaSchemaKind::OpenApi3)?,
            swagger2: MetaSchema::compile(MetaSchemaKind::Swagger2)?,
        })
    }

    pub fn get(&self, kind: MetaSchemaKind) -> &MetaSchema {
        match kind {
            MetaSchemaKind::OpenApi3 => &self.openapi3,
            MetaSchemaKind::Swagger2 => &self.swagger2,
        }
    }

    /// The meta-schema matching `document`
    pub fn for_document(&self, document: &Document) -> &MetaSchema {
        self.get(MetaSchemaKind::detect(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_schemas_compile() {
        let set = MetaSchemaSet::compile().unwrap();
        assert_eq!(set.get(MetaSchemaKind::OpenApi3).kind(), MetaSchemaKind::OpenApi3);
        assert_eq!(set.get(MetaSchemaKind::Swagger2).kind(), MetaSchemaKind::Swagger2);
    }

    #[test]
    fn test_detect() {
        let swagger = Document::from_value(&json!({"swagger": "2.0"}), None);
        let openapi = Document::from_value(&json!({"openapi": "3.0.3"}), None);
        let neither = Document::from_value(&json!({"info": {}}), None);

        assert_eq!(MetaSchemaKind::detect(&swagger), MetaSchemaKind::Swagger2);
        assert_eq!(MetaSchemaKind::detect(&openapi), MetaSchemaKind::OpenApi3);
        assert_eq!(MetaSchemaKind::detect(&neither), MetaSchemaKind::OpenApi3);
    }

    #[test]
    fn test_bad_schema_is_reported() {
        let err = MetaSchema::from_value(MetaSchemaKind::OpenApi3, &json!({"type": 12})).unwrap_err();
        assert!(matches!(err, SchemaError::Compile { .. }));
    }
}
