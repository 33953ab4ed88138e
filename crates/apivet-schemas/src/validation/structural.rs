//! Structural validation against a meta-schema
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::document::{Document, NodePath, Origin};
use crate::validation::error::{SchemaResult, SchemaViolation};
use crate::validation::meta_schema::{MetaSchema, MetaSchemaSet};
use tracing::{debug, instrument};

/// Checks resolved documents against the embedded meta-schemas
#[derive(Debug)]
pub struct StructuralValidator {
    schemas: MetaSchemaSet,
}

impl StructuralValidator {
    /// Compile both meta-schemas
    pub fn new() -> SchemaResult<Self> {
        Ok(Self {
            schemas: MetaSchemaSet::compile()?,
        })
    }

    pub fn schemas(&self) -> &MetaSchemaSet {
        &self.schemas
    }

    /// Check `document` against the meta-schema its version key selects
    pub fn check_detected(&self, document: &Document) -> Vec<SchemaViolation> {
        self.check(document, self.schemas.for_document(document))
    }

    /// Check `document` against `schema`
    ///
    /// Every violation the schema validator reports becomes one entry, and
    /// its instance path is mapped to the origin of the node at that path.
    /// A subtree shared by several parents is checked where it first appears;
    /// its other occurrences are reference objects and are not reported.
    #[instrument(skip_all, fields(meta_schema = %schema.kind()))]
    pub fn check(&self, document: &Document, schema: &MetaSchema) -> Vec<SchemaViolation> {
        let instance = document.to_compact_value();
        let violations: Vec<SchemaViolation> = schema
            .validator()
            .iter_errors(&instance.value)
            .filter_map(|error| {
                let instance_path = NodePath::from_pointer(&error.instance_path.to_string())
                    .unwrap_or_default();
                if instance.is_within_reference(&instance_path) {
                    return None;
                }
                let schema_path = error.schema_path.to_string();
                Some(SchemaViolation {
                    keyword: keyword_of(&schema_path),
                    message: error.to_string(),
                    origin: origin_of(document, &instance_path),
                    instance_path,
                    schema_path,
                })
            })
            .collect();
        debug!(count = violations.len(), "structural check finished");
        violations
    }
}

/// Last segment of the schema path, which names the failing keyword
fn keyword_of(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty() && segment.parse::<usize>().is_err())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .unwrap_or_else(|| "schema".to_string())
}

/// Origin of the node at `path`, or of its nearest existing ancestor
fn origin_of(document: &Document, path: &NodePath) -> Origin {
    let mut probe = path.clone();
    loop {
        if let Some(node) = document.lookup(&probe) {
            return document.origin(node).clone();
        }
        if probe.pop().is_none() {
            return Origin::local(NodePath::root());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{DocumentParser, Format, ReferenceResolver};
    use crate::validation::meta_schema::MetaSchemaKind;
    use serde_json::json;

    fn validator() -> StructuralValidator {
        StructuralValidator::new().unwrap()
    }

    #[test]
    fn test_keyword_of() {
        assert_eq!(keyword_of("/required"), "required");
        assert_eq!(keyword_of("/properties/info/$ref/required"), "required");
        assert_eq!(keyword_of("/items/0"), "items");
        assert_eq!(keyword_of(""), "schema");
    }

    #[test]
    fn test_valid_openapi_document() {
        let document = Document::from_value(
            &json!({
                "openapi": "3.0.3",
                "info": {"title": "Pets", "version": "1.0.0"},
                "paths": {
                    "/pets": {"get": {"responses": {"200": {"description": "ok"}}}}
                }
            }),
            None,
        );
        assert!(validator().check_detected(&document).is_empty());
    }

    #[test]
    fn test_valid_swagger_document() {
        let document = Document::from_value(
            &json!({
                "swagger": "2.0",
                "info": {"title": "Pets", "version": "1.0.0"},
                "basePath": "/v1",
                "paths": {
                    "/pets": {"get": {"responses": {"200": {"description": "ok", "schema": {"type": "array"}}}}}
                },
                "definitions": {"Pet": {"type": "object", "required": ["id"]}}
            }),
            None,
        );
        let validator = validator();
        assert_eq!(MetaSchemaKind::detect(&document), MetaSchemaKind::Swagger2);
        assert!(validator.check_detected(&document).is_empty());
    }

    #[test]
    fn test_missing_required_field() {
        let document = Document::from_value(
            &json!({"openapi": "3.0.3", "info": {"title": "Pets"}, "paths": {}}),
            None,
        );
        let violations = validator().check_detected(&document);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].keyword, "required");
        assert_eq!(violations[0].origin.path.to_pointer(), "/info");
        assert!(violations[0].message.contains("version"));
    }

    #[test]
    fn test_violation_reported_at_definition() {
        let document = DocumentParser::new()
            .parse_content(
                r##"
openapi: 3.0.3
info: {title: Pets, version: "1"}
paths:
  /pets:
    get:
      responses:
        "200": {$ref: "#/components/responses/Broken"}
components:
  responses:
    Broken:
      content: {}
"##,
                Format::Yaml,
                None,
            )
            .unwrap();
        let resolved = ReferenceResolver::new()
            .resolve(&document)
            .unwrap()
            .resolved()
            .unwrap();

        let violations = validator().check_detected(resolved.document());
        assert!(!violations.is_empty());
        assert!(violations
            .iter()
            .all(|v| v.origin.path.to_pointer() == "/components/responses/Broken"));
        assert!(violations
            .iter()
            .any(|v| v.instance_path.to_pointer() == "/paths/~1pets/get/responses/200"));
    }

    /// Schema `S{i}` refers to `S{i+1}` from two properties
    fn doubling_schemas(depth: usize, leaf: serde_json::Value) -> Document {
        let mut schemas = serde_json::Map::new();
        for level in 0..depth {
            let next = json!({"$ref": format!("#/components/schemas/S{}", level + 1)});
            schemas.insert(
                format!("S{level}"),
                json!({"type": "object", "properties": {"left": next.clone(), "right": next}}),
            );
        }
        schemas.insert(format!("S{depth}"), leaf);
        let document = Document::from_value(
            &json!({
                "openapi": "3.0.3",
                "info": {"title": "Deep", "version": "1"},
                "paths": {},
                "components": {"schemas": schemas}
            }),
            None,
        );
        ReferenceResolver::new()
            .resolve(&document)
            .unwrap()
            .resolved()
            .unwrap()
            .into_document()
    }

    #[test]
    fn test_deeply_shared_schemas_are_checked_once() {
        let valid = doubling_schemas(32, json!({"type": "string"}));
        assert!(validator().check_detected(&valid).is_empty());

        let broken = doubling_schemas(32, json!({"type": "string", "required": "id"}));
        let violations = validator().check_detected(&broken);
        assert_eq!(violations.len(), 1, "{:?}", violations);
        assert_eq!(violations[0].keyword, "type");
        assert_eq!(violations[0].origin.path.to_pointer(), "/components/schemas/S32/required");
    }
}
