//! Structural diagnostics

use crate::diagnostics::Diagnostic;
use apivet_schemas::{Document, MetaSchema, SchemaViolation, StructuralValidator};

/// Code of a structural diagnostic for a failing schema keyword
pub fn structural_code(keyword: &str) -> String {
    format!("schema.{}", keyword)
}

impl From<SchemaViolation> for Diagnostic {
    fn from(violation: SchemaViolation) -> Self {
        Diagnostic::structural(structural_code(&violation.keyword), violation.message, &violation.origin)
    }
}

/// Check `document` against `schema`, one error diagnostic per violation
pub fn check(validator: &StructuralValidator, document: &Document, schema: &MetaSchema) -> Vec<Diagnostic> {
    validator
        .check(document, schema)
        .into_iter()
        .map(Diagnostic::from)
        .collect()
}

/// Like [`check`] with the meta-schema picked from the document's version key
pub fn check_detected(validator: &StructuralValidator, document: &Document) -> Vec<Diagnostic> {
    check(validator, document, validator.schemas().for_document(document))
}
