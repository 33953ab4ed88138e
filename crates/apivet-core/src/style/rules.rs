//! Built-in style rules
//!
//! Rules read the resolved view and report each violation at the origin of
//! the offending node. A defect reached through several references is
//! therefore reported once, at the place where it is written.

use super::engine::{LintInput, RawViolation, RuleDescriptor, RuleEngine, RuleSet};
use crate::diagnostics::Severity;
use apivet_schemas::{Document, NodeId, NodePath, Origin, PathSegment};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::trace;

pub const CONTENT_ENTRY_CONTAINS_SCHEMA: &str = "content-entry-contains-schema";
pub const OPERATION_OPERATION_ID: &str = "operation-operationId";
pub const OPERATION_ID_CASE_CONVENTION: &str = "operation-id-case-convention";
pub const PATH_KEYS_NO_TRAILING_SLASH: &str = "path-keys-no-trailing-slash";
pub const INFO_CONTACT: &str = "info-contact";
pub const NO_REF_SIBLINGS: &str = "no-ref-siblings";

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

static LOWER_CAMEL_CASE: OnceLock<Regex> = OnceLock::new();

fn lower_camel_case() -> &'static Regex {
    LOWER_CAMEL_CASE.get_or_init(|| {
        Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("operationId pattern is a valid regex")
    })
}

/// The rules shipped with apivet
pub fn builtin_catalog() -> Vec<RuleDescriptor> {
    vec![
        RuleDescriptor {
            code: CONTENT_ENTRY_CONTAINS_SCHEMA,
            default_severity: Severity::Warning,
            description: "Media type entries of a content map must specify a schema",
        },
        RuleDescriptor {
            code: OPERATION_OPERATION_ID,
            default_severity: Severity::Warning,
            description: "Operations must have an operationId",
        },
        RuleDescriptor {
            code: OPERATION_ID_CASE_CONVENTION,
            default_severity: Severity::Warning,
            description: "operationId values must be lower camel case",
        },
        RuleDescriptor {
            code: PATH_KEYS_NO_TRAILING_SLASH,
            default_severity: Severity::Warning,
            description: "Path keys other than '/' must not end with a slash",
        },
        RuleDescriptor {
            code: INFO_CONTACT,
            default_severity: Severity::Info,
            description: "The info object should have a contact object",
        },
        RuleDescriptor {
            code: NO_REF_SIBLINGS,
            default_severity: Severity::Hint,
            description: "Reference objects should not carry sibling keys",
        },
    ]
}

/// In-process engine evaluating [`builtin_catalog`]
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinEngine;

impl BuiltinEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RuleEngine for BuiltinEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    fn catalog(&self) -> Vec<RuleDescriptor> {
        builtin_catalog()
    }

    fn run(&self, input: &LintInput<'_>, rules: &RuleSet) -> Vec<RawViolation> {
        let mut sink = Sink::new(rules);

        if rules.is_enabled(CONTENT_ENTRY_CONTAINS_SCHEMA) {
            content_entry_contains_schema(input.resolved, &mut sink);
        }
        if rules.is_enabled(OPERATION_OPERATION_ID) || rules.is_enabled(OPERATION_ID_CASE_CONVENTION) {
            operations(input.resolved, &mut sink);
        }
        if rules.is_enabled(PATH_KEYS_NO_TRAILING_SLASH) {
            path_keys_no_trailing_slash(input.raw, &mut sink);
        }
        if rules.is_enabled(INFO_CONTACT) {
            info_contact(input.resolved, &mut sink);
        }
        if rules.is_enabled(NO_REF_SIBLINGS) {
            no_ref_siblings(input.raw, &mut sink);
        }

        trace!(violations = sink.violations.len(), "builtin rules finished");
        sink.violations
    }
}

/// Collects violations once per (rule, origin)
struct Sink<'r> {
    rules: &'r RuleSet,
    seen: HashSet<(&'static str, Origin)>,
    violations: Vec<RawViolation>,
}

impl<'r> Sink<'r> {
    fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            seen: HashSet::new(),
            violations: Vec::new(),
        }
    }

    fn report(&mut self, code: &'static str, origin: &Origin, message: &str) {
        let Some(severity) = self.rules.severity(code) else {
            return;
        };
        if !self.seen.insert((code, origin.clone())) {
            return;
        }
        let violation = RawViolation::new(code, severity, message, origin.path.segments().to_vec())
            .in_document(origin.document.as_deref().map(str::to_string));
        self.violations.push(violation);
    }
}

fn content_entry_contains_schema(document: &Document, sink: &mut Sink<'_>) {
    document.walk(|id, path| {
        if !is_content_map(document, id, path) {
            return;
        }
        for (_, entry) in document.entries_of(id) {
            if document.is_map(*entry) && document.get(*entry, "schema").is_none() {
                sink.report(
                    CONTENT_ENTRY_CONTAINS_SCHEMA,
                    document.origin(*entry),
                    "Content entries must specify a schema",
                );
            }
        }
    });
}

/// A `content` map of a request body, response, parameter or header, as
/// opposed to a schema property that happens to be called `content`
fn is_content_map(document: &Document, id: NodeId, path: &NodePath) -> bool {
    let segments = path.segments();
    let [.., parent, PathSegment::Key(key)] = segments else {
        return false;
    };
    key == "content"
        && document.is_map(id)
        && !matches!(parent, PathSegment::Key(p) if p == "properties" || p == "examples")
}

fn operations(document: &Document, sink: &mut Sink<'_>) {
    let root = document.root();
    let Some(paths) = document.get(root, "paths") else {
        return;
    };
    for (_, path_item) in document.entries_of(paths) {
        for (method, operation) in document.entries_of(*path_item) {
            if !HTTP_METHODS.contains(&method.as_str()) || !document.is_map(*operation) {
                continue;
            }
            match document.get(*operation, "operationId") {
                None => sink.report(
                    OPERATION_OPERATION_ID,
                    document.origin(*operation),
                    "Operation must have \"operationId\".",
                ),
                Some(id_node) => {
                    let valid = document
                        .as_str(id_node)
                        .map(|id| lower_camel_case().is_match(id))
                        .unwrap_or(true);
                    if !valid {
                        sink.report(
                            OPERATION_ID_CASE_CONVENTION,
                            document.origin(id_node),
                            "operationIds must follow lower camel case",
                        );
                    }
                }
            }
        }
    }
}

fn path_keys_no_trailing_slash(document: &Document, sink: &mut Sink<'_>) {
    let Some(paths) = document.get(document.root(), "paths") else {
        return;
    };
    for (key, path_item) in document.entries_of(paths) {
        if key != "/" && key.ends_with('/') {
            sink.report(
                PATH_KEYS_NO_TRAILING_SLASH,
                document.origin(*path_item),
                "Path must not end with slash.",
            );
        }
    }
}

fn info_contact(document: &Document, sink: &mut Sink<'_>) {
    let Some(info) = document.get(document.root(), "info") else {
        return;
    };
    if document.is_map(info) && document.get(info, "contact").is_none() {
        sink.report(
            INFO_CONTACT,
            document.origin(info),
            "Info object must have \"contact\" object.",
        );
    }
}

fn no_ref_siblings(document: &Document, sink: &mut Sink<'_>) {
    document.walk(|id, _| {
        if document.ref_string(id).is_some() && document.entries_of(id).len() > 1 {
            sink.report(
                NO_REF_SIBLINGS,
                document.origin(id),
                "$ref must not be placed next to any other properties",
            );
        }
    });
}
