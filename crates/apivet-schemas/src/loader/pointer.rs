//! Reference pointers
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::document::{NodePath, Origin};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use url::Url;

/// The place a `$ref` designates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefTarget {
    /// External document; `None` for the document holding the reference
    pub location: Option<Url>,
    /// Path inside the target document
    pub pointer: NodePath,
}

impl RefTarget {
    /// Parse a raw `$ref` string relative to `base`, the location of the
    /// document it appears in
    ///
    /// The document part is joined onto `base` (or onto the working directory
    /// when the document has no location). The fragment is percent-decoded and
    /// then read as a JSON pointer. A reference naming its own document by
    /// location is normalized to a local one.
    pub fn parse(raw: &str, base: Option<&Url>) -> Result<Self, String> {
        let (document_part, fragment) = match raw.split_once('#') {
            Some((document_part, fragment)) => (document_part, fragment),
            None => (raw, ""),
        };

        let decoded = urlencoding::decode(fragment)
            .map_err(|e| format!("invalid percent-encoding in fragment: {}", e))?;
        let pointer = NodePath::from_pointer(&decoded)
            .ok_or_else(|| format!("fragment '{}' is not a JSON pointer", fragment))?;

        if document_part.is_empty() {
            return Ok(Self {
                location: None,
                pointer,
            });
        }

        let mut location = join_location(document_part, base)?;
        location.set_fragment(None);
        let location = match base {
            Some(base) if same_document(base, &location) => None,
            _ => Some(location),
        };

        Ok(Self { location, pointer })
    }

    pub fn is_local(&self) -> bool {
        self.location.is_none()
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}{}", location, self.pointer),
            None => write!(f, "{}", self.pointer),
        }
    }
}

fn join_location(document_part: &str, base: Option<&Url>) -> Result<Url, String> {
    if let Ok(absolute) = Url::parse(document_part) {
        return Ok(absolute);
    }
    match base {
        Some(base) => base
            .join(document_part)
            .map_err(|e| format!("cannot join '{}' onto '{}': {}", document_part, base, e)),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| format!("cannot determine working directory: {}", e))?;
            let base = Url::from_directory_path(&cwd)
                .map_err(|_| format!("working directory '{}' is not absolute", cwd.display()))?;
            base.join(document_part)
                .map_err(|e| format!("cannot resolve '{}': {}", document_part, e))
        }
    }
}

fn same_document(a: &Url, b: &Url) -> bool {
    let mut a = a.clone();
    a.set_fragment(None);
    a == *b
}

/// A `$ref` occurrence: where it was written and what it designates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferencePointer {
    /// The `$ref` string exactly as written
    pub raw: String,
    /// Location of the reference object
    pub source: Origin,
    /// Parsed target
    pub target: RefTarget,
}

impl ReferencePointer {
    pub fn new(raw: impl Into<String>, source: Origin, target: RefTarget) -> Self {
        Self {
            raw: raw.into(),
            source,
            target,
        }
    }
}

impl fmt::Display for ReferencePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' at {}", self.raw, self.source)
    }
}

impl Serialize for ReferencePointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ReferencePointer", 3)?;
        state.serialize_field("ref", &self.raw)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("target", &self.target.to_string())?;
        state.end()
    }
}
