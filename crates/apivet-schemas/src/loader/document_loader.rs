//! Document loader facade
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::{
    cache::DocumentSet,
    document::Document,
    error::{LoaderError, LoaderResult},
    parser::{DocumentParser, Format},
    resolver::{ReferenceResolver, Resolution},
};
use std::path::Path;
use tracing::debug;
use url::Url;

/// Loads documents from text or files and gathers their file-system externals
#[derive(Debug, Default)]
pub struct DocumentLoader {
    parser: DocumentParser,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse text in a known format
    pub fn parse_str(&self, text: &str, format: Format, location: Option<Url>) -> LoaderResult<Document> {
        self.parser.parse_content(text, format, location)
    }

    /// Parse text, sniffing JSON first and YAML second
    pub fn parse_any(&self, text: &str, location: Option<Url>) -> LoaderResult<Document> {
        self.parser
            .parse_with_fallback(text, location)
            .map(|(document, _)| document)
    }

    /// Load a document, detecting the format from the file extension
    pub fn load_file(&self, path: &Path) -> LoaderResult<Document> {
        debug!(path = %path.display(), "loading document");
        self.parser.parse_file(path)
    }

    /// Build a [`DocumentSet`] for `root`, reading every `file:` external it
    /// reaches from disk
    ///
    /// This is the blocking counterpart of the asynchronous prefetch; it
    /// refuses network locations.
    pub fn gather_local(&self, root: Document) -> LoaderResult<DocumentSet> {
        let mut set = DocumentSet::new(root);
        loop {
            let pending = set.pending_locations();
            if pending.is_empty() {
                return Ok(set);
            }
            for location in pending {
                let document = self.load_location(&location)?;
                set.insert_external(&location, document);
            }
        }
    }

    /// Load a file and resolve it along with its local externals
    pub fn load_and_resolve(&self, path: &Path) -> LoaderResult<Resolution> {
        let document = self.load_file(path)?;
        let set = self.gather_local(document)?;
        ReferenceResolver::new().resolve_set(&set)
    }

    fn load_location(&self, location: &Url) -> LoaderResult<Document> {
        if location.scheme() != "file" {
            return Err(LoaderError::fetch_error(
                location.as_str(),
                "only file locations can be read synchronously",
            ));
        }
        let path = location
            .to_file_path()
            .map_err(|_| LoaderError::invalid_location(location.as_str(), "not a local file path"))?;
        let text = std::fs::read_to_string(&path)
            .map_err(|e| LoaderError::fetch_error(location.as_str(), e.to_string()))?;
        let format = Format::from_url(location);
        match format {
            Some(format) => self.parse_str(&text, format, Some(location.clone())),
            None => self.parse_any(&text, Some(location.clone())),
        }
    }
}
