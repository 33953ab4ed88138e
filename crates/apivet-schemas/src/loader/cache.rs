//! Run-scoped document cache
//!
//! A [`DocumentSet`] holds the document under validation plus every external
//! document its references reach, each parsed exactly once. It is created at
//! the start of a run and dropped with it; there is no eviction.
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::document::Document;
use crate::loader::pointer::RefTarget;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Index of the document under validation
pub const ROOT_INDEX: usize = 0;

/// The documents taking part in one resolution
#[derive(Debug, Clone)]
pub struct DocumentSet {
    documents: Vec<Document>,
    by_location: HashMap<String, usize>,
}

impl DocumentSet {
    /// Start a set from the document under validation
    pub fn new(root: Document) -> Self {
        let mut by_location = HashMap::new();
        if let Some(location) = root.location() {
            by_location.insert(location_key(location), ROOT_INDEX);
        }
        Self {
            documents: vec![root],
            by_location,
        }
    }

    pub fn root(&self) -> &Document {
        &self.documents[ROOT_INDEX]
    }

    /// Document at `index`; indices come from [`DocumentSet::find`] or insertion
    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Index of the document loaded from `location`
    pub fn find(&self, location: &Url) -> Option<usize> {
        self.by_location.get(&location_key(location)).copied()
    }

    /// Document whose nodes carry `label` as their origin document; `None`
    /// names the root
    pub fn by_origin(&self, label: Option<&str>) -> Option<&Document> {
        match label {
            None => Some(self.root()),
            Some(label) => self.by_location.get(label).and_then(|&index| self.documents.get(index)),
        }
    }

    pub fn contains(&self, location: &Url) -> bool {
        self.find(location).is_some()
    }

    /// Add an external document; a location already present keeps its first
    /// document and returns the existing index
    pub fn insert_external(&mut self, location: &Url, document: Document) -> usize {
        let key = location_key(location);
        if let Some(&index) = self.by_location.get(&key) {
            return index;
        }
        let index = self.documents.len();
        self.documents.push(document.into_external(&key));
        self.by_location.insert(key, index);
        index
    }

    /// External locations referenced by loaded documents but not yet loaded,
    /// in first-seen order
    ///
    /// References that fail to parse are skipped here; the resolver reports them.
    pub fn pending_locations(&self) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for document in &self.documents {
            let base = document.location();
            document.walk(|id, _| {
                let Some(raw) = document.ref_string(id) else {
                    return;
                };
                let Ok(RefTarget {
                    location: Some(location),
                    ..
                }) = RefTarget::parse(raw, base)
                else {
                    return;
                };
                if !self.contains(&location) && seen.insert(location_key(&location)) {
                    pending.push(location);
                }
            });
        }
        pending
    }

    /// Locations of the loaded external documents
    pub fn external_locations(&self) -> Vec<&str> {
        let mut locations: Vec<(&str, usize)> = self
            .by_location
            .iter()
            .filter(|(_, &index)| index != ROOT_INDEX)
            .map(|(key, &index)| (key.as_str(), index))
            .collect();
        locations.sort_by_key(|(_, index)| *index);
        locations.into_iter().map(|(key, _)| key).collect()
    }
}

/// Cache key of a location: the URL without its fragment
pub fn location_key(location: &Url) -> String {
    let mut location = location.clone();
    location.set_fragment(None);
    location.to_string()
}
