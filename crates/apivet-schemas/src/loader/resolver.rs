//! Reference resolution and circular reference detection
//!
//! This module handles:
//! - `$ref` substitution across the document and its external documents
//! - Circular reference detection in a single depth-first pass
//! - Sharing of substructures reached through several references
//!
//! Resolution either yields a [`ResolvedDocument`] with every reference
//! replaced, or a [`CircularReferenceReport`] with one chain for each
//! reference that closes a cycle during the walk. Every node is expanded at
//! most once, so densely connected schemas stay linear in the document size.
//! A partial document is never returned.
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::cache::{DocumentSet, ROOT_INDEX};
use crate::loader::document::{Document, DocumentBuilder, Node, NodeId, Origin};
use crate::loader::error::{LoaderError, LoaderResult};
use crate::loader::pointer::{RefTarget, ReferencePointer};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, instrument};

/// A node addressed across the document set
type TargetKey = (usize, NodeId);

/// A document with every reference substituted
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    document: Document,
}

impl ResolvedDocument {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_value(&self) -> serde_json::Value {
        self.document.to_value()
    }
}

/// One reference cycle
///
/// `pointers` starts and ends with the same pointer, so the first and last
/// entries target the same location. [`CircularChain::len`] counts the hops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircularChain {
    pub pointers: Vec<ReferencePointer>,
}

impl CircularChain {
    /// Pointers of the cycle without the closing repetition
    pub fn hops(&self) -> &[ReferencePointer] {
        self.pointers.get(1..).unwrap_or(&[])
    }

    /// Number of references forming the cycle
    pub fn len(&self) -> usize {
        self.hops().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}

impl fmt::Display for CircularChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.pointers.iter().map(|p| p.source.to_string()).collect();
        write!(f, "{}", rendered.join(" -> "))
    }
}

/// Every distinct cycle found in a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CircularReferenceReport {
    pub chains: Vec<CircularChain>,
}

impl CircularReferenceReport {
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl fmt::Display for CircularReferenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} circular reference chain(s):", self.chains.len())?;
        for chain in &self.chains {
            writeln!(f, "  {}", chain)?;
        }
        Ok(())
    }
}

/// Outcome of a successful resolution walk
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(ResolvedDocument),
    Circular(CircularReferenceReport),
}

impl Resolution {
    pub fn is_circular(&self) -> bool {
        matches!(self, Resolution::Circular(_))
    }

    pub fn resolved(self) -> Option<ResolvedDocument> {
        match self {
            Resolution::Resolved(document) => Some(document),
            Resolution::Circular(_) => None,
        }
    }

    pub fn circular(self) -> Option<CircularReferenceReport> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Circular(report) => Some(report),
        }
    }
}

/// Reference resolver
///
/// Holds no state between calls; every call walks a fresh copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceResolver;

impl ReferenceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a standalone document
    ///
    /// External references fail with [`LoaderError::ReferenceError`] because
    /// no external document is loaded; use [`ReferenceResolver::resolve_set`]
    /// after prefetching.
    pub fn resolve(&self, document: &Document) -> LoaderResult<Resolution> {
        self.resolve_set(&DocumentSet::new(document.clone()))
    }

    /// Resolve the root of `set`, following references into any document in it
    #[instrument(skip_all, fields(documents = set.len()))]
    pub fn resolve_set(&self, set: &DocumentSet) -> LoaderResult<Resolution> {
        let mut walk = ResolutionWalk::new(set);
        let root = walk.copy(ROOT_INDEX, set.root().root());

        if !walk.chains.is_empty() {
            debug!(chains = walk.chains.len(), "circular references found");
            return Ok(Resolution::Circular(CircularReferenceReport {
                chains: walk.chains,
            }));
        }
        if let Some(error) = walk.missing {
            return Err(error);
        }

        match root {
            Some(root) => {
                let location = set.root().location().cloned();
                let mut document = walk.out.finish(root, location);
                if let Some(text) = set.root().source_text() {
                    document = document.with_source_text(text);
                }
                Ok(Resolution::Resolved(ResolvedDocument { document }))
            }
            None => Err(LoaderError::reference_error(
                "",
                "#",
                "resolution aborted without a recorded cause",
            )),
        }
    }
}

struct ResolutionWalk<'a> {
    set: &'a DocumentSet,
    out: DocumentBuilder,
    memo: HashMap<TargetKey, NodeId>,
    aborted: HashSet<TargetKey>,
    /// Nodes being copied, with the reference depth they were entered at
    active: HashMap<TargetKey, usize>,
    stack: Vec<ReferencePointer>,
    chains: Vec<CircularChain>,
    seen_cycles: HashSet<Vec<Origin>>,
    missing: Option<LoaderError>,
}

impl<'a> ResolutionWalk<'a> {
    fn new(set: &'a DocumentSet) -> Self {
        Self {
            set,
            out: DocumentBuilder::new(),
            memo: HashMap::new(),
            aborted: HashSet::new(),
            active: HashMap::new(),
            stack: Vec::new(),
            chains: Vec::new(),
            seen_cycles: HashSet::new(),
            missing: None,
        }
    }

    fn document(&self, index: usize) -> &'a Document {
        let set: &'a DocumentSet = self.set;
        match set.get(index) {
            Some(document) => document,
            None => set.root(),
        }
    }

    /// Copy the node at `(doc, id)` into the output arena, substituting
    /// references. `None` means the branch was aborted by a cycle or a
    /// missing target.
    fn copy(&mut self, doc: usize, id: NodeId) -> Option<NodeId> {
        let key = (doc, id);
        if let Some(&out) = self.memo.get(&key) {
            return Some(out);
        }
        if self.aborted.contains(&key) {
            return None;
        }

        self.active.insert(key, self.stack.len());
        let document = self.document(doc);
        let copied = match document.ref_string(id) {
            Some(raw) => self.follow(doc, id, raw),
            None => self.copy_plain(doc, id),
        };
        self.active.remove(&key);

        // Both outcomes hold for any later visit: an aborted node reaches a
        // cycle or a missing target from wherever it is entered.
        match copied {
            Some(out) => {
                self.memo.insert(key, out);
            }
            None => {
                self.aborted.insert(key);
            }
        }
        copied
    }

    fn copy_plain(&mut self, doc: usize, id: NodeId) -> Option<NodeId> {
        let document = self.document(doc);
        let node = match document.node(id) {
            Node::Map(entries) => {
                let mut children = Vec::with_capacity(entries.len());
                let mut complete = true;
                for (key, child) in entries {
                    match self.copy(doc, *child) {
                        Some(out) => children.push((key.clone(), out)),
                        None => complete = false,
                    }
                }
                if !complete {
                    return None;
                }
                Node::Map(children)
            }
            Node::Seq(items) => {
                let mut children = Vec::with_capacity(items.len());
                let mut complete = true;
                for child in items {
                    match self.copy(doc, *child) {
                        Some(out) => children.push(out),
                        None => complete = false,
                    }
                }
                if !complete {
                    return None;
                }
                Node::Seq(children)
            }
            Node::Scalar(scalar) => Node::Scalar(scalar.clone()),
        };
        Some(self.out.push(node, document.origin(id).clone()))
    }

    fn follow(&mut self, doc: usize, id: NodeId, raw: &str) -> Option<NodeId> {
        let document = self.document(doc);
        let source = document.origin(id).clone();

        let target = match RefTarget::parse(raw, document.location()) {
            Ok(target) => target,
            Err(reason) => {
                self.record_missing(raw, &source, reason);
                return None;
            }
        };
        let pointer = ReferencePointer::new(raw, source, target);

        let key = match self.locate(doc, &pointer) {
            Ok(key) => key,
            Err(reason) => {
                self.record_missing(raw, &pointer.source, reason);
                return None;
            }
        };

        if let Some(&depth) = self.active.get(&key) {
            self.record_cycle(depth, pointer);
            return None;
        }

        self.stack.push(pointer);
        let resolved = self.copy(key.0, key.1);
        self.stack.pop();
        resolved
    }

    fn locate(&self, doc: usize, pointer: &ReferencePointer) -> Result<TargetKey, String> {
        let target_doc = match &pointer.target.location {
            None => doc,
            Some(location) => self
                .set
                .find(location)
                .ok_or_else(|| format!("external document '{}' is not loaded", location))?,
        };
        let document = self.document(target_doc);
        document
            .lookup(&pointer.target.pointer)
            .map(|node| (target_doc, node))
            .ok_or_else(|| format!("target '{}' does not exist", pointer.target))
    }

    fn record_missing(&mut self, raw: &str, source: &Origin, reason: String) {
        if self.missing.is_none() {
            self.missing = Some(LoaderError::reference_error(raw, source.to_string(), reason));
        }
    }

    /// Record the cycle closed by `closing`, whose target was entered with
    /// `depth` references on the stack
    fn record_cycle(&mut self, depth: usize, closing: ReferencePointer) {
        let mut hops: Vec<ReferencePointer> = self.stack.get(depth..).unwrap_or(&[]).to_vec();
        hops.push(closing);

        let start = hops
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.source.cmp(&b.source))
            .map(|(index, _)| index)
            .unwrap_or(0);
        hops.rotate_left(start);

        let key: Vec<Origin> = hops.iter().map(|pointer| pointer.source.clone()).collect();
        if !self.seen_cycles.insert(key) {
            return;
        }

        let mut pointers = Vec::with_capacity(hops.len() + 1);
        if let Some(last) = hops.last() {
            pointers.push(last.clone());
        }
        pointers.extend(hops);
        debug!(hops = pointers.len() - 1, "recorded circular reference chain");
        self.chains.push(CircularChain { pointers });
    }
}
