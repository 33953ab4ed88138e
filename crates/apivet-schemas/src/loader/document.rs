//! Arena-backed document tree
//!
//! A [`Document`] stores every node in a flat arena addressed by [`NodeId`].
//! Children are always pushed before their parents, so the arena is acyclic
//! by construction even when the resolver shares one subtree between many
//! parents. Every node remembers its [`Origin`]: the document and path where
//! it was written, which is where diagnostics about it are reported.
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Key under which an object designates a reference
pub const REF_KEY: &str = "$ref";

/// One step of a path through a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

impl PathSegment {
    /// Render the segment as it appears in a JSON pointer
    pub fn to_pointer_token(&self) -> String {
        match self {
            PathSegment::Key(key) => key.replace('~', "~0").replace('/', "~1"),
            PathSegment::Index(index) => index.to_string(),
        }
    }

    /// The segment as text, without escaping
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            PathSegment::Key(key) => std::borrow::Cow::Borrowed(key),
            PathSegment::Index(index) => std::borrow::Cow::Owned(index.to_string()),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// An ordered sequence of path segments
///
/// Ordering is lexicographic over segments, which is the order the
/// aggregator uses when sorting diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    /// The empty path, designating the document root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Parse a JSON pointer such as `/paths/~1pets/get`
    ///
    /// Every token becomes a [`PathSegment::Key`]; lookups treat numeric keys
    /// as indices when they meet a sequence. Returns `None` when the pointer is
    /// not empty and does not start with `/`, or carries a bad `~` escape.
    pub fn from_pointer(pointer: &str) -> Option<Self> {
        if pointer.is_empty() {
            return Some(Self::root());
        }
        let rest = pointer.strip_prefix('/')?;
        let mut segments = Vec::new();
        for token in rest.split('/') {
            segments.push(PathSegment::Key(unescape_token(token)?));
        }
        Some(Self(segments))
    }

    /// Render as a JSON pointer (`""` for the root)
    pub fn to_pointer(&self) -> String {
        self.0
            .iter()
            .map(|segment| format!("/{}", segment.to_pointer_token()))
            .collect()
    }

    /// A new path with one more segment
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Append a segment in place
    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    /// Remove the last segment
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&PathSegment> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Whether `prefix` is a leading sub-path of this path
    ///
    /// Segments compare by their text, so a key `"0"` parsed from a pointer
    /// matches the index `0` of a sequence.
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        prefix.len() <= self.len()
            && prefix
                .0
                .iter()
                .zip(&self.0)
                .all(|(expected, actual)| expected.as_text() == actual.as_text())
    }

    /// Append all segments of `other`
    pub fn join(&self, other: &NodePath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_pointer())
    }
}

impl From<Vec<PathSegment>> for NodePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for NodePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

fn unescape_token(token: &str) -> Option<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

/// Stable handle of a node inside one document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Leaf values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }
}

/// Tagged node variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Mapping with ordered, unique string keys
    Map(Vec<(String, NodeId)>),
    /// Sequence
    Seq(Vec<NodeId>),
    /// Leaf
    Scalar(Scalar),
}

/// Where a node was written
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin {
    /// External document location; `None` means the document under validation
    pub document: Option<Arc<str>>,
    /// Path inside that document
    pub path: NodePath,
}

impl Origin {
    pub fn local(path: NodePath) -> Self {
        Self {
            document: None,
            path,
        }
    }

    pub fn is_local(&self) -> bool {
        self.document.is_none()
    }
}

impl Serialize for Origin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Origin", 2)?;
        state.serialize_field("document", &self.document.as_deref())?;
        state.serialize_field("path", &self.path)?;
        state.end()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document {
            Some(location) => write!(f, "{}{}", location, self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeEntry {
    node: Node,
    origin: Origin,
}

/// An immutable, ordered document tree
#[derive(Debug, Clone)]
pub struct Document {
    entries: Vec<NodeEntry>,
    root: NodeId,
    location: Option<Url>,
    source: Option<Arc<str>>,
}

impl Document {
    /// Build a document from a JSON value (no duplicate-key detection is
    /// possible at this point; use the parser for raw text)
    pub fn from_value(value: &Value, location: Option<Url>) -> Self {
        let mut builder = DocumentBuilder::new();
        let mut path = NodePath::root();
        let root = builder.push_value(value, &mut path);
        builder.finish(root, location)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of arena entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.entries[id.index()].node
    }

    pub fn origin(&self, id: NodeId) -> &Origin {
        &self.entries[id.index()].origin
    }

    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    /// Location rendered for messages
    pub fn display_location(&self) -> String {
        self.location
            .as_ref()
            .map(|url| url.to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    /// The original text, when the document was parsed from text
    pub fn source_text(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Attach the original text
    pub fn with_source_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.source = Some(text.into());
        self
    }

    /// Mark every node as written in the external document at `location`
    pub fn into_external(mut self, location: &str) -> Self {
        let location: Arc<str> = Arc::from(location);
        for entry in &mut self.entries {
            entry.origin.document = Some(Arc::clone(&location));
        }
        self
    }

    pub fn entries_of(&self, id: NodeId) -> &[(String, NodeId)] {
        match self.node(id) {
            Node::Map(entries) => entries,
            _ => &[],
        }
    }

    pub fn items_of(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Node::Seq(items) => items,
            _ => &[],
        }
    }

    pub fn is_map(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Map(_))
    }

    pub fn as_str(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Value of `key` in a mapping node
    pub fn get(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.entries_of(id)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, child)| *child)
    }

    /// Follow one segment; numeric keys index into sequences
    pub fn child(&self, id: NodeId, segment: &PathSegment) -> Option<NodeId> {
        match (self.node(id), segment) {
            (Node::Map(_), segment) => self.get(id, &segment.as_text()),
            (Node::Seq(items), PathSegment::Index(index)) => items.get(*index).copied(),
            (Node::Seq(items), PathSegment::Key(key)) => {
                key.parse::<usize>().ok().and_then(|index| items.get(index).copied())
            }
            (Node::Scalar(_), _) => None,
        }
    }

    /// Follow `path` from `start`
    pub fn lookup_from(&self, start: NodeId, path: &NodePath) -> Option<NodeId> {
        path.segments()
            .iter()
            .try_fold(start, |current, segment| self.child(current, segment))
    }

    /// Follow `path` from the root
    pub fn lookup(&self, path: &NodePath) -> Option<NodeId> {
        self.lookup_from(self.root, path)
    }

    /// The `$ref` string of a reference object
    pub fn ref_string(&self, id: NodeId) -> Option<&str> {
        self.get(id, REF_KEY).and_then(|target| self.as_str(target))
    }

    /// Whether any node of the tree is a reference object
    pub fn has_references(&self) -> bool {
        self.entries.iter().enumerate().any(|(index, _)| {
            self.ref_string(NodeId(index as u32)).is_some()
        })
    }

    /// Pre-order walk from the root, handing every node and its path to `visit`
    ///
    /// A shared node is visited once, under the first path that reaches it,
    /// and its subtree is not walked again.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &NodePath),
    {
        let mut visited = vec![false; self.entries.len()];
        let mut path = NodePath::root();
        self.walk_node(self.root, &mut path, &mut visited, &mut visit);
    }

    fn walk_node<F>(&self, id: NodeId, path: &mut NodePath, visited: &mut [bool], visit: &mut F)
    where
        F: FnMut(NodeId, &NodePath),
    {
        if std::mem::replace(&mut visited[id.index()], true) {
            return;
        }
        visit(id, path);
        match self.node(id) {
            Node::Map(entries) => {
                for (key, child) in entries {
                    path.push(key.as_str());
                    self.walk_node(*child, path, visited, visit);
                    path.pop();
                }
            }
            Node::Seq(items) => {
                for (index, child) in items.iter().enumerate() {
                    path.push(index);
                    self.walk_node(*child, path, visited, visit);
                    path.pop();
                }
            }
            Node::Scalar(_) => {}
        }
    }

    /// Expand the tree into a JSON value
    ///
    /// Shared subtrees are copied at every place they appear; see
    /// [`Document::to_compact_value`] for a form that stays linear in size.
    pub fn to_value(&self) -> Value {
        self.value_at(self.root)
    }

    /// Expand the subtree at `id` into a JSON value
    pub fn value_at(&self, id: NodeId) -> Value {
        match self.node(id) {
            Node::Map(entries) => {
                let mut map = Map::new();
                for (key, child) in entries {
                    map.insert(key.clone(), self.value_at(*child));
                }
                Value::Object(map)
            }
            Node::Seq(items) => Value::Array(items.iter().map(|child| self.value_at(*child)).collect()),
            Node::Scalar(scalar) => scalar.to_value(),
        }
    }

    /// Expand the tree into a JSON value, writing each shared map once
    ///
    /// A map reached through several parents is expanded under the first
    /// path that reaches it. Later occurrences become a reference object
    /// pointing at that path, so every node is expanded at most once.
    pub fn to_compact_value(&self) -> CompactValue {
        let mut compact = CompactValue::default();
        let mut expanded: Vec<Option<String>> = vec![None; self.entries.len()];
        let mut path = NodePath::root();
        compact.value = self.compact_value_at(self.root, &mut path, &mut expanded, &mut compact.references);
        compact
    }

    fn compact_value_at(
        &self,
        id: NodeId,
        path: &mut NodePath,
        expanded: &mut [Option<String>],
        references: &mut Vec<NodePath>,
    ) -> Value {
        match self.node(id) {
            Node::Map(entries) => {
                if let Some(fragment) = &expanded[id.index()] {
                    let mut reference = Map::new();
                    reference.insert(REF_KEY.to_string(), Value::String(fragment.clone()));
                    references.push(path.clone());
                    return Value::Object(reference);
                }
                expanded[id.index()] = Some(fragment_of(path));

                let mut map = Map::new();
                for (key, child) in entries {
                    path.push(key.as_str());
                    map.insert(key.clone(), self.compact_value_at(*child, path, expanded, references));
                    path.pop();
                }
                Value::Object(map)
            }
            Node::Seq(items) => {
                let mut values = Vec::with_capacity(items.len());
                for (index, child) in items.iter().enumerate() {
                    path.push(index);
                    values.push(self.compact_value_at(*child, path, expanded, references));
                    path.pop();
                }
                Value::Array(values)
            }
            Node::Scalar(scalar) => scalar.to_value(),
        }
    }
}

/// A document expanded with every shared map written once
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompactValue {
    pub value: Value,
    /// Paths where a repeated map was written as a reference object
    pub references: Vec<NodePath>,
}

impl CompactValue {
    /// Whether `path` lies at or below a reference object
    pub fn is_within_reference(&self, path: &NodePath) -> bool {
        self.references.iter().any(|reference| path.starts_with(reference))
    }
}

/// URI fragment form of a path: `#` followed by the percent-encoded pointer
fn fragment_of(path: &NodePath) -> String {
    let mut fragment = String::from("#");
    for segment in path.segments() {
        fragment.push('/');
        fragment.push_str(&urlencoding::encode(&segment.to_pointer_token()));
    }
    fragment
}

/// Incremental arena construction shared by the parser and the resolver
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    entries: Vec<NodeEntry>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a node whose children are already in the arena
    pub fn push(&mut self, node: Node, origin: Origin) -> NodeId {
        let id = NodeId(self.entries.len() as u32);
        self.entries.push(NodeEntry { node, origin });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_value(&mut self, value: &Value, path: &mut NodePath) -> NodeId {
        let node = match value {
            Value::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, child) in map {
                    path.push(key.as_str());
                    entries.push((key.clone(), self.push_value(child, path)));
                    path.pop();
                }
                Node::Map(entries)
            }
            Value::Array(items) => {
                let mut children = Vec::with_capacity(items.len());
                for (index, child) in items.iter().enumerate() {
                    path.push(index);
                    children.push(self.push_value(child, path));
                    path.pop();
                }
                Node::Seq(children)
            }
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => Node::Scalar(Scalar::Number(n.clone())),
            Value::String(s) => Node::Scalar(Scalar::String(s.clone())),
        };
        self.push(node, Origin::local(path.clone()))
    }

    /// Seal the arena with `root` as its root node
    pub fn finish(self, root: NodeId, location: Option<Url>) -> Document {
        Document {
            entries: self.entries,
            root,
            location,
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        Document::from_value(
            &json!({
                "openapi": "3.0.0",
                "paths": {
                    "/pets": {
                        "get": {"parameters": [{"name": "limit"}, {"$ref": "#/components/parameters/Offset"}]}
                    }
                }
            }),
            None,
        )
    }

    #[test]
    fn test_pointer_round_trip_escapes() {
        let path = NodePath::from_pointer("/paths/~1pets/get").unwrap();
        assert_eq!(path.segments()[1], PathSegment::Key("/pets".to_string()));
        assert_eq!(path.to_pointer(), "/paths/~1pets/get");
        assert_eq!(path.to_string(), "#/paths/~1pets/get");

        assert!(NodePath::from_pointer("no-slash").is_none());
        assert!(NodePath::from_pointer("/bad~2escape").is_none());
        assert!(NodePath::from_pointer("").unwrap().is_empty());
    }

    #[test]
    fn test_lookup_and_origins() {
        let doc = sample();
        let param = doc
            .lookup(&NodePath::from_pointer("/paths/~1pets/get/parameters/1").unwrap())
            .unwrap();
        assert_eq!(doc.ref_string(param), Some("#/components/parameters/Offset"));
        assert_eq!(
            doc.origin(param).path,
            NodePath::new(vec!["paths".into(), "/pets".into(), "get".into(), "parameters".into(), 1.into()])
        );
        assert!(doc.has_references());
    }

    #[test]
    fn test_value_round_trip_keeps_order() {
        let value = json!({"b": 1, "a": [true, null, "x"], "c": {"z": 1.5, "y": -2}});
        let doc = Document::from_value(&value, None);
        assert_eq!(doc.to_value(), value);
        let keys: Vec<_> = doc.entries_of(doc.root()).iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_walk_visits_every_path() {
        let doc = sample();
        let mut paths = Vec::new();
        doc.walk(|_, path| paths.push(path.to_pointer()));
        assert_eq!(paths[0], "");
        assert!(paths.contains(&"/paths/~1pets/get/parameters/0/name".to_string()));
    }

    /// Each level holds two references to the next, so a full expansion
    /// doubles with every level
    fn doubling_chain(depth: usize) -> Document {
        let mut builder = DocumentBuilder::new();
        let origin = |path: &str| Origin::local(NodePath::from_pointer(path).unwrap_or_default());
        let mut next = builder.push(Node::Scalar(Scalar::String("leaf".to_string())), origin("/leaf"));
        for level in 0..depth {
            let at = format!("/levels/{level}");
            next = builder.push(
                Node::Map(vec![("left".to_string(), next), ("right".to_string(), next)]),
                origin(&at),
            );
        }
        let root = builder.push(Node::Map(vec![("top".to_string(), next)]), origin(""));
        builder.finish(root, None)
    }

    #[test]
    fn test_walk_visits_shared_nodes_once() {
        let doc = doubling_chain(40);
        let mut visits = 0usize;
        doc.walk(|_, _| visits += 1);
        assert_eq!(visits, doc.len());
    }

    #[test]
    fn test_compact_value_writes_shared_maps_once() {
        let doc = doubling_chain(40);
        let compact = doc.to_compact_value();
        assert_eq!(compact.references.len(), 39);
        assert!(compact.is_within_reference(&NodePath::from_pointer("/top/right").unwrap()));
        assert!(!compact.is_within_reference(&NodePath::from_pointer("/top/left").unwrap()));

        let value = compact.value;

        assert_eq!(value["top"]["right"], json!({"$ref": "#/top/left"}));
        assert_eq!(value["top"]["left"]["right"], json!({"$ref": "#/top/left/left"}));
        assert_eq!(value["top"]["left"]["left"]["right"]["$ref"], "#/top/left/left/left");

        let small = doubling_chain(2);
        assert_eq!(
            small.to_compact_value().value,
            json!({"top": {"left": {"left": "leaf", "right": "leaf"}, "right": {"$ref": "#/top/left"}}})
        );
    }

    #[test]
    fn test_compact_value_encodes_fragments() {
        let mut builder = DocumentBuilder::new();
        let shared = builder.push(Node::Map(Vec::new()), Origin::local(NodePath::root()));
        let first = builder.push(
            Node::Map(vec![("/pets/{id}".to_string(), shared)]),
            Origin::local(NodePath::root()),
        );
        let root = builder.push(
            Node::Map(vec![("paths".to_string(), first), ("again".to_string(), shared)]),
            Origin::local(NodePath::root()),
        );
        let doc = builder.finish(root, None);
        assert_eq!(doc.to_compact_value().value["again"]["$ref"], "#/paths/~1pets~1%7Bid%7D");
    }

    #[test]
    fn test_prefix_matches_indices_by_text() {
        let parsed = NodePath::from_pointer("/paths/~1a/get/parameters/0").unwrap();
        let walked = NodePath::new(vec!["paths".into(), "/a".into(), "get".into(), "parameters".into(), 0.into()]);
        assert!(walked.child("name").starts_with(&parsed));
        assert!(parsed.starts_with(&walked));
        assert!(!walked.starts_with(&parsed.child("name")));
        assert!(!NodePath::new(vec!["paths".into(), 1.into()]).starts_with(&NodePath::new(vec!["paths".into(), 0.into()])));
    }

    #[test]
    fn test_path_ordering_is_lexicographic() {
        let a: NodePath = ["components", "schemas"].into_iter().collect();
        let b: NodePath = ["paths"].into_iter().collect();
        let c: NodePath = ["components"].into_iter().collect();
        let mut paths = vec![b.clone(), a.clone(), c.clone()];
        paths.sort();
        assert_eq!(paths, vec![c, a, b]);
    }

    #[test]
    fn test_external_relabel() {
        let doc = sample().into_external("file:///tmp/other.yaml");
        let origin = doc.origin(doc.root());
        assert_eq!(origin.document.as_deref(), Some("file:///tmp/other.yaml"));
        assert!(!origin.is_local());
    }
}
