//! Document parsing for YAML and JSON formats
//!
//! Both formats are read through one serde visitor that builds an ordered
//! tree and rejects duplicate mapping keys, which neither `serde_json::Value`
//! nor `serde_yaml::Value` report on their own.
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::document::{Document, DocumentBuilder, Node, NodeId, NodePath, Origin, Scalar};
use crate::loader::error::{LoaderError, LoaderResult};
use serde::de::{self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde_json::Number;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use url::Url;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML format (.yaml, .yml)
    Yaml,
    /// JSON format (.json)
    Json,
}

impl Format {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> LoaderResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(extension) => match extension.to_lowercase().as_str() {
                "yaml" | "yml" => Ok(Format::Yaml),
                "json" => Ok(Format::Json),
                _ => Err(LoaderError::unsupported_format(path.to_path_buf())),
            },
            None => Err(LoaderError::unsupported_format(path.to_path_buf())),
        }
    }

    /// Detect format from the last path segment of a URL, if it has a known extension
    pub fn from_url(url: &Url) -> Option<Self> {
        let name = url.path_segments()?.next_back()?;
        Format::from_path(Path::new(name)).ok()
    }

    /// Get file extensions for this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Yaml => &["yaml", "yml"],
            Format::Json => &["json"],
        }
    }
}

/// Parser turning text into [`Document`] trees
#[derive(Debug, Default)]
pub struct DocumentParser;

impl DocumentParser {
    /// Create a new document parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a file, detecting the format from its extension
    pub fn parse_file(&self, path: &Path) -> LoaderResult<Document> {
        let format = Format::from_path(path)?;
        let display = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| LoaderError::io_error(display.as_str(), e))?;
        let absolute = path
            .canonicalize()
            .map_err(|e| LoaderError::io_error(display.as_str(), e))?;
        let location = Url::from_file_path(&absolute)
            .map_err(|_| LoaderError::invalid_location(display, "not an absolute file path"))?;

        self.parse_content(&content, format, Some(location))
    }

    /// Parse content with an explicit format
    pub fn parse_content(
        &self,
        content: &str,
        format: Format,
        location: Option<Url>,
    ) -> LoaderResult<Document> {
        let display = display_location(location.as_ref());
        let raw = match format {
            Format::Yaml => serde_yaml::from_str::<RawNode>(content)
                .map_err(|e| LoaderError::yaml_parse_error(display.as_str(), e))?,
            Format::Json => serde_json::from_str::<RawNode>(content)
                .map_err(|e| LoaderError::json_parse_error(display.as_str(), e))?,
        };

        if !matches!(raw, RawNode::Map(_)) {
            return Err(LoaderError::NotAnObject { location: display });
        }

        let mut builder = DocumentBuilder::new();
        let mut path = NodePath::root();
        let root = push_raw(&mut builder, raw, &mut path);
        Ok(builder.finish(root, location).with_source_text(content))
    }

    /// Try JSON first, then YAML
    ///
    /// JSON is tried first because every JSON text is also YAML, and the JSON
    /// error is the more useful one to surface when both fail on JSON-looking
    /// input.
    pub fn parse_with_fallback(
        &self,
        content: &str,
        location: Option<Url>,
    ) -> LoaderResult<(Document, Format)> {
        match self.parse_content(content, Format::Json, location.clone()) {
            Ok(document) => Ok((document, Format::Json)),
            Err(json_err @ LoaderError::NotAnObject { .. }) => Err(json_err),
            Err(json_err) => match self.parse_content(content, Format::Yaml, location) {
                Ok(document) => Ok((document, Format::Yaml)),
                Err(yaml_err @ LoaderError::NotAnObject { .. }) => Err(yaml_err),
                Err(_) if looks_like_json(content) => Err(json_err),
                Err(yaml_err) => Err(yaml_err),
            },
        }
    }
}

fn looks_like_json(content: &str) -> bool {
    matches!(content.trim_start().chars().next(), Some('{') | Some('['))
}

pub(crate) fn display_location(location: Option<&Url>) -> String {
    match location {
        Some(url) if url.scheme() == "file" => url
            .to_file_path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| url.to_string()),
        Some(url) => url.to_string(),
        None => "<memory>".to_string(),
    }
}

fn push_raw(builder: &mut DocumentBuilder, raw: RawNode, path: &mut NodePath) -> NodeId {
    let node = match raw {
        RawNode::Map(entries) => {
            let mut children = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                path.push(key.as_str());
                let child = push_raw(builder, value, path);
                path.pop();
                children.push((key, child));
            }
            Node::Map(children)
        }
        RawNode::Seq(items) => {
            let mut children = Vec::with_capacity(items.len());
            for (index, value) in items.into_iter().enumerate() {
                path.push(index);
                children.push(push_raw(builder, value, path));
                path.pop();
            }
            Node::Seq(children)
        }
        RawNode::Scalar(scalar) => Node::Scalar(scalar),
    };
    builder.push(node, Origin::local(path.clone()))
}

/// Intermediate tree produced straight from the deserializer
#[derive(Debug)]
enum RawNode {
    Map(Vec<(String, RawNode)>),
    Seq(Vec<RawNode>),
    Scalar(Scalar),
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawNodeVisitor)
    }
}

struct RawNodeVisitor;

impl<'de> Visitor<'de> for RawNodeVisitor {
    type Value = RawNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a document node")
    }

    fn visit_bool<E>(self, v: bool) -> Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Bool(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Number(Number::from(v))))
    }

    fn visit_u64<E>(self, v: u64) -> Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Number(Number::from(v))))
    }

    fn visit_f64<E>(self, v: f64) -> Result<RawNode, E> {
        // YAML admits .nan and .inf, which JSON numbers cannot carry
        Ok(RawNode::Scalar(match Number::from_f64(v) {
            Some(n) => Scalar::Number(n),
            None => Scalar::String(v.to_string()),
        }))
    }

    fn visit_str<E>(self, v: &str) -> Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::String(v.to_string())))
    }

    fn visit_string<E>(self, v: String) -> Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::String(v)))
    }

    fn visit_unit<E>(self) -> Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Null))
    }

    fn visit_none<E>(self) -> Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Null))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<RawNode, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawNode::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<RawNode, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<RawNode>()? {
            items.push(item);
        }
        Ok(RawNode::Seq(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<RawNode, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        let mut seen = HashSet::new();
        while let Some(MapKey(key)) = map.next_key::<MapKey>()? {
            if !seen.insert(key.clone()) {
                return Err(de::Error::custom(format!("duplicate key '{}'", key)));
            }
            let value = map.next_value::<RawNode>()?;
            entries.push((key, value));
        }
        Ok(RawNode::Map(entries))
    }

    // Tagged YAML values (`!tag value`); the tag carries no meaning here
    fn visit_enum<A>(self, data: A) -> Result<RawNode, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (_tag, variant) = data.variant::<String>()?;
        variant.newtype_variant::<RawNode>()
    }
}

/// Mapping key in string form; YAML allows numbers and booleans as keys
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MapKeyVisitor)
    }
}

struct MapKeyVisitor;

impl<'de> Visitor<'de> for MapKeyVisitor {
    type Value = MapKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar mapping key")
    }

    fn visit_str<E>(self, v: &str) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<MapKey, E> {
        Ok(MapKey(v))
    }

    fn visit_bool<E>(self, v: bool) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_unit<E>(self) -> Result<MapKey, E> {
        Ok(MapKey("null".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path(Path::new("api.yaml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("api.YML")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("api.json")).unwrap(), Format::Json);

        assert!(Format::from_path(Path::new("api.txt")).is_err());
        assert!(Format::from_path(Path::new("api")).is_err());

        let url = Url::parse("https://example.com/specs/pets.yaml?v=2").unwrap();
        assert_eq!(Format::from_url(&url), Some(Format::Yaml));
        assert_eq!(Format::Yaml.extensions(), &["yaml", "yml"]);
    }

    #[test]
    fn test_yaml_parsing() -> LoaderResult<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("api.yaml");
        fs::write(
            &file_path,
            r#"
openapi: 3.0.0
info:
  title: Pets
  version: "1.0"
paths:
  /pets:
    get:
      responses:
        200:
          description: ok
"#,
        )
        .unwrap();

        let document = DocumentParser::new().parse_file(&file_path)?;
        let value = document.to_value();
        assert_eq!(value["openapi"], "3.0.0");
        assert_eq!(value["paths"]["/pets"]["get"]["responses"]["200"]["description"], "ok");
        assert_eq!(document.location().map(|u| u.scheme()), Some("file"));
        assert!(document.source_text().unwrap().contains("openapi: 3.0.0"));
        Ok(())
    }

    #[test]
    fn test_json_parsing() -> LoaderResult<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("api.json");
        fs::write(&file_path, r#"{"swagger": "2.0", "paths": {}, "info": {"title": "x"}}"#).unwrap();

        let document = DocumentParser::new().parse_file(&file_path)?;
        assert_eq!(
            document.to_value(),
            json!({"swagger": "2.0", "paths": {}, "info": {"title": "x"}})
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let parser = DocumentParser::new();

        let json_err = parser
            .parse_content(r#"{"a": 1, "b": {"c": 1, "c": 2}}"#, Format::Json, None)
            .unwrap_err();
        assert!(matches!(json_err, LoaderError::JsonParseError { .. }));
        assert!(json_err.to_string().contains("duplicate key 'c'"));

        let yaml_err = parser
            .parse_content("a: 1\nb: 2\na: 3\n", Format::Yaml, None)
            .unwrap_err();
        assert!(yaml_err.is_parse_error());
    }

    #[test]
    fn test_non_object_root() {
        let parser = DocumentParser::new();
        for (content, format) in [("[1, 2]", Format::Json), ("just text", Format::Yaml), ("", Format::Yaml)] {
            let err = parser.parse_content(content, format, None).unwrap_err();
            assert!(matches!(err, LoaderError::NotAnObject { .. }), "{content:?} -> {err}");
            assert!(err.to_string().contains("not a valid object"));
        }
    }

    #[test]
    fn test_missing_file_and_bad_extension() {
        let dir = tempdir().unwrap();
        let parser = DocumentParser::new();

        let missing = parser.parse_file(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(missing, LoaderError::IoError { .. }));

        let unsupported = parser.parse_file(&dir.path().join("api.txt")).unwrap_err();
        assert!(matches!(unsupported, LoaderError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_fallback_parsing() -> LoaderResult<()> {
        let parser = DocumentParser::new();

        let (document, format) = parser.parse_with_fallback(r#"{"openapi": "3.0.0"}"#, None)?;
        assert_eq!(format, Format::Json);
        assert_eq!(document.to_value()["openapi"], "3.0.0");

        let (document, format) = parser.parse_with_fallback("openapi: 3.1.0\npaths: {}\n", None)?;
        assert_eq!(format, Format::Yaml);
        assert_eq!(document.to_value()["openapi"], "3.1.0");

        let err = parser.parse_with_fallback(r#"{"a": 1,"#, None).unwrap_err();
        assert!(matches!(err, LoaderError::JsonParseError { .. }));
        Ok(())
    }

    #[test]
    fn test_origins_follow_source_paths() -> LoaderResult<()> {
        let document = DocumentParser::new().parse_content(
            "paths:\n  /a:\n    get:\n      tags: [x, y]\n",
            Format::Yaml,
            None,
        )?;
        let tag = document
            .lookup(&NodePath::from_pointer("/paths/~1a/get/tags/1").unwrap())
            .unwrap();
        assert_eq!(document.origin(tag).path.to_pointer(), "/paths/~1a/get/tags/1");
        assert_eq!(document.as_str(tag), Some("y"));
        Ok(())
    }
}
