//! Document loading and reference resolution
//!
//! This module provides:
//! - YAML and JSON parsing with duplicate-key detection
//! - An arena document tree that tracks where every node was written
//! - `$ref` resolution across local and external documents
//! - Circular reference detection and reporting
//! - Line lookup from node paths back into the source text
//!
//! # Example Usage
//!
//! ```rust
//! use apivet_schemas::loader::{DocumentLoader, Format, ReferenceResolver};
//!
//! let loader = DocumentLoader::new();
//! let document = loader.parse_str(
//!     "a: {$ref: '#/b'}\nb: {type: string}\n",
//!     Format::Yaml,
//!     None,
//! )?;
//! let resolved = ReferenceResolver::new().resolve(&document)?.resolved().unwrap();
//! assert_eq!(resolved.to_value()["a"]["type"], "string");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

pub mod cache;
pub mod document;
pub mod document_loader;
pub mod error;
pub mod lines;
pub mod parser;
pub mod pointer;
pub mod resolver;

pub use cache::DocumentSet;
pub use document::{Document, Node, NodeId, NodePath, Origin, PathSegment, Scalar};
pub use document_loader::DocumentLoader;
pub use error::{LoaderError, LoaderResult};
pub use lines::LineIndex;
pub use parser::{DocumentParser, Format};
pub use pointer::{RefTarget, ReferencePointer};
pub use resolver::{CircularChain, CircularReferenceReport, ReferenceResolver, Resolution, ResolvedDocument};
