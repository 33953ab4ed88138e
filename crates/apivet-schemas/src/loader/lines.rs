//! Line lookup for nodes of a parsed text
//!
//! Document trees are built from serde visitors, which carry no positions.
//! [`LineIndex`] instead follows a path through the indentation of the
//! original text: block YAML and indented JSON write every nested key on a
//! deeper line of its own. A flow collection or single-line JSON ends the
//! descent, and the line of the deepest segment found is returned.
//!
//! Copyright (c) 2025 Apivet Team
//! Licensed under the Apache-2.0 license

use crate::loader::document::{NodePath, PathSegment};

/// One line holding content, neither blank nor a comment
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceLine {
    /// 1-based line number in the text
    number: usize,
    indent: usize,
    /// Starts with a `- ` sequence marker
    item: bool,
    /// Column and text of the mapping key written on the line
    key: Option<(usize, String)>,
    /// Starts with `}` or `]`
    closing: bool,
}

impl SourceLine {
    fn parse(number: usize, raw: &str) -> Option<Self> {
        let content = raw.trim_start();
        if content.is_empty() || content.starts_with('#') || content == "---" || content == "..." {
            return None;
        }
        let indent = raw.len() - content.len();

        let (item, column, rest) = match content.strip_prefix('-') {
            Some(after) if after.is_empty() || after.starts_with(' ') => {
                let value = after.trim_start();
                (true, indent + content.len() - value.len(), value)
            }
            _ => (false, indent, content),
        };

        Some(Self {
            number,
            indent,
            item,
            key: parse_key(rest).map(|key| (column, key)),
            closing: rest.starts_with('}') || rest.starts_with(']'),
        })
    }
}

/// Key of a `key: value` line, quoted or plain
fn parse_key(text: &str) -> Option<String> {
    match text.chars().next()? {
        quote @ ('"' | '\'') => {
            let body = &text[1..];
            let mut key = String::new();
            let mut escaped = false;
            for (offset, c) in body.char_indices() {
                if escaped {
                    key.push(c);
                    escaped = false;
                } else if quote == '"' && c == '\\' {
                    escaped = true;
                } else if c == quote {
                    let after = body[offset + c.len_utf8()..].trim_start();
                    return after.starts_with(':').then_some(key);
                } else {
                    key.push(c);
                }
            }
            None
        }
        '{' | '[' | '}' | ']' => None,
        _ => {
            let end = text
                .find(": ")
                .or_else(|| text.strip_suffix(':').map(str::len))?;
            Some(text[..end].trim_end().to_string())
        }
    }
}

/// Position of the walk: the line of the node reached so far
#[derive(Debug, Clone, Copy)]
enum Scope {
    Root,
    /// A mapping entry; its children sit deeper than `column`
    Entry { line: usize, column: usize },
    /// A sequence element starting at `column`
    Element { line: usize, column: usize },
}

/// Lines of one source text, ready for path lookups
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    lines: Vec<SourceLine>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .enumerate()
                .filter_map(|(index, raw)| SourceLine::parse(index + 1, raw))
                .collect(),
        }
    }

    /// 1-based line of the node at `path`, or of its deepest ancestor that
    /// could be located; `None` when the text has no content
    pub fn line_of(&self, path: &NodePath) -> Option<usize> {
        let mut line = self.lines.first()?.number;
        let mut scope = Scope::Root;
        for segment in path.segments() {
            let next = match segment {
                PathSegment::Index(index) => self.find_element(scope, *index),
                PathSegment::Key(key) => self
                    .find_entry(scope, key)
                    .or_else(|| key.parse().ok().and_then(|index| self.find_element(scope, index))),
            };
            let Some(next) = next else {
                break;
            };
            scope = next;
            line = match next {
                Scope::Entry { line, .. } | Scope::Element { line, .. } => self.lines[line].number,
                Scope::Root => line,
            };
        }
        Some(line)
    }

    /// Indices of the lines nested in `scope`
    ///
    /// Block sequences may put their `- ` markers at the column of the key
    /// that holds them, so those lines stay inside an entry.
    fn members(&self, scope: Scope) -> std::ops::Range<usize> {
        let (start, column, items_inside) = match scope {
            Scope::Root => return 0..self.lines.len(),
            Scope::Entry { line, column } => (line + 1, column, true),
            Scope::Element { line, column } => (line + 1, column, false),
        };
        let end = self.lines[start..]
            .iter()
            .position(|l| !(l.indent > column || (items_inside && l.indent == column && l.item)))
            .map_or(self.lines.len(), |offset| start + offset);
        start..end
    }

    fn find_entry(&self, scope: Scope, key: &str) -> Option<Scope> {
        let mut candidates: Vec<usize> = Vec::new();
        if let Scope::Element { line, .. } = scope {
            candidates.push(line);
        }
        candidates.extend(self.members(scope));

        let column = candidates
            .iter()
            .find_map(|&index| self.lines[index].key.as_ref().map(|(column, _)| *column))?;
        candidates
            .into_iter()
            .find(|&index| matches!(&self.lines[index].key, Some((c, k)) if *c == column && k == key))
            .map(|line| Scope::Entry { line, column })
    }

    fn find_element(&self, scope: Scope, index: usize) -> Option<Scope> {
        let members = self.members(scope);
        let lines = &self.lines;

        let marked = members.clone().find(|&i| lines[i].item);
        let (column, elements): (usize, Vec<usize>) = match marked {
            Some(first) => {
                let column = lines[first].indent;
                let elements = members.filter(|&i| lines[i].item && lines[i].indent == column).collect();
                (column, elements)
            }
            None => {
                let column = members.clone().map(|i| lines[i].indent).min()?;
                let elements = members
                    .filter(|&i| lines[i].indent == column && !lines[i].closing)
                    .collect();
                (column, elements)
            }
        };
        elements
            .get(index)
            .map(|&line| Scope::Element { line, column })
    }
}
