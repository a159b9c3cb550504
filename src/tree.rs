//! Generic document tree.
//!
//! A parsed set is held as a [`DocumentTree`]: scalars, ordered sequences,
//! and label-keyed mappings. Mappings keep their entries in document order and
//! may carry a reserved [`ATTRIBUTES_KEY`] sub-mapping holding the element's
//! XML attributes.
//!
//! Paths into the tree use the notation produced by [`crate::query`]:
//! `.label` for mapping entries and `[i]` for sequence items, with no leading
//! dot on the first segment (`LiveSet.Tracks.AudioTrack[0].Name`). A label
//! containing `.`, `[`, `]`, `"` or `\` is written as a quoted segment,
//! `["Group.Chain"]`, with `"` and `\` backslash-escaped.

use std::borrow::Cow;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Label of the sub-mapping holding an element's attributes.
pub const ATTRIBUTES_KEY: &str = "$";

/// Label holding character data of an element that also has attributes or children.
pub const TEXT_KEY: &str = "_";

/// `Drop` is iterative; `Clone`, `PartialEq` and `Serialize` recurse, which
/// is safe for trees from [`crate::xml::parse`] (at most
/// [`crate::xml::MAX_DEPTH`] deep).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentTree {
    Scalar(String),
    Sequence(Vec<DocumentTree>),
    Mapping(Vec<(String, DocumentTree)>),
}

impl DocumentTree {
    /// Child of a mapping by label. `None` for scalars and sequences.
    pub fn get(&self, label: &str) -> Option<&DocumentTree> {
        match self {
            DocumentTree::Mapping(entries) => entries
                .iter()
                .find(|(key, _)| key == label)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Follows a chain of mapping labels from this node.
    pub fn get_path(&self, labels: &[&str]) -> Option<&DocumentTree> {
        labels
            .iter()
            .try_fold(self, |node, label| node.get(label))
    }

    pub fn attributes(&self) -> Option<&DocumentTree> {
        self.get(ATTRIBUTES_KEY)
    }

    /// Attribute value of this element, if present and scalar.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()?.get(name)?.as_scalar()
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            DocumentTree::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Entry labels of a mapping in document order, reserved keys included.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            DocumentTree::Mapping(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Mapping entries in document order; empty for other variants.
    pub fn entries(&self) -> &[(String, DocumentTree)] {
        match self {
            DocumentTree::Mapping(entries) => entries,
            _ => &[],
        }
    }

    /// Normalizes cardinality: a sequence yields its items, anything else
    /// yields itself as a one-element list.
    pub fn as_list(&self) -> Vec<&DocumentTree> {
        match self {
            DocumentTree::Sequence(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Re-walks a path produced by [`crate::query::find_by_keys`].
    pub fn navigate(&self, path: &str) -> Option<&DocumentTree> {
        let mut node = self;
        for segment in parse_path(path)? {
            node = match segment {
                PathSegment::Label(label) => node.get(&label)?,
                PathSegment::Index(i) => match node {
                    DocumentTree::Sequence(items) => items.get(i)?,
                    _ => return None,
                },
            };
        }
        Some(node)
    }

    /// Single-line JSON rendering used in diagnostics.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    fn drain_children_into(&mut self, out: &mut Vec<DocumentTree>) {
        match self {
            DocumentTree::Scalar(_) => {}
            DocumentTree::Sequence(items) => out.append(items),
            DocumentTree::Mapping(entries) => out.extend(entries.drain(..).map(|(_, v)| v)),
        }
    }
}

// Real sets nest deeply enough that the derived recursive drop can exhaust
// the stack; unwind children onto a heap-allocated work list instead.
impl Drop for DocumentTree {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.drain_children_into(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.drain_children_into(&mut pending);
        }
    }
}

impl Serialize for DocumentTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DocumentTree::Scalar(s) => serializer.serialize_str(s),
            DocumentTree::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DocumentTree::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

enum PathSegment<'a> {
    Label(Cow<'a, str>),
    Index(usize),
}

/// Appends a mapping label to `path` in the notation [`DocumentTree::navigate`] reads.
pub(crate) fn push_label(path: &mut String, label: &str) {
    let plain = !label.is_empty() && !label.contains(['.', '[', ']', '"', '\\']);
    if plain {
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(label);
        return;
    }
    path.push_str("[\"");
    for c in label.chars() {
        if c == '"' || c == '\\' {
            path.push('\\');
        }
        path.push(c);
    }
    path.push_str("\"]");
}

fn parse_path(path: &str) -> Option<Vec<PathSegment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = path;
    let mut first = true;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("[\"") {
            let (label, tail) = parse_quoted(after)?;
            segments.push(PathSegment::Label(Cow::Owned(label)));
            rest = tail.strip_prefix(']')?;
        } else if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']')?;
            segments.push(PathSegment::Index(after[..close].parse().ok()?));
            rest = &after[close + 1..];
        } else {
            let body = if first { rest } else { rest.strip_prefix('.')? };
            let end = body.find(['.', '[']).unwrap_or(body.len());
            segments.push(PathSegment::Label(Cow::Borrowed(&body[..end])));
            rest = &body[end..];
        }
        first = false;
    }
    Some(segments)
}

/// Reads an escaped label up to its closing quote; returns it and the remainder.
fn parse_quoted(s: &str) -> Option<(String, &str)> {
    let mut label = String::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((label, &s[i + 1..])),
            '\\' => label.push(chars.next()?.1),
            _ => label.push(c),
        }
    }
    None
}
