//! XML to [`DocumentTree`] conversion.
//!
//! Shapes the tree the way the extraction code expects it:
//!
//! - the root element is unwrapped, its content is the returned tree;
//! - attributes go under [`ATTRIBUTES_KEY`], ahead of any children;
//! - a child label seen once maps to a single node, a repeated label maps to a
//!   [`DocumentTree::Sequence`] in document order;
//! - an element with no attributes and no children collapses to a scalar of its
//!   trimmed text (possibly empty); otherwise its text is kept under [`TEXT_KEY`].
//!
//! Parsing is iterative over quick-xml events. Elements nested deeper than
//! [`MAX_DEPTH`] are rejected, which bounds the recursion of the tree's
//! `Clone`, `PartialEq` and `Serialize` impls.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::LoadError;
use crate::tree::{DocumentTree, ATTRIBUTES_KEY, TEXT_KEY};

/// Deepest element nesting accepted. Live sets stay well under 100.
pub const MAX_DEPTH: usize = 512;

/// Element under construction.
struct Frame {
    label: String,
    attributes: Vec<(String, DocumentTree)>,
    children: Vec<(String, Vec<DocumentTree>)>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, LoadError> {
        let label = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| LoadError::TreeParse(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| LoadError::TreeParse(e.to_string()))?
                .into_owned();
            attributes.push((key, DocumentTree::Scalar(value)));
        }
        Ok(Self {
            label,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn push_child(&mut self, label: String, node: DocumentTree) {
        match self.children.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, nodes)) => nodes.push(node),
            None => self.children.push((label, vec![node])),
        }
    }

    fn close(self) -> (String, DocumentTree) {
        let text = self.text.trim().to_string();
        if self.attributes.is_empty() && self.children.is_empty() {
            return (self.label, DocumentTree::Scalar(text));
        }

        let mut entries = Vec::with_capacity(self.children.len() + 2);
        if !self.attributes.is_empty() {
            entries.push((
                ATTRIBUTES_KEY.to_string(),
                DocumentTree::Mapping(self.attributes),
            ));
        }
        if !text.is_empty() {
            entries.push((TEXT_KEY.to_string(), DocumentTree::Scalar(text)));
        }
        for (label, mut nodes) in self.children {
            let node = if nodes.len() == 1 {
                nodes.remove(0)
            } else {
                DocumentTree::Sequence(nodes)
            };
            entries.push((label, node));
        }
        (self.label, DocumentTree::Mapping(entries))
    }
}

/// Parses an XML document into a tree rooted at the root element's content.
pub fn parse(xml: &str) -> Result<DocumentTree, LoadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<DocumentTree> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| LoadError::TreeParse(format!("at byte {}: {}", reader.buffer_position(), e)))?;
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(LoadError::TreeParse(
                        "content after the root element".to_string(),
                    ));
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(LoadError::TreeParse(format!(
                        "elements nested deeper than {}",
                        MAX_DEPTH
                    )));
                }
                stack.push(Frame::open(&start)?);
            }
            Event::Empty(start) => {
                let (label, node) = Frame::open(&start)?.close();
                attach(&mut stack, &mut root, label, node)?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| LoadError::TreeParse("unbalanced end tag".to_string()))?;
                let (label, node) = frame.close();
                attach(&mut stack, &mut root, label, node)?;
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| LoadError::TreeParse(e.to_string()))?;
                    frame.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(LoadError::TreeParse(format!(
            "unexpected end of document inside <{}>",
            stack.last().map(|f| f.label.as_str()).unwrap_or_default()
        )));
    }
    root.ok_or_else(|| LoadError::TreeParse("document has no root element".to_string()))
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<DocumentTree>,
    label: String,
    node: DocumentTree,
) -> Result<(), LoadError> {
    match stack.last_mut() {
        Some(parent) => parent.push_child(label, node),
        None if root.is_none() => *root = Some(node),
        None => {
            return Err(LoadError::TreeParse(
                "content after the root element".to_string(),
            ))
        }
    }
    Ok(())
}
