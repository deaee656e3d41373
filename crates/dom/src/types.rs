//! Core type definitions for the document arena
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Identity is the index, never the content
//! 3. Use SmallVec for small arrays (avoid heap allocation)

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Node identifier (index into arena)
/// u32 allows 4 billion nodes, enough for any webpage
pub type NodeId = u32;

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
}

/// Ordered attribute list with unique keys
///
/// Pages rarely carry more than a handful of attributes per element, so a
/// linear scan beats hashing here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(SmallVec<[(String, String); 4]>);

impl Attributes {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Insert or replace. Replacing keeps the original position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// A node in the document arena
///
/// `node_name` is the lowercase tag name for elements, the doctype name for
/// doctypes and a `#`-prefixed marker otherwise. `node_value` holds the
/// character data of text and comment nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub node_id: NodeId,
    pub node_type: NodeType,

    // Navigation indices
    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>, // Most nodes have <4 children

    pub node_name: String,
    pub node_value: String,
    pub attributes: Attributes,
}

impl DomNode {
    fn bare(node_type: NodeType, node_name: String, node_value: String) -> Self {
        Self {
            node_id: 0,
            node_type,
            parent_id: None,
            children_ids: SmallVec::new(),
            node_name,
            node_value,
            attributes: Attributes::new(),
        }
    }

    pub fn document() -> Self {
        Self::bare(NodeType::Document, "#document".to_string(), String::new())
    }

    pub fn doctype(name: impl Into<String>) -> Self {
        Self::bare(NodeType::DocumentType, name.into(), String::new())
    }

    pub fn element(tag: impl Into<String>, attributes: Attributes) -> Self {
        let mut node = Self::bare(
            NodeType::Element,
            tag.into().to_ascii_lowercase(),
            String::new(),
        );
        node.attributes = attributes;
        node
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::bare(NodeType::Text, "#text".to_string(), text.into())
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::bare(NodeType::Comment, "#comment".to_string(), text.into())
    }

    /// Get tag name for element nodes
    pub fn tag_name(&self) -> Option<&str> {
        if self.node_type == NodeType::Element {
            Some(&self.node_name)
        } else {
            None
        }
    }

    /// Check if node is an element
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Check if node is text
    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }
}

/// Elements that never have an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is emitted without escaping. The parser
/// runs with scripting enabled, so `noscript` content is raw text too.
pub const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "xmp", "iframe", "noembed", "noframes",
];

/// Elements whose whitespace must survive serialization untouched
pub const PREFORMATTED_ELEMENTS: &[&str] = &[
    "pre", "textarea", "script", "style", "noscript", "xmp", "iframe", "noembed", "noframes",
];
