//! Document - an HTML page loaded into the arena
//!
//! Parsing goes through `scraper` (html5ever), so malformed markup is
//! repaired with the standard HTML5 error-recovery rules rather than
//! rejected. The parsed `scraper::Html` is kept alongside the arena as the
//! selector-matching view; every scraper node maps to exactly one arena
//! node, and matches are filtered to nodes still attached to the live tree.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::serializer::DomSerializer;
use crate::types::*;
use ahash::AHashMap;
use scraper::{Html, Node, Selector};

/// A parsed document, exclusively owning its node arena
pub struct Document {
    arena: DomArena,
    source: Html,
    source_ids: AHashMap<ego_tree::NodeId, NodeId>,
}

impl Document {
    /// Parse markup into a document
    pub fn parse(markup: &str) -> Result<Self> {
        let source = Html::parse_document(markup);
        let (arena, source_ids) = build_arena(&source)?;

        tracing::debug!(
            nodes = arena.len(),
            parse_errors = source.errors.len(),
            "Parsed document"
        );

        Ok(Self {
            arena,
            source,
            source_ids,
        })
    }

    /// Get reference to internal arena
    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    /// The synthetic document container
    pub fn root(&self) -> NodeId {
        // build_arena always sets a root
        self.arena.root_id().unwrap_or(0)
    }

    /// Resolve a CSS selector to live elements, in document order
    pub fn select(&self, expression: &str) -> Result<Vec<NodeId>> {
        let selector = Selector::parse(expression)
            .map_err(|_| DomError::InvalidSelector(expression.to_string()))?;

        let mut matches = Vec::new();
        for element in self.source.select(&selector) {
            let Some(&node_id) = self.source_ids.get(&element.id()) else {
                continue;
            };
            if self.arena.is_attached(node_id)? {
                matches.push(node_id);
            }
        }
        Ok(matches)
    }

    /// Create an unattached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena.add_node(DomNode::element(tag, Attributes::new()))
    }

    /// Create an unattached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.add_node(DomNode::text(text))
    }

    /// Attach `child` under `parent` at `position` (`None` appends)
    pub fn attach(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) -> Result<()> {
        self.arena.attach(parent, child, position)
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.arena.attach(parent, child, None)
    }

    /// Remove a node and its subtree from the document. Idempotent.
    pub fn detach(&mut self, node_id: NodeId) -> Result<()> {
        self.arena.detach(node_id)
    }

    pub fn node(&self, node_id: NodeId) -> Result<&DomNode> {
        self.arena.get(node_id)
    }

    pub fn tag_name(&self, node_id: NodeId) -> Result<&str> {
        self.arena
            .get(node_id)?
            .tag_name()
            .ok_or(DomError::NotAnElement(node_id))
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Result<Option<&str>> {
        Ok(self.arena.get(node_id)?.attr(name))
    }

    pub fn set_attr(&mut self, node_id: NodeId, name: &str, value: impl Into<String>) -> Result<()> {
        let node = self.arena.get_mut(node_id)?;
        if !node.is_element() {
            return Err(DomError::NotAnElement(node_id));
        }
        node.attributes.set(name, value);
        Ok(())
    }

    pub fn parent(&self, node_id: NodeId) -> Result<Option<NodeId>> {
        self.arena.parent(node_id)
    }

    pub fn children(&self, node_id: NodeId) -> Result<&[NodeId]> {
        self.arena.children(node_id)
    }

    /// Parent chain, nearest first, excluding the node itself
    pub fn ancestors(&self, node_id: NodeId) -> Result<Vec<NodeId>> {
        self.arena.ancestors(node_id)
    }

    pub fn is_attached(&self, node_id: NodeId) -> Result<bool> {
        self.arena.is_attached(node_id)
    }

    /// Snapshot of every live element, in document order
    pub fn elements(&self) -> Vec<NodeId> {
        self.arena.find(DomNode::is_element)
    }

    /// First live element with the given tag
    pub fn find_first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.arena
            .find_one(|node| node.is_element() && node.node_name.eq_ignore_ascii_case(tag))
    }

    /// Serialize to indented markup
    pub fn serialize(&self) -> Result<String> {
        DomSerializer::new().serialize(&self.arena)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.arena.len())
            .finish()
    }
}

/// Copy the scraper tree into an arena (iterative, no recursion)
fn build_arena(source: &Html) -> Result<(DomArena, AHashMap<ego_tree::NodeId, NodeId>)> {
    let mut arena = DomArena::with_capacity(source.tree.nodes().count());
    let mut source_ids = AHashMap::new();

    let root = arena.add_node(DomNode::document());
    arena.set_root(root)?;

    let top = source.tree.root();
    let mut stack: Vec<(ego_tree::NodeRef<'_, Node>, NodeId)> =
        top.children().rev().map(|child| (child, root)).collect();

    while let Some((node_ref, parent)) = stack.pop() {
        let node = match node_ref.value() {
            Node::Element(element) => DomNode::element(element.name(), element.attrs().collect()),
            Node::Text(text) => DomNode::text(&**text),
            Node::Comment(comment) => DomNode::comment(&**comment),
            Node::Doctype(doctype) => DomNode::doctype(doctype.name()),
            // Template contents: hoist children into the enclosing element
            Node::Fragment | Node::Document => {
                stack.extend(node_ref.children().rev().map(|child| (child, parent)));
                continue;
            }
            _ => continue,
        };

        let node_id = arena.add_node(node);
        arena.append_new(parent, node_id)?;
        source_ids.insert(node_ref.id(), node_id);

        stack.extend(node_ref.children().rev().map(|child| (child, node_id)));
    }

    Ok((arena, source_ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>T</title></head>
<body><div class="a">X</div><div class="b">Y</div></body></html>"#;

    #[test]
    fn test_parse_builds_tree() {
        let doc = Document::parse(PAGE).unwrap();

        let html = doc.find_first_by_tag("html").unwrap();
        let head = doc.find_first_by_tag("head").unwrap();
        let body = doc.find_first_by_tag("body").unwrap();

        assert_eq!(doc.parent(head).unwrap(), Some(html));
        assert_eq!(doc.parent(body).unwrap(), Some(html));
        assert_eq!(doc.parent(html).unwrap(), Some(doc.root()));
    }

    #[test]
    fn test_parse_repairs_malformed_markup() {
        let doc = Document::parse("<div><p>unclosed<span>text").unwrap();

        assert!(doc.find_first_by_tag("head").is_some());
        assert!(doc.find_first_by_tag("body").is_some());
        assert_eq!(doc.select("div p span").unwrap().len(), 1);
    }

    #[test]
    fn test_select_returns_document_order() {
        let doc = Document::parse(PAGE).unwrap();

        let divs = doc.select("div").unwrap();
        assert_eq!(divs.len(), 2);
        assert_eq!(doc.attr(divs[0], "class").unwrap(), Some("a"));
        assert_eq!(doc.attr(divs[1], "class").unwrap(), Some("b"));
    }

    #[test]
    fn test_select_invalid_expression() {
        let doc = Document::parse(PAGE).unwrap();

        match doc.select("div[") {
            Err(DomError::InvalidSelector(expr)) => assert_eq!(expr, "div["),
            other => panic!("expected InvalidSelector, got {:?}", other),
        }
    }

    #[test]
    fn test_select_skips_detached_nodes() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.find_first_by_tag("body").unwrap();

        doc.detach(body).unwrap();

        assert!(doc.select(".a").unwrap().is_empty());
        assert_eq!(doc.select("title").unwrap().len(), 1);
    }

    #[test]
    fn test_identical_subtrees_have_distinct_identity() {
        let doc = Document::parse("<p><b>same</b></p><p><b>same</b></p>").unwrap();

        let bolds = doc.select("b").unwrap();
        assert_eq!(bolds.len(), 2);
        assert_ne!(bolds[0], bolds[1]);
        assert_ne!(doc.parent(bolds[0]).unwrap(), doc.parent(bolds[1]).unwrap());
    }

    #[test]
    fn test_create_and_attach_element() {
        let mut doc = Document::parse(PAGE).unwrap();
        let body = doc.find_first_by_tag("body").unwrap();

        let script = doc.create_element("script");
        assert!(!doc.is_attached(script).unwrap());

        let text = doc.create_text("run()");
        doc.append_child(script, text).unwrap();
        doc.append_child(body, script).unwrap();

        assert!(doc.is_attached(script).unwrap());
        assert_eq!(doc.children(body).unwrap().last(), Some(&script));
        assert!(matches!(
            doc.append_child(script, body),
            Err(DomError::Cycle { .. })
        ));
    }

    #[test]
    fn test_set_attr() {
        let mut doc = Document::parse(PAGE).unwrap();
        let div = doc.select(".b").unwrap()[0];

        doc.set_attr(div, "data-x", "1").unwrap();
        assert_eq!(doc.attr(div, "data-x").unwrap(), Some("1"));

        let text = doc.children(div).unwrap()[0];
        assert!(matches!(
            doc.set_attr(text, "x", "y"),
            Err(DomError::NotAnElement(_))
        ));
        assert!(matches!(doc.tag_name(text), Err(DomError::NotAnElement(_))));
    }

    #[test]
    fn test_elements_snapshot_is_document_order() {
        let doc = Document::parse(PAGE).unwrap();

        let tags: Vec<_> = doc
            .elements()
            .into_iter()
            .map(|id| doc.tag_name(id).unwrap().to_string())
            .collect();
        assert_eq!(tags, vec!["html", "head", "title", "body", "div", "div"]);
    }
}
