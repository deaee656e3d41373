//! Arena-based DOM tree storage
//!
//! Nodes live in a single `Vec` and are addressed by index. The index is
//! the node's identity: two subtrees with identical markup are still two
//! distinct sets of indices, which is what identity-based pruning relies on.
//!
//! ## Memory Layout
//!
//! ```text
//! Arena: Vec<DomNode>
//!        [Node0][Node1][Node2]...
//!         ↑ 4-byte index, not 8-byte pointer
//! ```
//!
//! Detached nodes stay in the arena. They are simply unreachable from the
//! root, so every lookup that cares about the live tree walks from the root
//! instead of scanning the vector.

use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId, NodeType};

/// Arena allocator for DOM nodes
#[derive(Debug)]
pub struct DomArena {
    /// All nodes stored sequentially (cache-friendly)
    nodes: Vec<DomNode>,

    /// Root node ID (if set)
    root_id: Option<NodeId>,
}

impl DomArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self::with_capacity(1024) // Pre-allocate for typical page
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root_id: None,
        }
    }

    /// Add an unattached node to the arena, returns its ID
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.node_id = node_id;
        node.parent_id = None;
        node.children_ids.clear();
        self.nodes.push(node);
        node_id
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Set root node
    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        self.get(node_id)?;
        self.root_id = Some(node_id);
        Ok(())
    }

    /// Get root node ID
    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    /// Total number of nodes ever allocated, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child IDs of a node, in order
    pub fn children(&self, node_id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.get(node_id)?.children_ids)
    }

    /// Parent ID of a node
    pub fn parent(&self, node_id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.get(node_id)?.parent_id)
    }

    /// Parent chain of a node, nearest first. The node itself is excluded.
    pub fn ancestors(&self, node_id: NodeId) -> Result<Vec<NodeId>> {
        let mut chain = Vec::new();
        let mut current = self.parent(node_id)?;
        while let Some(id) = current {
            chain.push(id);
            current = self.parent(id)?;
        }
        Ok(chain)
    }

    /// True if `ancestor` lies on the parent chain of `node_id`
    pub fn is_ancestor(&self, ancestor: NodeId, node_id: NodeId) -> Result<bool> {
        let mut current = self.parent(node_id)?;
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.parent(id)?;
        }
        Ok(false)
    }

    /// True if the node is the root or reachable from it
    pub fn is_attached(&self, node_id: NodeId) -> Result<bool> {
        let Some(root) = self.root_id else {
            return Ok(false);
        };
        Ok(node_id == root || self.is_ancestor(root, node_id)?)
    }

    /// Attach `child` under `parent` at `position` (`None` appends)
    ///
    /// The child is detached from any previous parent first, so a node never
    /// has two parents. Attaching a node under itself or one of its own
    /// descendants is refused.
    pub fn attach(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) -> Result<()> {
        self.get(child)?;
        if parent == child || self.is_ancestor(child, parent)? {
            return Err(DomError::Cycle { parent, child });
        }

        self.detach(child)?;

        let parent_node = self.get_mut(parent)?;
        let index = position
            .unwrap_or(parent_node.children_ids.len())
            .min(parent_node.children_ids.len());
        parent_node.children_ids.insert(index, child);

        self.get_mut(child)?.parent_id = Some(parent);
        Ok(())
    }

    /// Append a node fresh from `add_node` as the last child of `parent`
    ///
    /// A node with no parent and no children cannot close a cycle, so this
    /// skips the ancestor walk `attach` does. Used when building a tree top
    /// down, where that walk would cost the full depth on every node.
    pub(crate) fn append_new(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let node = self.get(child)?;
        if node.parent_id.is_some() || !node.children_ids.is_empty() || parent == child {
            return self.attach(parent, child, None);
        }

        self.get_mut(parent)?.children_ids.push(child);
        self.get_mut(child)?.parent_id = Some(parent);
        Ok(())
    }

    /// Detach a node (and its subtree) from its parent
    ///
    /// Detaching a node that has no parent is a no-op. A node whose ancestor
    /// was detached keeps its own parent link; it is already out of the live
    /// tree, and detaching it again is harmless.
    pub fn detach(&mut self, node_id: NodeId) -> Result<()> {
        let Some(parent_id) = self.get(node_id)?.parent_id else {
            return Ok(());
        };

        let parent = self.get_mut(parent_id)?;
        parent.children_ids.retain(|id| *id != node_id);
        self.get_mut(node_id)?.parent_id = None;
        Ok(())
    }

    /// Traverse tree depth-first (iterative, no recursion)
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut stack = vec![start_id];

        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            visit(node)?;

            // Push children in reverse order (so they're visited left-to-right)
            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
        }

        Ok(())
    }

    /// Find live nodes matching predicate, in document order
    pub fn find<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&DomNode) -> bool,
    {
        let mut found = Vec::new();
        if let Some(root) = self.root_id {
            let _ = self.traverse_df(root, |node| {
                if predicate(node) {
                    found.push(node.node_id);
                }
                Ok(())
            });
        }
        found
    }

    /// Find first live node matching predicate
    pub fn find_one<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&DomNode) -> bool,
    {
        let root = self.root_id?;
        let mut stack = vec![root];
        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id).ok()?;
            if predicate(node) {
                return Some(node_id);
            }
            stack.extend(node.children_ids.iter().rev().copied());
        }
        None
    }

    /// Find all live elements by tag name
    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.find(|node| node.node_type == NodeType::Element && node.node_name.eq_ignore_ascii_case(tag))
    }

    /// Clear arena (reuse allocation)
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root_id = None;
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}
