//! Arena-backed structure tree.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. The
//! parent link is an index into the same arena, written only when a child is
//! attached, so the tree cannot acquire a second parent or a cycle through
//! the public API. [`StructureTree::validate`] re-checks this before the tree
//! is materialized.

use super::types::{StructType, StructureAttributes};
use crate::error::{Error, Result};
use std::fmt;

/// Index of a node in its [`StructureTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the logical structure tree.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureNode {
    /// Standard structure type
    pub role: StructType,

    /// Accessibility attributes
    pub attributes: StructureAttributes,

    /// Text rendered by this node, if it is a text leaf
    pub text: Option<String>,

    /// Zero-based page the node's content appears on
    pub page: Option<usize>,

    /// Children in reading order
    pub children: Vec<NodeId>,

    parent: Option<NodeId>,
}

impl StructureNode {
    /// Create a detached node.
    pub fn new(role: StructType) -> Self {
        Self {
            role,
            attributes: StructureAttributes::default(),
            text: None,
            page: None,
            children: Vec::new(),
            parent: None,
        }
    }

    /// Set the node text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the node page (zero-based).
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the node attributes.
    pub fn with_attributes(mut self, attributes: StructureAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Parent of this node; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether this node owns marked content.
    ///
    /// Leaves that carry non-blank text, and illustrations, are content-bearing.
    /// Containers never are, even when empty.
    pub fn is_content_bearing(&self) -> bool {
        if !self.children.is_empty()
            || self.role.is_container()
            || self.role == StructType::Artifact
            || self.role == StructType::Document
            || self.page.is_none()
        {
            return false;
        }
        self.role.is_illustration()
            || self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Structure tree rooted at a synthetic `Document` node.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureTree {
    nodes: Vec<StructureNode>,
}

impl Default for StructureTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureTree {
    /// Create a tree holding only the `Document` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![StructureNode::new(StructType::Document)],
        }
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&StructureNode> {
        self.nodes.get(id.0)
    }

    /// Get a node by id, failing with [`Error::InvalidTree`] on a dangling id.
    pub fn node(&self, id: NodeId) -> Result<&StructureNode> {
        self.get(id)
            .ok_or_else(|| Error::InvalidTree(format!("dangling node id {}", id)))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut StructureNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::InvalidTree(format!("dangling node id {}", id)))
    }

    /// Attach a new node as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, mut node: StructureNode) -> Result<NodeId> {
        self.node(parent)?;
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Iterate over all nodes with their ids, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &StructureNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// First page of a node: its own page, else the first page among its descendants.
    pub fn first_page(&self, id: NodeId) -> Option<usize> {
        let node = self.get(id)?;
        node.page
            .or_else(|| node.children.iter().find_map(|&c| self.first_page(c)))
    }

    /// Check the single-parent, acyclic invariants.
    ///
    /// Every node must be reachable from the root exactly once, and each
    /// child's stored parent must be the node listing it.
    pub fn validate(&self) -> Result<()> {
        let root = self.root();
        if self.nodes[root.0].parent.is_some() {
            return Err(Error::InvalidTree("root has a parent".to_string()));
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        seen[root.0] = true;

        while let Some(id) = stack.pop() {
            for &child in &self.node(id)?.children {
                let child_node = self.node(child)?;
                if seen[child.0] {
                    return Err(Error::InvalidTree(format!(
                        "node {} is reachable more than once",
                        child
                    )));
                }
                if child_node.parent != Some(id) {
                    return Err(Error::InvalidTree(format!(
                        "node {} lists {} as child but its parent is {:?}",
                        id, child, child_node.parent
                    )));
                }
                seen[child.0] = true;
                stack.push(child);
            }
        }

        if let Some(orphan) = seen.iter().position(|s| !s) {
            return Err(Error::InvalidTree(format!(
                "node {} is not reachable from the root",
                NodeId(orphan)
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<StructureNode> {
        &mut self.nodes
    }
}
