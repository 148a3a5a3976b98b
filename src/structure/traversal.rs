//! Structure tree traversal.
//!
//! Reading order is the pre-order traversal of the tree: a node, then its
//! children in order. MCID allocation and content linking both walk the tree
//! this way, so they always agree on the order of content-bearing nodes.

use super::mcid::McidAssignment;
use super::tree::{NodeId, StructureTree};
use std::fmt::Write;

/// Characters of node text shown per line of a dump.
const DUMP_TEXT_CHARS: usize = 40;

/// Pre-order iterator over node ids.
pub struct Preorder<'a> {
    tree: &'a StructureTree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.tree.get(id) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(id)
    }
}

/// Traverse the tree in reading order, starting at the root.
pub fn preorder(tree: &StructureTree) -> Preorder<'_> {
    Preorder {
        tree,
        stack: vec![tree.root()],
    }
}

/// Content-bearing nodes in reading order.
pub fn content_nodes(tree: &StructureTree) -> Vec<NodeId> {
    preorder(tree)
        .filter(|&id| tree.get(id).is_some_and(|n| n.is_content_bearing()))
        .collect()
}

impl StructureTree {
    /// Render an indented view of the tree, one node per line.
    ///
    /// ```text
    /// Document
    ///   H1 [p1]
    ///     Span [p1 mcid=0] "Intro"
    /// ```
    pub fn dump(&self, mcids: Option<&McidAssignment>) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root(), 0usize)];

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            let _ = write!(out, "{:indent$}{}", "", node.role, indent = depth * 2);

            let mcid = mcids.and_then(|a| a.mcid_of(id));
            match (node.page, mcid) {
                (Some(page), Some(mcid)) => {
                    let _ = write!(out, " [p{} mcid={}]", page + 1, mcid);
                },
                (Some(page), None) => {
                    let _ = write!(out, " [p{}]", page + 1);
                },
                _ => {},
            }
            if let Some(ref text) = node.text {
                let shown: String = text.chars().take(DUMP_TEXT_CHARS).collect();
                let ellipsis = if text.chars().count() > DUMP_TEXT_CHARS { "..." } else { "" };
                let _ = write!(out, " {:?}{}", shown, ellipsis);
            }
            out.push('\n');

            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}
