//! Marked content identifier allocation.
//!
//! MCIDs are handed out while walking the tree in reading order. The counter
//! is per page or per document according to [`McidScope`]; either way no
//! (page, MCID) pair is ever handed out twice, and a second claim on a pair
//! aborts the run with [`Error::McidCollision`].

use super::traversal::preorder;
use super::tree::{NodeId, StructureTree};
use crate::config::McidScope;
use crate::error::{Error, Result};
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// One allocated identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct McidEntry {
    /// Owning node
    pub node: NodeId,
    /// Zero-based page
    pub page: usize,
    /// Marked content identifier
    pub mcid: u32,
}

/// All identifiers allocated for one tree, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McidAssignment {
    scope: McidScope,
    entries: Vec<McidEntry>,
    by_node: HashMap<NodeId, usize>,
}

impl McidAssignment {
    /// Scope the identifiers were allocated in.
    pub fn scope(&self) -> McidScope {
        self.scope
    }

    /// All entries in reading order.
    pub fn entries(&self) -> &[McidEntry] {
        &self.entries
    }

    /// Number of allocated identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was allocated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// MCID owned by a node.
    pub fn mcid_of(&self, node: NodeId) -> Option<u32> {
        self.entry_of(node).map(|e| e.mcid)
    }

    /// Full entry owned by a node.
    pub fn entry_of(&self, node: NodeId) -> Option<&McidEntry> {
        self.by_node.get(&node).map(|&i| &self.entries[i])
    }

    /// Entries on one page, in reading order (and so in increasing MCID order).
    pub fn on_page(&self, page: usize) -> impl Iterator<Item = &McidEntry> {
        self.entries.iter().filter(move |e| e.page == page)
    }

    /// Pages that received at least one identifier.
    pub fn pages(&self) -> BTreeSet<usize> {
        self.entries.iter().map(|e| e.page).collect()
    }
}

/// Allocator for one tagging run.
#[derive(Debug, Clone)]
pub struct McidAllocator {
    scope: McidScope,
    next_document: u32,
    next_per_page: BTreeMap<usize, u32>,
    claimed: HashSet<(usize, u32)>,
    assignment: McidAssignment,
}

impl McidAllocator {
    /// Create an allocator for the given scope.
    pub fn new(scope: McidScope) -> Self {
        Self {
            scope,
            next_document: 0,
            next_per_page: BTreeMap::new(),
            claimed: HashSet::new(),
            assignment: McidAssignment {
                scope,
                ..Default::default()
            },
        }
    }

    /// Next identifier for content on `page`.
    fn next_mcid(&mut self, page: usize) -> u32 {
        let counter = match self.scope {
            McidScope::PerPage => self.next_per_page.entry(page).or_insert(0),
            McidScope::Document => &mut self.next_document,
        };
        let mcid = *counter;
        *counter += 1;
        mcid
    }

    /// Record that `node` owns (`page`, `mcid`).
    pub fn claim(&mut self, node: NodeId, page: usize, mcid: u32) -> Result<()> {
        if !self.claimed.insert((page, mcid)) {
            return Err(Error::McidCollision { page, mcid });
        }
        if self.assignment.by_node.contains_key(&node) {
            return Err(Error::InvalidTree(format!("node {} already owns an MCID", node)));
        }
        self.assignment
            .by_node
            .insert(node, self.assignment.entries.len());
        self.assignment.entries.push(McidEntry { node, page, mcid });
        Ok(())
    }

    /// Allocate identifiers for every content-bearing node of `tree`.
    pub fn allocate(mut self, tree: &StructureTree) -> Result<McidAssignment> {
        for id in preorder(tree) {
            let node = tree.node(id)?;
            if !node.is_content_bearing() {
                continue;
            }
            let Some(page) = node.page else {
                continue;
            };
            let mcid = self.next_mcid(page);
            self.claim(id, page, mcid)?;
            debug!("MCID {} on page {} -> {} {}", mcid, page + 1, node.role, id);
        }
        Ok(self.assignment)
    }
}

/// Allocate identifiers for a tree in the given scope.
pub fn allocate_mcids(tree: &StructureTree, scope: McidScope) -> Result<McidAssignment> {
    McidAllocator::new(scope).allocate(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::tree::StructureNode;
    use crate::structure::types::StructType;

    fn two_page_tree() -> StructureTree {
        let mut tree = StructureTree::new();
        let root = tree.root();
        for (text, page) in [("a", 0), ("b", 0), ("c", 1), ("d", 0)] {
            tree.append(root, StructureNode::new(StructType::P).with_text(text).with_page(page))
                .unwrap();
        }
        tree.append(root, StructureNode::new(StructType::L).with_page(1)).unwrap();
        tree
    }

    #[test]
    fn test_per_page_counters_reset() {
        let tree = two_page_tree();
        let assignment = allocate_mcids(&tree, McidScope::PerPage).unwrap();
        let pairs: Vec<(usize, u32)> =
            assignment.entries().iter().map(|e| (e.page, e.mcid)).collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (0, 2)]);
    }

    #[test]
    fn test_document_scope_is_flat() {
        let tree = two_page_tree();
        let assignment = allocate_mcids(&tree, McidScope::Document).unwrap();
        let mcids: Vec<u32> = assignment.entries().iter().map(|e| e.mcid).collect();
        assert_eq!(mcids, vec![0, 1, 2, 3]);
        assert_eq!(assignment.scope(), McidScope::Document);
    }

    #[test]
    fn test_containers_get_nothing() {
        let tree = two_page_tree();
        let assignment = allocate_mcids(&tree, McidScope::PerPage).unwrap();
        assert_eq!(assignment.len(), 4);
        assert_eq!(assignment.mcid_of(NodeId(5)), None);
        assert_eq!(assignment.mcid_of(NodeId(3)), Some(0));
        assert_eq!(assignment.pages().into_iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_collision_is_fatal() {
        let mut allocator = McidAllocator::new(McidScope::PerPage);
        allocator.claim(NodeId(1), 0, 3).unwrap();
        let err = allocator.claim(NodeId(2), 0, 3).unwrap_err();
        assert!(matches!(err, Error::McidCollision { page: 0, mcid: 3 }));

        allocator.claim(NodeId(2), 1, 3).unwrap();
    }

    #[test]
    fn test_node_claims_once() {
        let mut allocator = McidAllocator::new(McidScope::PerPage);
        allocator.claim(NodeId(1), 0, 0).unwrap();
        assert!(matches!(allocator.claim(NodeId(1), 0, 1), Err(Error::InvalidTree(_))));
    }
}
