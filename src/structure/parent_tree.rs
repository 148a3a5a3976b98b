//! Parent tree index: (page, MCID) back to the owning structure node.
//!
//! Mirrors the number tree of ISO 32000-1:2008 Section 14.7.4.4. Each page
//! with marked content has one array whose i-th slot is the node owning
//! MCID i on that page. Empty slots (`None`) stand for MCIDs that are not
//! linked to structure: content-not-found nodes, or with document-wide
//! numbering, identifiers that live on another page.

use super::mcid::McidAssignment;
use super::tree::NodeId;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Page-ordered lookup from (page, MCID) to node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentTreeIndex {
    pages: BTreeMap<usize, Vec<Option<NodeId>>>,
}

impl ParentTreeIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from an MCID assignment.
    pub fn from_assignment(assignment: &McidAssignment) -> Result<Self> {
        let mut index = Self::new();
        for entry in assignment.entries() {
            index.insert(entry.page, entry.mcid, entry.node)?;
        }
        Ok(index)
    }

    /// Point (`page`, `mcid`) at `node`, padding the page array with empty slots.
    pub fn insert(&mut self, page: usize, mcid: u32, node: NodeId) -> Result<()> {
        let slots = self.pages.entry(page).or_default();
        let i = mcid as usize;
        if slots.len() <= i {
            slots.resize(i + 1, None);
        }
        if slots[i].is_some() {
            return Err(Error::McidCollision { page, mcid });
        }
        slots[i] = Some(node);
        Ok(())
    }

    /// Node owning `mcid` on `page`.
    pub fn lookup(&self, page: usize, mcid: u32) -> Option<NodeId> {
        self.pages.get(&page)?.get(mcid as usize).copied().flatten()
    }

    /// Slot array of one page.
    pub fn page_slots(&self, page: usize) -> Option<&[Option<NodeId>]> {
        self.pages.get(&page).map(|s| s.as_slice())
    }

    /// Clear the slot of an identifier whose content could not be linked.
    ///
    /// The array keeps its length so later identifiers keep their positions.
    pub fn mark_unlinked(&mut self, page: usize, mcid: u32) -> Option<NodeId> {
        self.pages.get_mut(&page)?.get_mut(mcid as usize)?.take()
    }

    /// Pages with an array, ascending.
    pub fn pages(&self) -> impl Iterator<Item = (usize, &[Option<NodeId>])> {
        self.pages.iter().map(|(&page, slots)| (page, slots.as_slice()))
    }

    /// Number of pages with an array.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number-tree key of a page (its `/StructParents` value).
    pub fn key_for_page(&self, page: usize) -> Option<i64> {
        self.pages.contains_key(&page).then_some(page as i64)
    }

    /// Value for `/ParentTreeNextKey`.
    pub fn next_key(&self) -> i64 {
        self.pages
            .keys()
            .next_back()
            .map(|&page| page as i64 + 1)
            .unwrap_or(0)
    }
}
