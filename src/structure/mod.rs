//! PDF Logical Structure (Tagged PDF) construction.
//!
//! This module builds the logical structure of a document according to
//! ISO 32000-1:2008 Section 14.7, starting from classified elements.
//!
//! ## Overview
//!
//! Tagged PDFs carry explicit document structure that defines reading order,
//! semantic meaning and accessibility information. Building it happens in
//! stages:
//!
//! 1. [`HierarchyBuilder`] turns flat classified elements into a
//!    [`StructureTree`] (lists grouped, table cells expanded, headings nested).
//! 2. [`McidAllocator`] gives every content-bearing node a marked content
//!    identifier, in reading order.
//! 3. [`ParentTreeIndex`] records the reverse mapping from (page, MCID) to node.
//! 4. [`StructureTreeBuilder`] materializes `StructTreeRoot`, `StructElem`
//!    and `ParentTree` objects.
//!
//! ## Structure Tree
//!
//! - **StructTreeRoot**: The root of the structure hierarchy
//! - **StructElem**: Structure elements (paragraphs, headings, sections, etc.)
//! - **ParentTree**: Maps marked content IDs to structure elements
//! - **Marked Content**: Tagged content in page streams (BDC/EMC operators)
//!
//! ## Example
//!
//! ```
//! use pdf_tagger::config::TaggingConfig;
//! use pdf_tagger::elements::ClassifiedElement;
//! use pdf_tagger::structure::{allocate_mcids, HierarchyBuilder};
//!
//! let config = TaggingConfig::default();
//! let elements = vec![
//!     ClassifiedElement::new("H1", "Intro", 1),
//!     ClassifiedElement::new("P", "Hello world", 1),
//! ];
//! let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();
//! let mcids = allocate_mcids(&hierarchy.tree, config.mcid_scope).unwrap();
//! assert_eq!(mcids.len(), 2);
//! ```

mod builder;
pub mod heuristics;
mod hierarchy;
mod mcid;
mod parent_tree;
pub mod traversal;
mod tree;
mod types;

pub use builder::{StructTreeObjects, StructureTreeBuilder};
pub use hierarchy::{Hierarchy, HierarchyBuilder, HierarchyStats};
pub use mcid::{allocate_mcids, McidAllocator, McidAssignment, McidEntry};
pub use parent_tree::ParentTreeIndex;
pub use traversal::{content_nodes, preorder, Preorder};
pub use tree::{NodeId, StructureNode, StructureTree};
pub use types::{CheckedState, RoleParse, StructType, StructureAttributes};
