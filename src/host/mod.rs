//! Host document seam.
//!
//! The tagger never touches a document library directly. Everything it needs
//! from the document being tagged (page objects, content streams, object
//! numbering, catalog and page dictionaries) goes through [`HostDocument`].
//!
//! Two hosts ship with the crate:
//! - [`MemoryDocument`]: pages and objects held in memory, for tests and embedding
//! - [`LopdfDocument`]: an existing PDF file loaded and saved with `lopdf`

mod lopdf_backend;
mod memory;

pub use lopdf_backend::LopdfDocument;
pub use memory::MemoryDocument;

use crate::error::Result;
use crate::object::{Object, ObjectRef};

/// Document operations the tagging pipeline needs.
///
/// Pages are addressed by zero-based index.
pub trait HostDocument {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Reference to a page object.
    fn page_ref(&self, page: usize) -> Result<ObjectRef>;

    /// References to all page objects, in page order.
    fn page_refs(&self) -> Result<Vec<ObjectRef>> {
        (0..self.page_count()).map(|page| self.page_ref(page)).collect()
    }

    /// Decoded content of a page (all content streams concatenated).
    fn page_content(&self, page: usize) -> Result<Vec<u8>>;

    /// Replace the content of a page.
    fn set_page_content(&mut self, page: usize, content: Vec<u8>) -> Result<()>;

    /// First object number not in use.
    fn next_object_id(&self) -> u32;

    /// Add an indirect object.
    fn insert_object(&mut self, id: ObjectRef, object: Object) -> Result<()>;

    /// Set an entry of the document catalog.
    fn set_catalog_entry(&mut self, key: &str, value: Object) -> Result<()>;

    /// Set an entry of a page dictionary.
    fn set_page_entry(&mut self, page: usize, key: &str, value: Object) -> Result<()>;

    /// Whether the catalog already has a `/StructTreeRoot`.
    fn has_structure_tree(&self) -> bool;
}
