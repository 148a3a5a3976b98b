//! In-memory host document.

use super::HostDocument;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct MemoryPage {
    object_ref: ObjectRef,
    dict: Dictionary,
    content: Vec<u8>,
}

/// A document held entirely in memory.
///
/// Pages get object numbers as they are added; objects inserted by the
/// tagger are kept in a map keyed by object number.
///
/// # Examples
///
/// ```
/// use pdf_tagger::host::{HostDocument, MemoryDocument};
///
/// let doc = MemoryDocument::new().with_page("BT (Hello) Tj ET");
/// assert_eq!(doc.page_count(), 1);
/// assert_eq!(doc.page_content(0).unwrap(), b"BT (Hello) Tj ET");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
    catalog: Dictionary,
    objects: BTreeMap<u32, Object>,
    next_id: u32,
}

impl MemoryDocument {
    /// Create an empty document. Object 1 is reserved for the catalog.
    pub fn new() -> Self {
        let mut catalog = Dictionary::new();
        catalog.insert("Type".to_string(), Object::name("Catalog"));
        Self {
            pages: Vec::new(),
            catalog,
            objects: BTreeMap::new(),
            next_id: 2,
        }
    }

    /// Append a page with the given content.
    pub fn add_page(&mut self, content: impl Into<Vec<u8>>) -> usize {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("Page"));
        self.pages.push(MemoryPage {
            object_ref: ObjectRef::new(self.next_id, 0),
            dict,
            content: content.into(),
        });
        self.next_id += 1;
        self.pages.len() - 1
    }

    /// Append a page (builder form).
    pub fn with_page(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.add_page(content);
        self
    }

    /// The catalog dictionary.
    pub fn catalog(&self) -> &Dictionary {
        &self.catalog
    }

    /// A page dictionary.
    pub fn page_dict(&self, page: usize) -> Option<&Dictionary> {
        self.pages.get(page).map(|p| &p.dict)
    }

    /// An inserted object by number.
    pub fn object(&self, id: u32) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Follow a reference to an inserted object.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(r) => self.objects.get(&r.id),
            other => Some(other),
        }
    }

    /// Number of inserted objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn page_mut(&mut self, page: usize) -> Result<&mut MemoryPage> {
        self.pages.get_mut(page).ok_or(Error::PageNotFound(page))
    }
}

impl HostDocument for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_ref(&self, page: usize) -> Result<ObjectRef> {
        self.pages
            .get(page)
            .map(|p| p.object_ref)
            .ok_or(Error::PageNotFound(page))
    }

    fn page_content(&self, page: usize) -> Result<Vec<u8>> {
        self.pages
            .get(page)
            .map(|p| p.content.clone())
            .ok_or(Error::PageNotFound(page))
    }

    fn set_page_content(&mut self, page: usize, content: Vec<u8>) -> Result<()> {
        self.page_mut(page)?.content = content;
        Ok(())
    }

    fn next_object_id(&self) -> u32 {
        self.next_id
    }

    fn insert_object(&mut self, id: ObjectRef, object: Object) -> Result<()> {
        if id.id == 1 || self.pages.iter().any(|p| p.object_ref.id == id.id) {
            return Err(Error::Host(format!("object {} is already in use", id)));
        }
        self.objects.insert(id.id, object);
        self.next_id = self.next_id.max(id.id + 1);
        Ok(())
    }

    fn set_catalog_entry(&mut self, key: &str, value: Object) -> Result<()> {
        self.catalog.insert(key.to_string(), value);
        Ok(())
    }

    fn set_page_entry(&mut self, page: usize, key: &str, value: Object) -> Result<()> {
        self.page_mut(page)?.dict.insert(key.to_string(), value);
        Ok(())
    }

    fn has_structure_tree(&self) -> bool {
        self.catalog.contains_key("StructTreeRoot")
    }
}
