//! File-backed host document on the `lopdf` crate.

use super::HostDocument;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::path::Path;

/// An existing PDF loaded with `lopdf`.
///
/// Replaced page content is written as a new flate-compressed stream; the
/// old streams become unreferenced and are pruned on save.
pub struct LopdfDocument {
    inner: lopdf::Document,
    page_ids: Vec<lopdf::ObjectId>,
}

impl LopdfDocument {
    /// Load a PDF file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = lopdf::Document::load(path)?;
        log::info!("Loaded {} ({} pages)", path.display(), inner.get_pages().len());
        Ok(Self::from_document(inner))
    }

    /// Wrap an already loaded document.
    pub fn from_document(inner: lopdf::Document) -> Self {
        // get_pages is keyed by 1-based page number
        let page_ids = inner.get_pages().into_values().collect();
        Self { inner, page_ids }
    }

    /// Access the underlying document.
    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    /// Write the document to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let pruned = self.inner.prune_objects();
        log::debug!("Pruned {} unreferenced objects", pruned.len());
        self.inner.save(path.as_ref())?;
        log::info!("Saved {}", path.as_ref().display());
        Ok(())
    }

    fn page_id(&self, page: usize) -> Result<lopdf::ObjectId> {
        self.page_ids.get(page).copied().ok_or(Error::PageNotFound(page))
    }

    fn catalog_id(&self) -> Result<lopdf::ObjectId> {
        Ok(self.inner.trailer.get(b"Root")?.as_reference()?)
    }

    fn dict_mut(&mut self, id: lopdf::ObjectId) -> Result<&mut lopdf::Dictionary> {
        Ok(self.inner.get_object_mut(id)?.as_dict_mut()?)
    }
}

/// Content bytes of a stream, decompressed when it carries a filter.
fn decode_stream(stream: &lopdf::Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Convert an object into its `lopdf` form.
fn to_lopdf(object: &Object) -> lopdf::Object {
    match object {
        Object::Null => lopdf::Object::Null,
        Object::Boolean(b) => lopdf::Object::Boolean(*b),
        Object::Integer(i) => lopdf::Object::Integer(*i),
        Object::Real(r) => lopdf::Object::Real(*r as _),
        Object::String(s) => lopdf::Object::String(s.clone(), lopdf::StringFormat::Literal),
        Object::Name(n) => lopdf::Object::Name(n.as_bytes().to_vec()),
        Object::Array(items) => lopdf::Object::Array(items.iter().map(to_lopdf).collect()),
        Object::Dictionary(dict) => {
            let mut out = lopdf::Dictionary::new();
            for (key, value) in dict {
                out.set(key.as_str(), to_lopdf(value));
            }
            lopdf::Object::Dictionary(out)
        },
        Object::Reference(r) => lopdf::Object::Reference((r.id, r.gen)),
    }
}

impl HostDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_ref(&self, page: usize) -> Result<ObjectRef> {
        let (id, gen) = self.page_id(page)?;
        Ok(ObjectRef::new(id, gen))
    }

    fn page_content(&self, page: usize) -> Result<Vec<u8>> {
        // Streams of a /Contents array need not end in whitespace
        // ("...ET" + "BT..." must not become "ETBT").
        let mut content = Vec::new();
        for id in self.inner.get_page_contents(self.page_id(page)?) {
            let bytes = decode_stream(self.inner.get_object(id)?.as_stream()?)?;
            if !content.is_empty() {
                content.push(b'\n');
            }
            content.extend_from_slice(&bytes);
        }
        Ok(content)
    }

    fn set_page_content(&mut self, page: usize, content: Vec<u8>) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut stream = lopdf::Stream::new(lopdf::Dictionary::new(), content);
        stream.compress()?;
        let stream_id = self.inner.add_object(stream);
        self.dict_mut(page_id)?
            .set("Contents", lopdf::Object::Reference(stream_id));
        Ok(())
    }

    fn next_object_id(&self) -> u32 {
        self.inner.max_id + 1
    }

    fn insert_object(&mut self, id: ObjectRef, object: Object) -> Result<()> {
        let key = (id.id, id.gen);
        if self.inner.objects.contains_key(&key) {
            return Err(Error::Host(format!("object {} is already in use", id)));
        }
        self.inner.objects.insert(key, to_lopdf(&object));
        self.inner.max_id = self.inner.max_id.max(id.id);
        Ok(())
    }

    fn set_catalog_entry(&mut self, key: &str, value: Object) -> Result<()> {
        let catalog = self.catalog_id()?;
        self.dict_mut(catalog)?.set(key, to_lopdf(&value));
        Ok(())
    }

    fn set_page_entry(&mut self, page: usize, key: &str, value: Object) -> Result<()> {
        let page_id = self.page_id(page)?;
        self.dict_mut(page_id)?.set(key, to_lopdf(&value));
        Ok(())
    }

    fn has_structure_tree(&self) -> bool {
        self.catalog_id()
            .ok()
            .and_then(|id| self.inner.get_dictionary(id).ok())
            .is_some_and(|catalog| catalog.has(b"StructTreeRoot"))
    }
}
