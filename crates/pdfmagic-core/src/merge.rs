//! Page assembly
//!
//! A [`PageSet`] is the output document under construction. Each appended
//! source document is imported wholesale:
//! 1. Inherited page attributes are copied onto each page, since pages are
//!    about to lose their original parent
//! 2. Every object id is shifted past the destination's highest id
//! 3. Pages are re-parented under the destination page tree, in order
//!
//! Objects that end up unreachable (source catalogs, page tree nodes) are
//! pruned when the set is serialized.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::PdfMagicError;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on parent-chain walks, guards against cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Ordered accumulation of output pages for one pipeline run.
pub struct PageSet {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for PageSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSet {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.page_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_ids.is_empty()
    }

    /// Parse `bytes` and append all of its pages. Returns the number added.
    ///
    /// `name` labels the error if the document cannot be parsed.
    pub fn append_pdf(&mut self, name: &str, bytes: &[u8]) -> Result<usize, PdfMagicError> {
        let source = Document::load_mem(bytes).map_err(|e| PdfMagicError::CorruptPdf {
            filename: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.append_document(source))
    }

    /// Append every page of an already parsed document, in page order.
    pub fn append_document(&mut self, mut source: Document) -> usize {
        // get_pages is keyed by page number, so values come out in reading order
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        for &page_id in &source_pages {
            flatten_inherited_attributes(&mut source, page_id);
        }

        let offset = self.doc.max_id;
        let source_max_id = source
            .objects
            .keys()
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
            .max(source.max_id);

        for (old_id, mut object) in std::mem::take(&mut source.objects) {
            shift_references(&mut object, offset);
            self.doc
                .objects
                .insert((old_id.0 + offset, old_id.1), object);
        }

        for old_page_id in &source_pages {
            let new_page_id = (old_page_id.0 + offset, old_page_id.1);
            if let Some(Object::Dictionary(page)) = self.doc.objects.get_mut(&new_page_id) {
                page.set("Parent", Object::Reference(self.pages_id));
            }
            self.page_ids.push(new_page_id);
        }

        self.doc.max_id = self.doc.max_id.max(source_max_id + offset);
        source_pages.len()
    }

    /// Build the page tree and serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>, PdfMagicError> {
        if self.page_ids.is_empty() {
            return Err(PdfMagicError::NoPages("No pages to merge".into()));
        }

        let kids = self
            .page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>();

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(self.page_ids.len() as i64));
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog_dict.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(Object::Dictionary(catalog_dict));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        self.doc.prune_objects();
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| PdfMagicError::Serialization(e.to_string()))?;

        Ok(buffer)
    }
}

/// Copy attributes the page inherits from its ancestors onto the page itself.
fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return;
    };

    let mut inherited = Vec::new();
    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = find_in_ancestors(doc, page, key) {
            inherited.push((key, value));
        }
    }

    if let Some(Object::Dictionary(page)) = doc.objects.get_mut(&page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

fn find_in_ancestors(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Shift every indirect reference inside `obj` by `offset`.
fn shift_references(obj: &mut Object, offset: u32) {
    match obj {
        Object::Reference(id) => id.0 += offset,
        Object::Array(items) => {
            for item in items.iter_mut() {
                shift_references(item, offset);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                shift_references(value, offset);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                shift_references(value, offset);
            }
        }
        _ => {}
    }
}
