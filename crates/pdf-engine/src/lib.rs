use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
pub mod text;

pub use text::{decode_text_bytes, decode_text_string, encode_text_string};

/// Page size used when a page has no readable `MediaBox` (US Letter).
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

/// Keys never followed when copying an annotation out of a document. They
/// point back into the page tree or at other annotations.
const UNRESOLVED_KEYS: [&[u8]; 5] = [b"P", b"Parent", b"Popup", b"IRT", b"AP"];
const MAX_RESOLVE_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Options applied when a document is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Deflate uncompressed streams before writing
    pub compress: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { compress: true }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PdfEngineError {
    /// True when the document itself could not be read, as opposed to a
    /// failed operation on a readable one.
    pub fn is_corrupt_document(&self) -> bool {
        matches!(
            self,
            PdfEngineError::Parse(_)
                | PdfEngineError::EncryptedUnsupported
                | PdfEngineError::NoPages
        )
    }
}

/// Document store and per-page annotation access.
///
/// Handles are owned by the engine that issued them; every opened handle must
/// be passed back to [`PdfEngine::close`].
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;

    /// Rebuild the document's object table: drop unreferenced objects and
    /// empty streams, renumber, and recompress.
    fn repair(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;

    fn page_height(&self, handle: DocumentHandle, page_index: u32) -> Result<f32, PdfEngineError> {
        Ok(self.page_size(handle, page_index)?.height_pt)
    }

    /// Annotation dictionaries of a page in `/Annots` order, with indirect
    /// values resolved.
    fn annotations(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<Vec<Dictionary>, PdfEngineError>;

    /// Store `annotation` as a new object and append it to the page's
    /// `/Annots` array.
    fn append_annotation(
        &mut self,
        handle: DocumentHandle,
        page_index: u32,
        annotation: Dictionary,
    ) -> Result<ObjectId, PdfEngineError>;

    fn save(
        &mut self,
        handle: DocumentHandle,
        path: &Path,
        options: SaveOptions,
    ) -> Result<(), PdfEngineError>;

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug)]
struct DocumentRecord {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl DocumentRecord {
    fn new(doc: Document) -> Result<Self, PdfEngineError> {
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(PdfEngineError::NoPages);
        }
        Ok(Self { doc, pages })
    }

    fn page_id(&self, page_index: u32) -> Result<ObjectId, PdfEngineError> {
        self.pages.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: self.pages.len() as u32,
        })
    }
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(bytes: &[u8]) -> Result<Document, PdfEngineError> {
        let doc = Document::load_mem(bytes)?;
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfEngineError::EncryptedUnsupported);
        }
        Ok(doc)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }

    fn record_mut(
        &mut self,
        handle: DocumentHandle,
    ) -> Result<&mut DocumentRecord, PdfEngineError> {
        self.docs.get_mut(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }

    /// Number of currently open documents.
    pub fn open_documents(&self) -> usize {
        self.docs.len()
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let record = DocumentRecord::new(Self::load(&bytes)?)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, record);

        Ok(handle)
    }

    fn repair(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        let record = self.record_mut(handle)?;
        let doc = &mut record.doc;

        let pruned = doc.prune_objects();
        let emptied = doc.delete_zero_length_streams();
        doc.renumber_objects();
        doc.compress();
        tracing::debug!(pruned = pruned.len(), emptied = emptied.len(), "repaired document");

        record.pages = doc.get_pages().into_values().collect();
        if record.pages.is_empty() {
            return Err(PdfEngineError::NoPages);
        }
        Ok(())
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.pages.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        let page_id = record.page_id(page_index)?;

        let size = inherited_attribute(&record.doc, page_id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|array| {
                if array.len() != 4 {
                    return None;
                }
                let x0 = number(&record.doc, &array[0])?;
                let y0 = number(&record.doc, &array[1])?;
                let x1 = number(&record.doc, &array[2])?;
                let y1 = number(&record.doc, &array[3])?;
                Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
            })
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Ok(size)
    }

    fn annotations(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<Vec<Dictionary>, PdfEngineError> {
        let record = self.record(handle)?;
        let doc = &record.doc;
        let page = doc.get_dictionary(record.page_id(page_index)?)?;

        let entries = match page.get(b"Annots").map(|obj| resolve(doc, obj)) {
            Ok(Object::Array(entries)) => entries,
            // Some writers store a lone annotation instead of a one-element array.
            Ok(lone @ Object::Dictionary(_)) => vec![lone],
            Ok(other) => {
                tracing::warn!(
                    page = page_index + 1,
                    annots = ?other,
                    "ignoring /Annots that is neither an array nor a dictionary"
                );
                return Ok(Vec::new());
            }
            Err(_) => return Ok(Vec::new()),
        };

        let mut dictionaries = Vec::with_capacity(entries.len());
        for entry in &entries {
            match resolve(doc, entry) {
                Object::Dictionary(dict) => {
                    dictionaries.push(resolve_dictionary(doc, &dict, MAX_RESOLVE_DEPTH))
                }
                other => {
                    tracing::debug!(page = page_index, ?other, "skipping non-dictionary annotation")
                }
            }
        }

        Ok(dictionaries)
    }

    fn append_annotation(
        &mut self,
        handle: DocumentHandle,
        page_index: u32,
        annotation: Dictionary,
    ) -> Result<ObjectId, PdfEngineError> {
        let record = self.record_mut(handle)?;
        let page_id = record.page_id(page_index)?;
        let doc = &mut record.doc;

        // Annots may be inline or an indirect array. A lone annotation is
        // kept as the first entry; anything else is replaced.
        let existing = doc.get_dictionary(page_id)?.get(b"Annots").ok().cloned();
        let annot_id = doc.add_object(Object::Dictionary(annotation));

        let annots = match existing {
            Some(Object::Reference(target_id)) => match doc.get_object_mut(target_id) {
                Ok(Object::Array(array)) => {
                    array.push(Object::Reference(annot_id));
                    return Ok(annot_id);
                }
                Ok(Object::Dictionary(_)) => {
                    vec![Object::Reference(target_id), Object::Reference(annot_id)]
                }
                _ => vec![Object::Reference(annot_id)],
            },
            Some(Object::Array(mut array)) => {
                array.push(Object::Reference(annot_id));
                array
            }
            Some(lone @ Object::Dictionary(_)) => {
                vec![Object::Reference(doc.add_object(lone)), Object::Reference(annot_id)]
            }
            _ => vec![Object::Reference(annot_id)],
        };
        doc.get_dictionary_mut(page_id)?.set("Annots", Object::Array(annots));

        Ok(annot_id)
    }

    fn save(
        &mut self,
        handle: DocumentHandle,
        path: &Path,
        options: SaveOptions,
    ) -> Result<(), PdfEngineError> {
        let doc = &mut self.record_mut(handle)?.doc;
        if options.compress {
            doc.compress();
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        fs::write(path, bytes)
            .map_err(|source| PdfEngineError::Write { path: path.to_path_buf(), source })?;

        Ok(())
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// Look up a page attribute, walking up the page tree through `/Parent`.
fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // The depth bound guards against parent cycles in damaged files.
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(resolve_ref(doc, value));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve_ref<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn number(doc: &Document, object: &Object) -> Option<f32> {
    match resolve_ref(doc, object) {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

fn resolve(doc: &Document, object: &Object) -> Object {
    resolve_ref(doc, object).clone()
}

fn resolve_dictionary(doc: &Document, dict: &Dictionary, depth: usize) -> Dictionary {
    let mut resolved = Dictionary::new();
    for (key, value) in dict.iter() {
        let value = if UNRESOLVED_KEYS.contains(&key.as_slice()) {
            value.clone()
        } else {
            resolve_deep(doc, value.clone(), depth)
        };
        resolved.set(key.clone(), value);
    }
    resolved
}

fn resolve_deep(doc: &Document, object: Object, depth: usize) -> Object {
    if depth == 0 {
        return object;
    }
    match object {
        Object::Reference(_) => resolve_deep(doc, resolve(doc, &object), depth - 1),
        Object::Array(items) => Object::Array(
            items.into_iter().map(|item| resolve_deep(doc, item, depth - 1)).collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(resolve_dictionary(doc, &dict, depth - 1)),
        other => other,
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use lopdf::dictionary;

    fn open_bytes(engine: &mut LopdfEngine, bytes: Vec<u8>) -> DocumentHandle {
        engine.open(OpenSource::Bytes(bytes)).expect("open should succeed")
    }

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::blank_pdf(3));

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 3);
    }

    #[test]
    fn page_height_comes_from_media_box() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::pdf_with_page_size(595.0, 842.0, 1));

        assert_eq!(engine.page_height(handle, 0).expect("height"), 842.0);
    }

    #[test]
    fn page_height_inherits_from_parent() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::pdf_with_inherited_media_box(400.0, 500.0));

        assert_eq!(engine.page_height(handle, 0).expect("height"), 500.0);
    }

    #[test]
    fn page_height_defaults_without_media_box() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::pdf_without_media_box());

        assert_eq!(engine.page_height(handle, 0).expect("height"), 792.0);
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }

    #[test]
    fn garbage_bytes_are_a_corrupt_document() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"definitely not a pdf".to_vec()))
            .expect_err("should fail to parse");

        assert!(err.is_corrupt_document());
    }

    #[test]
    fn out_of_range_page_is_reported() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::blank_pdf(1));

        let err = engine.annotations(handle, 4).expect_err("page 4 does not exist");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 4, page_count: 1 }));
    }

    #[test]
    fn appended_annotations_are_listed_in_order() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::blank_pdf(2));

        for name in ["first", "second"] {
            engine
                .append_annotation(
                    handle,
                    1,
                    dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Text",
                        "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                        "Contents" => Object::string_literal(name),
                    },
                )
                .expect("append should succeed");
        }

        let annots = engine.annotations(handle, 1).expect("annotations");
        let contents: Vec<String> = annots
            .iter()
            .filter_map(|dict| dict.get(b"Contents").ok().and_then(decode_text_string))
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert!(engine.annotations(handle, 0).expect("page 0").is_empty());
    }

    #[test]
    fn append_keeps_existing_indirect_annots_array() {
        let mut engine = LopdfEngine::new();
        let existing = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Square",
            "Rect" => vec![1.into(), 1.into(), 5.into(), 5.into()],
        };
        let handle = open_bytes(&mut engine, fixtures::pdf_with_indirect_annots(vec![existing]));

        engine
            .append_annotation(
                handle,
                0,
                dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Circle",
                    "Rect" => vec![2.into(), 2.into(), 6.into(), 6.into()],
                },
            )
            .expect("append should succeed");

        let subtypes: Vec<Vec<u8>> = engine
            .annotations(handle, 0)
            .expect("annotations")
            .iter()
            .filter_map(|dict| dict.get(b"Subtype").ok()?.as_name().ok().map(<[u8]>::to_vec))
            .collect();
        assert_eq!(subtypes, vec![b"Square".to_vec(), b"Circle".to_vec()]);
    }

    fn subtypes(engine: &LopdfEngine, handle: DocumentHandle, page: u32) -> Vec<Vec<u8>> {
        engine
            .annotations(handle, page)
            .expect("annotations")
            .iter()
            .filter_map(|dict| dict.get(b"Subtype").ok()?.as_name().ok().map(<[u8]>::to_vec))
            .collect()
    }

    fn square() -> Dictionary {
        dictionary! {
            "Type" => "Annot",
            "Subtype" => "Square",
            "Rect" => vec![1.into(), 1.into(), 5.into(), 5.into()],
        }
    }

    #[test]
    fn lone_annotation_dictionary_is_listed() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::pdf_with_lone_annot(square()));

        assert_eq!(subtypes(&engine, handle, 0), vec![b"Square".to_vec()]);
    }

    #[test]
    fn unusable_annots_entry_reads_as_empty() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::pdf_with_annots_value(Object::Integer(7)));

        assert!(engine.annotations(handle, 0).expect("annotations").is_empty());
    }

    #[test]
    fn append_keeps_lone_annotation() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::pdf_with_lone_annot(square()));

        engine
            .append_annotation(
                handle,
                0,
                dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Circle",
                    "Rect" => vec![2.into(), 2.into(), 6.into(), 6.into()],
                },
            )
            .expect("append should succeed");

        assert_eq!(subtypes(&engine, handle, 0), vec![b"Square".to_vec(), b"Circle".to_vec()]);
    }

    #[test]
    fn annotation_values_are_resolved() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::pdf_with_indirect_ink_list());

        let annots = engine.annotations(handle, 0).expect("annotations");
        let ink_list = annots[0].get(b"InkList").expect("ink list").as_array().expect("array");
        assert_eq!(ink_list.len(), 1);
        assert!(ink_list[0].as_array().is_ok());
    }

    #[test]
    fn repair_keeps_pages_and_annotations() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::blank_pdf(2));
        engine
            .append_annotation(
                handle,
                1,
                dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Text",
                    "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                },
            )
            .expect("append");

        engine.repair(handle).expect("repair should succeed");

        assert_eq!(engine.page_count(handle).expect("count"), 2);
        assert_eq!(engine.annotations(handle, 1).expect("annotations").len(), 1);
    }

    #[test]
    fn save_round_trips_through_disk() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("out.pdf");

        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::blank_pdf(1));
        engine
            .append_annotation(
                handle,
                0,
                dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Square",
                    "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                },
            )
            .expect("append");
        engine.save(handle, &path, SaveOptions::default()).expect("save should succeed");
        engine.close(handle).expect("close");

        let reopened = engine.open(OpenSource::from(path.as_path())).expect("reopen");
        assert_eq!(engine.annotations(reopened, 0).expect("annotations").len(), 1);
        assert_eq!(engine.open_documents(), 1);
    }

    #[test]
    fn save_to_missing_directory_is_a_write_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("missing").join("out.pdf");

        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::blank_pdf(1));
        let err = engine.save(handle, &path, SaveOptions::default()).expect_err("should fail");

        assert!(matches!(err, PdfEngineError::Write { .. }));
    }

    #[test]
    fn close_releases_handle() {
        let mut engine = LopdfEngine::new();
        let handle = open_bytes(&mut engine, fixtures::blank_pdf(1));

        engine.close(handle).expect("close");
        assert!(matches!(engine.close(handle), Err(PdfEngineError::InvalidHandle(_))));
        assert_eq!(engine.open_documents(), 0);
    }
}
