mod annots;
mod cmap;
mod content;
mod font;
pub mod geometry;
pub mod text;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use annots::{AnnotationKind, PageAnnotation};
pub use cmap::ToUnicodeMap;
pub use geometry::{Rect, Rgb};
pub use text::{PageText, TextChar};

use content::TextCollector;
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

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

impl From<&[u8]> for OpenSource {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
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
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("malformed content: {0}")]
    Content(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Handle-based access to PDF documents.
///
/// Pages are addressed by 0-based index. A handle stays valid until
/// [`PdfEngine::close`] is called for it; prefer [`PdfEngine::open_scoped`]
/// so the document is released on every exit path.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(&self, handle: DocumentHandle, page_index: u32)
        -> Result<PageSize, PdfEngineError>;

    /// Positioned text of a page, in content-stream order.
    fn page_text(&self, handle: DocumentHandle, page_index: u32)
        -> Result<PageText, PdfEngineError>;

    /// Rectangles of every occurrence of `needle` on a page.
    fn search_page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        needle: &str,
        case_sensitive: bool,
    ) -> Result<Vec<Rect>, PdfEngineError> {
        Ok(self.page_text(handle, page_index)?.search(needle, case_sensitive))
    }

    fn annotations(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<Vec<PageAnnotation>, PdfEngineError>;
    fn add_highlight(
        &mut self,
        handle: DocumentHandle,
        page_index: u32,
        rect: Rect,
        color: Rgb,
    ) -> Result<(), PdfEngineError>;

    /// Serialize the document. Unmodified documents come back byte-identical.
    fn save(&mut self, handle: DocumentHandle) -> Result<Vec<u8>, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;

    /// Open a document whose handle is closed when the guard is dropped.
    fn open_scoped(&mut self, source: OpenSource) -> Result<OpenDocument<'_, Self>, PdfEngineError>
    where
        Self: Sized,
    {
        let handle = self.open(source)?;
        Ok(OpenDocument { engine: self, handle })
    }
}

/// An open document that closes itself on drop.
pub struct OpenDocument<'e, E: PdfEngine> {
    engine: &'e mut E,
    handle: DocumentHandle,
}

impl<E: PdfEngine> OpenDocument<'_, E> {
    pub fn page_count(&self) -> Result<u32, PdfEngineError> {
        self.engine.page_count(self.handle)
    }

    pub fn page_size(&self, page_index: u32) -> Result<PageSize, PdfEngineError> {
        self.engine.page_size(self.handle, page_index)
    }

    pub fn page_text(&self, page_index: u32) -> Result<PageText, PdfEngineError> {
        self.engine.page_text(self.handle, page_index)
    }

    pub fn search_page(
        &self,
        page_index: u32,
        needle: &str,
        case_sensitive: bool,
    ) -> Result<Vec<Rect>, PdfEngineError> {
        self.engine.search_page(self.handle, page_index, needle, case_sensitive)
    }

    pub fn annotations(&self, page_index: u32) -> Result<Vec<PageAnnotation>, PdfEngineError> {
        self.engine.annotations(self.handle, page_index)
    }

    pub fn add_highlight(
        &mut self,
        page_index: u32,
        rect: Rect,
        color: Rgb,
    ) -> Result<(), PdfEngineError> {
        self.engine.add_highlight(self.handle, page_index, rect, color)
    }

    pub fn save(&mut self) -> Result<Vec<u8>, PdfEngineError> {
        self.engine.save(self.handle)
    }
}

impl<E: PdfEngine> Drop for OpenDocument<'_, E> {
    fn drop(&mut self) {
        if let Err(err) = self.engine.close(self.handle) {
            tracing::warn!(handle = self.handle.raw(), %err, "failed to close document");
        }
    }
}

struct DocumentRecord {
    source: Vec<u8>,
    document: Document,
    page_ids: Vec<ObjectId>,
    page_sizes: Vec<PageSize>,
    modified: bool,
}

#[derive(Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently open.
    pub fn open_documents(&self) -> usize {
        self.docs.len()
    }

    fn parse(bytes: &[u8]) -> Result<(Document, Vec<ObjectId>, Vec<PageSize>), PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let document = Document::load_mem(bytes)?;
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        let page_sizes = page_ids
            .iter()
            .map(|page_id| {
                content::inherited(&document, *page_id, b"MediaBox")
                    .map(|object| resolve(&document, object))
                    .and_then(|object| object.as_array().ok())
                    .and_then(|array| Rect::from_pdf_array(array))
                    .map(|rect| PageSize { width_pt: rect.width(), height_pt: rect.height() })
                    .unwrap_or(DEFAULT_PAGE_SIZE)
            })
            .collect();

        Ok((document, page_ids, page_sizes))
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
}

impl DocumentRecord {
    fn page_id(&self, page_index: u32) -> Result<ObjectId, PdfEngineError> {
        self.page_ids.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: self.page_ids.len() as u32,
        })
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let source = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let (document, page_ids, page_sizes) = Self::parse(&source)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = page_ids.len(), "opened document");
        let record = DocumentRecord { source, document, page_ids, page_sizes, modified: false };
        self.docs.insert(handle, record);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_ids.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn page_text(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageText, PdfEngineError> {
        let record = self.record(handle)?;
        let chars = TextCollector::new(&record.document).collect_page(record.page_id(page_index)?)?;
        tracing::debug!(page = page_index, chars = chars.len(), "extracted page text");
        Ok(PageText::from_chars(chars))
    }

    fn annotations(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<Vec<PageAnnotation>, PdfEngineError> {
        let record = self.record(handle)?;
        annots::page_annotations(&record.document, record.page_id(page_index)?)
    }

    fn add_highlight(
        &mut self,
        handle: DocumentHandle,
        page_index: u32,
        rect: Rect,
        color: Rgb,
    ) -> Result<(), PdfEngineError> {
        let record = self.record_mut(handle)?;
        let page_id = record.page_id(page_index)?;
        let annotation_id = annots::add_highlight(&mut record.document, page_id, rect, color)?;
        record.modified = true;
        tracing::debug!(page = page_index, ?annotation_id, ?rect, "added highlight");
        Ok(())
    }

    fn save(&mut self, handle: DocumentHandle) -> Result<Vec<u8>, PdfEngineError> {
        let record = self.record_mut(handle)?;
        if !record.modified {
            return Ok(record.source.clone());
        }

        let mut bytes = Vec::new();
        record.document.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    for _ in 0..32 {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return &Object::Null,
            },
            _ => return current,
        }
    }
    &Object::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixturePage, PdfFixture};

    fn sample_pdf_bytes() -> Vec<u8> {
        PdfFixture::new()
            .page(FixturePage::new().text(72.0, 700.0, 12.0, "Systems are reliable."))
            .page(
                FixturePage::new()
                    .text(72.0, 700.0, 12.0, "Second page")
                    .annotation("Square", Rect::new(10.0, 10.0, 50.0, 50.0)),
            )
            .to_bytes()
            .expect("fixture should serialize")
    }

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(sample_pdf_bytes())).expect("open should succeed");

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 2);
        assert_eq!(engine.page_size(handle, 0).expect("size should succeed"), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }

    #[test]
    fn page_out_of_range_is_reported() {
        let mut engine = LopdfEngine::new();
        let handle = engine.open(sample_pdf_bytes().into()).expect("open should succeed");

        let err = engine.page_text(handle, 5).expect_err("page 5 does not exist");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 5, page_count: 2 }));
    }

    #[test]
    fn rejects_garbage_and_encrypted_input() {
        let mut engine = LopdfEngine::new();
        assert!(matches!(
            engine.open(b"definitely not a pdf".as_slice().into()),
            Err(PdfEngineError::Parse(_))
        ));

        let mut encrypted = sample_pdf_bytes();
        encrypted.extend_from_slice(b"\n% /Encrypt\n");
        assert!(matches!(engine.open(encrypted.into()), Err(PdfEngineError::EncryptedUnsupported)));
        assert_eq!(engine.open_documents(), 0);
    }

    #[test]
    fn rejects_documents_without_pages() {
        let bytes = PdfFixture::new().to_bytes().expect("fixture should serialize");
        let err = LopdfEngine::new().open(bytes.into()).expect_err("empty document should fail");
        assert!(matches!(err, PdfEngineError::Backend(_)));
    }

    #[test]
    fn searches_page_text() {
        let mut engine = LopdfEngine::new();
        let handle = engine.open(sample_pdf_bytes().into()).expect("open should succeed");

        assert_eq!(engine.page_text(handle, 0).expect("text").text(), "Systems are reliable.");
        assert_eq!(engine.search_page(handle, 0, "RELIABLE", false).expect("search").len(), 1);
        assert!(engine.search_page(handle, 1, "reliable", false).expect("search").is_empty());
    }

    #[test]
    fn unmodified_save_is_byte_identical() {
        let bytes = sample_pdf_bytes();
        let mut engine = LopdfEngine::new();
        let handle = engine.open(bytes.clone().into()).expect("open should succeed");

        assert_eq!(engine.save(handle).expect("save should succeed"), bytes);
    }

    #[test]
    fn added_highlight_survives_save_and_reopen() {
        let mut engine = LopdfEngine::new();
        let handle = engine.open(sample_pdf_bytes().into()).expect("open should succeed");
        let rect = engine.search_page(handle, 0, "systems", false).expect("search")[0];

        engine
            .add_highlight(handle, 0, rect, Rgb::new(1.0, 0.0, 0.0))
            .expect("highlight should be added");
        let saved = engine.save(handle).expect("save should succeed");
        engine.close(handle).expect("close should succeed");

        let reopened = engine.open(saved.into()).expect("saved output should reopen");
        let annotations = engine.annotations(reopened, 0).expect("annotations");
        assert_eq!(annotations.len(), 1);
        assert!(annotations[0].kind.is_highlight());
        let second_page = engine.annotations(reopened, 1).expect("annotations");
        assert_eq!(second_page[0].kind, AnnotationKind::Square);
    }

    #[test]
    fn scoped_document_closes_on_drop() {
        let mut engine = LopdfEngine::new();
        {
            let document =
                engine.open_scoped(sample_pdf_bytes().into()).expect("open should succeed");
            assert_eq!(document.page_count().expect("count"), 2);
        }
        assert_eq!(engine.open_documents(), 0);

        let result: Result<(), PdfEngineError> = (|| {
            let document = engine.open_scoped(sample_pdf_bytes().into())?;
            document.page_text(9)?;
            Ok(())
        })();
        assert!(result.is_err());
        assert_eq!(engine.open_documents(), 0);
    }

    #[test]
    fn close_twice_fails() {
        let mut engine = LopdfEngine::new();
        let handle = engine.open(sample_pdf_bytes().into()).expect("open should succeed");
        engine.close(handle).expect("first close succeeds");
        assert!(matches!(engine.close(handle), Err(PdfEngineError::InvalidHandle(_))));
    }

    #[test]
    fn opens_from_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("sample.pdf");
        fs::write(&path, sample_pdf_bytes()).expect("write fixture");

        let mut engine = LopdfEngine::new();
        let handle = engine.open(path.as_path().into()).expect("open from path");
        assert_eq!(engine.page_count(handle).expect("count"), 2);

        let missing = engine.open(dir.path().join("missing.pdf").into());
        assert!(matches!(missing, Err(PdfEngineError::Io(_))));
    }
}
