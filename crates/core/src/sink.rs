//! Where translated records end up.

use crate::translate::translate;
use annotmerge_model::{AnnotationError, AnnotationRecord};
use lopdf::ObjectId;
use pdf_engine::{DocumentHandle, PdfEngine, PdfEngineError};

/// Why a single record could not be re-created. Never fatal for a batch.
#[derive(Debug, thiserror::Error)]
pub enum RecreateError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
}

/// Target that re-creates records as native annotations.
pub trait AnnotationSink {
    fn recreate(&mut self, record: &AnnotationRecord) -> Result<(), RecreateError>;
}

/// Appends translated records to the pages of an open document.
pub struct DocumentSink<'a, E: PdfEngine + ?Sized> {
    engine: &'a mut E,
    handle: DocumentHandle,
}

impl<'a, E: PdfEngine + ?Sized> DocumentSink<'a, E> {
    pub fn new(engine: &'a mut E, handle: DocumentHandle) -> Self {
        Self { engine, handle }
    }

    /// Translate against the record's page height and append. A page index
    /// past the end of the document is an engine error.
    pub fn append(&mut self, record: &AnnotationRecord) -> Result<ObjectId, RecreateError> {
        let page_height = self.engine.page_height(self.handle, record.page())?;
        let dict = translate(record, page_height)?;
        Ok(self.engine.append_annotation(self.handle, record.page(), dict)?)
    }
}

impl<E: PdfEngine + ?Sized> AnnotationSink for DocumentSink<'_, E> {
    fn recreate(&mut self, record: &AnnotationRecord) -> Result<(), RecreateError> {
        let id = self.append(record)?;
        tracing::debug!(page = record.page() + 1, kind = %record.kind(), ?id, "created annotation");
        Ok(())
    }
}
