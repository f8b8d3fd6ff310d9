//! Importing foreign annotation descriptions into a document.

use crate::config::{Settings, DEFAULT_PREVIEW_CHARS};
use crate::document::{open_document, with_document};
use crate::sink::DocumentSink;
use crate::xfdf::{read_xfdf, InterchangeError};
use annotmerge_model::AnnotationRecord;
use pdf_engine::{DocumentHandle, PdfEngine, PdfEngineError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot read {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },
    #[error(transparent)]
    Interchange(#[from] InterchangeError),
    #[error("invalid annotation list {path}: {source}")]
    Records {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Records the translator or the document rejected
    pub failed: usize,
    /// Records addressed to pages the document does not have
    pub skipped: usize,
}

/// Append `records` to an open document, page by page in ascending order.
pub fn import_records<E: PdfEngine + ?Sized>(
    engine: &mut E,
    handle: DocumentHandle,
    records: &[AnnotationRecord],
) -> Result<ImportReport, PdfEngineError> {
    let page_count = engine.page_count(handle)?;

    let mut by_page: BTreeMap<u32, Vec<&AnnotationRecord>> = BTreeMap::new();
    for record in records {
        by_page.entry(record.page()).or_default().push(record);
    }

    let mut report = ImportReport::default();
    let mut sink = DocumentSink::new(engine, handle);

    for (page, page_records) in by_page {
        if page >= page_count {
            tracing::warn!(
                page = page + 1,
                page_count,
                annotations = page_records.len(),
                "page does not exist, skipping annotations"
            );
            report.skipped += page_records.len();
            continue;
        }

        for record in page_records {
            match sink.append(record) {
                Ok(id) => {
                    tracing::debug!(page = page + 1, kind = %record.kind(), ?id, "imported");
                    report.imported += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        page = page + 1,
                        kind = %record.kind(),
                        preview = %record.content_preview(DEFAULT_PREVIEW_CHARS),
                        %err,
                        "failed to import annotation"
                    );
                    report.failed += 1;
                }
            }
        }
    }

    Ok(report)
}

/// Import the annotations of an XFDF file into `pdf` and write `output`.
pub fn import_xfdf_file<E: PdfEngine + ?Sized>(
    engine: &mut E,
    pdf: &Path,
    xfdf: &Path,
    output: &Path,
    settings: &Settings,
) -> Result<ImportReport, ImportError> {
    let doc = read_xfdf(xfdf)?;
    if let Some(source) = &doc.source {
        tracing::debug!(%source, target = %pdf.display(), "XFDF refers to source document");
    }
    tracing::info!(file = %xfdf.display(), annotations = doc.records.len(), "parsed XFDF");

    import_records_file(engine, pdf, &doc.records, output, settings)
}

/// Import an in-memory record list into `pdf` and write `output`.
///
/// With nothing to import the input is copied to the output unchanged.
pub fn import_records_file<E: PdfEngine + ?Sized>(
    engine: &mut E,
    pdf: &Path,
    records: &[AnnotationRecord],
    output: &Path,
    settings: &Settings,
) -> Result<ImportReport, ImportError> {
    if records.is_empty() {
        copy_unchanged(pdf, output)?;
        tracing::info!(output = %output.display(), "no annotations to import, copied input");
        return Ok(ImportReport::default());
    }

    let handle = open_document(engine, pdf, settings.repair_inputs)
        .map_err(|source| ImportError::Open { path: pdf.to_path_buf(), source })?;

    with_document(engine, handle, |engine, handle| {
        let report = import_records(engine, handle, records)?;
        engine
            .save(handle, output, settings.save_options())
            .map_err(|source| ImportError::Save { path: output.to_path_buf(), source })?;

        tracing::info!(
            output = %output.display(),
            imported = report.imported,
            failed = report.failed,
            skipped = report.skipped,
            "saved document"
        );
        Ok(report)
    })
}

/// Read a JSON array of records.
pub fn load_records(path: &Path) -> Result<Vec<AnnotationRecord>, ImportError> {
    let bytes =
        fs::read(path).map_err(|source| ImportError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&bytes)
        .map_err(|source| ImportError::Records { path: path.to_path_buf(), source })
}

fn copy_unchanged(input: &Path, output: &Path) -> Result<(), ImportError> {
    let same_file = matches!(
        (fs::canonicalize(input), fs::canonicalize(output)),
        (Ok(input), Ok(output)) if input == output
    );
    if !same_file {
        fs::copy(input, output)
            .map_err(|source| ImportError::Io { path: input.to_path_buf(), source })?;
    }
    Ok(())
}
