//! Annotation merge and import core
//!
//! Extraction, translation, merging and XFDF import on top of the
//! `pdf-engine` document store.

pub mod config;
pub mod document;
pub mod extract;
pub mod import;
pub mod merge;
pub mod sink;
pub mod translate;
pub mod xfdf;

pub use config::{ConfigError, Settings, DEFAULT_PREVIEW_CHARS};
pub use document::{open_document, with_document};
pub use extract::{extract_document, extract_page, record_from_dictionary};
pub use import::{
    import_records, import_records_file, import_xfdf_file, load_records, ImportError,
    ImportReport,
};
pub use merge::{
    merge, merge_candidate, merge_files, CandidateOutcome, MergeError, MergeRun, MergeStats,
    SeenFingerprints,
};
pub use sink::{AnnotationSink, DocumentSink, RecreateError};
pub use translate::{pdf_date, translate, translate_at};
pub use xfdf::{parse_xfdf, read_xfdf, InterchangeError, XfdfDocument};
