use crate::AnnotationKind;

/// Per-annotation failures.
///
/// None of these abort a batch: callers count the annotation as failed (or
/// downgrade it) and carry on with the next one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnnotationError {
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),
    #[error("{kind} annotation has no geometry")]
    EmptyGeometry { kind: AnnotationKind },
    #[error("unsupported annotation kind: {0}")]
    UnsupportedKind(String),
}

impl AnnotationError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedGeometry(detail.into())
    }
}

pub type AnnotationResult<T> = Result<T, AnnotationError>;
