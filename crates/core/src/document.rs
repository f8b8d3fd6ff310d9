//! Opening documents and making sure they are released again.

use pdf_engine::{DocumentHandle, OpenSource, PdfEngine, PdfEngineError};
use std::path::Path;

/// Open `path`, optionally repairing it. A document that fails to repair is
/// closed before the error is returned.
pub fn open_document<E: PdfEngine + ?Sized>(
    engine: &mut E,
    path: &Path,
    repair: bool,
) -> Result<DocumentHandle, PdfEngineError> {
    let handle = engine.open(OpenSource::from(path))?;

    if repair {
        if let Err(err) = engine.repair(handle) {
            release(engine, handle);
            return Err(err);
        }
    }

    tracing::debug!(path = %path.display(), handle = handle.raw(), "opened document");
    Ok(handle)
}

/// Run `f` on an open document and close it afterwards, whatever `f`
/// returned. A close failure is reported only when `f` itself succeeded.
pub fn with_document<E, T, Err, F>(engine: &mut E, handle: DocumentHandle, f: F) -> Result<T, Err>
where
    E: PdfEngine + ?Sized,
    Err: From<PdfEngineError>,
    F: FnOnce(&mut E, DocumentHandle) -> Result<T, Err>,
{
    let result = f(engine, handle);

    match (result, engine.close(handle)) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err.into()),
        (Err(err), close) => {
            if let Err(close_err) = close {
                tracing::warn!(%close_err, "failed to close document after error");
            }
            Err(err)
        }
    }
}

fn release<E: PdfEngine + ?Sized>(engine: &mut E, handle: DocumentHandle) {
    if let Err(err) = engine.close(handle) {
        tracing::warn!(%err, handle = handle.raw(), "failed to close document");
    }
}
