//! Source input: read the whole source document into memory.
//!
//! The document is read exactly once, before anything is written, so a
//! missing or unreadable file fails the run with a typed error and leaves the
//! output directory untouched.

use crate::error::PipelineError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read the source document at `path` as UTF-8 text.
pub async fn read_source(path: &Path) -> Result<String, PipelineError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => PipelineError::SourceNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => PipelineError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PipelineError::SourceReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let text = String::from_utf8(bytes).map_err(|e| PipelineError::SourceNotText {
        path: path.to_path_buf(),
        detail: e.utf8_error().to_string(),
    })?;

    debug!("Read source document {} ({} bytes)", path.display(), text.len());
    Ok(text)
}
