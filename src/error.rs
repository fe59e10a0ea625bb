//! Error types for the splitrender library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] is **fatal**: the run cannot proceed at all (missing
//!   source document, bad delimiter pattern, unwritable output directory,
//!   renderer not installed). Returned as `Err(PipelineError)` from
//!   [`crate::run::run`].
//!
//! * [`FragmentError`] is **non-fatal**: the renderer ran for one fragment but
//!   did not succeed (non-zero exit, killed by a signal, timed out). Stored in
//!   [`crate::output::FragmentResult`] and in the failure ledger; the run
//!   carries on with the next fragment.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the splitrender library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// Source document was not found at the given path.
    #[error("Source document not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the source document.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The source document exists but is not valid UTF-8 text.
    #[error("Source document '{path}' is not valid UTF-8 text: {detail}")]
    SourceNotText { path: PathBuf, detail: String },

    /// Could not read the source document for another reason.
    #[error("Failed to read source document '{path}': {source}")]
    SourceReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Split errors ──────────────────────────────────────────────────────
    /// The delimiter pattern does not compile.
    #[error("Invalid delimiter pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// The document produced more fragments than nine digits can name.
    #[error("Document splits into {count} fragments; at most 999999999 are supported")]
    TooManyFragments { count: usize },

    /// Could not create or write a fragment file (or the split directory).
    #[error("Failed to write fragment '{path}': {source}")]
    FragmentWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Render errors ─────────────────────────────────────────────────────
    /// Could not enumerate the fragment directory.
    #[error("Failed to list fragments in '{path}': {source}")]
    FragmentListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The renderer executable could not be found or launched.
    #[error("Renderer '{program}' could not be launched: {detail}\nInstall it or pass --renderer <PATH>.")]
    RendererUnavailable { program: String, detail: String },

    /// Could not write a captured stdout/stderr artifact.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Some fragments failed to render.
    ///
    /// Returned by [`crate::output::PipelineOutput::into_result`] when the
    /// caller wants to treat any failed fragment as an error.
    #[error("{failed}/{total} fragments failed to render; see the failure ledger")]
    PartialFailure { failed: usize, total: usize },

    // ── Ledger errors ─────────────────────────────────────────────────────
    /// Could not read or append to the manifest file.
    #[error("Manifest I/O failed on '{path}': {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read or append to the failure ledger.
    #[error("Failure ledger I/O failed on '{path}': {source}")]
    FailureLedgerIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A failure record could not be encoded, or a ledger line is not one.
    #[error("Bad failure ledger record in '{path}': {source}")]
    FailureRecordInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single fragment.
///
/// The artifacts are still written so the renderer's output can be
/// inspected (empty after a timeout); whether the pair is recorded in the manifest depends on
/// [`crate::config::FailurePolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentError {
    /// The renderer exited with a non-zero status code.
    #[error("Fragment {fragment}: renderer exited with status {code}")]
    NonZeroExit { fragment: String, code: i32 },

    /// The renderer was terminated without an exit code (e.g. by a signal).
    #[error("Fragment {fragment}: renderer was terminated without an exit code")]
    Terminated { fragment: String },

    /// The renderer did not finish within the configured timeout and was killed.
    ///
    /// Output is only collected from a renderer that exits, so both artifacts
    /// of a timed-out fragment are written empty.
    #[error("Fragment {fragment}: renderer timed out after {secs}s")]
    Timeout { fragment: String, secs: u64 },
}

impl FragmentError {
    /// Exit code reported by the renderer, if there was one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            FragmentError::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_not_found_display() {
        let e = PipelineError::SourceNotFound {
            path: PathBuf::from("/tmp/missing.org"),
        };
        assert!(e.to_string().contains("/tmp/missing.org"));
    }

    #[test]
    fn invalid_pattern_display() {
        let e = PipelineError::InvalidPattern {
            pattern: "(".into(),
            detail: "unclosed group".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("'('"), "got: {msg}");
        assert!(msg.contains("unclosed group"));
    }

    #[test]
    fn renderer_unavailable_display() {
        let e = PipelineError::RendererUnavailable {
            program: "go-org".into(),
            detail: "not found on PATH".into(),
        };
        assert!(e.to_string().contains("go-org"));
        assert!(e.to_string().contains("--renderer"));
    }

    #[test]
    fn fragment_error_exit_code() {
        let e = FragmentError::NonZeroExit {
            fragment: "000000003".into(),
            code: 2,
        };
        assert_eq!(e.exit_code(), Some(2));
        assert!(e.to_string().contains("status 2"));

        let t = FragmentError::Timeout {
            fragment: "000000003".into(),
            secs: 5,
        };
        assert_eq!(t.exit_code(), None);
        assert!(t.to_string().contains("5s"));
    }

    #[test]
    fn failure_ledger_io_keeps_source_chain() {
        use std::error::Error as _;

        let e = PipelineError::FailureLedgerIo {
            path: PathBuf::from("out/failed_files.ndjson"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        let source = e.source().expect("io source");
        assert!(source.to_string().contains("read-only"));
    }

    #[test]
    fn fragment_error_serialises_with_kind_tag() {
        let e = FragmentError::Terminated {
            fragment: "000000001".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"kind\":\"terminated\""), "got: {json}");
    }
}
