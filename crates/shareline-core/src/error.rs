//! Error taxonomy for the write engine.

use crate::crypto::CryptoError;
use crate::transport::TransportError;
use crate::workbook::WorkbookError;
use thiserror::Error;

/// Errors that can occur while appending a record to a remote target.
///
/// Everything except [`WriteError::MissingUrlOrLine`] and
/// [`WriteError::InvalidTarget`] is retryable: the orchestrator reruns the
/// whole attempt (re-locate, re-ensure directories, re-build payload,
/// re-write) rather than resuming mid-attempt.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The inbound call had no target URL or no record line. Rejected
    /// synchronously, before any worker is spawned.
    #[error("missing url or line")]
    MissingUrlOrLine,

    /// The target URL could not be decomposed into host/share/path.
    #[error("invalid target {url}: {reason}")]
    InvalidTarget { url: String, reason: String },

    /// A parent directory could not be created for a non-existence reason.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        path: String,
        source: TransportError,
    },

    /// Transport I/O failure during read, write, or delete.
    #[error("write failed: {0}")]
    Transport(#[from] TransportError),

    /// Key or cipher failure. Never falls back to writing plaintext.
    #[error("encryption failed: {0}")]
    Encryption(#[from] CryptoError),

    /// The rebuilt workbook could not be serialized.
    #[error("workbook rebuild failed: {0}")]
    Workbook(#[from] WorkbookError),

    /// The request's worker terminated without reporting an outcome.
    #[error("write worker terminated unexpectedly")]
    WorkerLost,
}

impl WriteError {
    /// Whether the retry orchestrator should run another attempt after this
    /// error. Malformed targets are surfaced immediately; everything else is
    /// classified as retryable at the single-attempt boundary.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            WriteError::MissingUrlOrLine | WriteError::InvalidTarget { .. }
        )
    }
}
