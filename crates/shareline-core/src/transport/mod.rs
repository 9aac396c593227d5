//! Transport seam for remote file shares.
//!
//! Mirrors the primitives an SMB-protocol client exposes: connect to a host,
//! authenticate a session, open a named share, then operate on paths below
//! the share root. A real protocol client stays an external collaborator;
//! the engine only ever sees these traits. Implementations here are
//! [`local::LocalShareClient`] for OS-mounted shares and
//! [`mock::MockShareClient`] for tests.

use async_trait::async_trait;

pub mod local;
pub mod mock;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport errors. The engine treats all of these as retryable.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not reach the host.
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Credentials were rejected.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The named share could not be opened.
    #[error("share unavailable: {message}")]
    ShareUnavailable { message: String },

    /// A remote operation failed.
    #[error("remote operation failed on {path}: {message}")]
    Remote { path: String, message: String },

    /// Local I/O error while servicing a share operation.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// How `write_file` treats an existing object, matching the dispositions the
/// underlying protocol offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateDisposition {
    /// Open if present, create if not. Content is written from offset zero
    /// without truncating an existing tail.
    CreateIfMissing,
    /// Create, replacing any existing object.
    CreateAlways,
    /// Open only; fail if the object does not exist.
    OpenExisting,
}

/// Entry point: produces one connection per call.
///
/// Implementations must be thread-safe; a client is shared across concurrent
/// write workers, but each worker attempt opens and closes its own
/// connection.
#[async_trait]
pub trait ShareClient: Send + Sync {
    /// Establish a fresh connection to the host.
    async fn connect(&self, host: &str) -> Result<Box<dyn ShareConnection>>;
}

/// One authenticated session in the making. Owned exclusively by a single
/// retry attempt and closed on every exit path of that attempt.
#[async_trait]
pub trait ShareConnection: Send + std::fmt::Debug {
    /// Authenticate the session.
    async fn authenticate(&mut self, principal: &str, secret: &str) -> Result<()>;

    /// Open a named share on the authenticated session.
    async fn open_share(&mut self, share: &str) -> Result<Box<dyn ShareHandle>>;

    /// Tear the connection down. Failures are non-fatal to the attempt's
    /// outcome but must leave the connection unusable.
    async fn close(&mut self) -> Result<()>;
}

/// Operations on paths below one share's root. Paths are `/`-separated and
/// share-relative.
#[async_trait]
pub trait ShareHandle: Send + Sync + std::fmt::Debug {
    async fn file_exists(&self, path: &str) -> Result<bool>;

    async fn folder_exists(&self, path: &str) -> Result<bool>;

    /// Create a single directory level. The parent must already exist.
    async fn create_dir(&self, path: &str) -> Result<()>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Write `bytes` as the object's content under the given disposition.
    async fn write_file(
        &self,
        path: &str,
        disposition: CreateDisposition,
        bytes: &[u8],
    ) -> Result<()>;

    /// Append `bytes`, creating the object when missing.
    async fn append_file(&self, path: &str, bytes: &[u8]) -> Result<()>;

    async fn remove_file(&self, path: &str) -> Result<()>;
}
