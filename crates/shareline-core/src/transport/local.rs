//! Transport adapter for shares the operating system has already mounted.
//!
//! The mount root directory stands in for the host and each share is a
//! subdirectory below it, so `smb://host/share/dir/f.csv` maps to
//! `<root>/share/dir/f.csv`. Authentication is a formality here: the OS
//! session that produced the mount already carries the credentials.

use super::{CreateDisposition, Result, ShareClient, ShareConnection, ShareHandle, TransportError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Client for OS-mounted share roots.
#[derive(Debug, Clone)]
pub struct LocalShareClient {
    root: PathBuf,
}

impl LocalShareClient {
    /// Create a client over `root`, the directory where shares are mounted.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ShareClient for LocalShareClient {
    async fn connect(&self, host: &str) -> Result<Box<dyn ShareConnection>> {
        let meta = fs::metadata(&self.root)
            .await
            .map_err(|e| TransportError::ConnectionFailed {
                message: format!("mount root {} unavailable: {e}", self.root.display()),
            })?;
        if !meta.is_dir() {
            return Err(TransportError::ConnectionFailed {
                message: format!("mount root {} is not a directory", self.root.display()),
            });
        }
        debug!(host, root = %self.root.display(), "opened mounted share root");
        Ok(Box::new(LocalConnection {
            root: self.root.clone(),
            authenticated: false,
            open: true,
        }))
    }
}

#[derive(Debug)]
struct LocalConnection {
    root: PathBuf,
    authenticated: bool,
    open: bool,
}

#[async_trait]
impl ShareConnection for LocalConnection {
    async fn authenticate(&mut self, principal: &str, _secret: &str) -> Result<()> {
        if !self.open {
            return Err(TransportError::ConnectionFailed {
                message: "connection is closed".to_string(),
            });
        }
        // The mount session already holds the real credentials.
        debug!(principal, "reusing mounted-share session credentials");
        self.authenticated = true;
        Ok(())
    }

    async fn open_share(&mut self, share: &str) -> Result<Box<dyn ShareHandle>> {
        if !self.open {
            return Err(TransportError::ConnectionFailed {
                message: "connection is closed".to_string(),
            });
        }
        if !self.authenticated {
            return Err(TransportError::AuthenticationFailed {
                message: "authenticate before opening a share".to_string(),
            });
        }
        let base = self.root.join(share);
        match fs::metadata(&base).await {
            Ok(meta) if meta.is_dir() => Ok(Box::new(LocalShareHandle { base })),
            Ok(_) => Err(TransportError::ShareUnavailable {
                message: format!("{share} is not a directory under the mount root"),
            }),
            Err(e) => Err(TransportError::ShareUnavailable {
                message: format!("{share}: {e}"),
            }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        self.authenticated = false;
        Ok(())
    }
}

#[derive(Debug)]
struct LocalShareHandle {
    base: PathBuf,
}

impl LocalShareHandle {
    fn resolve(&self, path: &str) -> PathBuf {
        self.base.join(path)
    }
}

fn io_err(path: &str, source: std::io::Error) -> TransportError {
    TransportError::Io {
        path: path.to_string(),
        source,
    }
}

#[async_trait]
impl ShareHandle for LocalShareHandle {
    async fn file_exists(&self, path: &str) -> Result<bool> {
        match fs::metadata(self.resolve(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(path, e)),
        }
    }

    async fn folder_exists(&self, path: &str) -> Result<bool> {
        match fs::metadata(self.resolve(path)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(path, e)),
        }
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        fs::create_dir(self.resolve(path))
            .await
            .map_err(|e| io_err(path, e))
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(path)).await.map_err(|e| io_err(path, e))
    }

    async fn write_file(
        &self,
        path: &str,
        disposition: CreateDisposition,
        bytes: &[u8],
    ) -> Result<()> {
        let full = self.resolve(path);
        match disposition {
            CreateDisposition::CreateAlways => {
                fs::write(&full, bytes).await.map_err(|e| io_err(path, e))
            }
            CreateDisposition::CreateIfMissing | CreateDisposition::OpenExisting => {
                // Write from offset zero without truncating an existing tail,
                // matching the open-if/open dispositions of the protocol.
                let mut opts = fs::OpenOptions::new();
                opts.write(true);
                opts.create(matches!(disposition, CreateDisposition::CreateIfMissing));
                let mut file = opts.open(&full).await.map_err(|e| io_err(path, e))?;
                file.write_all(bytes).await.map_err(|e| io_err(path, e))?;
                file.flush().await.map_err(|e| io_err(path, e))
            }
        }
    }

    async fn append_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.resolve(path))
            .await
            .map_err(|e| io_err(path, e))?;
        file.write_all(bytes).await.map_err(|e| io_err(path, e))?;
        file.flush().await.map_err(|e| io_err(path, e))
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        fs::remove_file(self.resolve(path))
            .await
            .map_err(|e| io_err(path, e))
    }
}
