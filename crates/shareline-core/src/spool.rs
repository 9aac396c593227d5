//! Offline spool for records that could not be delivered.
//!
//! One JSON file per entry, named `<millis>-<seq>.json` with zero padding,
//! so lexicographic order is arrival order. Entries hold only the target
//! URL, the record line, and when they were queued. Credentials are never
//! spooled; the drainer supplies them at flush time.

use crate::error::WriteError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Hours after which an undelivered record is dropped at read time.
pub const EXPIRY_HOURS: i64 = 72;

#[derive(Error, Debug)]
pub enum SpoolError {
    #[error("spool io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("spool entry {path} could not be serialized: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One queued record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpoolEntry {
    /// When the record was queued, RFC 3339.
    pub queued_at: String,
    pub url: String,
    pub line: String,
}

/// Delivery summary for one drain pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DrainStatus {
    pub delivered: usize,
    pub remaining: usize,
}

/// Directory-backed FIFO of spooled records.
#[derive(Debug, Clone)]
pub struct Spool {
    dir: PathBuf,
}

impl Spool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Queue one record for later delivery.
    pub async fn enqueue(&self, url: &str, line: &str) -> Result<PathBuf, SpoolError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err(&self.dir, e))?;
        let entry = SpoolEntry {
            queued_at: chrono::Utc::now().to_rfc3339(),
            url: url.to_string(),
            line: line.to_string(),
        };
        let path = self.dir.join(next_name());
        let body = serde_json::to_vec_pretty(&entry).map_err(|e| json_err(&path, e))?;
        fs::write(&path, body).await.map_err(|e| io_err(&path, e))?;
        debug!(path = %path.display(), "record spooled");
        Ok(path)
    }

    /// Undelivered entries in arrival order.
    ///
    /// Entries older than [`EXPIRY_HOURS`] are purged here rather than
    /// delivered; an entry whose timestamp cannot be parsed counts as
    /// expired. Unparseable entry files are skipped with a warning and left
    /// in place for inspection.
    pub async fn pending(&self) -> Result<Vec<(PathBuf, SpoolEntry)>, SpoolError> {
        let mut paths = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&self.dir, e)),
        };
        while let Some(ent) = dir.next_entry().await.map_err(|e| io_err(&self.dir, e))? {
            let path = ent.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let cutoff = chrono::Utc::now() - chrono::Duration::hours(EXPIRY_HOURS);
        let mut entries = Vec::new();
        for path in paths {
            let body = fs::read(&path).await.map_err(|e| io_err(&path, e))?;
            let entry: SpoolEntry = match serde_json::from_slice(&body) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable spool entry");
                    continue;
                }
            };
            if is_expired(&entry, cutoff) {
                warn!(path = %path.display(), queued_at = %entry.queued_at, "dropping expired record");
                if let Err(e) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "expired entry could not be removed");
                }
                continue;
            }
            entries.push((path, entry));
        }
        Ok(entries)
    }

    /// Deliver pending entries in order through `send`.
    ///
    /// Stops at the first delivery failure so arrival order is preserved
    /// for the next pass; delivered entries are removed as they go.
    pub async fn drain<F, Fut>(&self, mut send: F) -> Result<DrainStatus, SpoolError>
    where
        F: FnMut(SpoolEntry) -> Fut,
        Fut: std::future::Future<Output = Result<(), WriteError>>,
    {
        let pending = self.pending().await?;
        let total = pending.len();
        let mut delivered = 0usize;
        for (path, entry) in pending {
            match send(entry).await {
                Ok(()) => {
                    if let Err(e) = fs::remove_file(&path).await {
                        warn!(path = %path.display(), error = %e, "delivered entry could not be removed");
                    }
                    delivered += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "drain stopped at first failure");
                    break;
                }
            }
        }
        Ok(DrainStatus {
            delivered,
            remaining: total - delivered,
        })
    }
}

fn is_expired(entry: &SpoolEntry, cutoff: chrono::DateTime<chrono::Utc>) -> bool {
    match chrono::DateTime::parse_from_rfc3339(&entry.queued_at) {
        Ok(t) => t.with_timezone(&chrono::Utc) < cutoff,
        Err(_) => true,
    }
}

fn next_name() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{:020}-{seq:06}.json", chrono::Utc::now().timestamp_millis())
}

fn io_err(path: &Path, source: std::io::Error) -> SpoolError {
    SpoolError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn json_err(path: &Path, source: serde_json::Error) -> SpoolError {
    SpoolError::Json {
        path: path.to_path_buf(),
        source,
    }
}
