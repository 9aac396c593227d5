//! Access audit log kept next to each target.

use crate::target::ParsedTarget;
use crate::transport::{CreateDisposition, ShareHandle, TransportError};
use tracing::warn;

/// Name of the audit log object in the target's directory.
pub const AUDIT_LOG_NAME: &str = "audit_access_log.csv";

/// Header row of a fresh audit log.
pub const AUDIT_HEADER: &str = "timestamp,name,motivo";

/// Path of the audit log sitting next to `target`.
pub fn log_path(target: &ParsedTarget) -> String {
    let parent = target.parent_path();
    if parent.is_empty() {
        AUDIT_LOG_NAME.to_string()
    } else {
        format!("{parent}/{AUDIT_LOG_NAME}")
    }
}

/// Make sure the audit log exists, creating it with its header row on first
/// use.
///
/// Runs after a successful write. Audit trouble never fails the write that
/// triggered it: errors are logged and swallowed.
pub async fn ensure_log(handle: &dyn ShareHandle, target: &ParsedTarget) {
    let path = log_path(target);
    let outcome: Result<(), TransportError> = async {
        if handle.file_exists(&path).await? {
            return Ok(());
        }
        let header = format!("{AUDIT_HEADER}\n");
        handle
            .write_file(&path, CreateDisposition::CreateIfMissing, header.as_bytes())
            .await
    }
    .await;
    if let Err(e) = outcome {
        warn!(%path, error = %e, "audit log update failed");
    }
}
