//! On-demand creation of the target's parent directory chain.

use crate::error::WriteError;
use crate::target::ParsedTarget;
use crate::transport::ShareHandle;
use tracing::debug;

/// Walk the target's parent segments shallow to deep, creating each missing
/// level with an existence check first.
///
/// A concurrent writer may create a level between our check and our create;
/// that race is tolerated by re-checking existence after a failed create.
/// Any other creation failure aborts the attempt with
/// [`WriteError::DirectoryCreate`].
pub async fn ensure_parent_dirs(
    handle: &dyn ShareHandle,
    target: &ParsedTarget,
) -> Result<(), WriteError> {
    let mut prefix = String::new();
    for segment in &target.parent_segments {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);

        if handle.folder_exists(&prefix).await? {
            continue;
        }
        match handle.create_dir(&prefix).await {
            Ok(()) => debug!(path = %prefix, "created directory"),
            Err(source) => {
                // Lost a create race, or a real failure.
                if handle.folder_exists(&prefix).await.unwrap_or(false) {
                    continue;
                }
                return Err(WriteError::DirectoryCreate {
                    path: prefix,
                    source,
                });
            }
        }
    }
    Ok(())
}
