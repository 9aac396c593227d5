//! Target object writing: temp-and-swap replacement or in-place append.

use crate::error::WriteError;
use crate::payload::Payload;
use crate::target::ParsedTarget;
use crate::transport::{CreateDisposition, ShareHandle};
use tracing::debug;

/// Write `payload` to the target.
///
/// A [`Payload::Append`] delta goes straight onto the object's tail,
/// creating it when missing; concurrent readers may observe a partial write.
///
/// A [`Payload::Replace`] image already contains every record the target
/// should hold. In atomic mode it lands in a temp sibling first, then swaps:
/// remove any pre-existing target, copy the temp object's bytes into a newly
/// created target, remove the temp. A failure between the swap steps can
/// strand a temp object; the next attempt uses a fresh temp name and never
/// trips over it. In non-atomic mode the image is written directly over the
/// target without the temp stage.
pub(crate) async fn write_payload(
    handle: &dyn ShareHandle,
    target: &ParsedTarget,
    payload: &Payload,
    atomic: bool,
) -> Result<(), WriteError> {
    let image = match payload {
        Payload::Append(delta) => {
            handle.append_file(&target.relative_path, delta).await?;
            return Ok(());
        }
        Payload::Replace(image) => image,
    };

    if !atomic {
        handle
            .write_file(&target.relative_path, CreateDisposition::CreateAlways, image)
            .await?;
        return Ok(());
    }

    let temp_path = temp_sibling(target, chrono::Utc::now().timestamp_millis());
    handle
        .write_file(&temp_path, CreateDisposition::CreateAlways, image)
        .await?;

    // The copy is taken from the share, not from memory, so the swap only
    // proceeds with bytes the share durably accepted.
    let staged = handle.read_file(&temp_path).await?;
    if handle.file_exists(&target.relative_path).await? {
        handle.remove_file(&target.relative_path).await?;
    }
    handle
        .write_file(&target.relative_path, CreateDisposition::CreateAlways, &staged)
        .await?;
    handle.remove_file(&temp_path).await?;
    debug!(path = %target.relative_path, bytes = image.len(), "target swapped");
    Ok(())
}

/// Temp object name beside the target: `<leaf>.tmp<millis>`.
fn temp_sibling(target: &ParsedTarget, millis: i64) -> String {
    let name = format!("{}.tmp{millis}", target.leaf_name);
    let parent = target.parent_path();
    if parent.is_empty() {
        name
    } else {
        format!("{parent}/{name}")
    }
}
