//! Spreadsheet-mode payload rebuilding.

use super::line::CSV_HEADER;
use crate::request::SpreadsheetSpec;
use crate::workbook::{WorkbookCodec, WorkbookDoc, WorkbookError};
use tracing::warn;

/// Sheet created when the workbook has none.
pub const SHEET_NAME: &str = "checkins";

/// Rebuild the workbook with `line` appended as a row of cells.
///
/// The record line is split on commas, one cell per field, and lands on the
/// first sheet directly after its last row. A target with no decodable
/// workbook (missing, empty, or corrupt) starts fresh: one sheet named
/// [`SHEET_NAME`] whose first row is the record header.
pub fn append_record(
    existing: Option<&[u8]>,
    line: &str,
    spec: &SpreadsheetSpec,
    codec: &dyn WorkbookCodec,
) -> Result<Vec<u8>, WorkbookError> {
    let mut doc = match existing {
        Some(bytes) => match codec.decode(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "existing workbook is unreadable, starting fresh");
                WorkbookDoc::default()
            }
        },
        None => WorkbookDoc::default(),
    };

    if doc.sheet_count() == 0 {
        doc.create_sheet(SHEET_NAME).append_row(CSV_HEADER.split(','));
    }
    if let Some(sheet) = doc.sheet_mut(0) {
        sheet.append_row(line.split(','));
    }

    if spec.password.is_some() || spec.protect {
        codec.encode_protected(&doc, spec.password.as_deref())
    } else {
        codec.encode(&doc)
    }
}
