//! In-memory workbook model and the codec seam for spreadsheet targets.
//!
//! Spreadsheet appends are full rewrites: decode the existing container into
//! a [`WorkbookDoc`], mutate it, serialize the whole thing back. The model is
//! deliberately small: ordered sheets of dense string cells, which is all the
//! record format needs.

pub mod xlsx;

pub use xlsx::XlsxCodec;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkbookError {
    /// The container bytes could not be parsed as a workbook.
    #[error("workbook decode failed: {message}")]
    Decode { message: String },

    /// The rebuilt workbook could not be serialized.
    #[error("workbook encode failed: {message}")]
    Encode { message: String },
}

/// An ordered collection of sheets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookDoc {
    pub sheets: Vec<SheetDoc>,
}

impl WorkbookDoc {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Append an empty sheet and return it for population.
    pub fn create_sheet(&mut self, name: impl Into<String>) -> &mut SheetDoc {
        self.sheets.push(SheetDoc {
            name: name.into(),
            rows: Vec::new(),
        });
        let end = self.sheets.len() - 1;
        &mut self.sheets[end]
    }

    pub fn sheet(&self, index: usize) -> Option<&SheetDoc> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut SheetDoc> {
        self.sheets.get_mut(index)
    }
}

/// One sheet: a name and dense rows of string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetDoc {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl SheetDoc {
    /// Append a row after the current last row.
    pub fn append_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Set one cell, growing the grid with empty cells as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.into();
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Serialization seam between the workbook model and a container format.
///
/// Implementations are synchronous; the payload builder runs them on a
/// blocking task.
pub trait WorkbookCodec: Send + Sync {
    /// Parse container bytes into the model.
    fn decode(&self, bytes: &[u8]) -> Result<WorkbookDoc, WorkbookError>;

    /// Serialize the model without protection.
    fn encode(&self, doc: &WorkbookDoc) -> Result<Vec<u8>, WorkbookError>;

    /// Serialize with sheet protection, password-backed when one is given.
    fn encode_protected(
        &self,
        doc: &WorkbookDoc,
        password: Option<&str>,
    ) -> Result<Vec<u8>, WorkbookError>;
}
