//! XLSX codec over calamine (decode) and rust_xlsxwriter (encode).

use super::{SheetDoc, WorkbookCodec, WorkbookDoc, WorkbookError};
use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::io::Cursor;

/// Codec for Office Open XML workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxCodec;

impl XlsxCodec {
    pub fn new() -> Self {
        Self
    }

    fn write(
        &self,
        doc: &WorkbookDoc,
        protection: Option<Option<&str>>,
    ) -> Result<Vec<u8>, WorkbookError> {
        let mut workbook = Workbook::new();
        for sheet in &doc.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name).map_err(encode_err)?;
            for (row, cells) in sheet.rows.iter().enumerate() {
                for (col, value) in cells.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    worksheet
                        .write_string(row as u32, col as u16, value)
                        .map_err(encode_err)?;
                }
            }
            match protection {
                None => {}
                Some(None) => {
                    worksheet.protect();
                }
                Some(Some(password)) => {
                    worksheet.protect_with_password(password);
                }
            }
        }
        workbook.save_to_buffer().map_err(encode_err)
    }
}

impl WorkbookCodec for XlsxCodec {
    fn decode(&self, bytes: &[u8]) -> Result<WorkbookDoc, WorkbookError> {
        let mut book = Xlsx::new(Cursor::new(bytes.to_vec())).map_err(decode_err)?;
        let mut doc = WorkbookDoc::default();
        let names = book.sheet_names().to_vec();
        for name in names {
            let range = book.worksheet_range(&name).map_err(decode_err)?;
            let sheet = doc.create_sheet(name);
            populate(sheet, &range);
        }
        Ok(doc)
    }

    fn encode(&self, doc: &WorkbookDoc) -> Result<Vec<u8>, WorkbookError> {
        self.write(doc, None)
    }

    fn encode_protected(
        &self,
        doc: &WorkbookDoc,
        password: Option<&str>,
    ) -> Result<Vec<u8>, WorkbookError> {
        self.write(doc, Some(password))
    }
}

fn populate(sheet: &mut SheetDoc, range: &calamine::Range<Data>) {
    let (start_row, start_col) = match range.start() {
        Some(start) => (start.0 as usize, start.1 as usize),
        None => return,
    };
    for (row, col, cell) in range.cells() {
        let text = cell_text(cell);
        if text.is_empty() {
            continue;
        }
        sheet.set_cell(start_row + row, start_col + col, text);
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn decode_err(e: calamine::XlsxError) -> WorkbookError {
    WorkbookError::Decode {
        message: e.to_string(),
    }
}

fn encode_err(e: rust_xlsxwriter::XlsxError) -> WorkbookError {
    WorkbookError::Encode {
        message: e.to_string(),
    }
}
