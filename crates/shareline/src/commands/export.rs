//! Export command implementation

use anyhow::{Context, Result};
use clap::Args;
use shareline_core::workbook::{WorkbookCodec, WorkbookDoc, XlsxCodec};
use std::path::PathBuf;

/// Render a workbook's rows as CSV
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Workbook file to export
    input: PathBuf,

    /// Where to write the CSV (stdout when omitted)
    output: Option<PathBuf>,
}

/// Execute the export command
pub async fn execute(args: ExportArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let doc = tokio::task::spawn_blocking(move || XlsxCodec::new().decode(&bytes))
        .await?
        .with_context(|| format!("{} is not a readable workbook", args.input.display()))?;
    let csv = render_csv(&doc)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, csv)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported {} -> {}", args.input.display(), path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

/// CSV rendering of the first sheet: every cell double-quoted with embedded
/// quotes doubled, empty rows skipped.
fn render_csv(doc: &WorkbookDoc) -> Result<String> {
    let sheet = doc
        .sheet(0)
        .ok_or_else(|| anyhow::anyhow!("workbook has no sheets"))?;
    let mut out = String::new();
    for row in &sheet.rows {
        if row.iter().all(String::is_empty) {
            continue;
        }
        let quoted: Vec<String> = row.iter().map(|cell| quote(cell)).collect();
        out.push_str(&quoted.join(","));
        out.push('\n');
    }
    Ok(out)
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_cell_is_quoted_and_inner_quotes_doubled() {
        let mut doc = WorkbookDoc::default();
        let sheet = doc.create_sheet("checkins");
        sheet.append_row(["created_at", "nombre", "motivo"]);
        sheet.append_row(["2024-03-01", "Ana \"Ani\" L", "visita"]);

        let csv = render_csv(&doc).unwrap();
        assert_eq!(
            csv,
            "\"created_at\",\"nombre\",\"motivo\"\n\
             \"2024-03-01\",\"Ana \"\"Ani\"\" L\",\"visita\"\n"
        );
    }

    #[test]
    fn empty_rows_are_skipped() {
        let mut doc = WorkbookDoc::default();
        let sheet = doc.create_sheet("checkins");
        sheet.append_row(["a"]);
        sheet.set_cell(2, 0, "c");

        let csv = render_csv(&doc).unwrap();
        assert_eq!(csv, "\"a\"\n\"c\"\n");
    }

    #[test]
    fn sheetless_workbook_is_an_error() {
        let err = render_csv(&WorkbookDoc::default()).unwrap_err();
        assert!(err.to_string().contains("no sheets"));
    }
}
