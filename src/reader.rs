//! Loads a survey export (`.xlsx`) into the in-memory grid model.

use std::path::Path;

use calamine::{Data, Dimensions, Reader, Xlsx, open_workbook};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::grid::{CellRange, CellValue, Workbook, Worksheet};

/// Converts one calamine cell. Dates stay serial numbers; the formatter
/// decides what they mean.
fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{e:?}")),
    }
}

/// calamine dimensions are 0-based (row, col) pairs.
fn merge_range(dim: &Dimensions) -> CellRange {
    CellRange::new(
        dim.start.0 + 1,
        dim.start.1 + 1,
        dim.end.0 + 1,
        dim.end.1 + 1,
    )
}

/// Reads every worksheet of `path`, values and merged ranges.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open_survey(path: impl AsRef<Path>) -> Result<Workbook> {
    let mut xlsx: Xlsx<_> = open_workbook(path.as_ref())?;
    xlsx.load_merged_regions()?;

    let mut book = Workbook::new();
    for name in xlsx.sheet_names() {
        let range = xlsx.worksheet_range(&name)?;
        let mut sheet = Worksheet::new(name.as_str());

        if let Some((row0, col0)) = range.start() {
            for (row, col, data) in range.used_cells() {
                sheet.set(row0 + row as u32 + 1, col0 + col as u32 + 1, cell_value(data));
            }
        }

        let merges = xlsx
            .worksheet_merge_cells(&name)
            .transpose()?
            .unwrap_or_default();
        for dim in &merges {
            sheet.merge(merge_range(dim))?;
        }

        debug!(sheet = %name, merges = merges.len(), "sheet loaded");
        book.push(sheet);
    }

    info!(sheets = book.len(), "survey loaded");
    Ok(book)
}
