//! Persists a report [`Workbook`] as `.xlsx`.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook as XlsxWorkbook};
use tracing::{debug, info, instrument};

use crate::error::{GridError, Result};
use crate::grid::{BorderWeight, CellStyle, CellValue, Shade, Workbook, Worksheet};

fn shade_color(shade: Shade) -> Color {
    match shade {
        Shade::LightGray => Color::RGB(0xD9D9D9),
        Shade::LightGreen => Color::RGB(0xC6EFCE),
        Shade::Green => Color::RGB(0x00B050),
        Shade::Red => Color::RGB(0xFF0000),
    }
}

fn border(weight: BorderWeight) -> FormatBorder {
    match weight {
        BorderWeight::Thin => FormatBorder::Thin,
        BorderWeight::Thick => FormatBorder::Thick,
    }
}

fn xlsx_format(style: &CellStyle) -> Format {
    let mut format = Format::new();
    if style.bold {
        format = format.set_bold();
    }
    if style.centered {
        format = format
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
    }
    if style.right_aligned {
        format = format.set_align(FormatAlign::Right);
    }
    if let Some(shade) = style.fill {
        format = format.set_background_color(shade_color(shade));
    }
    if let Some(num_format) = &style.number_format {
        format = format.set_num_format(num_format);
    }
    if let Some(weight) = style.border_top {
        format = format.set_border_top(border(weight));
    }
    if let Some(weight) = style.border_bottom {
        format = format.set_border_bottom(border(weight));
    }
    if let Some(weight) = style.border_left {
        format = format.set_border_left(border(weight));
    }
    if let Some(weight) = style.border_right {
        format = format.set_border_right(border(weight));
    }
    format
}

/// 1-based model address → 0-based xlsx address.
fn address(row: u32, col: u32) -> std::result::Result<(u32, u16), GridError> {
    let out_of_bounds = GridError::OutOfBounds { row, col };
    if row == 0 || col == 0 {
        return Err(out_of_bounds);
    }
    let col = u16::try_from(col - 1).map_err(|_| out_of_bounds)?;
    Ok((row - 1, col))
}

fn write_sheet(book: &mut XlsxWorkbook, sheet: &Worksheet) -> Result<()> {
    let target = book.add_worksheet();
    target.set_name(sheet.name())?;

    let format_at = |row: u32, col: u32| {
        sheet
            .style(row, col)
            .map(xlsx_format)
            .unwrap_or_default()
    };

    // Merges first; the top-left cell is rewritten with its value below.
    for range in sheet.merges() {
        let (first_row, first_col) = address(range.first_row, range.first_col)?;
        let (last_row, last_col) = address(range.last_row, range.last_col)?;
        let format = format_at(range.first_row, range.first_col);
        target.merge_range(first_row, first_col, last_row, last_col, "", &format)?;
    }

    for ((row, col), value) in sheet.cells() {
        let (xrow, xcol) = address(row, col)?;
        let format = format_at(row, col);
        match value {
            CellValue::Text(text) => {
                target.write_string_with_format(xrow, xcol, text, &format)?;
            }
            CellValue::Number(number) => {
                target.write_number_with_format(xrow, xcol, *number, &format)?;
            }
            CellValue::Empty => {}
        }
    }

    for (row, col) in sheet.styled_cells() {
        if !sheet.cell(row, col).is_empty() {
            continue;
        }
        let (xrow, xcol) = address(row, col)?;
        target.write_blank(xrow, xcol, &format_at(row, col))?;
    }

    if sheet.autofit() {
        target.autofit();
    }
    debug!(sheet = sheet.name(), merges = sheet.merges().len(), "sheet written");
    Ok(())
}

/// Writes every sheet of `report` to `path`, replacing an existing file.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn save_report(report: &Workbook, path: impl AsRef<Path>) -> Result<()> {
    let mut book = XlsxWorkbook::new();
    for sheet in report.worksheets() {
        write_sheet(&mut book, sheet)?;
    }
    book.save(path.as_ref())?;
    info!(sheets = report.len(), "report saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_conversion() {
        assert_eq!(address(1, 1), Ok((0, 0)));
        assert_eq!(address(8, 14), Ok((7, 13)));
        assert_eq!(address(0, 3), Err(GridError::OutOfBounds { row: 0, col: 3 }));
        assert!(address(1, 70_000).is_err());
    }

    #[test]
    fn test_format_matches_style() {
        let style = CellStyle {
            bold: true,
            fill: Some(Shade::Red),
            border_bottom: Some(BorderWeight::Thick),
            ..CellStyle::default()
        };
        let expected = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xFF0000))
            .set_border_bottom(FormatBorder::Thick);
        assert_eq!(xlsx_format(&style), expected);

        let right = CellStyle {
            right_aligned: true,
            ..CellStyle::default()
        };
        assert_eq!(xlsx_format(&right), Format::new().set_align(FormatAlign::Right));
    }
}
