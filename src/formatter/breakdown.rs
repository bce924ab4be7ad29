//! The "Celkové údaje 12hod" sheet: total volumes per leg and turn
//! movement, read from the survey's class breakdown sheet.
//!
//! That sheet labels every leg in row 1, merged across the leg's movement
//! columns, with the orientation in row 2 and the movements in row 3. The
//! per-leg "App Total" and the trailing "Int Total" columns are recomputed,
//! never copied.

use tracing::instrument;

use crate::error::{Diagnostics, Result};
use crate::formatter::extract::DataExtractor;
use crate::formatter::header::{HeaderSpec, parse_header};
use crate::formatter::layout::SectionHeader;
use crate::formatter::section::{SectionContext, SectionOutcome, finish};
use crate::formatter::types::ColumnPlan;
use crate::grid::{Workbook, Worksheet};

pub const BREAKDOWN_SHEET: &str = "Celkové údaje 12hod";

const SOURCE_SHEET: &str = "total volume class breakdown";
const LEG_ROW: u32 = 1;
const ORIENTATION_ROW: u32 = 2;

/// The class breakdown sheet of a survey, if it has one. The first sheet
/// holds the survey summary and is never considered.
pub fn find_breakdown_sheet(source: &Workbook) -> Option<&Worksheet> {
    source
        .worksheets()
        .iter()
        .skip(1)
        .find(|sheet| sheet.name().trim().eq_ignore_ascii_case(SOURCE_SHEET))
}

#[instrument(skip_all, fields(source = %source.name()))]
pub fn run_breakdown_section(
    source: &Worksheet,
    ctx: &SectionContext,
    diagnostics: &mut Diagnostics,
) -> Result<SectionOutcome> {
    // movements, not vehicle classes: always detect the sentinel
    let spec = HeaderSpec {
        label_row: LEG_ROW,
        sentinel: None,
        ..ctx.header.clone()
    };
    let segments = parse_header(source, &spec)?;

    let mut orientations = Vec::with_capacity(segments.len());
    for segment in &segments {
        let raw = source.cell(ORIENTATION_ROW, segment.start_column).to_string();
        let orientation = match raw.trim() {
            "" => String::new(),
            text => ctx.dictionary.compass(text, diagnostics),
        };
        orientations.push(orientation);
    }

    let data = DataExtractor::new(&ctx.dictionary, ctx.extract.clone()).extract(
        source,
        &segments,
        diagnostics,
    )?;
    let legs = data
        .segments()
        .iter()
        .map(|segment| ctx.dictionary.leg_label(&segment.label, diagnostics))
        .collect();
    let plan = ColumnPlan::new(data.segments(), true);
    let header = SectionHeader::Breakdown { legs, orientations };

    finish(BREAKDOWN_SHEET, data, plan, header, ctx, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::fixtures::breakdown_sheet;
    use crate::formatter::validate::Verdict;
    use crate::grid::{CellRange, CellValue, Shade};

    #[test]
    fn test_breakdown_section() {
        let source = breakdown_sheet();
        let mut diagnostics = Diagnostics::new();
        let outcome =
            run_breakdown_section(&source, &SectionContext::default(), &mut diagnostics).unwrap();

        assert_eq!(outcome.verdict, Verdict::Match);
        assert_eq!(outcome.grand_total, 30.0);
        assert!(diagnostics.is_empty());

        let sheet = &outcome.sheet;
        assert_eq!(sheet.name(), BREAKDOWN_SHEET);
        assert_eq!(sheet.cell(1, 1), &CellValue::from("Smer od"));
        assert_eq!(sheet.cell(1, 2), &CellValue::from("1 - sever"));
        assert_eq!(sheet.merged_range(1, 5), Some(CellRange::new(1, 2, 1, 5)));
        assert_eq!(sheet.cell(2, 2), &CellValue::from("juh"));
        assert_eq!(sheet.cell(1, 6), &CellValue::from("2 - východ"));
        assert_eq!(sheet.cell(2, 6), &CellValue::from("západ"));
        assert_eq!(sheet.cell(3, 4), &CellValue::from("dolava"));
        assert_eq!(sheet.cell(3, 6), &CellValue::from("priamo"));
        assert_eq!(sheet.cell(3, 8), &CellValue::from("Spolu"));

        assert_eq!(sheet.cell(4, 1), &CellValue::from("07:00 - 07:15"));
        assert_eq!(sheet.cell(4, 5).as_number(), Some(6.0));
        assert_eq!(sheet.cell(4, 8).as_number(), Some(9.0));
        assert_eq!(sheet.cell(4, 9).as_number(), Some(15.0));
        assert_eq!(sheet.cell(7, 9).as_number(), Some(30.0));
        assert_eq!(sheet.style(7, 9).unwrap().fill, Some(Shade::Green));
    }

    #[test]
    fn test_find_breakdown_sheet() {
        let mut book = Workbook::new();
        book.push(Worksheet::new("Total Volume Class Breakdown"));
        assert!(find_breakdown_sheet(&book).is_none());

        book.push(Worksheet::new("Northbound"));
        book.push(Worksheet::new(" TOTAL VOLUME CLASS BREAKDOWN "));
        let found = find_breakdown_sheet(&book).unwrap();
        assert_eq!(found.name(), " TOTAL VOLUME CLASS BREAKDOWN ");
    }
}
