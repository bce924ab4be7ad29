use std::env;
use std::fs;

use traffic_formatter::error::Diagnostics;
use traffic_formatter::formatter::validate::Verdict;
use traffic_formatter::formatter::{SectionContext, build_report};
use traffic_formatter::grid::{CellRange, CellValue, Shade, Workbook, Worksheet};
use traffic_formatter::output::save_report;
use traffic_formatter::reader::open_survey;

const CATEGORIES: [&str; 3] = ["Motorcycles", "Lights", "Single-Unit Trucks"];

fn direction_sheet() -> Worksheet {
    let mut sheet = Worksheet::new("Northbound");
    sheet.set(1, 2, "1 - Northbound");
    sheet.set(3, 1, "Start Time");

    let mut col = 2;
    for label in ["1 - right", "1 - left", "1 - thru"] {
        sheet.set(2, col, label);
        sheet.merge(CellRange::new(2, col, 2, col + 2)).unwrap();
        for (offset, category) in CATEGORIES.iter().enumerate() {
            sheet.set(3, col + offset as u32, *category);
        }
        col += 3;
    }

    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0, 0.0, 0.0];
    for (row, start) in [(4, "07:00"), (5, "07:15")] {
        sheet.set(row, 1, start);
        for (offset, value) in values.iter().enumerate() {
            sheet.set(row, 2 + offset as u32, *value);
        }
    }
    sheet
}

fn survey() -> Workbook {
    let mut first = Worksheet::new("Summary");
    first.set(1, 2, "Crossroads 12");
    first.set(7, 2, 45413.25);
    first.set(8, 2, 45413.75);

    let mut book = Workbook::new();
    book.push(first);
    book.push(direction_sheet());
    book
}

#[test]
fn test_full_pipeline() {
    let mut diagnostics = Diagnostics::new();
    let (report, summary) =
        build_report(&survey(), &SectionContext::default(), &mut diagnostics).unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(summary.mismatches(), 0);
    assert!(summary.sections.iter().all(|s| s.verdict == Verdict::Match));

    let north = report.worksheet("1 - Northbound").unwrap();
    // time column, three blocks of three codes plus a subtotal, then the total
    assert_eq!(north.cell(1, 14), &CellValue::from("Suma"));
    assert_eq!(north.cell(3, 2), &CellValue::from("M"));
    assert_eq!(north.cell(3, 4), &CellValue::from("NV"));
    assert_eq!(north.cell(3, 5), &CellValue::from("Spolu"));
    assert_eq!(north.cell(4, 5).as_number(), Some(6.0));
    assert_eq!(north.cell(4, 14).as_number(), Some(21.0));
    assert_eq!(north.cell(7, 1), &CellValue::from("Suma"));
    assert_eq!(north.cell(7, 14).as_number(), Some(42.0));
    assert_eq!(north.style(7, 14).unwrap().fill, Some(Shade::Green));

    let rundown = report.worksheets().last().unwrap();
    assert_eq!(summary.sections.last().unwrap().grand_total, 42.0);
    assert_eq!(rundown.cell(1, 2), &CellValue::from("M"));

    let basics = &report.worksheets()[0];
    assert_eq!(basics.cell(7, 2), &CellValue::from("01-05-2024 06:00:00"));
    assert_eq!(basics.cell(8, 2), &CellValue::from("01-05-2024 18:00:00"));
}

#[test]
fn test_report_survives_xlsx_round_trip() {
    let dir = env::temp_dir().join("traffic_formatter_integration");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("report.xlsx");

    let (report, _) =
        build_report(&survey(), &SectionContext::default(), &mut Diagnostics::new()).unwrap();
    save_report(&report, &path).unwrap();

    let reread = open_survey(&path).unwrap();
    let names: Vec<&str> = reread.worksheets().iter().map(|ws| ws.name()).collect();
    let expected: Vec<&str> = report.worksheets().iter().map(|ws| ws.name()).collect();
    assert_eq!(names, expected);

    let north = reread.worksheet("1 - Northbound").unwrap();
    assert_eq!(north.cell(1, 1), &CellValue::from("Čas"));
    assert_eq!(north.cell(7, 14).as_number(), Some(42.0));
    assert_eq!(north.merged_range(2, 1), Some(CellRange::new(1, 1, 3, 1)));
    assert_eq!(north.merged_range(2, 14), Some(CellRange::new(1, 14, 3, 14)));

    fs::remove_file(&path).ok();
}
