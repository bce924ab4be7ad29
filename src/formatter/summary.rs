//! The "Základné údaje" sheet: survey metadata copied from the first
//! source sheet under fixed Slovak labels.

use chrono::NaiveDateTime;
use tracing::instrument;

use crate::error::StructuralError;
use crate::formatter::utility::{from_serial, parse_date_time};
use crate::grid::{CellRange, CellValue, Worksheet};

pub const SUMMARY_SHEET: &str = "Základné údaje";

const DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Row → label in column A. Column B of the same row is copied verbatim,
/// except for the measurement start and end which are reformatted.
static FIELDS: &[(u32, &str)] = &[
    (1, "Názov štúdie"),
    (2, "Projekt"),
    (3, "Kód projektu"),
    (4, "Smery a vozidlá"),
    (5, "Časové intervaly"),
    (6, "Časová zóna"),
    (7, "Začiatok merania"),
    (8, "Koniec merania"),
    (9, "Miesto"),
    (10, "Latitude and Longitude (GPS  LAT / LON)"),
    (12, "Doobed. špička"),
    (13, "Stredná špička"),
    (14, "Poobedná špička"),
    (16, "Poznámka 1"),
    (17, "Poznámka 2"),
    (18, "Poznámka 3"),
    (19, "Poznámka 4"),
];

const DATE_ROWS: [u32; 2] = [7, 8];

fn date_at(source: &Worksheet, row: u32) -> Result<NaiveDateTime, StructuralError> {
    let cell = source.cell(row, 2);
    let parsed = match cell {
        CellValue::Number(serial) => from_serial(*serial),
        CellValue::Text(text) => parse_date_time(text),
        CellValue::Empty => None,
    };
    parsed.ok_or_else(|| StructuralError::MalformedDate {
        sheet: source.name().to_string(),
        cell: CellRange::cell(row, 2),
        value: cell.to_string(),
    })
}

#[instrument(skip_all, fields(source = %source.name()))]
pub fn write_summary(source: &Worksheet) -> Result<Worksheet, StructuralError> {
    let mut sheet = Worksheet::new(SUMMARY_SHEET);
    for &(row, label) in FIELDS {
        sheet.set(row, 1, label);
        if DATE_ROWS.contains(&row) {
            let date = date_at(source, row)?;
            sheet.set(row, 2, date.format(DATE_FORMAT).to_string());
            sheet.style_mut(row, 2).right_aligned = true;
        } else {
            sheet.set(row, 2, source.cell(row, 2).clone());
        }
    }
    sheet.set_autofit(true);
    Ok(sheet)
}
