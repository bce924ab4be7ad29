//! In-memory worksheet model.
//!
//! The reader fills a [`Workbook`] from disk, the formatter reads source
//! sheets and writes report sheets, and the writer persists the result.
//! Rows and columns are 1-based everywhere in this crate.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::GridError;

/// Scalar content of a single cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Returns `true` for empty cells and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Trimmed text content, if the cell holds non-blank text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// Numeric content, accepting numbers stored as text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Empty => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

/// Rectangular cell range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl CellRange {
    pub fn new(first_row: u32, first_col: u32, last_row: u32, last_col: u32) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    pub fn cell(row: u32, col: u32) -> Self {
        Self::new(row, col, row, col)
    }

    pub fn width(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    pub fn height(&self) -> u32 {
        self.last_row - self.first_row + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.width() == 1 && self.height() == 1
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.first_col), self.first_row)?;
        if !self.is_single_cell() {
            write!(f, ":{}{}", column_name(self.last_col), self.last_row)?;
        }
        Ok(())
    }
}

/// Spreadsheet column letters for a 1-based column index (`1` → `A`, `28` → `AB`).
pub fn column_name(col: u32) -> String {
    let mut name = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        name.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderWeight {
    Thin,
    Thick,
}

/// Background fills used by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shade {
    LightGray,
    LightGreen,
    Green,
    Red,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub bold: bool,
    pub centered: bool,
    pub right_aligned: bool,
    pub fill: Option<Shade>,
    pub number_format: Option<String>,
    pub border_top: Option<BorderWeight>,
    pub border_bottom: Option<BorderWeight>,
    pub border_left: Option<BorderWeight>,
    pub border_right: Option<BorderWeight>,
}

static EMPTY: CellValue = CellValue::Empty;

#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
    styles: BTreeMap<(u32, u32), CellStyle>,
    merges: Vec<CellRange>,
    autofit: bool,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self, row: u32, col: u32) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }

    /// Stores a value; writing [`CellValue::Empty`] clears the cell.
    pub fn set(&mut self, row: u32, col: u32, value: impl Into<CellValue>) {
        match value.into() {
            CellValue::Empty => {
                self.cells.remove(&(row, col));
            }
            value => {
                self.cells.insert((row, col), value);
            }
        }
    }

    /// Non-empty cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &CellValue)> {
        self.cells.iter().map(|(addr, value)| (*addr, value))
    }

    /// Last used `(row, column)`, counting values and merges.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let from_cells = self.cells.keys().copied();
        let from_merges = self.merges.iter().map(|m| (m.last_row, m.last_col));
        from_cells.chain(from_merges).fold(None, |acc, (row, col)| match acc {
            None => Some((row, col)),
            Some((r, c)) => Some((r.max(row), c.max(col))),
        })
    }

    /// The merge range covering `(row, col)`, if any.
    pub fn merged_range(&self, row: u32, col: u32) -> Option<CellRange> {
        self.merges.iter().copied().find(|m| m.contains(row, col))
    }

    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    /// Registers a merged range. Single cells are ignored.
    pub fn merge(&mut self, range: CellRange) -> Result<(), GridError> {
        if range.first_row == 0 || range.first_col == 0 {
            return Err(GridError::OutOfBounds {
                row: range.first_row,
                col: range.first_col,
            });
        }
        if range.is_single_cell() {
            return Ok(());
        }
        if let Some(existing) = self.merges.iter().find(|m| m.intersects(&range)) {
            return Err(GridError::OverlappingMerge {
                new: range,
                existing: *existing,
            });
        }
        self.merges.push(range);
        Ok(())
    }

    pub fn style(&self, row: u32, col: u32) -> Option<&CellStyle> {
        self.styles.get(&(row, col))
    }

    pub fn style_mut(&mut self, row: u32, col: u32) -> &mut CellStyle {
        self.styles.entry((row, col)).or_default()
    }

    /// Addresses carrying a style, in row-major order.
    pub fn styled_cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.styles.keys().copied()
    }

    pub fn style_range(&mut self, range: CellRange, mut apply: impl FnMut(&mut CellStyle)) {
        for row in range.first_row..=range.last_row {
            for col in range.first_col..=range.last_col {
                apply(self.style_mut(row, col));
            }
        }
    }

    /// Sets the outer edges of `range` to `weight`.
    pub fn border_around(&mut self, range: CellRange, weight: BorderWeight) {
        for col in range.first_col..=range.last_col {
            self.style_mut(range.first_row, col).border_top = Some(weight);
            self.style_mut(range.last_row, col).border_bottom = Some(weight);
        }
        for row in range.first_row..=range.last_row {
            self.style_mut(row, range.first_col).border_left = Some(weight);
            self.style_mut(row, range.last_col).border_right = Some(weight);
        }
    }

    pub fn set_autofit(&mut self, autofit: bool) {
        self.autofit = autofit;
    }

    pub fn autofit(&self) -> bool {
        self.autofit
    }
}

/// Ordered, named collection of worksheets.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn worksheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// Case-insensitive lookup by sheet name.
    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets
            .iter()
            .find(|ws| ws.name().trim().eq_ignore_ascii_case(name.trim()))
    }

    pub fn push(&mut self, sheet: Worksheet) {
        self.sheets.push(sheet);
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}
