//! Error taxonomy and non-fatal diagnostics.
//!
//! Fatal problems (unrecognized header shape, malformed buckets, values that
//! cannot be converted where they are required) are [`FormatterError`]s and
//! abort the run. Vocabulary drift, tolerated empty cells and total
//! mismatches are collected as [`Diagnostics`] and only logged.

use thiserror::Error;
use tracing::{error, warn};

use crate::grid::CellRange;

/// The shape of a source sheet is not what a survey export looks like.
#[derive(Debug, Error, PartialEq)]
pub enum StructuralError {
    #[error("{sheet}: no '{sentinel}' header found in row {row} within {cap} columns")]
    SentinelNotFound {
        sheet: String,
        sentinel: String,
        row: u32,
        cap: u32,
    },

    #[error("{sheet}: header row {row} has no category labels")]
    EmptyHeader { sheet: String, row: u32 },

    #[error("{sheet}: used range ends at column {last_col}, beyond the {cap} column search limit")]
    ColumnCapExceeded { sheet: String, last_col: u32, cap: u32 },

    #[error("{sheet}: segment starting at column {column} overlaps the previous segment")]
    OverlappingSegments { sheet: String, column: u32 },

    #[error("{sheet}: missing category label in header cell {cell}")]
    MissingCategoryLabel { sheet: String, cell: CellRange },

    #[error("{sheet}: column {column} expected category '{expected}' but header says '{found}'")]
    CategoryMismatch {
        sheet: String,
        column: u32,
        expected: String,
        found: String,
    },

    #[error("{sheet}: value in {cell} does not belong to any header segment")]
    UnresolvedCell { sheet: String, cell: CellRange },

    #[error("{sheet}: duplicate bucket {bucket}, segment {segment}, category '{category}'")]
    DuplicateKey {
        sheet: String,
        bucket: usize,
        segment: usize,
        category: String,
    },

    #[error("{sheet}: malformed time bucket '{value}' in {cell}")]
    MalformedBucket {
        sheet: String,
        cell: CellRange,
        value: String,
    },

    #[error("{sheet}: no time buckets found below the header")]
    NoBuckets { sheet: String },

    #[error("{sheet}: body exceeds the {cap} row search limit")]
    RowCapExceeded { sheet: String, cap: u32 },

    #[error("bucket {bucket}: projected row does not match the column plan at position {position}")]
    Geometry { bucket: usize, position: usize },

    #[error("{sheet}: unrecognized direction code '{code}'")]
    UnknownDirectionCode { sheet: String, code: String },

    #[error("no direction worksheets found in source workbook")]
    NoDirectionSheets,

    #[error("{sheet}: '{value}' in {cell} is not a date")]
    MalformedDate {
        sheet: String,
        cell: CellRange,
        value: String,
    },

    #[error("source workbook has no worksheets")]
    EmptyWorkbook,
}

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("merge {new} overlaps existing merge {existing}")]
    OverlappingMerge { new: CellRange, existing: CellRange },

    #[error("cell address row {row}, column {col} is out of range")]
    OutOfBounds { row: u32, col: u32 },
}

#[derive(Debug, Error)]
pub enum FormatterError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("{sheet}: non-numeric value '{value}' in {cell}")]
    ValueConversion {
        sheet: String,
        cell: CellRange,
        value: String,
    },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormatterError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    CategoryMatch,
    ValueConversion,
    ValidationMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Per-run accumulator of non-fatal issues.
///
/// Every push is logged immediately: category and value issues as
/// warnings, total mismatches as errors.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            DiagnosticKind::CategoryMatch => warn!(kind = "category", "{message}"),
            DiagnosticKind::ValueConversion => warn!(kind = "value", "{message}"),
            DiagnosticKind::ValidationMismatch => error!(kind = "validation", "{message}"),
        }
        self.entries.push(Diagnostic { kind, message });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}
