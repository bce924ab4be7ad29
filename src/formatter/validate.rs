use crate::error::{DiagnosticKind, Diagnostics};
use crate::grid::{CellRange, Shade, Worksheet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch,
}

impl Verdict {
    /// | Verdict  | Fill  |
    /// |----------|-------|
    /// | Match    | green |
    /// | Mismatch | red   |
    pub fn shade(self) -> Shade {
        match self {
            Verdict::Match => Shade::Green,
            Verdict::Mismatch => Shade::Red,
        }
    }
}

/// Compares two independently computed grand totals. Only float noise is
/// tolerated; any real difference is a mismatch.
pub fn check(by_rows: f64, by_columns: f64) -> Verdict {
    let scale = by_rows.abs().max(by_columns.abs()).max(1.0);
    if (by_rows - by_columns).abs() <= f64::EPSILON * scale {
        Verdict::Match
    } else {
        Verdict::Mismatch
    }
}

/// Checks the totals and fills `cell` with the outcome. A mismatch is also
/// recorded as a diagnostic; it never fails the run.
pub fn mark(
    sheet: &mut Worksheet,
    cell: (u32, u32),
    by_rows: f64,
    by_columns: f64,
    diagnostics: &mut Diagnostics,
) -> Verdict {
    let verdict = check(by_rows, by_columns);
    let (row, col) = cell;
    sheet.style_mut(row, col).fill = Some(verdict.shade());
    if verdict == Verdict::Mismatch {
        diagnostics.push(
            DiagnosticKind::ValidationMismatch,
            format!(
                "{}: grand total in {} differs: rows give {by_rows}, columns give {by_columns}",
                sheet.name(),
                CellRange::cell(row, col)
            ),
        );
    }
    verdict
}
