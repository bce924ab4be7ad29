//! Header segment discovery.
//!
//! A survey sheet repeats one block of category columns per direction or
//! movement. Each block starts with the same category (the sentinel, e.g.
//! "Motorcycles") and is usually labelled by a merged cell spanning the
//! whole block. Blocks need not be the same width: one may omit the
//! pedestrian column. Merge ranges decide the width when present; otherwise
//! the block runs up to the next sentinel. A block with its own label merge
//! may start with any category (a u-turn without motorcycles).

use tracing::{debug, instrument};

use crate::error::StructuralError;
use crate::formatter::types::{HeaderSegment, SubLabel};
use crate::grid::{CellRange, Worksheet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    /// Row holding one label per segment, usually merged across it.
    pub label_row: u32,
    /// Row holding the per-column category labels.
    pub category_row: u32,
    pub first_column: u32,
    /// First category of every segment. Taken from the sheet when unset.
    pub sentinel: Option<String>,
    pub column_cap: u32,
}

impl Default for HeaderSpec {
    fn default() -> Self {
        Self {
            label_row: 2,
            category_row: 3,
            first_column: 2,
            sentinel: None,
            column_cap: 1000,
        }
    }
}

fn category_at(sheet: &Worksheet, spec: &HeaderSpec, col: u32) -> Option<String> {
    sheet
        .cell(spec.category_row, col)
        .as_text()
        .map(str::to_lowercase)
}

/// Splits the header of `sheet` into ordered, non-overlapping segments.
#[instrument(skip_all, fields(sheet = %sheet.name()))]
pub fn parse_header(
    sheet: &Worksheet,
    spec: &HeaderSpec,
) -> Result<Vec<HeaderSegment>, StructuralError> {
    let name = sheet.name().to_string();
    let last_col = sheet.dimensions().map(|(_, col)| col).unwrap_or(0);
    let limit = spec
        .first_column
        .saturating_add(spec.column_cap)
        .saturating_sub(1);
    if last_col > limit {
        return Err(StructuralError::ColumnCapExceeded {
            sheet: name,
            last_col,
            cap: spec.column_cap,
        });
    }

    let sentinel = match &spec.sentinel {
        Some(sentinel) => sentinel.trim().to_lowercase(),
        None => (spec.first_column..=last_col)
            .find_map(|col| category_at(sheet, spec, col))
            .ok_or_else(|| StructuralError::EmptyHeader {
                sheet: name.clone(),
                row: spec.category_row,
            })?,
    };
    let is_sentinel =
        |col: u32| category_at(sheet, spec, col).as_deref() == Some(sentinel.as_str());
    // a label merge must not reach into the category row
    let label_merge_at = |col: u32| {
        sheet
            .merged_range(spec.label_row, col)
            .filter(|range| range.first_col == col && range.last_row < spec.category_row)
    };

    let mut cursor = (spec.first_column..=last_col)
        .find(|&col| is_sentinel(col))
        .ok_or_else(|| StructuralError::SentinelNotFound {
            sheet: name.clone(),
            sentinel: sentinel.clone(),
            row: spec.category_row,
            cap: spec.column_cap,
        })?;

    let mut segments = Vec::new();
    while cursor <= last_col && (is_sentinel(cursor) || label_merge_at(cursor).is_some()) {
        let width = match sheet.merged_range(spec.label_row, cursor) {
            Some(range) if range.first_col < cursor => {
                return Err(StructuralError::OverlappingSegments {
                    sheet: name,
                    column: cursor,
                });
            }
            Some(range) => range.width(),
            None => {
                let next = ((cursor + 1)..=last_col)
                    .find(|&col| is_sentinel(col))
                    .unwrap_or(last_col + 1);
                next - cursor
            }
        };

        let sub_labels = (0..width)
            .map(|offset| {
                let col = cursor + offset;
                match sheet.cell(spec.category_row, col).as_text() {
                    Some(label) => Ok(SubLabel {
                        offset,
                        label: label.to_string(),
                    }),
                    None => Err(StructuralError::MissingCategoryLabel {
                        sheet: name.clone(),
                        cell: CellRange::cell(spec.category_row, col),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let label = sheet
            .cell(spec.label_row, cursor)
            .as_text()
            .unwrap_or_default()
            .to_string();
        debug!(start = cursor, width, label = %label, "header segment");

        segments.push(HeaderSegment {
            start_column: cursor,
            span_width: width,
            label,
            sub_labels,
        });
        cursor += width;
    }

    Ok(segments)
}
