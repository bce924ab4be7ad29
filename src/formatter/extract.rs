//! Body extraction: every numeric cell below the header becomes one keyed
//! value of a [`DataSet`].

use chrono::NaiveTime;
use tracing::{debug, instrument};

use crate::dictionary::CategoryDictionary;
use crate::error::{DiagnosticKind, Diagnostics, FormatterError, Result, StructuralError};
use crate::formatter::types::{
    Bucket, BucketKind, CategoryKey, DataSet, HeaderSegment, SegmentSpec,
};
use crate::formatter::utility::{
    format_interval, from_serial, interval_length, parse_interval, parse_time,
};
use crate::grid::{CellRange, CellValue, Worksheet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSpec {
    pub first_body_row: u32,
    pub time_column: u32,
    pub row_cap: u32,
}

impl Default for ExtractSpec {
    fn default() -> Self {
        Self {
            first_body_row: 4,
            time_column: 1,
            row_cap: 1000,
        }
    }
}

/// A data column resolved to its segment and category.
#[derive(Debug, Clone)]
struct ColumnRole {
    column: u32,
    segment: usize,
    category: String,
}

/// What column A says about a body row before interval ends are known.
enum RowLabel {
    Start(NaiveTime),
    Fixed(String, BucketKind),
}

pub struct DataExtractor<'a> {
    dictionary: &'a CategoryDictionary,
    spec: ExtractSpec,
}

impl<'a> DataExtractor<'a> {
    pub fn new(dictionary: &'a CategoryDictionary, spec: ExtractSpec) -> Self {
        Self { dictionary, spec }
    }

    /// Category order shared by all segments: the non-summary labels of the
    /// widest segment. Narrower segments must list a subsequence of it.
    fn category_layout(&self, segments: &[HeaderSegment]) -> Vec<String> {
        segments
            .iter()
            .map(|segment| self.categories_of(segment))
            .max_by_key(Vec::len)
            .unwrap_or_default()
    }

    fn categories_of(&self, segment: &HeaderSegment) -> Vec<String> {
        segment
            .sub_labels
            .iter()
            .filter(|s| !self.dictionary.is_summary(&s.label))
            .map(|s| s.label.clone())
            .collect()
    }

    fn resolve_columns(
        &self,
        sheet: &Worksheet,
        segments: &[HeaderSegment],
    ) -> std::result::Result<Vec<ColumnRole>, StructuralError> {
        let layout = self.category_layout(segments);
        let mut roles = Vec::new();
        for (index, segment) in segments.iter().enumerate() {
            let mut position = 0;
            for sub in &segment.sub_labels {
                if self.dictionary.is_summary(&sub.label) {
                    continue;
                }
                let column = segment.start_column + sub.offset;
                // a segment may omit categories but never reorder them
                let skipped = layout
                    .get(position..)
                    .unwrap_or_default()
                    .iter()
                    .position(|category| category.eq_ignore_ascii_case(&sub.label));
                let Some(skipped) = skipped else {
                    return Err(StructuralError::CategoryMismatch {
                        sheet: sheet.name().to_string(),
                        column,
                        expected: layout.get(position).cloned().unwrap_or_default(),
                        found: sub.label.clone(),
                    });
                };
                roles.push(ColumnRole {
                    column,
                    segment: index,
                    category: sub.label.clone(),
                });
                position += skipped + 1;
            }
        }
        Ok(roles)
    }

    /// Columns outside every segment that may still hold body values.
    fn stray_columns(
        &self,
        sheet: &Worksheet,
        segments: &[HeaderSegment],
        last_col: u32,
    ) -> Vec<u32> {
        (1..=last_col)
            .filter(|&col| col != self.spec.time_column)
            .filter(|&col| !segments.iter().any(|s| s.contains(col)))
            .filter(|&col| {
                let header = (1..self.spec.first_body_row)
                    .filter_map(|row| sheet.cell(row, col).as_text())
                    .last();
                !header.is_some_and(|label| self.dictionary.is_summary(label))
            })
            .collect()
    }

    /// `None` for a blank row.
    fn row_label(
        &self,
        sheet: &Worksheet,
        row: u32,
    ) -> std::result::Result<Option<RowLabel>, StructuralError> {
        let malformed = |value: String| StructuralError::MalformedBucket {
            sheet: sheet.name().to_string(),
            cell: CellRange::cell(row, self.spec.time_column),
            value,
        };
        match sheet.cell(row, self.spec.time_column) {
            CellValue::Empty => Ok(None),
            CellValue::Number(serial) => from_serial(*serial)
                .map(|dt| Some(RowLabel::Start(dt.time())))
                .ok_or_else(|| malformed(serial.to_string())),
            CellValue::Text(raw) => {
                let text = raw.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                if let Some((start, end)) = parse_interval(text) {
                    let label = format_interval(start, end);
                    return Ok(Some(RowLabel::Fixed(label, BucketKind::Interval)));
                }
                let translated = self.dictionary.summary_label(text);
                if text.starts_with('%') {
                    let label = translated.unwrap_or(text).to_string();
                    return Ok(Some(RowLabel::Fixed(label, BucketKind::Percentage)));
                }
                if let Some(label) = translated {
                    return Ok(Some(RowLabel::Fixed(label.to_string(), BucketKind::Subtotal)));
                }
                parse_time(text)
                    .map(|time| Some(RowLabel::Start(time)))
                    .ok_or_else(|| malformed(text.to_string()))
            }
        }
    }

    /// Turns column-A labels into buckets. Derived intervals end where the
    /// next derived interval starts; the last one reuses the previous length.
    fn buckets(
        &self,
        sheet: &Worksheet,
        last_row: u32,
    ) -> std::result::Result<Vec<Bucket>, StructuralError> {
        let name = sheet.name().to_string();
        let mut labelled = Vec::new();
        for row in self.spec.first_body_row..=last_row {
            if let Some(label) = self.row_label(sheet, row)? {
                labelled.push((row, label));
            }
        }

        let starts: Vec<(u32, NaiveTime)> = labelled
            .iter()
            .filter_map(|(row, label)| match label {
                RowLabel::Start(time) => Some((*row, *time)),
                _ => None,
            })
            .collect();
        if starts.len() == 1 {
            let (row, time) = starts[0];
            return Err(StructuralError::MalformedBucket {
                sheet: name,
                cell: CellRange::cell(row, self.spec.time_column),
                value: time.format("%H:%M").to_string(),
            });
        }

        let mut derived = 0;
        let buckets: Vec<Bucket> = labelled
            .into_iter()
            .map(|(row, label)| match label {
                RowLabel::Start(start) => {
                    let end = match starts.get(derived + 1) {
                        Some((_, next)) => *next,
                        None => {
                            let (_, previous) = starts[derived - 1];
                            start + interval_length(previous, start)
                        }
                    };
                    derived += 1;
                    Bucket {
                        row,
                        label: format_interval(start, end),
                        kind: BucketKind::Interval,
                    }
                }
                RowLabel::Fixed(label, kind) => Bucket { row, label, kind },
            })
            .collect();

        if buckets.is_empty() {
            return Err(StructuralError::NoBuckets { sheet: name });
        }
        Ok(buckets)
    }

    fn value(
        &self,
        sheet: &Worksheet,
        row: u32,
        column: u32,
        diagnostics: &mut Diagnostics,
    ) -> Result<f64> {
        let cell = sheet.cell(row, column);
        match cell {
            CellValue::Number(n) => Ok(*n),
            CellValue::Text(raw) if !cell.is_empty() => parse_number(raw).ok_or_else(|| {
                FormatterError::ValueConversion {
                    sheet: sheet.name().to_string(),
                    cell: CellRange::cell(row, column),
                    value: raw.clone(),
                }
            }),
            _ => {
                diagnostics.push(
                    DiagnosticKind::ValueConversion,
                    format!(
                        "{}: empty cell {} counted as 0",
                        sheet.name(),
                        CellRange::cell(row, column)
                    ),
                );
                Ok(0.0)
            }
        }
    }

    /// Extracts the body of `sheet` against `segments`.
    #[instrument(skip_all, fields(sheet = %sheet.name()))]
    pub fn extract(
        &self,
        sheet: &Worksheet,
        segments: &[HeaderSegment],
        diagnostics: &mut Diagnostics,
    ) -> Result<DataSet> {
        let name = sheet.name().to_string();
        let (last_row, last_col) = sheet
            .dimensions()
            .ok_or_else(|| StructuralError::NoBuckets { sheet: name.clone() })?;
        if last_row >= self.spec.first_body_row.saturating_add(self.spec.row_cap) {
            return Err(StructuralError::RowCapExceeded {
                sheet: name,
                cap: self.spec.row_cap,
            }
            .into());
        }

        let roles = self.resolve_columns(sheet, segments)?;
        let stray = self.stray_columns(sheet, segments, last_col);

        // Values need a bucket row and a segment column.
        for row in self.spec.first_body_row..=last_row {
            let blank = sheet.cell(row, self.spec.time_column).is_empty();
            let checked: Vec<u32> = if blank {
                stray.iter().copied().chain(roles.iter().map(|r| r.column)).collect()
            } else {
                stray.clone()
            };
            if let Some(col) = checked.into_iter().find(|&col| !sheet.cell(row, col).is_empty()) {
                return Err(StructuralError::UnresolvedCell {
                    sheet: name,
                    cell: CellRange::cell(row, col),
                }
                .into());
            }
        }

        let buckets = self.buckets(sheet, last_row)?;
        let specs = segments
            .iter()
            .map(|segment| SegmentSpec {
                label: segment.label.clone(),
                categories: self.categories_of(segment),
            })
            .collect();
        let rows: Vec<u32> = buckets.iter().map(|b| b.row).collect();
        let mut data = DataSet::new(name, buckets, specs);

        for (bucket, row) in rows.into_iter().enumerate() {
            for role in &roles {
                let value = self.value(sheet, row, role.column, diagnostics)?;
                data.insert(CategoryKey::new(bucket, role.segment, role.category.clone()), value)?;
            }
        }

        debug!(values = data.len(), buckets = data.buckets().len(), "extracted");
        Ok(data)
    }
}

/// Parses a numeric cell stored as text; `"12.5%"` becomes `0.125`.
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f64>().ok().map(|p| p / 100.0),
        None => text.parse::<f64>().ok(),
    }
}
