//! Projects a section's data and totals into the report grid.
//!
//! ```text
//!        | 1 - sever                                | Suma
//!  Čas   | 1 - 1 doprava       | 1 - 2 dolava       |
//!        | M  | LV | NV | Spolu | M  | LV | NV | Spolu|
//! -------+----+----+----+-------+----+----+----+------+-----
//!  07:00 - 07:15 ...
//!
//!  Suma  | column totals ...                          | grand total
//! ```

use tracing::instrument;

use crate::dictionary::{CategoryDictionary, ReportLabels};
use crate::error::{Diagnostics, GridError};
use crate::formatter::types::{AggregateResult, BucketKind, ColumnPlan, DataSet};
use crate::formatter::utility::round2;
use crate::grid::{CellRange, CellValue, Worksheet};

/// Header rows occupied by every section.
pub const HEADER_ROWS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionHeader {
    /// One block per segment. With a `title`, row 1 spans every block and
    /// row 2 carries the segment labels; without one, each segment label is
    /// merged over rows 1–2.
    Segmented {
        title: Option<String>,
        segment_labels: Vec<String>,
    },
    /// Each category column merged over rows 1–3, no subtotal columns.
    Flat,
    /// Class breakdown: leg in row 1 and orientation in row 2, each merged
    /// across its block, translated movements in row 3. Column A carries
    /// one caption per header row instead of a merged time label.
    Breakdown {
        legs: Vec<String>,
        orientations: Vec<String>,
    },
}

/// Where the writer put things, for the validator and the stylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutReport {
    pub first_body_row: u32,
    pub last_body_row: u32,
    pub totals_row: u32,
    pub total_column: u32,
}

impl LayoutReport {
    pub fn grand_total_cell(&self) -> (u32, u32) {
        (self.totals_row, self.total_column)
    }

    /// Row of the `index`-th bucket.
    pub fn bucket_row(&self, index: usize) -> u32 {
        self.first_body_row + index as u32
    }
}

pub struct LayoutWriter<'a> {
    dictionary: &'a CategoryDictionary,
    labels: &'a ReportLabels,
}

fn merge_text(sheet: &mut Worksheet, range: CellRange, text: &str) -> Result<(), GridError> {
    sheet.set(range.first_row, range.first_col, text);
    sheet.merge(range)
}

impl<'a> LayoutWriter<'a> {
    pub fn new(dictionary: &'a CategoryDictionary, labels: &'a ReportLabels) -> Self {
        Self { dictionary, labels }
    }

    fn write_header(
        &self,
        sheet: &mut Worksheet,
        plan: &ColumnPlan,
        header: &SectionHeader,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), GridError> {
        match header {
            SectionHeader::Breakdown { .. } => {
                sheet.set(1, 1, self.labels.leg.as_str());
                sheet.set(2, 1, self.labels.orientation.as_str());
                sheet.set(HEADER_ROWS, 1, self.labels.time.as_str());
            }
            _ => merge_text(sheet, CellRange::new(1, 1, HEADER_ROWS, 1), &self.labels.time)?,
        }

        match header {
            SectionHeader::Segmented {
                title,
                segment_labels,
            } => {
                let label_row = match title {
                    Some(title) => {
                        let last = plan.total_column() - 1;
                        let range = CellRange::new(1, ColumnPlan::FIRST_COLUMN, 1, last);
                        merge_text(sheet, range, title)?;
                        2
                    }
                    None => 1,
                };
                for block in plan.blocks() {
                    let label = segment_labels
                        .get(block.segment)
                        .map(String::as_str)
                        .unwrap_or_default();
                    let range =
                        CellRange::new(label_row, block.first_column, 2, block.last_column());
                    merge_text(sheet, range, label)?;

                    for (index, category) in block.categories.iter().enumerate() {
                        let code = self.dictionary.vehicle_code(category, diagnostics);
                        sheet.set(HEADER_ROWS, block.category_column(index), code);
                    }
                    if let Some(col) = block.subtotal_column {
                        sheet.set(HEADER_ROWS, col, self.labels.subtotal.as_str());
                    }
                }
            }
            SectionHeader::Breakdown { legs, orientations } => {
                for block in plan.blocks() {
                    let caption_rows = [(1, legs), (2, orientations)];
                    for (row, captions) in caption_rows {
                        let text = captions
                            .get(block.segment)
                            .map(String::as_str)
                            .unwrap_or_default();
                        let range =
                            CellRange::new(row, block.first_column, row, block.last_column());
                        merge_text(sheet, range, text)?;
                    }
                    for (index, category) in block.categories.iter().enumerate() {
                        let movement = self.dictionary.movement(category, diagnostics);
                        sheet.set(HEADER_ROWS, block.category_column(index), movement);
                    }
                    if let Some(col) = block.subtotal_column {
                        sheet.set(HEADER_ROWS, col, self.labels.subtotal.as_str());
                    }
                }
            }
            SectionHeader::Flat => {
                for block in plan.blocks() {
                    for (index, category) in block.categories.iter().enumerate() {
                        let col = block.category_column(index);
                        let code = self.dictionary.vehicle_code(category, diagnostics);
                        merge_text(sheet, CellRange::new(1, col, HEADER_ROWS, col), &code)?;
                    }
                }
            }
        }

        let total = plan.total_column();
        merge_text(
            sheet,
            CellRange::new(1, total, HEADER_ROWS, total),
            &self.labels.grand_total,
        )
    }

    /// Writes the header, one body row per bucket and the totals row.
    #[instrument(skip_all, fields(sheet = %sheet.name()))]
    pub fn write(
        &self,
        sheet: &mut Worksheet,
        data: &DataSet,
        plan: &ColumnPlan,
        totals: &AggregateResult,
        header: &SectionHeader,
        diagnostics: &mut Diagnostics,
    ) -> Result<LayoutReport, GridError> {
        self.write_header(sheet, plan, header, diagnostics)?;

        let first_body_row = HEADER_ROWS + 1;
        let mut row = first_body_row;
        for (bucket, meta) in data.buckets().iter().enumerate() {
            row = first_body_row + bucket as u32;
            sheet.set(row, 1, meta.label.as_str());
            for block in plan.blocks() {
                for (index, category) in block.categories.iter().enumerate() {
                    let value = data.get(bucket, block.segment, category).unwrap_or(0.0);
                    let value = match meta.kind {
                        BucketKind::Percentage => round2(value),
                        _ => value,
                    };
                    sheet.set(row, block.category_column(index), value);
                }
                if let Some(col) = block.subtotal_column {
                    let subtotal = totals
                        .subtotals
                        .get(&(bucket, block.segment))
                        .copied()
                        .unwrap_or(0.0);
                    sheet.set(row, col, subtotal);
                }
            }
            let row_total = totals.row_totals.get(&bucket).copied().unwrap_or(0.0);
            sheet.set(row, plan.total_column(), row_total);
        }
        let last_body_row = row;

        let totals_row = last_body_row + 2;
        sheet.set(totals_row, 1, self.labels.grand_total.as_str());
        for block in plan.blocks() {
            for (index, category) in block.categories.iter().enumerate() {
                let total = totals
                    .column_totals
                    .get(&(block.segment, category.clone()))
                    .copied()
                    .unwrap_or(0.0);
                sheet.set(totals_row, block.category_column(index), total);
            }
            if let Some(col) = block.subtotal_column {
                let total = totals
                    .subtotal_column_totals
                    .get(&block.segment)
                    .copied()
                    .unwrap_or(0.0);
                sheet.set(totals_row, col, total);
            }
        }
        sheet.set(
            totals_row,
            plan.total_column(),
            CellValue::Number(totals.grand_total_by_columns),
        );

        Ok(LayoutReport {
            first_body_row,
            last_body_row,
            totals_row,
            total_column: plan.total_column(),
        })
    }
}
