use tracing::instrument;

use crate::formatter::layout::{HEADER_ROWS, LayoutReport};
use crate::formatter::types::{BucketKind, ColumnPlan, DataSet};
use crate::formatter::utility::ends_on_hour;
use crate::grid::{BorderWeight, CellRange, CellStyle, Shade, Worksheet};

const PERCENT_FORMAT: &str = "0.00%";

fn fill_unless_set(style: &mut CellStyle, shade: Shade) {
    if style.fill.is_none() {
        style.fill = Some(shade);
    }
}

fn thin_grid(style: &mut CellStyle) {
    style.border_top = Some(BorderWeight::Thin);
    style.border_bottom = Some(BorderWeight::Thin);
    style.border_left = Some(BorderWeight::Thin);
    style.border_right = Some(BorderWeight::Thin);
}

/// Styles a finished section. Runs after validation and keeps the fill the
/// validator put on the grand total cell.
#[instrument(skip_all, fields(sheet = %sheet.name()))]
pub fn style_section(
    sheet: &mut Worksheet,
    data: &DataSet,
    plan: &ColumnPlan,
    layout: &LayoutReport,
) {
    let total = plan.total_column();
    let whole = CellRange::new(1, 1, layout.totals_row, total);
    let body = CellRange::new(layout.first_body_row, 1, layout.last_body_row, total);
    let totals = CellRange::new(layout.totals_row, 1, layout.totals_row, total);

    sheet.style_range(whole, |style| style.centered = true);
    sheet.style_range(CellRange::new(1, 1, HEADER_ROWS, total), |style| {
        style.bold = true
    });
    sheet.style_range(CellRange::new(1, 1, layout.totals_row, 1), |style| {
        style.bold = true
    });

    sheet.style_range(CellRange::new(1, 1, HEADER_ROWS, total), thin_grid);
    sheet.style_range(body, thin_grid);
    sheet.style_range(totals, thin_grid);

    sheet.border_around(CellRange::new(1, 1, HEADER_ROWS, 1), BorderWeight::Thick);
    for block in plan.blocks() {
        let header = CellRange::new(1, block.first_column, HEADER_ROWS, block.last_column());
        sheet.border_around(header, BorderWeight::Thick);
    }
    sheet.border_around(CellRange::new(1, total, HEADER_ROWS, total), BorderWeight::Thick);
    sheet.border_around(
        CellRange::new(layout.first_body_row, 1, layout.last_body_row, 1),
        BorderWeight::Thick,
    );
    sheet.border_around(body, BorderWeight::Thick);
    sheet.border_around(totals, BorderWeight::Thick);

    for (index, bucket) in data.buckets().iter().enumerate() {
        let row = layout.bucket_row(index);
        match bucket.kind {
            BucketKind::Interval if ends_on_hour(&bucket.label) => {
                sheet.style_range(CellRange::new(row, 1, row, total), |style| {
                    style.border_bottom = Some(BorderWeight::Thick)
                });
            }
            BucketKind::Percentage => {
                sheet.style_range(CellRange::new(row, 2, row, total), |style| {
                    style.number_format = Some(PERCENT_FORMAT.to_string())
                });
            }
            _ => {}
        }
    }

    for col in plan.blocks().iter().filter_map(|b| b.subtotal_column) {
        sheet.style_range(CellRange::new(HEADER_ROWS, col, layout.totals_row, col), |style| {
            fill_unless_set(style, Shade::LightGray)
        });
    }
    sheet.style_range(CellRange::new(1, total, layout.totals_row, total), |style| {
        fill_unless_set(style, Shade::LightGreen)
    });

    sheet.set_autofit(true);
}
