use tracing::{debug, instrument};

use crate::error::StructuralError;
use crate::formatter::types::{AggregateResult, BucketKind, ColumnPlan, DataSet, Entry, Position};
use crate::formatter::utility::round2;

/// Computes row, subtotal and column totals of `data` laid out by `plan`.
///
/// Every bucket is projected into report column order and walked against
/// the plan's positions: category values accumulate into the row total and
/// the running segment sum, and each [`Entry::SegmentEnd`] closes the
/// segment into its subtotal column. Only interval buckets count toward
/// column totals and the two grand totals; percentage rows keep their own
/// row total rounded to two decimals.
#[instrument(skip_all, fields(sheet = %data.sheet()))]
pub fn aggregate(data: &DataSet, plan: &ColumnPlan) -> Result<AggregateResult, StructuralError> {
    let positions = plan.positions();
    let mut result = AggregateResult::default();

    for (bucket, meta) in data.buckets().iter().enumerate() {
        let entries = data.entries(bucket, plan.with_subtotals());
        if entries.len() != positions.len() {
            return Err(StructuralError::Geometry {
                bucket,
                position: entries.len().min(positions.len()),
            });
        }

        let counted = meta.kind == BucketKind::Interval;
        let mut row_total = 0.0;
        let mut segment_sum = 0.0;

        for (position_index, (entry, position)) in entries.iter().zip(&positions).enumerate() {
            match (entry, position) {
                (Entry::Value(value), Position::Category { segment, index }) => {
                    let value = match meta.kind {
                        BucketKind::Percentage => round2(*value),
                        _ => *value,
                    };
                    row_total += value;
                    segment_sum += value;
                    if counted {
                        let category = plan.blocks()[*segment].categories[*index].clone();
                        *result.column_totals.entry((*segment, category)).or_default() += value;
                    }
                }
                (Entry::SegmentEnd, Position::Subtotal { segment }) => {
                    result.subtotals.insert((bucket, *segment), segment_sum);
                    if counted {
                        *result.subtotal_column_totals.entry(*segment).or_default() += segment_sum;
                    }
                    segment_sum = 0.0;
                }
                _ => {
                    return Err(StructuralError::Geometry {
                        bucket,
                        position: position_index,
                    });
                }
            }
        }

        if meta.kind == BucketKind::Percentage {
            row_total = round2(row_total);
        }
        result.row_totals.insert(bucket, row_total);
        if counted {
            result.grand_total_by_rows += row_total;
        }
    }

    result.grand_total_by_columns = if plan.with_subtotals() {
        result.subtotal_column_totals.values().sum()
    } else {
        result.column_totals.values().sum()
    };

    debug!(
        by_rows = result.grand_total_by_rows,
        by_columns = result.grand_total_by_columns,
        "aggregated"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::types::{Bucket, CategoryKey, SegmentSpec};

    fn specs() -> Vec<SegmentSpec> {
        ["right", "left"]
            .iter()
            .map(|label| SegmentSpec {
                label: label.to_string(),
                categories: vec!["M".into(), "LV".into(), "NV".into()],
            })
            .collect()
    }

    fn dataset(rows: &[(BucketKind, [f64; 6])]) -> DataSet {
        let buckets = rows
            .iter()
            .enumerate()
            .map(|(i, (kind, _))| Bucket {
                row: 4 + i as u32,
                label: format!("b{i}"),
                kind: *kind,
            })
            .collect();
        let specs = specs();
        let mut data = DataSet::new("test", buckets, specs.clone());
        for (bucket, (_, values)) in rows.iter().enumerate() {
            for (i, value) in values.iter().enumerate() {
                let (segment, index) = (i / 3, i % 3);
                let category = specs[segment].categories[index].clone();
                data.insert(CategoryKey::new(bucket, segment, category), *value)
                    .unwrap();
            }
        }
        data
    }

    #[test]
    fn test_reference_sums() {
        let data = dataset(&[
            (BucketKind::Interval, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            (BucketKind::Interval, [1.0, 1.0, 1.0, 2.0, 2.0, 2.0]),
            (BucketKind::Interval, [0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
        ]);
        let plan = ColumnPlan::new(data.segments(), true);
        let result = aggregate(&data, &plan).unwrap();

        assert_eq!(result.row_totals[&0], 21.0);
        assert_eq!(result.row_totals[&1], 9.0);
        assert_eq!(result.row_totals[&2], 2.0);
        assert_eq!(result.subtotals[&(0, 0)], 6.0);
        assert_eq!(result.subtotals[&(0, 1)], 15.0);
        assert_eq!(result.column_totals[&(0, "NV".to_string())], 5.0);
        assert_eq!(result.column_totals[&(1, "M".to_string())], 6.0);
        assert_eq!(result.subtotal_column_totals[&0], 10.0);
        assert_eq!(result.subtotal_column_totals[&1], 22.0);
        assert_eq!(result.grand_total_by_rows, 32.0);
        assert_eq!(result.grand_total_by_columns, 32.0);
        assert_eq!(result.grand_total(), 32.0);
    }

    #[test]
    fn test_summary_rows_excluded_from_grand_totals() {
        let data = dataset(&[
            (BucketKind::Interval, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            (BucketKind::Subtotal, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            (BucketKind::Percentage, [0.123, 0.2, 0.0, 0.0, 0.0, 0.0]),
        ]);
        let plan = ColumnPlan::new(data.segments(), true);
        let result = aggregate(&data, &plan).unwrap();

        assert_eq!(result.grand_total_by_rows, 21.0);
        assert_eq!(result.grand_total_by_columns, 21.0);
        assert_eq!(result.row_totals[&1], 21.0);
        assert_eq!(result.row_totals[&2], 0.32);
        assert_eq!(result.column_totals[&(0, "M".to_string())], 1.0);
    }

    #[test]
    fn test_flat_plan_sums_category_columns() {
        let data = dataset(&[(BucketKind::Interval, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0])]);
        let plan = ColumnPlan::new(data.segments(), false);
        let result = aggregate(&data, &plan).unwrap();

        assert!(result.subtotals.is_empty());
        assert_eq!(result.grand_total_by_columns, 21.0);
        assert_eq!(result.grand_total_by_rows, 21.0);
    }

    #[test]
    fn test_plan_mismatch_is_geometry_error() {
        let data = dataset(&[(BucketKind::Interval, [1.0; 6])]);
        let mut narrower = specs();
        narrower[0].categories.pop();
        let plan = ColumnPlan::new(&narrower, true);
        let err = aggregate(&data, &plan).unwrap_err();
        assert!(matches!(err, StructuralError::Geometry { bucket: 0, .. }));
    }
}
