//! One report section: `parse → extract → aggregate → layout → validate →
//! style`, strictly in that order. Every stage is instrumented, so the
//! console shows each stage's timing when its span closes.

use std::collections::BTreeMap;

use tracing::{info, instrument};

use crate::dictionary::{CategoryDictionary, ReportLabels};
use crate::error::{Diagnostics, Result, StructuralError};
use crate::formatter::aggregate::aggregate;
use crate::formatter::extract::{DataExtractor, ExtractSpec};
use crate::formatter::header::{HeaderSpec, parse_header};
use crate::formatter::layout::{LayoutWriter, SectionHeader};
use crate::formatter::style::style_section;
use crate::formatter::types::{
    Bucket, BucketKind, CategoryKey, ColumnPlan, DataSet, SegmentSpec,
};
use crate::formatter::validate::{Verdict, mark};
use crate::grid::Worksheet;

pub const RUNDOWN_SHEET: &str = "Celkový priebeh intenzít";

/// Per-run settings shared by every section. Never mutated during a run.
#[derive(Debug, Clone, Default)]
pub struct SectionContext {
    pub dictionary: CategoryDictionary,
    pub labels: ReportLabels,
    pub header: HeaderSpec,
    pub extract: ExtractSpec,
}

/// A direction sheet of the survey and where it goes in the report.
#[derive(Debug, Clone, Copy)]
pub struct Direction<'a> {
    pub code: u32,
    pub source: &'a Worksheet,
    pub output_name: &'a str,
    /// Translated leg title for row 1, e.g. `"1 - sever"`.
    pub title: Option<&'a str>,
}

#[derive(Debug)]
pub struct SectionOutcome {
    pub sheet: Worksheet,
    pub data: DataSet,
    pub verdict: Verdict,
    pub grand_total: f64,
}

/// Aggregates, writes, validates and styles `data` into a new sheet.
pub(crate) fn finish(
    name: &str,
    data: DataSet,
    plan: ColumnPlan,
    header: SectionHeader,
    ctx: &SectionContext,
    diagnostics: &mut Diagnostics,
) -> Result<SectionOutcome> {
    let totals = aggregate(&data, &plan)?;

    let mut sheet = Worksheet::new(name);
    let layout = LayoutWriter::new(&ctx.dictionary, &ctx.labels).write(
        &mut sheet,
        &data,
        &plan,
        &totals,
        &header,
        diagnostics,
    )?;

    let verdict = mark(
        &mut sheet,
        layout.grand_total_cell(),
        totals.grand_total_by_rows,
        totals.grand_total_by_columns,
        diagnostics,
    );
    style_section(&mut sheet, &data, &plan, &layout);

    info!(sheet = name, grand_total = totals.grand_total(), ?verdict, "section done");
    Ok(SectionOutcome {
        sheet,
        data,
        verdict,
        grand_total: totals.grand_total(),
    })
}

#[instrument(skip_all, fields(source = %direction.source.name(), code = direction.code))]
pub fn run_direction_section(
    direction: &Direction<'_>,
    ctx: &SectionContext,
    diagnostics: &mut Diagnostics,
) -> Result<SectionOutcome> {
    let segments = parse_header(direction.source, &ctx.header)?;
    let data = DataExtractor::new(&ctx.dictionary, ctx.extract.clone()).extract(
        direction.source,
        &segments,
        diagnostics,
    )?;
    let plan = ColumnPlan::new(data.segments(), true);

    let segment_labels = data
        .segments()
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            ctx.dictionary
                .segment_label(&segment.label, direction.code, index, diagnostics)
        })
        .collect();
    let header = SectionHeader::Segmented {
        title: direction.title.map(str::to_string),
        segment_labels,
    };

    finish(direction.output_name, data, plan, header, ctx, diagnostics)
}

/// Interval buckets of all directions summed per bucket label and vehicle
/// class. Buckets and classes keep the order they are first seen in.
pub fn merge_directions(sets: &[DataSet]) -> std::result::Result<DataSet, StructuralError> {
    let mut labels: Vec<String> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    let mut sums: BTreeMap<(usize, usize), f64> = BTreeMap::new();

    for data in sets {
        for (key, value) in data.iter() {
            let bucket = &data.buckets()[key.bucket];
            if bucket.kind != BucketKind::Interval {
                continue;
            }
            let bucket_index = match labels.iter().position(|l| *l == bucket.label) {
                Some(index) => index,
                None => {
                    labels.push(bucket.label.clone());
                    labels.len() - 1
                }
            };
            let category_index = match categories
                .iter()
                .position(|c| c.eq_ignore_ascii_case(&key.category))
            {
                Some(index) => index,
                None => {
                    categories.push(key.category.clone());
                    categories.len() - 1
                }
            };
            *sums.entry((bucket_index, category_index)).or_default() += value;
        }
    }

    let buckets = labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| Bucket {
            row: 4 + index as u32,
            label,
            kind: BucketKind::Interval,
        })
        .collect();
    let segment = SegmentSpec {
        label: RUNDOWN_SHEET.to_string(),
        categories: categories.clone(),
    };
    let mut merged = DataSet::new(RUNDOWN_SHEET, buckets, vec![segment]);
    for ((bucket, category), value) in sums {
        merged.insert(CategoryKey::new(bucket, 0, categories[category].clone()), value)?;
    }
    Ok(merged)
}

/// Total intensity rundown over every direction section.
#[instrument(skip_all, fields(directions = sets.len()))]
pub fn run_rundown_section(
    sets: &[DataSet],
    ctx: &SectionContext,
    diagnostics: &mut Diagnostics,
) -> Result<SectionOutcome> {
    let data = merge_directions(sets)?;
    let plan = ColumnPlan::new(data.segments(), false);
    finish(RUNDOWN_SHEET, data, plan, SectionHeader::Flat, ctx, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::fixtures::survey_sheet;
    use crate::grid::{CellValue, Shade};

    const MLN: &[&str] = &["Motorcycles", "Lights", "Single-Unit Trucks"];

    fn north() -> Worksheet {
        let mut sheet = survey_sheet(
            "Northbound",
            &[("1 - right", MLN), ("1 - left", MLN)],
            &[
                ("07:00".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
                ("07:15".into(), vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            ],
        );
        sheet.set(1, 2, "1 - Northbound");
        sheet
    }

    #[test]
    fn test_direction_section() {
        let source = north();
        let ctx = SectionContext::default();
        let mut diagnostics = Diagnostics::new();
        let direction = Direction {
            code: 1,
            source: &source,
            output_name: "1 - sever",
            title: Some("1 - sever"),
        };
        let outcome = run_direction_section(&direction, &ctx, &mut diagnostics).unwrap();

        assert_eq!(outcome.verdict, Verdict::Match);
        assert_eq!(outcome.grand_total, 27.0);
        let sheet = &outcome.sheet;
        assert_eq!(sheet.name(), "1 - sever");
        assert_eq!(sheet.cell(2, 2), &CellValue::from("1 - 1 doprava"));
        assert_eq!(sheet.cell(2, 6), &CellValue::from("1 - 2 dolava"));
        assert_eq!(sheet.cell(7, 10).as_number(), Some(27.0));
        assert_eq!(sheet.style(7, 10).unwrap().fill, Some(Shade::Green));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_rundown_merges_directions() {
        let ctx = SectionContext::default();
        let mut diagnostics = Diagnostics::new();
        let mut sets = Vec::new();
        for (code, name) in [(1, "1 - sever"), (2, "2 - juh")] {
            let source = north();
            let direction = Direction {
                code,
                source: &source,
                output_name: name,
                title: None,
            };
            sets.push(run_direction_section(&direction, &ctx, &mut diagnostics).unwrap().data);
        }

        let merged = merge_directions(&sets).unwrap();
        assert_eq!(merged.buckets().len(), 2);
        assert_eq!(merged.get(0, 0, "Motorcycles"), Some(10.0));
        assert_eq!(merged.get(1, 0, "Lights"), Some(4.0));

        let outcome = run_rundown_section(&sets, &ctx, &mut diagnostics).unwrap();
        assert_eq!(outcome.sheet.name(), RUNDOWN_SHEET);
        assert_eq!(outcome.grand_total, 54.0);
        assert_eq!(outcome.verdict, Verdict::Match);
        assert_eq!(outcome.sheet.cell(1, 2), &CellValue::from("M"));
    }
}
