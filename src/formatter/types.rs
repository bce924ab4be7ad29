//! Data types shared by the section pipeline stages.

use std::collections::BTreeMap;

use crate::error::StructuralError;

/// One category label inside a header segment, `offset` columns from its start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubLabel {
    pub offset: u32,
    pub label: String,
}

/// A direction/leg column block discovered in the source header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSegment {
    pub start_column: u32,
    pub span_width: u32,
    pub label: String,
    pub sub_labels: Vec<SubLabel>,
}

impl HeaderSegment {
    pub fn end_column(&self) -> u32 {
        self.start_column + self.span_width - 1
    }

    pub fn contains(&self, column: u32) -> bool {
        (self.start_column..=self.end_column()).contains(&column)
    }

    pub fn sub_label(&self, offset: u32) -> Option<&str> {
        self.sub_labels
            .iter()
            .find(|s| s.offset == offset)
            .map(|s| s.label.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKind {
    /// A measured time interval.
    Interval,
    /// A summary row already present in the source ("Grand Total").
    Subtotal,
    /// A share row ("% Approach"); values are fractions.
    Percentage,
}

/// One body row of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub row: u32,
    pub label: String,
    pub kind: BucketKind,
}

/// Identity of one numeric datum within a parse pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryKey {
    pub bucket: usize,
    pub segment: usize,
    pub category: String,
}

impl CategoryKey {
    pub fn new(bucket: usize, segment: usize, category: impl Into<String>) -> Self {
        Self {
            bucket,
            segment,
            category: category.into(),
        }
    }
}

/// A segment as the report sees it: its source label and ordered categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSpec {
    pub label: String,
    pub categories: Vec<String>,
}

/// Positional entry of a projected body row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry {
    Value(f64),
    /// Closes a segment; occupies that segment's subtotal column.
    SegmentEnd,
}

/// Extracted numeric body of one section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    sheet: String,
    buckets: Vec<Bucket>,
    segments: Vec<SegmentSpec>,
    values: BTreeMap<CategoryKey, f64>,
}

impl DataSet {
    pub fn new(sheet: impl Into<String>, buckets: Vec<Bucket>, segments: Vec<SegmentSpec>) -> Self {
        Self {
            sheet: sheet.into(),
            buckets,
            segments,
            values: BTreeMap::new(),
        }
    }

    /// Records one value. Each key may be recorded once.
    pub fn insert(&mut self, key: CategoryKey, value: f64) -> Result<(), StructuralError> {
        if self.values.contains_key(&key) {
            return Err(StructuralError::DuplicateKey {
                sheet: self.sheet.clone(),
                bucket: key.bucket,
                segment: key.segment,
                category: key.category,
            });
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn get(&self, bucket: usize, segment: usize, category: &str) -> Option<f64> {
        self.values
            .get(&CategoryKey::new(bucket, segment, category))
            .copied()
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn segments(&self) -> &[SegmentSpec] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CategoryKey, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    /// Projects one bucket into report column order: every segment's
    /// categories, each segment followed by [`Entry::SegmentEnd`] when
    /// `with_subtotals` is set. Missing values project as zero.
    pub fn entries(&self, bucket: usize, with_subtotals: bool) -> Vec<Entry> {
        let mut row = Vec::new();
        for (segment, spec) in self.segments.iter().enumerate() {
            for category in &spec.categories {
                let value = self.get(bucket, segment, category).unwrap_or(0.0);
                row.push(Entry::Value(value));
            }
            if with_subtotals {
                row.push(Entry::SegmentEnd);
            }
        }
        row
    }
}

/// What the aggregator and layout expect at one report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Category { segment: usize, index: usize },
    Subtotal { segment: usize },
}

/// Report columns of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub segment: usize,
    pub first_column: u32,
    pub categories: Vec<String>,
    pub subtotal_column: Option<u32>,
}

impl Block {
    pub fn category_column(&self, index: usize) -> u32 {
        self.first_column + index as u32
    }

    pub fn last_column(&self) -> u32 {
        self.subtotal_column
            .unwrap_or(self.first_column + self.categories.len() as u32 - 1)
    }

    pub fn width(&self) -> u32 {
        self.last_column() - self.first_column + 1
    }
}

/// Output column geometry of a section, computed once and shared by the
/// aggregator, layout writer and stylist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    blocks: Vec<Block>,
    total_column: u32,
    with_subtotals: bool,
}

impl ColumnPlan {
    /// Column 1 is reserved for time buckets.
    pub const FIRST_COLUMN: u32 = 2;

    pub fn new(segments: &[SegmentSpec], with_subtotals: bool) -> Self {
        let mut column = Self::FIRST_COLUMN;
        let mut blocks = Vec::with_capacity(segments.len());
        for (segment, spec) in segments.iter().enumerate() {
            let first_column = column;
            column += spec.categories.len() as u32;
            let subtotal_column = with_subtotals.then(|| {
                column += 1;
                column - 1
            });
            blocks.push(Block {
                segment,
                first_column,
                categories: spec.categories.clone(),
                subtotal_column,
            });
        }
        Self {
            blocks,
            total_column: column,
            with_subtotals,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The per-bucket grand total column, right of every block.
    pub fn total_column(&self) -> u32 {
        self.total_column
    }

    pub fn with_subtotals(&self) -> bool {
        self.with_subtotals
    }

    /// Every report column between the time column and the total column.
    pub fn positions(&self) -> Vec<Position> {
        let mut positions = Vec::new();
        for block in &self.blocks {
            positions.extend((0..block.categories.len()).map(|index| Position::Category {
                segment: block.segment,
                index,
            }));
            if block.subtotal_column.is_some() {
                positions.push(Position::Subtotal {
                    segment: block.segment,
                });
            }
        }
        positions
    }
}

/// Derived totals of one section. Never mutated after computation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateResult {
    /// Bucket index → sum of its category values.
    pub row_totals: BTreeMap<usize, f64>,
    /// (bucket, segment) → value of the segment's subtotal column.
    pub subtotals: BTreeMap<(usize, usize), f64>,
    /// (segment, category) → sum over interval buckets.
    pub column_totals: BTreeMap<(usize, String), f64>,
    /// Segment → sum of its subtotal column over interval buckets.
    pub subtotal_column_totals: BTreeMap<usize, f64>,
    pub grand_total_by_rows: f64,
    pub grand_total_by_columns: f64,
}

impl AggregateResult {
    pub fn grand_total(&self) -> f64 {
        self.grand_total_by_rows
    }
}
