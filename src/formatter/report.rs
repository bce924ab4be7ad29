//! Whole-report orchestration: summary sheet, one section per direction
//! sheet in direction-code order, the total intensity rundown and, when the
//! survey has one, the class breakdown.

use tracing::{info, instrument, warn};

use crate::dictionary::{CategoryDictionary, split_leg_prefix};
use crate::formatter::breakdown::{find_breakdown_sheet, run_breakdown_section};
use crate::error::{Diagnostics, Result, StructuralError};
use crate::formatter::section::{
    Direction, SectionContext, run_direction_section, run_rundown_section,
};
use crate::formatter::summary::write_summary;
use crate::formatter::validate::Verdict;
use crate::grid::{Workbook, Worksheet};

const MAX_SHEET_NAME: usize = 31;
const DIRECTION_CODES: std::ops::RangeInclusive<u32> = 1..=6;

#[derive(Debug, Clone, PartialEq)]
pub struct SectionSummary {
    pub name: String,
    pub verdict: Verdict,
    pub grand_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub sections: Vec<SectionSummary>,
}

impl RunSummary {
    pub fn mismatches(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.verdict == Verdict::Mismatch)
            .count()
    }
}

/// A direction sheet found in the survey, before its section runs.
#[derive(Debug, Clone)]
struct Discovered<'a> {
    code: u32,
    source: &'a Worksheet,
    raw_title: String,
}

/// Makes `name` a valid, unused worksheet name.
fn sheet_name(name: &str, taken: &[String], fallback: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    let base = match cleaned.trim() {
        "" => fallback.to_string(),
        trimmed => trimmed.to_string(),
    };

    let is_taken = |candidate: &str| taken.iter().any(|t| t.eq_ignore_ascii_case(candidate));
    let mut candidate = base.clone();
    let mut n = 2;
    while is_taken(&candidate) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        candidate = base.chars().take(keep).collect::<String>() + &suffix;
        n += 1;
    }
    candidate
}

/// Sheets after the first whose name is a compass direction, ordered by the
/// direction code that starts cell B1.
fn discover_directions<'a>(
    source: &'a Workbook,
    dictionary: &CategoryDictionary,
) -> std::result::Result<Vec<Discovered<'a>>, StructuralError> {
    let mut found = Vec::new();
    for sheet in source.worksheets().iter().skip(1) {
        if !dictionary.is_compass_direction(sheet.name()) {
            continue;
        }
        let raw_title = sheet.cell(1, 2).to_string().trim().to_string();
        let code = match split_leg_prefix(&raw_title) {
            (Some(code), _) if DIRECTION_CODES.contains(&code) => code,
            _ => {
                let code = raw_title.split('-').next().unwrap_or_default().trim();
                return Err(StructuralError::UnknownDirectionCode {
                    sheet: sheet.name().to_string(),
                    code: code.to_string(),
                });
            }
        };
        found.push(Discovered {
            code,
            source: sheet,
            raw_title,
        });
    }
    if found.is_empty() {
        return Err(StructuralError::NoDirectionSheets);
    }
    found.sort_by_key(|d| d.code);
    Ok(found)
}

/// Builds the report workbook from a survey export.
#[instrument(skip_all, fields(sheets = source.len()))]
pub fn build_report(
    source: &Workbook,
    ctx: &SectionContext,
    diagnostics: &mut Diagnostics,
) -> Result<(Workbook, RunSummary)> {
    let first = source
        .worksheets()
        .first()
        .ok_or(StructuralError::EmptyWorkbook)?;

    let mut report = Workbook::new();
    let mut summary = RunSummary::default();
    let mut taken: Vec<String> = Vec::new();

    let sheet = write_summary(first)?;
    taken.push(sheet.name().to_string());
    report.push(sheet);

    let directions = discover_directions(source, &ctx.dictionary)?;
    info!(count = directions.len(), "direction sheets found");

    let mut sets = Vec::with_capacity(directions.len());
    for found in &directions {
        let title = ctx.dictionary.leg_label(&found.raw_title, diagnostics);
        let name = sheet_name(&found.raw_title, &taken, &found.code.to_string());
        let direction = Direction {
            code: found.code,
            source: found.source,
            output_name: &name,
            title: Some(&title),
        };
        let outcome = run_direction_section(&direction, ctx, diagnostics)?;
        if outcome.verdict == Verdict::Mismatch {
            warn!(sheet = %name, "grand totals disagree");
        }
        summary.sections.push(SectionSummary {
            name: name.clone(),
            verdict: outcome.verdict,
            grand_total: outcome.grand_total,
        });
        taken.push(name);
        report.push(outcome.sheet);
        sets.push(outcome.data);
    }

    let rundown = run_rundown_section(&sets, ctx, diagnostics)?;
    summary.sections.push(SectionSummary {
        name: rundown.sheet.name().to_string(),
        verdict: rundown.verdict,
        grand_total: rundown.grand_total,
    });
    report.push(rundown.sheet);

    match find_breakdown_sheet(source) {
        Some(sheet) => {
            let breakdown = run_breakdown_section(sheet, ctx, diagnostics)?;
            summary.sections.push(SectionSummary {
                name: breakdown.sheet.name().to_string(),
                verdict: breakdown.verdict,
                grand_total: breakdown.grand_total,
            });
            report.push(breakdown.sheet);
        }
        None => warn!("no class breakdown sheet in survey, section skipped"),
    }

    Ok((report, summary))
}
