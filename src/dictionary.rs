//! Source vocabulary → report vocabulary.
//!
//! The survey tool labels vehicle classes, turn movements and compass
//! directions in English; the report uses short class codes and Slovak
//! text. Lookups are case-insensitive. A label with no entry is passed
//! through unchanged and recorded as a [`DiagnosticKind::CategoryMatch`]
//! diagnostic, never an error.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{DiagnosticKind, Diagnostics};

static VEHICLE_CLASSES: &[(&str, &str)] = &[
    ("motorcycles", "M"),
    ("lights", "LV"),
    ("single-unit trucks", "NV"),
    ("articulated trucks", "TNV"),
    ("buses", "A"),
    ("bicycles on road", "B"),
    ("articulated buses", "AK"),
    ("pedestrians", "CH"),
];

static MOVEMENTS: &[(&str, &str)] = &[
    ("right", "doprava"),
    ("left", "dolava"),
    ("thru", "priamo"),
    ("u-turn", "otočenie"),
    ("hard right", "prudko doprava"),
    ("hard left", "prudko doľava"),
    ("slight right", "mierne doprava"),
    ("slight left", "mierne doľava"),
    ("bear right", "mierne doprava"),
    ("bear left", "mierne doľava"),
];

static COMPASS: &[(&str, &str)] = &[
    ("north", "sever"),
    ("north-northeast", "sever-severovýchod"),
    ("northeast", "severovýchod"),
    ("east-northeast", "východ-severovýchod"),
    ("east", "východ"),
    ("east-southeast", "východ-juhovýchod"),
    ("southeast", "juhovýchod"),
    ("south-southeast", "juh-juhovýchod"),
    ("south", "juh"),
    ("south-southwest", "juh-juhozápad"),
    ("southwest", "juhozápad"),
    ("west-southwest", "západ-juhozápad"),
    ("west", "západ"),
    ("west-northwest", "západ-severozápad"),
    ("northwest", "severozápad"),
    ("north-northwest", "sever-severozápad"),
];

static SUMMARY: &[(&str, &str)] = &[
    ("spolu", "Spolu"),
    ("total", "Spolu"),
    ("app total", "Spolu"),
    ("int total", "Celkom"),
    ("grand total", "Spolu sk.voz."),
    ("% approach", "% pomer na smer"),
    ("% total", "% celkový pomer"),
    ("leg", "Smer od"),
    ("direction", "Orientácia"),
    ("start time", "Čas"),
];

const UTURN: &str = "u-turn";

/// Fixed report text that does not come from the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLabels {
    pub time: String,
    pub subtotal: String,
    pub grand_total: String,
    /// Row 1 and row 2 captions of the class breakdown sheet.
    pub leg: String,
    pub orientation: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            time: "Čas".to_string(),
            subtotal: "Spolu".to_string(),
            grand_total: "Suma".to_string(),
            leg: "Smer od".to_string(),
            orientation: "Orientácia".to_string(),
        }
    }
}

/// Extra or replacement entries, read from a JSON file.
///
/// ```json
/// { "vehicle_classes": { "trams": "T" }, "movements": { "right": "vpravo" } }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DictionaryOverrides {
    pub vehicle_classes: HashMap<String, String>,
    pub movements: HashMap<String, String>,
    pub compass: HashMap<String, String>,
    pub summary: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CategoryDictionary {
    vehicle_classes: HashMap<String, String>,
    movements: HashMap<String, String>,
    compass: HashMap<String, String>,
    summary: HashMap<String, String>,
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (normalize(k), v.to_string()))
        .collect()
}

fn merge_into(target: &mut HashMap<String, String>, extra: HashMap<String, String>) {
    target.extend(extra.into_iter().map(|(k, v)| (normalize(&k), v)));
}

/// Splits `"1 - right"` into `(Some(1), "right")`. Labels without a numeric
/// prefix are returned whole.
pub fn split_leg_prefix(raw: &str) -> (Option<u32>, &str) {
    match raw.split_once('-') {
        Some((head, tail)) => match head.trim().parse::<u32>() {
            Ok(leg) => (Some(leg), tail.trim()),
            Err(_) => (None, raw.trim()),
        },
        None => (None, raw.trim()),
    }
}

/// Drops a trailing "bound" (`"Northbound"` → `"North"`).
fn strip_bound(name: &str) -> &str {
    let trimmed = name.trim();
    let cut = trimmed.len().saturating_sub(5);
    if trimmed.len() >= 5
        && trimmed.is_char_boundary(cut)
        && trimmed[cut..].eq_ignore_ascii_case("bound")
    {
        trimmed[..cut].trim()
    } else {
        trimmed
    }
}

impl Default for CategoryDictionary {
    fn default() -> Self {
        Self {
            vehicle_classes: table(VEHICLE_CLASSES),
            movements: table(MOVEMENTS),
            compass: table(COMPASS),
            summary: table(SUMMARY),
        }
    }
}

impl CategoryDictionary {
    pub fn with_overrides(mut self, overrides: DictionaryOverrides) -> Self {
        merge_into(&mut self.vehicle_classes, overrides.vehicle_classes);
        merge_into(&mut self.movements, overrides.movements);
        merge_into(&mut self.compass, overrides.compass);
        merge_into(&mut self.summary, overrides.summary);
        self
    }

    fn translate(
        table: &HashMap<String, String>,
        what: &str,
        label: &str,
        diagnostics: &mut Diagnostics,
    ) -> String {
        match table.get(&normalize(label)) {
            Some(found) => found.clone(),
            None => {
                diagnostics.push(
                    DiagnosticKind::CategoryMatch,
                    format!("no {what} match found for '{label}'"),
                );
                label.to_string()
            }
        }
    }

    /// Short class code (`"Motorcycles"` → `"M"`).
    pub fn vehicle_code(&self, label: &str, diagnostics: &mut Diagnostics) -> String {
        Self::translate(&self.vehicle_classes, "vehicle class", label, diagnostics)
    }

    /// Turn movement text (`"Right"` → `"doprava"`).
    pub fn movement(&self, label: &str, diagnostics: &mut Diagnostics) -> String {
        Self::translate(&self.movements, "movement", label, diagnostics)
    }

    /// Compass direction name, with or without a "bound" suffix.
    pub fn compass(&self, label: &str, diagnostics: &mut Diagnostics) -> String {
        match self.compass.get(&normalize(strip_bound(label))) {
            Some(found) => found.clone(),
            None => Self::translate(&self.compass, "compass direction", label, diagnostics),
        }
    }

    pub fn is_compass_direction(&self, name: &str) -> bool {
        self.compass.contains_key(&normalize(strip_bound(name)))
    }

    /// Report text for a summary row/column label such as "App Total".
    /// Returns `None` for anything that is not a summary label.
    pub fn summary_label(&self, label: &str) -> Option<&str> {
        self.summary.get(&normalize(label)).map(String::as_str)
    }

    pub fn is_summary(&self, label: &str) -> bool {
        self.summary_label(label).is_some()
    }

    /// Report label of the `index`-th (0-based) movement segment of leg `leg`.
    ///
    /// `"1 - right"` at index 0 of leg 2 becomes `"2 - 1 doprava"`: the leg
    /// always comes from the direction sheet, never from the source prefix.
    /// A u-turn repeats the leg number (`"2 - 2 otočenie"`). Unknown
    /// movements are returned verbatim.
    pub fn segment_label(
        &self,
        raw: &str,
        leg: u32,
        index: usize,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let (_, movement) = split_leg_prefix(raw);
        match self.movements.get(&normalize(movement)) {
            Some(translation) if normalize(movement) == UTURN => {
                format!("{leg} - {leg} {translation}")
            }
            Some(translation) => format!("{leg} - {} {translation}", index + 1),
            None => {
                diagnostics.push(
                    DiagnosticKind::CategoryMatch,
                    format!("no movement match found for '{raw}'"),
                );
                raw.trim().to_string()
            }
        }
    }

    /// Leg title such as `"1 - Northbound"` → `"1 - sever"`.
    pub fn leg_label(&self, raw: &str, diagnostics: &mut Diagnostics) -> String {
        match split_leg_prefix(raw) {
            (Some(leg), rest) if !rest.is_empty() => {
                format!("{leg} - {}", self.compass(rest, diagnostics))
            }
            (Some(leg), _) => leg.to_string(),
            (None, rest) => self.compass(rest, diagnostics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_code_is_case_insensitive() {
        let dict = CategoryDictionary::default();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(dict.vehicle_code("Motorcycles", &mut diagnostics), "M");
        assert_eq!(dict.vehicle_code("motorcycles", &mut diagnostics), "M");
        assert_eq!(dict.vehicle_code(" SINGLE-UNIT TRUCKS ", &mut diagnostics), "NV");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unmatched_label_passes_through_with_one_diagnostic() {
        let dict = CategoryDictionary::default();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(dict.vehicle_code("Trams", &mut diagnostics), "Trams");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::CategoryMatch), 1);
    }

    #[test]
    fn test_segment_labels() {
        let dict = CategoryDictionary::default();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(dict.segment_label("1 - right", 1, 0, &mut diagnostics), "1 - 1 doprava");
        assert_eq!(dict.segment_label("Thru", 2, 2, &mut diagnostics), "2 - 3 priamo");
        assert_eq!(dict.segment_label("U-Turn", 3, 3, &mut diagnostics), "3 - 3 otočenie");
        assert!(diagnostics.is_empty());

        // the direction sheet decides the leg, whatever the source prefix says
        assert_eq!(dict.segment_label("1 - right", 2, 0, &mut diagnostics), "2 - 1 doprava");
        assert_eq!(dict.segment_label("1 - u-turn", 2, 3, &mut diagnostics), "2 - 2 otočenie");

        assert_eq!(dict.segment_label("1 - sideways", 1, 0, &mut diagnostics), "1 - sideways");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_split_leg_prefix() {
        assert_eq!(split_leg_prefix("1 - u-turn"), (Some(1), "u-turn"));
        assert_eq!(split_leg_prefix("u-turn"), (None, "u-turn"));
        assert_eq!(split_leg_prefix("left"), (None, "left"));
    }

    #[test]
    fn test_compass_accepts_bound_suffix() {
        let dict = CategoryDictionary::default();
        let mut diagnostics = Diagnostics::new();
        assert!(dict.is_compass_direction("Northbound"));
        assert!(dict.is_compass_direction(" south-southwest "));
        assert!(!dict.is_compass_direction("Summary"));
        assert_eq!(dict.compass("Eastbound", &mut diagnostics), "východ");
        assert_eq!(dict.leg_label("2 - Westbound", &mut diagnostics), "2 - západ");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_summary_labels() {
        let dict = CategoryDictionary::default();
        assert_eq!(dict.summary_label("App Total"), Some("Spolu"));
        assert_eq!(dict.summary_label("INT TOTAL"), Some("Celkom"));
        assert!(!dict.is_summary("lights"));
    }

    #[test]
    fn test_overrides_extend_and_replace() {
        let mut overrides = DictionaryOverrides::default();
        overrides.vehicle_classes.insert("Trams".into(), "T".into());
        overrides.movements.insert("RIGHT".into(), "vpravo".into());
        let dict = CategoryDictionary::default().with_overrides(overrides);
        let mut diagnostics = Diagnostics::new();

        assert_eq!(dict.vehicle_code("trams", &mut diagnostics), "T");
        assert_eq!(dict.segment_label("Right", 1, 0, &mut diagnostics), "1 - 1 vpravo");
        assert_eq!(dict.movement("RIGHT", &mut diagnostics), "vpravo");
        assert_eq!(dict.vehicle_code("lights", &mut diagnostics), "LV");
        assert!(diagnostics.is_empty());
    }
}
