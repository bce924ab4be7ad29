use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

static TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

static DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Converts a spreadsheet serial date (days since 1899-12-30) to a date-time.
/// Returns `None` for negative or non-finite serials.
pub fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * MILLIS_PER_DAY).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Parses a time of day from either a bare time or a full date-time text.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(text, f).ok())
        .or_else(|| parse_date_time(text).map(|dt| dt.time()))
}

/// Parses a full date-time text in any of the export's date formats.
pub fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
}

/// Parses a pre-formatted `"HH:mm - HH:mm"` interval label.
pub fn parse_interval(text: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = text.split_once('-')?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    Some((start, end))
}

pub fn format_interval(start: NaiveTime, end: NaiveTime) -> String {
    format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
}

/// Time from `start` to `next`, wrapping past midnight.
pub fn interval_length(start: NaiveTime, next: NaiveTime) -> TimeDelta {
    let delta = next.signed_duration_since(start);
    if delta <= TimeDelta::zero() {
        delta + TimeDelta::days(1)
    } else {
        delta
    }
}

/// Whether an interval label ends on a full hour (`"07:45 - 08:00"`).
pub fn ends_on_hour(label: &str) -> bool {
    parse_interval(label)
        .map(|(_, end)| end.minute() == 0)
        .unwrap_or(false)
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serial() {
        // 2024-05-01 07:15
        let dt = from_serial(45413.302083333336).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-05-01 07:15");
        assert_eq!(
            from_serial(0.5).unwrap().format("%H:%M").to_string(),
            "12:00"
        );
        assert!(from_serial(-1.0).is_none());
        assert!(from_serial(f64::NAN).is_none());
    }

    #[test]
    fn test_parse_time_variants() {
        let seven = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        assert_eq!(parse_time("07:00"), Some(seven));
        assert_eq!(parse_time("2024-05-01 07:00:00"), Some(seven));
        assert_eq!(parse_time("5/1/2024 7:00 AM"), Some(seven));
        assert_eq!(parse_time("Grand Total"), None);
    }

    #[test]
    fn test_parse_interval() {
        let (start, end) = parse_interval("07:45 - 08:00").unwrap();
        assert_eq!(format_interval(start, end), "07:45 - 08:00");
        assert!(parse_interval("07:45").is_none());
        assert!(ends_on_hour("07:45 - 08:00"));
        assert!(!ends_on_hour("07:30 - 07:45"));
    }

    #[test]
    fn test_interval_length_wraps_midnight() {
        let a = NaiveTime::from_hms_opt(23, 45, 0).unwrap();
        let b = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(interval_length(a, b), TimeDelta::minutes(15));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.12345), 0.12);
        assert_eq!(round2(0.678), 0.68);
    }
}
