//! Utility functions for date normalization.

use chrono::NaiveDate;

/// Parse a calendar date from user input, dropping any time component.
///
/// Accepts:
/// - YYYY-MM-DD
/// - RFC3339 datetime (local date of the given offset)
/// - naive datetime YYYY-MM-DDTHH:MM:SS
/// - DD/MM/YYYY
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.date());
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}

/// Current local calendar date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
