//! Display formatting shared by the result and attendance views.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Confidence in [0, 1] as a percentage with one decimal, e.g. `0.873` → `"87.3"`.
///
/// Ties round away from zero.
pub fn confidence_percent(confidence: f64) -> String {
    let tenths = (confidence * 100.0 * 10.0).round() / 10.0;
    format!("{tenths:.1}")
}

/// Parse the calendar date out of a server date string.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, and RFC 3339 timestamps.
/// For timestamps the date is taken as written, with no timezone shift.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

/// Long en-US date, e.g. `"2024-01-01"` → `"Monday, January 1, 2024"`.
pub fn long_date(raw: &str) -> String {
    match parse_calendar_date(raw) {
        Some(date) => date.format("%A, %B %-d, %Y").to_string(),
        None => {
            tracing::debug!(raw, "unparseable attendance date");
            "Invalid Date".to_string()
        }
    }
}
