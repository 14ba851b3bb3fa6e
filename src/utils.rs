//! Small shared helpers for dates and numbers.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{ConsoleError, Result};

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Short weekday name of a calendar date, Sunday through Saturday.
#[must_use]
pub fn weekday_label(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Sun => "Sun",
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| ConsoleError::Validation(format!("Invalid date format: {raw} ({e})")))
}

/// Parse an optional `YYYY-MM-DD` date; `None` and blank strings give `None`.
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some),
    }
}
