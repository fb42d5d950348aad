//! Conversions between typed values and the strings text inputs hold.
//!
//! `*_serialize` produces the input string; `*_deserialize` reads it back.
//! Empty input is the "no value" case throughout.

use chrono::{NaiveDate, NaiveDateTime};

/// Input format of a date field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Input format of a datetime field (minute precision).
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Wire formats accepted when reading dates.
const DATE_FORMATS: [&str; 2] = [DATE_FORMAT, "%Y/%m/%d"];

/// Wire formats accepted when reading datetimes.
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    DATETIME_FORMAT,
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub fn date_serialize(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

/// Parse a date input. Text after the tenth character (a time part) is
/// ignored.
pub fn date_deserialize(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let head = value.get(..10).unwrap_or(value);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok())
}

pub fn datetime_serialize(datetime: Option<NaiveDateTime>) -> String {
    datetime
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse a datetime input. A trailing `Z` or UTC offset is dropped; the
/// value is taken as local wall-clock time.
pub fn datetime_deserialize(value: &str) -> Option<NaiveDateTime> {
    let value = strip_offset(value.trim());
    if value.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn strip_offset(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    // +HH:MM / -HH:MM after the time part
    if value.len() > 16
        && let Some(idx) = value.rfind(['+', '-'])
        && idx > 10
    {
        return &value[..idx];
    }
    value
}

pub fn nullable_serialize(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

pub fn nullable_deserialize(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

pub fn number_serialize(number: Option<f64>) -> String {
    number.map(|n| n.to_string()).unwrap_or_default()
}

/// Parse a number input; empty or unparseable input reads as `0`.
pub fn number_deserialize(value: &str) -> f64 {
    parse_number(value).unwrap_or(0.0)
}

/// Parse a number input; empty or unparseable input reads as no value.
pub fn number_nullable_deserialize(value: Option<&str>) -> Option<f64> {
    value.and_then(parse_number)
}

fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}
