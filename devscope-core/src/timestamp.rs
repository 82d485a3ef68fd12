//! Timestamp and date-bound handling for record filtering
//!
//! Backend timestamps are wall-clock strings in the phone's local time. They
//! are compared as naive date-times, so a day always runs from 00:00:00.000 to
//! 23:59:59.999 regardless of DST transitions on that day.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Wall-clock formats the backend is known to emit, most specific first
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Parse a record timestamp
///
/// Returns `None` for anything unrecognised; such records can never satisfy a
/// date bound. Offsets in RFC 3339 input are dropped and the written
/// wall-clock time kept.
///
/// # Example
///
/// ```rust
/// use devscope_core::timestamp::parse_timestamp;
///
/// let ts = parse_timestamp("2024-03-15 14:22:10").unwrap();
/// assert_eq!(ts.to_string(), "2024-03-15 14:22:10");
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    parse_date(raw).map(start_of_day)
}

/// Parse a filter date (`YYYY-MM-DD`, or `DD.MM.YYYY`)
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// First instant of `date`
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last millisecond of `date`: start of day + 24h - 1ms
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::hours(24) - Duration::milliseconds(1)
}
