//! Record filtering
//!
//! A record matches [`FilterCriteria`] when it passes both the text search and
//! the date range. Filtering borrows the source slice and returns references
//! in their original order; the snapshot itself is never touched.
//!
//! The search term is matched as typed (only lowercased); surrounding spaces
//! are part of the query. Phone numbers are matched as literal substrings.
//! `+7 900 555` will not match a query for `7900555`; callers wanting
//! normalised matching must normalise the query themselves.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::trace;

use crate::records::LogRecord;
use crate::timestamp::{end_of_day, parse_timestamp, start_of_day};

/// Active filter parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Case-insensitive substring; empty matches everything
    pub search_term: String,

    /// Inclusive lower bound, from the start of this day
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper bound, through the last millisecond of this day
    pub end_date: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Restrict to a single calendar day
    pub fn on_day(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self.end_date = Some(date);
        self
    }

    /// Whether no constraint is active
    pub fn is_empty(&self) -> bool {
        self.search_term.trim().is_empty() && self.start_date.is_none() && self.end_date.is_none()
    }

    pub fn has_date_bounds(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Lower and upper instants of the date range
    pub fn bounds(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        (
            self.start_date.map(start_of_day),
            self.end_date.map(end_of_day),
        )
    }

    /// Lowercased search term as typed, or empty when it is only whitespace
    fn needle(&self) -> String {
        if self.search_term.trim().is_empty() {
            String::new()
        } else {
            self.search_term.to_lowercase()
        }
    }

    /// Whether a single record passes these criteria
    pub fn matches<R: LogRecord + ?Sized>(&self, record: &R) -> bool {
        let needle = self.needle();
        let (lower, upper) = self.bounds();
        record_matches(record, &needle, lower, upper)
    }
}

/// Filter records, keeping their original relative order
///
/// # Example
///
/// ```rust
/// use devscope_core::filter::{filter, FilterCriteria};
/// use devscope_core::records::SmsRecord;
///
/// let records = vec![
///     SmsRecord { phone_number: "555-0100".into(), text: "hello".into(), ..Default::default() },
///     SmsRecord { phone_number: "900".into(), text: "Code 555".into(), ..Default::default() },
///     SmsRecord { phone_number: "123".into(), text: "bye".into(), ..Default::default() },
/// ];
///
/// let matching = filter(&records, &FilterCriteria::new().with_search("555"));
/// assert_eq!(matching.len(), 2);
/// assert_eq!(matching[0].phone_number, "555-0100");
/// ```
pub fn filter<'a, R: LogRecord>(records: &'a [R], criteria: &FilterCriteria) -> Vec<&'a R> {
    let needle = criteria.needle();
    let (lower, upper) = criteria.bounds();

    let matching: Vec<&R> = records
        .iter()
        .filter(|record| record_matches(*record, &needle, lower, upper))
        .collect();

    trace!(
        "Filtered {} records down to {} (search={:?}, from={:?}, to={:?})",
        records.len(),
        matching.len(),
        criteria.search_term,
        criteria.start_date,
        criteria.end_date
    );

    matching
}

fn record_matches<R: LogRecord + ?Sized>(
    record: &R,
    needle: &str,
    lower: Option<NaiveDateTime>,
    upper: Option<NaiveDateTime>,
) -> bool {
    text_matches(record, needle) && date_matches(record, lower, upper)
}

fn text_matches<R: LogRecord + ?Sized>(record: &R, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    record.phone_number().to_lowercase().contains(needle)
        || record
            .search_text()
            .is_some_and(|text| text.to_lowercase().contains(needle))
}

fn date_matches<R: LogRecord + ?Sized>(
    record: &R,
    lower: Option<NaiveDateTime>,
    upper: Option<NaiveDateTime>,
) -> bool {
    if lower.is_none() && upper.is_none() {
        return true;
    }

    // Unparseable timestamps cannot satisfy any bound
    let Some(ts) = parse_timestamp(record.timestamp()) else {
        return false;
    };

    lower.map_or(true, |lower| ts >= lower) && upper.map_or(true, |upper| ts <= upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CallLogRecord, SmsRecord};

    fn call(number: &str, contact: Option<&str>, ts: &str) -> CallLogRecord {
        CallLogRecord {
            phone_number: number.to_string(),
            contact_name: contact.map(str::to_string),
            timestamp: ts.to_string(),
            ..Default::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_empty_search_matches_all() {
        let records = vec![
            call("1", None, "2024-01-01 00:00:00"),
            call("2", None, "garbage"),
        ];
        assert_eq!(filter(&records, &FilterCriteria::new()).len(), 2);
        assert_eq!(
            filter(&records, &FilterCriteria::new().with_search("   ")).len(),
            2
        );
    }

    #[test]
    fn test_search_is_case_insensitive_over_contact() {
        let records = vec![
            call("111", Some("Anna Petrova"), ""),
            call("222", Some("Boris"), ""),
            call("333", None, ""),
        ];
        let matching = filter(&records, &FilterCriteria::new().with_search("ANNA"));
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].phone_number, "111");
    }

    #[test]
    fn test_search_over_sms_text() {
        let records = vec![SmsRecord {
            phone_number: "900".to_string(),
            text: "Balance: 100 RUB".to_string(),
            ..Default::default()
        }];
        assert_eq!(
            filter(&records, &FilterCriteria::new().with_search("balance")).len(),
            1
        );
    }

    #[test]
    fn test_search_term_spaces_are_significant() {
        let records = vec![
            call("111", Some("Anna Petrova"), ""),
            call("222", Some("Annabel"), ""),
        ];
        let matching = filter(&records, &FilterCriteria::new().with_search("Anna "));
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].phone_number, "111");
        assert!(FilterCriteria::new().with_search("Anna ").matches(&records[0]));
        assert!(!FilterCriteria::new().with_search("Anna ").matches(&records[1]));
    }

    #[test]
    fn test_phone_numbers_not_normalised() {
        let records = vec![call("+7 900 555-12-34", None, "")];
        assert!(filter(&records, &FilterCriteria::new().with_search("7900555")).is_empty());
        assert_eq!(
            filter(&records, &FilterCriteria::new().with_search("900 555")).len(),
            1
        );
    }

    #[test]
    fn test_end_date_is_inclusive_to_last_millisecond() {
        let records = vec![
            call("a", None, "2024-03-15 23:59:59.999"),
            call("b", None, "2024-03-16 00:00:00.000"),
        ];
        let criteria = FilterCriteria::new().with_end_date(date("2024-03-15"));
        let matching = filter(&records, &criteria);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].phone_number, "a");
    }

    #[test]
    fn test_start_date_is_inclusive() {
        let records = vec![
            call("a", None, "2024-03-14 23:59:59.999"),
            call("b", None, "2024-03-15 00:00:00"),
        ];
        let criteria = FilterCriteria::new().with_start_date(date("2024-03-15"));
        let matching = filter(&records, &criteria);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].phone_number, "b");
    }

    #[test]
    fn test_malformed_timestamp_excluded_only_by_date_bounds() {
        let records = vec![call("a", None, "sometime")];
        assert_eq!(filter(&records, &FilterCriteria::new()).len(), 1);
        assert!(filter(
            &records,
            &FilterCriteria::new().with_start_date(date("2000-01-01"))
        )
        .is_empty());
    }

    #[test]
    fn test_single_day() {
        let records = vec![
            call("a", None, "2024-03-14 12:00:00"),
            call("b", None, "2024-03-15 12:00:00"),
            call("c", None, "2024-03-16 12:00:00"),
        ];
        let criteria = FilterCriteria::new().on_day(date("2024-03-15"));
        let matching = filter(&records, &criteria);
        assert_eq!(matching.len(), 1);
        assert!(criteria.matches(&records[1]));
        assert!(!criteria.matches(&records[0]));
    }

    #[test]
    fn test_criteria_is_empty() {
        assert!(FilterCriteria::new().is_empty());
        assert!(FilterCriteria::new().with_search(" ").is_empty());
        assert!(!FilterCriteria::new().with_search("x").is_empty());
        assert!(!FilterCriteria::new().with_end_date(date("2024-01-01")).is_empty());
    }
}
