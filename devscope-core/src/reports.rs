//! PDF report requests
//!
//! Reports are rendered by the backend; this module only describes the
//! requests and names the resulting files. Four endpoints exist:
//!
//! | Request | Endpoint | Default file name |
//! |---------|----------|-------------------|
//! | [`CategoryReportRequest`] | `GET /generate-category-report` | `<category>_report_<date_after>.pdf` |
//! | [`PathReportRequest`] | `POST /report/generate/{category}` | `<category>_report.pdf` |
//! | call logs | `POST /report/calls/from_json` | `calls_report.pdf` |
//! | [`MessagesReportRequest`] | `GET /report/messages` | `messages_report.pdf` |
//!
//! A `Content-Disposition` filename sent by the server always wins over the
//! default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Duration, NaiveDate};

use crate::fs_utils::save_download;
use crate::{DeviceError, Result};

/// Default number of files included in a category report
pub const DEFAULT_REPORT_LIMIT: u32 = 10;

/// Largest limit the report form accepts
pub const MAX_REPORT_LIMIT: u32 = 1000;

/// How far back a new category report starts
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

pub const CALLS_REPORT_FILENAME: &str = "calls_report.pdf";
pub const MESSAGES_REPORT_FILENAME: &str = "messages_report.pdf";

/// File family a category report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportCategory {
    #[default]
    Images,
    Videos,
    Documents,
}

impl ReportCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCategory::Images => "images",
            ReportCategory::Videos => "videos",
            ReportCategory::Documents => "documents",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "images" | "photos" => Ok(ReportCategory::Images),
            "videos" => Ok(ReportCategory::Videos),
            "documents" => Ok(ReportCategory::Documents),
            other => Err(DeviceError::validation(
                "category",
                format!("Unknown report category: {}", other),
            )),
        }
    }
}

/// Parameters of `GET /generate-category-report`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReportRequest {
    pub category: ReportCategory,
    /// Required; files created on or after this date
    pub date_after: Option<NaiveDate>,
    pub date_before: Option<NaiveDate>,
    pub limit: u32,
}

impl CategoryReportRequest {
    /// Form defaults: images, the last 30 days, 10 files
    pub fn with_defaults(today: NaiveDate) -> Self {
        Self {
            category: ReportCategory::default(),
            date_after: Some(today - Duration::days(DEFAULT_LOOKBACK_DAYS)),
            date_before: None,
            limit: DEFAULT_REPORT_LIMIT,
        }
    }

    /// Reject the request before it reaches the backend
    pub fn validate(&self) -> Result<()> {
        let Some(date_after) = self.date_after else {
            return Err(DeviceError::validation("date_after", "Date after is required"));
        };

        if let Some(date_before) = self.date_before {
            if date_before < date_after {
                return Err(DeviceError::validation(
                    "date_before",
                    "Date before must not be earlier than date after",
                ));
            }
        }

        if self.limit == 0 || self.limit > MAX_REPORT_LIMIT {
            return Err(DeviceError::validation(
                "limit",
                format!("Limit must be between 1 and {}", MAX_REPORT_LIMIT),
            ));
        }

        Ok(())
    }

    /// Query string pairs; `date_before` only when set
    pub fn query(&self) -> Result<Vec<(&'static str, String)>> {
        self.validate()?;
        let mut query = vec![("category", self.category.as_str().to_string())];
        if let Some(date_after) = self.date_after {
            query.push(("date_after", date_after.format("%Y-%m-%d").to_string()));
        }
        if let Some(date_before) = self.date_before {
            query.push(("date_before", date_before.format("%Y-%m-%d").to_string()));
        }
        query.push(("limit", self.limit.to_string()));
        Ok(query)
    }

    pub fn default_filename(&self) -> String {
        match self.date_after {
            Some(date) => format!("{}_report_{}.pdf", self.category, date.format("%Y-%m-%d")),
            None => format!("{}_report.pdf", self.category),
        }
    }
}

/// Parameters of `POST /report/generate/{category}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathReportRequest {
    pub category: String,
    /// Device directory the files are taken from
    pub filter_path: String,
    pub limit: u32,
}

impl PathReportRequest {
    pub fn new(category: impl Into<String>, filter_path: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            filter_path: filter_path.into(),
            limit: DEFAULT_REPORT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(DeviceError::validation("category", "Category is required"));
        }
        if self.filter_path.trim().is_empty() {
            return Err(DeviceError::validation("filter_path", "Path is required"));
        }
        Ok(())
    }

    pub fn default_filename(&self) -> String {
        format!("{}_report.pdf", self.category.trim())
    }
}

/// Parameters of `GET /report/messages`
///
/// Mirrors the SMS page's filter: the search term goes out as `contact`, the
/// single-day filter as `date`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessagesReportRequest {
    pub contact: Option<String>,
    pub date: Option<NaiveDate>,
}

impl MessagesReportRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(contact) = self.contact.as_deref().map(str::trim) {
            if !contact.is_empty() {
                query.push(("contact", contact.to_string()));
            }
        }
        if let Some(date) = self.date {
            query.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        query
    }
}

/// A downloaded report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ReportFile {
    /// Name from `Content-Disposition` when present, else `default_name`
    pub fn new(content_disposition: Option<&str>, default_name: &str, bytes: Vec<u8>) -> Self {
        let filename = content_disposition
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| default_name.to_string());
        Self { filename, bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write into `dir` without overwriting an existing file
    pub async fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        save_download(dir, &self.filename, &self.bytes).await
    }
}

/// Extract the file name from a `Content-Disposition` header value
///
/// Handles quoted and bare values, and the RFC 5987 `filename*=UTF-8''...`
/// form (percent-escapes are left as sent).
///
/// # Example
///
/// ```rust
/// use devscope_core::reports::filename_from_content_disposition;
///
/// assert_eq!(
///     filename_from_content_disposition("attachment; filename=\"images_report.pdf\"").as_deref(),
///     Some("images_report.pdf")
/// );
/// assert_eq!(
///     filename_from_content_disposition("attachment; filename=calls.pdf; size=10").as_deref(),
///     Some("calls.pdf")
/// );
/// assert!(filename_from_content_disposition("inline").is_none());
/// ```
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let start = header.to_ascii_lowercase().find("filename")?;
    let rest = &header[start + "filename".len()..];
    let eq = rest.find('=')?;
    if rest[..eq].contains([';', '\n']) {
        return None;
    }

    let value = rest[eq + 1..].trim_start();
    let raw = match value.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &value[1..];
            inner.find(quote).map_or(inner, |end| &inner[..end])
        }
        _ => value.split([';', '\n']).next().unwrap_or(value),
    };

    let raw = raw.trim();
    let raw = match raw.find("''") {
        Some(pos) if raw[..pos].eq_ignore_ascii_case("utf-8") => &raw[pos + 2..],
        _ => raw,
    };
    let name: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_category_defaults() {
        let request = CategoryReportRequest::with_defaults(date(2024, 3, 31));
        assert_eq!(request.category, ReportCategory::Images);
        assert_eq!(request.date_after, Some(date(2024, 3, 1)));
        assert_eq!(request.limit, 10);
        assert_eq!(request.default_filename(), "images_report_2024-03-01.pdf");
    }

    #[test]
    fn test_date_after_required() {
        let request = CategoryReportRequest {
            date_after: None,
            ..CategoryReportRequest::with_defaults(date(2024, 3, 31))
        };
        match request.validate() {
            Err(DeviceError::Validation { field, message }) => {
                assert_eq!(field, "date_after");
                assert_eq!(message, "Date after is required");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(request.query().is_err());
    }

    #[test]
    fn test_category_query_pairs() {
        let request = CategoryReportRequest {
            category: ReportCategory::Videos,
            date_after: Some(date(2024, 1, 1)),
            date_before: Some(date(2024, 2, 1)),
            limit: 25,
        };
        assert_eq!(
            request.query().unwrap(),
            vec![
                ("category", "videos".to_string()),
                ("date_after", "2024-01-01".to_string()),
                ("date_before", "2024-02-01".to_string()),
                ("limit", "25".to_string()),
            ]
        );
    }

    #[test]
    fn test_inverted_range_and_limit_rejected() {
        let mut request = CategoryReportRequest::with_defaults(date(2024, 3, 31));
        request.date_before = Some(date(2024, 2, 1));
        assert!(request.validate().is_err());

        let mut request = CategoryReportRequest::with_defaults(date(2024, 3, 31));
        request.limit = 0;
        assert!(request.validate().is_err());
        request.limit = MAX_REPORT_LIMIT + 1;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Photos".parse::<ReportCategory>().unwrap(), ReportCategory::Images);
        assert_eq!("documents".parse::<ReportCategory>().unwrap(), ReportCategory::Documents);
        assert!("music".parse::<ReportCategory>().is_err());
    }

    #[test]
    fn test_messages_query_skips_blank() {
        let request = MessagesReportRequest {
            contact: Some("  ".to_string()),
            date: Some(date(2024, 3, 15)),
        };
        assert_eq!(request.query(), vec![("date", "2024-03-15".to_string())]);
        assert!(MessagesReportRequest::default().query().is_empty());
    }

    #[test]
    fn test_path_report() {
        let request = PathReportRequest::new("images", "/sdcard/DCIM").with_limit(5);
        assert!(request.validate().is_ok());
        assert_eq!(request.default_filename(), "images_report.pdf");
        assert!(PathReportRequest::new("images", " ").validate().is_err());
    }

    #[test]
    fn test_content_disposition_variants() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename='a b.pdf'").as_deref(),
            Some("a b.pdf")
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename*=UTF-8''report.pdf").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(
            filename_from_content_disposition("attachment; FILENAME=x.pdf").as_deref(),
            Some("x.pdf")
        );
        assert!(filename_from_content_disposition("attachment; filename=").is_none());
    }

    #[test]
    fn test_report_file_naming() {
        let file = ReportFile::new(None, CALLS_REPORT_FILENAME, vec![1, 2, 3]);
        assert_eq!(file.filename, "calls_report.pdf");
        assert_eq!(file.len(), 3);

        let file = ReportFile::new(
            Some("attachment; filename=images_report.pdf"),
            "fallback.pdf",
            Vec::new(),
        );
        assert_eq!(file.filename, "images_report.pdf");
        assert!(file.is_empty());
    }

    #[test]
    fn test_save_twice_keeps_both() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = ReportFile::new(None, MESSAGES_REPORT_FILENAME, b"%PDF-1.4".to_vec());

        let first = tokio_test::block_on(file.save_to(dir.path())).unwrap();
        let second = tokio_test::block_on(file.save_to(dir.path())).unwrap();

        assert_eq!(first, dir.path().join("messages_report.pdf"));
        assert_eq!(second, dir.path().join("messages_report (1).pdf"));
        assert_eq!(std::fs::read(&second).unwrap(), b"%PDF-1.4");
    }
}
