//! Storage table parsing
//!
//! Input is `df` output for the data partition:
//!
//! ```text
//! Filesystem       1K-blocks    Used Available Use% Mounted on
//! /dev/block/dm-0   59762708 9226312  50536396  16% /data
//! ```
//!
//! The second non-blank line supplies total, used and available kilobytes and
//! the used percentage. Any deviation (too few lines, too few fields,
//! non-numeric values) leaves the summary unset.

use tracing::debug;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Parsed storage table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageSummary {
    pub total_kb: u64,
    pub used_kb: u64,
    pub available_kb: u64,
    /// Percentage from the `Use%` column, as reported
    pub used_percent: u8,
}

impl StorageSummary {
    pub fn total_display(&self) -> String {
        format_kilobytes(self.total_kb)
    }

    pub fn used_display(&self) -> String {
        format_kilobytes(self.used_kb)
    }

    pub fn available_display(&self) -> String {
        format_kilobytes(self.available_kb)
    }
}

/// Render a kilobyte count in the largest fitting unit
///
/// # Example
///
/// ```rust
/// use devscope_core::status::storage::format_kilobytes;
///
/// assert_eq!(format_kilobytes(512), "512 KB");
/// assert_eq!(format_kilobytes(1536), "1.50 MB");
/// assert_eq!(format_kilobytes(59762708), "56.99 GB");
/// ```
pub fn format_kilobytes(kb: u64) -> String {
    if kb >= MIB {
        format!("{:.2} GB", kb as f64 / MIB as f64)
    } else if kb >= KIB {
        format!("{:.2} MB", kb as f64 / KIB as f64)
    } else {
        format!("{} KB", kb)
    }
}

/// Parse a `df` table
pub fn parse_storage(text: &str) -> Option<StorageSummary> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(data_line) = lines.nth(1) else {
        debug!("Storage table has no data line");
        return None;
    };

    let fields: Vec<&str> = data_line.split_whitespace().collect();
    if fields.len() < 5 {
        debug!("Storage data line has {} fields, expected at least 5", fields.len());
        return None;
    }

    let summary = parse_fields(&fields);
    if summary.is_none() {
        debug!("Storage data line is not numeric: {:?}", data_line);
    }
    summary
}

fn parse_fields(fields: &[&str]) -> Option<StorageSummary> {
    Some(StorageSummary {
        total_kb: fields.get(1)?.parse().ok()?,
        used_kb: fields.get(2)?.parse().ok()?,
        available_kb: fields.get(3)?.parse().ok()?,
        used_percent: fields.get(4)?.trim_end_matches('%').parse().ok()?,
    })
}
