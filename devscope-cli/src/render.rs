//! Plain-text rendering of dashboard views

use std::fmt::Write as _;

use devscope_core::files::{FileCatalog, FileCategory};
use devscope_core::status::{DeviceStatus, GpsCoordinates, UNKNOWN};
use devscope_core::{CallLogRecord, Page, SmsRecord};

/// Longest message body shown in the SMS table
const MAX_TEXT_WIDTH: usize = 60;

/// Left-aligned text table sized to its widest cells
struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let header: Vec<String> = self.headers.iter().map(|h| h.to_string()).collect();
        write_row(&mut out, &widths, &header);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_row(&mut out, &widths, &rule);
        for row in &self.rows {
            write_row(&mut out, &widths, row);
        }
        out
    }
}

fn write_row(out: &mut String, widths: &[usize], cells: &[String]) {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let pad = width.saturating_sub(cell.chars().count());
        line.push_str(cell);
        line.extend(std::iter::repeat(' ').take(pad));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        flat
    } else {
        let mut cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// "Showing 11-20 of 42 (page 2 of 5)"
fn page_footer<T>(page: &Page<T>, noun: &str) -> String {
    if page.total_count == 0 {
        return format!("No {} found", noun);
    }
    format!(
        "Showing {}-{} of {} {} (page {} of {})",
        page.first_row(),
        page.last_row(),
        page.total_count,
        noun,
        page.page_number,
        page.total_pages
    )
}

pub fn calls_table(page: &Page<&CallLogRecord>) -> String {
    let mut table = Table::new(vec!["Date", "Number", "Contact", "Type", "Duration", "Country", "Flags"]);
    for call in &page.items {
        let mut flags = Vec::new();
        if call.is_new() {
            flags.push("new");
        }
        if call.is_missed() {
            flags.push("missed");
        }
        table.push(vec![
            or_dash(&call.timestamp),
            or_dash(&call.phone_number),
            or_dash(call.contact_name.as_deref().unwrap_or("")),
            call.call_type.display_label().to_string(),
            or_dash(&call.duration_display),
            or_dash(&call.country),
            flags.join(","),
        ]);
    }

    let mut out = table.render();
    out.push_str(&page_footer(page, "calls"));
    out.push('\n');
    out
}

pub fn sms_table(page: &Page<&SmsRecord>) -> String {
    let mut table = Table::new(vec!["Date", "Number", "Type", "Text"]);
    for message in &page.items {
        table.push(vec![
            or_dash(&message.timestamp),
            or_dash(&message.phone_number),
            message.message_type.display_label().to_string(),
            truncate(&message.text, MAX_TEXT_WIDTH),
        ]);
    }

    let mut out = table.render();
    out.push_str(&page_footer(page, "messages"));
    out.push('\n');
    out
}

pub fn status_report(status: &DeviceStatus) -> String {
    let mut out = String::new();
    let name = if status.device_name.is_empty() {
        UNKNOWN
    } else {
        &status.device_name
    };
    let android = if status.android_version.is_empty() {
        UNKNOWN
    } else {
        &status.android_version
    };

    let _ = writeln!(out, "Device:   {}", name);
    let _ = writeln!(out, "Android:  {}", android);

    let battery = &status.battery;
    let _ = writeln!(out, "\n[Battery]");
    let _ = writeln!(out, "Level:    {}", battery.level.display_with(|l| format!("{}%", l)));
    let _ = writeln!(out, "Status:   {}", battery.status);

    let _ = writeln!(out, "\n[Storage]");
    match &status.storage {
        Some(storage) => {
            let _ = writeln!(out, "Total:    {}", storage.total_display());
            let _ = writeln!(out, "Used:     {} ({}%)", storage.used_display(), storage.used_percent);
            let _ = writeln!(out, "Free:     {}", storage.available_display());
        }
        None => {
            let _ = writeln!(out, "{}", UNKNOWN);
        }
    }

    let wifi = &status.wifi;
    let _ = writeln!(out, "\n[Wi-Fi]");
    let _ = writeln!(out, "SSID:     {}", wifi.ssid);
    let _ = writeln!(out, "Signal:   {}", wifi.signal_display());
    let _ = writeln!(out, "Speed:    {}", wifi.link_speed_display());
    let _ = writeln!(out, "Band:     {}", wifi.frequency_display());

    let network = &status.network;
    let _ = writeln!(out, "\n[Network]");
    let _ = writeln!(out, "IP:       {}", network.ip_address);
    let _ = writeln!(out, "Operator: {}", network.operator);
    let _ = writeln!(out, "Data:     {}", network.connection_state);
    let _ = writeln!(out, "Signal:   {}", network.signal_display());

    let _ = writeln!(out, "\n[Location]");
    match status.gps.map_link() {
        Some(link) => {
            let _ = writeln!(out, "{}", link);
        }
        None => {
            let _ = writeln!(out, "{}", gps_placeholder(&status.gps));
        }
    }

    let _ = writeln!(out, "\nInstalled apps: {}", status.installed_apps.len());
    out
}

fn gps_placeholder(gps: &GpsCoordinates) -> String {
    match gps {
        GpsCoordinates::Placeholder(text) if !text.trim().is_empty() => text.clone(),
        _ => UNKNOWN.to_string(),
    }
}

pub fn apps_list(apps: &[String]) -> String {
    let mut out = String::new();
    for app in apps {
        out.push_str(app);
        out.push('\n');
    }
    let _ = writeln!(out, "{} packages", apps.len());
    out
}

pub fn files_listing(catalog: &FileCatalog, only: Option<FileCategory>) -> String {
    let mut out = String::new();
    let categories: Vec<FileCategory> = match only {
        Some(category) => vec![category],
        None => FileCategory::ALL.to_vec(),
    };

    for category in categories {
        let items = catalog.category(category);
        let _ = writeln!(out, "[{}] {}", category.as_str(), items.len());
        for item in items {
            let path = item.device_path().unwrap_or_default();
            if path.is_empty() {
                let _ = writeln!(out, "  {}", item.name);
            } else {
                let _ = writeln!(out, "  {}  ({})", item.name, path);
            }
        }
    }

    let _ = writeln!(out, "Total: {}", catalog.counts().total());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use devscope_core::status::SystemInfo;
    use devscope_core::{paginate, CallType};

    #[test]
    fn test_calls_table_columns_and_footer() {
        let calls = vec![
            CallLogRecord {
                phone_number: "+7 900 555-12-34".to_string(),
                contact_name: Some("Anna".to_string()),
                call_type: CallType::Missed,
                timestamp: "2024-03-15 14:22:10".to_string(),
                ..Default::default()
            },
            CallLogRecord {
                phone_number: "112".to_string(),
                call_type: CallType::Outgoing,
                ..Default::default()
            },
        ];

        let page = paginate(&calls, 1, 10);
        let out = calls_table(&page);
        let lines: Vec<&str> = out.lines().collect();

        assert!(lines[0].starts_with("Date"));
        assert!(lines[2].contains("Anna") && lines[2].contains("missed"));
        assert!(lines[3].contains("Outgoing"));
        assert_eq!(lines[4], "Showing 1-2 of 2 calls (page 1 of 1)");
    }

    #[test]
    fn test_empty_page_footer() {
        let calls: Vec<CallLogRecord> = Vec::new();
        let out = calls_table(&paginate(&calls, 1, 10));
        assert!(out.ends_with("No calls found\n"));
    }

    #[test]
    fn test_sms_text_truncated() {
        let messages = vec![SmsRecord {
            text: "x".repeat(100),
            ..Default::default()
        }];
        let out = sms_table(&paginate(&messages, 1, 10));
        let row = out.lines().nth(2).unwrap();
        assert!(row.ends_with("..."));
        assert!(!row.contains(&"x".repeat(61)));
    }

    #[test]
    fn test_status_report_placeholders() {
        let status = DeviceStatus::from_system_info(&SystemInfo::default());
        let out = status_report(&status);
        assert!(out.contains("Level:    Unknown"));
        assert!(out.contains("[Storage]\nUnknown"));
        assert!(out.contains("Operator: Unknown"));
    }

    #[test]
    fn test_files_listing() {
        let catalog: FileCatalog = serde_json::from_value(serde_json::json!({
            "photos": [{"name": "a.jpg", "url": "/files/download?path=%2Fsdcard%2Fa.jpg"}]
        }))
        .unwrap();
        let out = files_listing(&catalog, Some(FileCategory::Photos));
        assert_eq!(out, "[photos] 1\n  a.jpg  (/sdcard/a.jpg)\nTotal: 1\n");
    }
}
