//! Wifi info parsing
//!
//! Input is the `mWifiInfo` line from `dumpsys wifi`:
//!
//! ```text
//! mWifiInfo SSID: "HomeNet", BSSID: 24:a4:3c:11:22:33, MAC: 02:00:00:00:00:00,
//! Supplicant state: COMPLETED, RSSI: -55, Link speed: 433Mbps, Frequency: 5180MHz,
//! ```
//!
//! Each labelled field is looked up on its own, case-insensitively, so a
//! missing SSID does not stop the signal strength from being read.

use std::sync::OnceLock;

use regex::Regex;

use super::{cached_regex, first_capture, Field};

static SSID_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static RSSI_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static LINK_SPEED_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static FREQUENCY_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Frequencies above this are taken to be MHz
const MHZ_THRESHOLD: f64 = 100.0;

/// Parsed wifi blob
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WifiSummary {
    pub ssid: Field<String>,
    /// RSSI in dBm
    pub signal_dbm: Field<i32>,
    pub link_speed_mbps: Field<u32>,
    pub frequency_ghz: Field<f64>,
}

impl WifiSummary {
    pub fn signal_display(&self) -> String {
        self.signal_dbm.display_with(|dbm| format!("{} dBm", dbm))
    }

    pub fn link_speed_display(&self) -> String {
        self.link_speed_mbps
            .display_with(|mbps| format!("{} Mbps", mbps))
    }

    pub fn frequency_display(&self) -> String {
        self.frequency_ghz.display_with(|ghz| format!("{} GHz", ghz))
    }
}

/// Parse a wifi blob
///
/// # Example
///
/// ```rust
/// use devscope_core::status::{wifi::parse_wifi, Field};
///
/// let wifi = parse_wifi("SSID: \"HomeNet\", RSSI: -55, Link speed: 433Mbps, Frequency: 5.18GHz");
/// assert_eq!(wifi.ssid, Field::Parsed("HomeNet".to_string()));
/// assert_eq!(wifi.signal_display(), "-55 dBm");
/// assert_eq!(wifi.link_speed_display(), "433 Mbps");
/// assert_eq!(wifi.frequency_display(), "5.18 GHz");
/// ```
pub fn parse_wifi(text: &str) -> WifiSummary {
    // `\b` keeps "BSSID:" from being read as the network name
    let ssid = first_capture(
        cached_regex(&SSID_PATTERN, r"(?i)\bSSID: (.*?)(?:,|\n)"),
        text,
    )
    .map(|raw| raw.trim().trim_matches('"').to_string())
    .filter(|ssid| !ssid.is_empty());

    let signal_dbm = first_capture(cached_regex(&RSSI_PATTERN, r"(?i)RSSI: (-?\d+)"), text)
        .and_then(|digits| digits.parse::<i32>().ok());

    let link_speed_mbps = first_capture(
        cached_regex(&LINK_SPEED_PATTERN, r"(?i)Link speed: (\d+)"),
        text,
    )
    .and_then(|digits| digits.parse::<u32>().ok());

    let frequency_ghz = first_capture(
        cached_regex(&FREQUENCY_PATTERN, r"(?i)Frequency: ([\d.]+)"),
        text,
    )
    .and_then(|digits| digits.parse::<f64>().ok())
    .map(|value| {
        if value > MHZ_THRESHOLD {
            value / 1000.0
        } else {
            value
        }
    });

    WifiSummary {
        ssid: ssid.into(),
        signal_dbm: signal_dbm.into(),
        link_speed_mbps: link_speed_mbps.into(),
        frequency_ghz: frequency_ghz.into(),
    }
}
