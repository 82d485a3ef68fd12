//! Device status parsing
//!
//! The backend's `/system-info` endpoint returns raw diagnostic text for each
//! category: a `dumpsys battery` excerpt, a `df` table, wifi info, network
//! status and a `pm list packages` listing. Each sub-module turns one blob into
//! a typed summary.
//!
//! Parsers never fail. A field that cannot be extracted becomes
//! [`Field::Unknown`] (or the summary's documented default), and one malformed
//! blob has no effect on the others.
//!
//! ## Example
//!
//! ```rust
//! use devscope_core::status::{battery::BatteryState, DeviceStatus, SystemInfo};
//!
//! let info = SystemInfo {
//!     battery: "level: 85\nstatus: 2".to_string(),
//!     storage: "garbage".to_string(),
//!     ..Default::default()
//! };
//!
//! let status = DeviceStatus::from_system_info(&info);
//! assert_eq!(status.battery.level_percent(), 85);
//! assert_eq!(status.battery.status, BatteryState::Charging);
//! assert!(status.storage.is_none());
//! ```

pub mod apps;
pub mod battery;
pub mod network;
pub mod storage;
pub mod wifi;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::records::lenient_string;

pub use apps::{filter_installed_apps, parse_installed_apps};
pub use battery::{parse_battery, BatteryState, BatterySummary};
pub use network::{parse_network, ConnectionState, NetworkSummary};
pub use storage::{format_kilobytes, parse_storage, StorageSummary};
pub use wifi::{parse_wifi, WifiSummary};

/// Placeholder shown for any field that could not be extracted
pub const UNKNOWN: &str = "Unknown";

/// Outcome of extracting one field from a status blob
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Field<T> {
    /// The pattern matched and the value converted
    Parsed(T),
    /// No match, or the match did not convert
    #[default]
    Unknown,
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Parsed(value) => Some(value),
            Field::Unknown => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Field::Parsed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Parsed(value) => Field::Parsed(f(value)),
            Field::Unknown => Field::Unknown,
        }
    }

    /// Render with `f`, or the placeholder
    pub fn display_with(&self, f: impl FnOnce(&T) -> String) -> String {
        match self {
            Field::Parsed(value) => f(value),
            Field::Unknown => UNKNOWN.to_string(),
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Parsed(value),
            None => Field::Unknown,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Parsed(value) => value.fmt(f),
            Field::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// Compile a pattern once; a bad pattern disables the field instead of panicking
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &'static str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Invalid status pattern {:?}: {}", pattern, e);
            None
        }
    })
    .as_ref()
}

/// First capture group of the first match
pub(crate) fn first_capture<'t>(re: Option<&Regex>, text: &'t str) -> Option<&'t str> {
    re?.captures(text)?.get(1).map(|m| m.as_str())
}

/// GPS position reported by the backend
///
/// The backend sends an object when it has a fix and a human-readable string
/// ("Location unavailable", ...) otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GpsCoordinates {
    Fix {
        #[serde(deserialize_with = "lenient_string")]
        latitude: String,
        #[serde(deserialize_with = "lenient_string")]
        longitude: String,
    },
    Placeholder(String),
}

impl Default for GpsCoordinates {
    fn default() -> Self {
        GpsCoordinates::Placeholder(UNKNOWN.to_string())
    }
}

impl GpsCoordinates {
    /// Latitude and longitude as numbers, when both parse
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            GpsCoordinates::Fix {
                latitude,
                longitude,
            } => {
                let lat = latitude.trim().parse::<f64>().ok()?;
                let lon = longitude.trim().parse::<f64>().ok()?;
                Some((lat, lon))
            }
            GpsCoordinates::Placeholder(_) => None,
        }
    }

    /// OpenStreetMap embed URL centred on the fix, with a 0.01 degree box
    pub fn embed_map_url(&self) -> Option<String> {
        let (lat, lon) = self.position()?;
        Some(format!(
            "https://www.openstreetmap.org/export/embed.html?bbox={},{},{},{}&layer=mapnik&marker={},{}",
            lon - 0.01,
            lat - 0.01,
            lon + 0.01,
            lat + 0.01,
            lat,
            lon
        ))
    }

    /// Link for opening the position in a maps application
    pub fn map_link(&self) -> Option<String> {
        let (lat, lon) = self.position()?;
        Some(format!("https://www.google.com/maps?q={},{}", lat, lon))
    }
}

/// Raw `/system-info` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub device_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub android_version: String,
    #[serde(deserialize_with = "lenient_string")]
    pub battery: String,
    #[serde(deserialize_with = "lenient_string")]
    pub storage: String,
    #[serde(deserialize_with = "lenient_string")]
    pub wifi_connections: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ip_address: String,
    #[serde(deserialize_with = "lenient_string")]
    pub mobile_operator: String,
    #[serde(deserialize_with = "lenient_string")]
    pub network_status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub installed_apps: String,
    #[serde(deserialize_with = "lenient_gps")]
    pub gps_coordinates: GpsCoordinates,
}

/// Any shape that is neither a fix nor a string falls back to the placeholder
fn lenient_gps<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GpsCoordinates, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(GpsCoordinates::default());
    }
    match GpsCoordinates::deserialize(value) {
        Ok(gps) => Ok(gps),
        Err(e) => {
            warn!("Ignoring malformed gps_coordinates: {}", e);
            Ok(GpsCoordinates::default())
        }
    }
}

/// Parsed view of a [`SystemInfo`] snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub device_name: String,
    pub android_version: String,
    pub battery: BatterySummary,
    /// `None` when the storage table was malformed
    pub storage: Option<StorageSummary>,
    pub wifi: WifiSummary,
    pub network: NetworkSummary,
    pub installed_apps: Vec<String>,
    pub gps: GpsCoordinates,
}

impl DeviceStatus {
    /// Run every parser over its own blob
    pub fn from_system_info(info: &SystemInfo) -> Self {
        Self {
            device_name: info.device_name.trim().to_string(),
            android_version: info.android_version.trim().to_string(),
            battery: parse_battery(&info.battery),
            storage: parse_storage(&info.storage),
            wifi: parse_wifi(&info.wifi_connections),
            network: parse_network(
                &info.ip_address,
                &info.mobile_operator,
                &info.network_status,
            ),
            installed_apps: parse_installed_apps(&info.installed_apps),
            gps: info.gps_coordinates.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_display() {
        assert_eq!(Field::Parsed(42).to_string(), "42");
        assert_eq!(Field::<u32>::Unknown.to_string(), "Unknown");
        assert_eq!(
            Field::Parsed(-55).display_with(|v| format!("{} dBm", v)),
            "-55 dBm"
        );
        assert_eq!(Field::<i32>::Unknown.display_with(|v| format!("{} dBm", v)), "Unknown");
    }

    #[test]
    fn test_gps_fix_and_placeholder() {
        let info: SystemInfo = serde_json::from_value(json!({
            "gps_coordinates": {"latitude": "55.75", "longitude": 37.61}
        }))
        .unwrap();
        assert_eq!(info.gps_coordinates.position(), Some((55.75, 37.61)));
        assert_eq!(
            info.gps_coordinates.map_link().as_deref(),
            Some("https://www.google.com/maps?q=55.75,37.61")
        );
        assert!(info
            .gps_coordinates
            .embed_map_url()
            .unwrap()
            .contains("marker=55.75,37.61"));

        let info: SystemInfo = serde_json::from_value(json!({
            "gps_coordinates": "Location unavailable"
        }))
        .unwrap();
        assert!(info.gps_coordinates.position().is_none());
        assert!(info.gps_coordinates.embed_map_url().is_none());
    }

    #[test]
    fn test_one_bad_blob_does_not_affect_others() {
        let info = SystemInfo {
            battery: "level: 40\nstatus: 3".to_string(),
            storage: "Filesystem 1K-blocks Used Available Use% Mounted on\n/dev/block/dm-0 bogus".to_string(),
            wifi_connections: "RSSI: -61, Link speed: 72Mbps".to_string(),
            ip_address: "inet 192.168.1.23/24 brd 192.168.1.255".to_string(),
            mobile_operator: "  MegaFon \n".to_string(),
            network_status: "mDataConnectionState=1 mSignalStrength=80".to_string(),
            installed_apps: "package:org.b\npackage:org.a\n".to_string(),
            ..Default::default()
        };

        let status = DeviceStatus::from_system_info(&info);
        assert_eq!(status.battery.status, BatteryState::Discharging);
        assert!(status.storage.is_none());
        assert_eq!(status.wifi.ssid, Field::Unknown);
        assert_eq!(status.wifi.signal_dbm, Field::Parsed(-61));
        assert_eq!(status.network.operator, Field::Parsed("MegaFon".to_string()));
        assert_eq!(status.installed_apps, vec!["org.a", "org.b"]);
    }

    #[test]
    fn test_malformed_gps_falls_back_to_placeholder() {
        let shapes = [
            json!(null),
            json!(42),
            json!([55.75, 37.61]),
            json!({"latitude": "55.75"}),
            json!({"lat": 1, "lon": 2}),
        ];
        for gps in shapes {
            let info: SystemInfo = serde_json::from_value(json!({
                "battery": "level: 80",
                "gps_coordinates": gps.clone()
            }))
            .unwrap();
            assert_eq!(info.gps_coordinates, GpsCoordinates::default(), "{}", gps);

            let status = DeviceStatus::from_system_info(&info);
            assert_eq!(status.battery.level, Field::Parsed(80));
        }
    }

    #[test]
    fn test_system_info_tolerates_missing_fields() {
        let info: SystemInfo = serde_json::from_value(json!({"device_name": "Pixel 7"})).unwrap();
        assert_eq!(info.device_name, "Pixel 7");
        assert!(info.battery.is_empty());
        assert!(info.gps_coordinates.position().is_none());
    }
}
