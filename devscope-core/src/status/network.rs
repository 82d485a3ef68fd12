//! Network status parsing
//!
//! Three blobs feed this summary: `ip addr` output for the address, the SIM
//! operator name, and a `dumpsys telephony.registry` excerpt for the data
//! connection state and signal strength.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{cached_regex, first_capture, Field};

static INET_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static DATA_STATE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static SIGNAL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Mobile data connection state, per `TelephonyManager.DATA_*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Suspended,
    #[default]
    Unknown,
}

impl ConnectionState {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Disconnected,
            1 => Self::Connected,
            2 => Self::Suspended,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
            Self::Suspended => "Suspended",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetworkSummary {
    /// First IPv4 address
    pub ip_address: Field<String>,
    pub operator: Field<String>,
    pub connection_state: ConnectionState,
    pub signal_strength: Field<u32>,
}

impl NetworkSummary {
    /// Signal strength rendered as `N%`
    pub fn signal_display(&self) -> String {
        self.signal_strength.display_with(|level| format!("{}%", level))
    }
}

/// Parse the network blobs
///
/// # Example
///
/// ```rust
/// use devscope_core::status::network::{parse_network, ConnectionState};
///
/// let net = parse_network(
///     "inet 10.0.0.5/24 scope global wlan0",
///     "Beeline",
///     "mDataConnectionState=2 mSignalStrength=63",
/// );
/// assert_eq!(net.ip_address.to_string(), "10.0.0.5");
/// assert_eq!(net.connection_state, ConnectionState::Suspended);
/// assert_eq!(net.signal_display(), "63%");
/// ```
pub fn parse_network(ip_text: &str, operator: &str, status_text: &str) -> NetworkSummary {
    let ip_address = first_capture(cached_regex(&INET_PATTERN, r"(?i)inet ([\d.]+)"), ip_text)
        .map(str::to_string);

    let operator = Some(operator.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let connection_state = first_capture(
        cached_regex(&DATA_STATE_PATTERN, r"(?i)mDataConnectionState=(\d+)"),
        status_text,
    )
    .and_then(|digits| digits.parse::<u32>().ok())
    .map(ConnectionState::from_code)
    .unwrap_or_default();

    let signal_strength = first_capture(
        cached_regex(&SIGNAL_PATTERN, r"(?i)mSignalStrength=(\d+)"),
        status_text,
    )
    .and_then(|digits| digits.parse::<u32>().ok());

    NetworkSummary {
        ip_address: ip_address.into(),
        operator: operator.into(),
        connection_state,
        signal_strength: signal_strength.into(),
    }
}
