//! Battery status parsing
//!
//! Input is a `dumpsys battery` excerpt:
//!
//! ```text
//! Current Battery Service state:
//!   AC powered: false
//!   USB powered: true
//!   status: 2
//!   health: 2
//!   level: 85
//!   scale: 100
//! ```
//!
//! Only `level` and `status` are read. The status code follows Android's
//! `BatteryManager.BATTERY_STATUS_*` constants.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{cached_regex, first_capture, Field};

static LEVEL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static STATUS_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Charging state derived from the numeric status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatteryState {
    Charging,
    Discharging,
    NotCharging,
    Full,
    #[default]
    Unknown,
}

impl BatteryState {
    /// Map an Android status code; anything unrecognised is `Unknown`
    pub fn from_code(code: u32) -> Self {
        match code {
            2 => Self::Charging,
            3 => Self::Discharging,
            4 => Self::NotCharging,
            5 => Self::Full,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charging => "Charging",
            Self::Discharging => "Discharging",
            Self::NotCharging => "Not charging",
            Self::Full => "Full",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse charge band used for colouring the level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeBand {
    /// 20% or below
    Low,
    /// 21% to 50%
    Medium,
    High,
}

/// Parsed battery blob
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatterySummary {
    /// Charge level, 0-100
    pub level: Field<u8>,
    pub status: BatteryState,
}

impl BatterySummary {
    /// Level in percent; 0 when it could not be read
    pub fn level_percent(&self) -> u8 {
        self.level.value().copied().unwrap_or(0)
    }

    pub fn charge_band(&self) -> ChargeBand {
        match self.level_percent() {
            0..=20 => ChargeBand::Low,
            21..=50 => ChargeBand::Medium,
            _ => ChargeBand::High,
        }
    }
}

/// Parse a battery blob
///
/// # Example
///
/// ```rust
/// use devscope_core::status::battery::{parse_battery, BatteryState};
///
/// let summary = parse_battery("level: 85, status: 2");
/// assert_eq!(summary.level_percent(), 85);
/// assert_eq!(summary.status, BatteryState::Charging);
///
/// let summary = parse_battery("garbage");
/// assert_eq!(summary.level_percent(), 0);
/// assert_eq!(summary.status, BatteryState::Unknown);
/// ```
pub fn parse_battery(text: &str) -> BatterySummary {
    let level = first_capture(cached_regex(&LEVEL_PATTERN, r"level: (\d+)"), text)
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(|level| level.min(100) as u8);

    let status = first_capture(cached_regex(&STATUS_PATTERN, r"status: (\d+)"), text)
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(BatteryState::from_code)
        .unwrap_or_default();

    if level.is_none() {
        debug!("Battery level not found in status blob");
    }

    BatterySummary {
        level: level.into(),
        status,
    }
}
