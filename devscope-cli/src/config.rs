//! CLI Configuration
//!
//! Stored as TOML at `<config dir>/devscope/devscope.toml`. A missing file is
//! created with defaults on first run; missing keys fall back to defaults.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devscope_core::reports::{DEFAULT_LOOKBACK_DAYS, DEFAULT_REPORT_LIMIT, MAX_REPORT_LIMIT};

const CONFIG_FILE: &str = "devscope.toml";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Table display
    #[serde(default)]
    pub display: DisplayConfig,

    /// Device presence polling
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Report downloads
    #[serde(default)]
    pub reports: ReportConfig,

    /// Storage paths
    #[serde(default)]
    pub paths: PathConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the device backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Rows per page for call and message tables
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Seconds between device presence checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Where downloaded reports and files are saved
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Default number of files in a category report
    #[serde(default = "default_report_limit")]
    pub limit: u32,

    /// Default start of a category report, in days before today
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Open a report with the desktop's PDF viewer once saved
    #[serde(default = "default_false")]
    pub open_after_download: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Directory holding this file
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Saved login session
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

fn default_base_url() -> String {
    devscope_core::DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    devscope_core::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_page_size() -> usize {
    devscope_core::DEFAULT_PAGE_SIZE
}

fn default_poll_interval() -> u64 {
    devscope_core::DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_report_limit() -> u32 {
    DEFAULT_REPORT_LIMIT
}

fn default_lookback_days() -> i64 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_false() -> bool {
    false
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("devscope")
}

fn default_token_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("devscope")
        .join("session.json")
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            limit: default_report_limit(),
            lookback_days: default_lookback_days(),
            open_after_download: default_false(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            token_path: default_token_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            display: DisplayConfig::default(),
            presence: PresenceConfig::default(),
            reports: ReportConfig::default(),
            paths: PathConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_dir().join(CONFIG_FILE))
    }

    /// Load configuration from `config_path`, creating it if not found
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            toml::from_str::<Config>(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?
        } else {
            let mut config = Config::default();
            if let Some(dir) = config_path.parent() {
                config.paths.config_dir = dir.to_path_buf();
            }
            config.save_to(config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.paths.config_dir.join(CONFIG_FILE)
    }

    /// Reject values the rest of the CLI cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            bail!("backend.base_url must not be empty");
        }
        if self.backend.request_timeout_secs == 0 {
            bail!("backend.request_timeout_secs must be at least 1");
        }
        if self.display.page_size == 0 {
            bail!("display.page_size must be at least 1");
        }
        if self.presence.poll_interval_secs == 0 {
            bail!("presence.poll_interval_secs must be at least 1");
        }
        if self.reports.limit == 0 || self.reports.limit > MAX_REPORT_LIMIT {
            bail!("reports.limit must be between 1 and {}", MAX_REPORT_LIMIT);
        }
        if self.reports.lookback_days < 0 {
            bail!("reports.lookback_days must not be negative");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.presence.poll_interval_secs)
    }
}
