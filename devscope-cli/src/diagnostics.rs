//! Command line and logging
//!
//! Logs go to stderr so table output on stdout stays pipeable.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// devscope command-line interface
#[derive(Parser, Debug)]
#[command(name = "devscope")]
#[command(about = "Inspect call logs, messages, files and status of a connected phone", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(short, long, value_name = "LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// Enable JSON structured logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Show timestamps in logs
    #[arg(long, global = true)]
    pub timestamps: bool,

    /// Use this configuration file instead of the default one
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, value_name = "URL", global = true)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List call logs
    Calls {
        #[command(flatten)]
        filter: FilterArgs,

        /// First day to include (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", value_parser = parse_day)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", value_parser = parse_day)]
        to: Option<NaiveDate>,

        /// Download a PDF report of the matching calls instead of listing them
        #[arg(long)]
        report: bool,
    },

    /// List SMS messages
    Sms {
        #[command(flatten)]
        filter: FilterArgs,

        /// Only messages from this day (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", value_parser = parse_day)]
        date: Option<NaiveDate>,

        /// Download a PDF report for the same search instead of listing
        #[arg(long)]
        report: bool,
    },

    /// Show battery, storage, network and location status
    System {
        /// Print the raw backend payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// List installed packages
    Apps {
        /// Case-insensitive substring filter
        #[arg(short, long)]
        search: Option<String>,
    },

    /// List photos, videos, documents and other files
    Files {
        /// Case-insensitive file name filter
        #[arg(short, long)]
        search: Option<String>,

        /// Only this category (photos, videos, documents, others)
        #[arg(short, long)]
        category: Option<String>,

        /// Download the file at this device path
        #[arg(long, value_name = "DEVICE_PATH")]
        download: Option<String>,
    },

    /// Watch device presence
    Watch {
        /// Seconds between checks (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many changes (0 = until interrupted)
        #[arg(short = 'n', long, default_value = "0")]
        count: usize,
    },

    /// Generate a PDF report on the backend
    #[command(subcommand)]
    Report(ReportCommand),

    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        email: String,

        /// Password; read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account
    Register {
        #[arg(long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(long)]
        confirm_password: String,
    },

    /// Ask the backend to resend the verification e-mail
    ResendVerification {
        email: String,
    },

    /// Show or update the logged-in profile
    Profile {
        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        new_password: Option<String>,

        #[arg(long, default_value = "")]
        confirm_password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show current configuration
    DumpConfig {
        /// Show file paths
        #[arg(long)]
        show_paths: bool,
    },
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Calls { .. } => "calls",
            Command::Sms { .. } => "sms",
            Command::System { .. } => "system",
            Command::Apps { .. } => "apps",
            Command::Files { .. } => "files",
            Command::Watch { .. } => "watch",
            Command::Report(_) => "report",
            Command::Login { .. } => "login",
            Command::Register { .. } => "register",
            Command::ResendVerification { .. } => "resend-verification",
            Command::Profile { .. } => "profile",
            Command::Logout => "logout",
            Command::DumpConfig { .. } => "dump-config",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Files of one category created in a date range
    Category {
        /// images, videos or documents
        #[arg(short, long, default_value = "images")]
        category: String,

        /// Files created on or after this day (defaults to the configured lookback)
        #[arg(long, value_name = "DATE", value_parser = parse_day)]
        after: Option<NaiveDate>,

        /// Files created on or before this day
        #[arg(long, value_name = "DATE", value_parser = parse_day)]
        before: Option<NaiveDate>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Files of one category under a device directory
    Path {
        category: String,

        /// Device directory, e.g. /sdcard/DCIM
        filter_path: String,

        #[arg(long)]
        limit: Option<u32>,
    },
}

/// Search and paging options shared by the log tables
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive match on number, contact or text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Page to show
    #[arg(short, long, default_value = "1")]
    pub page: usize,

    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Show every matching row instead of one page
    #[arg(long)]
    pub all: bool,
}

fn parse_day(raw: &str) -> std::result::Result<NaiveDate, String> {
    devscope_core::timestamp::parse_date(raw)
        .ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", raw))
}

/// Initialize logging based on CLI configuration
pub fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = cli.log_level.parse::<Level>().with_context(|| {
        format!(
            "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
            cli.log_level
        )
    })?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.as_str()))
        .context("Failed to create log filter")?;

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    match (cli.json_logs, cli.timestamps) {
        (true, true) => subscriber.json().init(),
        (true, false) => subscriber.without_time().json().init(),
        (false, true) => subscriber.init(),
        (false, false) => subscriber.without_time().init(),
    }

    debug!(
        "Logging initialized: level={}, json={}, timestamps={}",
        log_level, cli.json_logs, cli.timestamps
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_calls_arguments() {
        let cli = Cli::try_parse_from([
            "devscope", "calls", "--search", "555", "--from", "2024-03-01", "--to", "2024-03-31",
            "--page", "2",
        ])
        .unwrap();

        match cli.command {
            Command::Calls {
                filter, from, to, report,
            } => {
                assert_eq!(filter.search.as_deref(), Some("555"));
                assert_eq!(filter.page, 2);
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert_eq!(to, NaiveDate::from_ymd_opt(2024, 3, 31));
                assert!(!report);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_bad_date_rejected() {
        assert!(Cli::try_parse_from(["devscope", "sms", "--date", "15/03/2024"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["devscope", "system", "--log-level", "debug", "--json-logs"])
            .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(cli.json_logs);
        assert_eq!(cli.command.name(), "system");
    }

    #[test]
    fn test_report_subcommands() {
        let cli = Cli::try_parse_from([
            "devscope", "report", "path", "images", "/sdcard/DCIM", "--limit", "5",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Report(ReportCommand::Path { limit: Some(5), .. })
        ));
    }
}
