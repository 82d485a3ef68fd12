//! Subcommand handlers

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use devscope_core::files::FileCategory;
use devscope_core::reports::ReportCategory;
use devscope_core::status::filter_installed_apps;
use devscope_core::{
    CategoryReportRequest, DeviceBackend, DeviceStatus, LogRecord, LogView, LoginForm,
    MessagesReportRequest, PathReportRequest, PresenceMonitor, ProfileUpdate, RegisterForm,
    ReportFile, Session, TokenStore,
};

use crate::config::Config;
use crate::diagnostics::{Command, FilterArgs, ReportCommand};
use crate::render;

/// Everything a handler needs
pub struct App {
    config: Config,
    backend: Arc<dyn DeviceBackend>,
}

impl App {
    pub fn new(config: Config, backend: Arc<dyn DeviceBackend>) -> Self {
        Self { config, backend }
    }

    fn session(&self) -> Session {
        Session::load(TokenStore::new(&self.config.paths.token_path))
    }

    /// Run one subcommand to completion
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Calls {
                filter,
                from,
                to,
                report,
            } => self.calls(&filter, from, to, report).await,
            Command::Sms {
                filter,
                date,
                report,
            } => self.sms(&filter, date, report).await,
            Command::System { json } => self.system(json).await,
            Command::Apps { search } => self.apps(search.as_deref()).await,
            Command::Files {
                search,
                category,
                download,
            } => {
                self.files(search.as_deref(), category.as_deref(), download.as_deref())
                    .await
            }
            Command::Watch { interval, count } => self.watch(interval, count).await,
            Command::Report(report) => self.report(report).await,
            Command::Login { email, password } => self.login(email, password).await,
            Command::Register {
                name,
                email,
                password,
                confirm_password,
            } => {
                let form = RegisterForm {
                    name,
                    email,
                    password,
                    confirm_password,
                };
                self.register(&form).await
            }
            Command::ResendVerification { email } => {
                self.backend
                    .resend_verification(email.trim())
                    .await
                    .context("resending verification e-mail")?;
                println!("Verification e-mail sent to {}", email.trim());
                Ok(())
            }
            Command::Profile {
                phone,
                bio,
                new_password,
                confirm_password,
            } => {
                let update = ProfileUpdate::new(
                    phone.as_deref().unwrap_or(""),
                    bio.as_deref().unwrap_or(""),
                    new_password.as_deref().unwrap_or(""),
                );
                self.profile(&update, &confirm_password).await
            }
            Command::Logout => {
                self.session().logout().context("clearing session")?;
                println!("Logged out");
                Ok(())
            }
            Command::DumpConfig { show_paths } => {
                dump_config(&self.config, show_paths);
                Ok(())
            }
        }
    }

    async fn calls(
        &self,
        args: &FilterArgs,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        report: bool,
    ) -> Result<()> {
        let records = self.backend.call_logs().await.context("fetching call logs")?;
        info!("Fetched {} call log entries", records.len());

        let mut view = build_view(records, args, self.config.display.page_size);
        view.set_start_date(from);
        view.set_end_date(to);

        if report {
            let matching: Vec<_> = view.matching().into_iter().cloned().collect();
            debug!("Requesting call report over {} rows", matching.len());
            let file = self
                .backend
                .calls_report(&matching)
                .await
                .context("generating call report")?;
            return self.save_report(file).await;
        }

        select_page(&mut view, args.page)?;
        print!("{}", render::calls_table(&view.page()));
        Ok(())
    }

    async fn sms(&self, args: &FilterArgs, date: Option<NaiveDate>, report: bool) -> Result<()> {
        if report {
            let request = MessagesReportRequest {
                contact: args.search.clone(),
                date,
            };
            let file = self
                .backend
                .messages_report(&request)
                .await
                .context("generating messages report")?;
            return self.save_report(file).await;
        }

        let records = self.backend.sms().await.context("fetching messages")?;
        info!("Fetched {} messages", records.len());

        let mut view = build_view(records, args, self.config.display.page_size);
        view.set_single_day(date);
        select_page(&mut view, args.page)?;
        print!("{}", render::sms_table(&view.page()));
        Ok(())
    }

    async fn system(&self, json: bool) -> Result<()> {
        let info = self
            .backend
            .system_info()
            .await
            .context("fetching system info")?;

        if json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            let status = DeviceStatus::from_system_info(&info);
            print!("{}", render::status_report(&status));
        }
        Ok(())
    }

    async fn apps(&self, search: Option<&str>) -> Result<()> {
        let info = self
            .backend
            .system_info()
            .await
            .context("fetching installed apps")?;
        let apps = filter_installed_apps(&info.installed_apps, search.unwrap_or(""));
        print!("{}", render::apps_list(&apps));
        Ok(())
    }

    async fn files(
        &self,
        search: Option<&str>,
        category: Option<&str>,
        download: Option<&str>,
    ) -> Result<()> {
        if let Some(device_path) = download {
            let file = self
                .backend
                .download_file(device_path)
                .await
                .with_context(|| format!("downloading {}", device_path))?;
            let saved = file.save_to(&self.config.reports.output_dir).await?;
            println!("Saved {} ({} bytes)", saved.display(), file.len());
            return Ok(());
        }

        let only = match category {
            Some(name) => match FileCategory::from_name(name) {
                Some(category) => Some(category),
                None => bail!(
                    "unknown category '{}', expected photos, videos, documents or others",
                    name
                ),
            },
            None => None,
        };

        let catalog = self.backend.all_files().await.context("fetching files")?;
        let catalog = match search {
            Some(term) => catalog.search(term),
            None => catalog,
        };
        print!("{}", render::files_listing(&catalog, only));
        Ok(())
    }

    async fn watch(&self, interval: Option<u64>, count: usize) -> Result<()> {
        let period = match interval {
            Some(0) => bail!("interval must be at least 1 second"),
            Some(secs) => Duration::from_secs(secs),
            None => self.config.poll_interval(),
        };

        let mut monitor = PresenceMonitor::spawn(self.backend.clone(), period);
        let mut rx = monitor.subscribe();
        let mut seen = 0usize;

        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        warn!("Presence monitor ended unexpectedly");
                        break;
                    }
                    let presence = rx.borrow_and_update().clone();
                    println!("[{}] {}", Local::now().format("%H:%M:%S"), presence);
                    seen += 1;
                    if count > 0 && seen >= count {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        monitor.stop();
        Ok(())
    }

    async fn report(&self, command: ReportCommand) -> Result<()> {
        let file = match command {
            ReportCommand::Category {
                category,
                after,
                before,
                limit,
            } => {
                let today = Local::now().date_naive();
                let request =
                    category_request(&self.config, today, &category, after, before, limit)?;
                self.backend
                    .category_report(&request)
                    .await
                    .context("generating category report")?
            }
            ReportCommand::Path {
                category,
                filter_path,
                limit,
            } => {
                let request = PathReportRequest::new(category, filter_path)
                    .with_limit(limit.unwrap_or(self.config.reports.limit));
                request.validate()?;
                self.backend
                    .path_report(&request)
                    .await
                    .context("generating path report")?
            }
        };

        self.save_report(file).await
    }

    async fn login(&self, email: String, password: Option<String>) -> Result<()> {
        let password = match password {
            Some(password) => password,
            None => prompt_password()?,
        };
        let form = LoginForm { email, password };

        let mut session = self.session();
        session.login(self.backend.as_ref(), &form).await?;
        println!("Logged in as {}", session.email().unwrap_or_default());
        Ok(())
    }

    async fn register(&self, form: &RegisterForm) -> Result<()> {
        let mut session = self.session();
        let message = session.register(self.backend.as_ref(), form).await?;

        match message {
            Some(message) => println!("{}", message),
            None => println!("Account created for {}", form.email.trim()),
        }
        if session.is_logged_in() {
            println!("Logged in as {}", session.email().unwrap_or_default());
        }
        Ok(())
    }

    async fn profile(&self, update: &ProfileUpdate, confirm_password: &str) -> Result<()> {
        let mut session = self.session();

        if !update.is_empty() {
            session
                .update_profile(self.backend.as_ref(), update, confirm_password)
                .await?;
            println!("Profile updated");
        }

        let profile = session.profile(self.backend.as_ref()).await?;
        println!("Name:  {}", profile.name);
        println!("Email: {}", profile.email);
        println!("Phone: {}", profile.phone.as_deref().unwrap_or("-"));
        println!("Bio:   {}", profile.bio.as_deref().unwrap_or("-"));
        Ok(())
    }

    async fn save_report(&self, file: ReportFile) -> Result<()> {
        if file.is_empty() {
            warn!("Backend returned an empty file for {}", file.filename);
        }

        let saved = file
            .save_to(&self.config.reports.output_dir)
            .await
            .with_context(|| {
                format!(
                    "saving {} to {}",
                    file.filename,
                    self.config.reports.output_dir.display()
                )
            })?;
        println!("Saved {} ({} bytes)", saved.display(), file.len());

        if self.config.reports.open_after_download {
            open_file(&saved);
        }
        Ok(())
    }
}

/// View over `records` honoring the shared search and paging flags
fn build_view<R: LogRecord>(records: Vec<R>, args: &FilterArgs, default_size: usize) -> LogView<R> {
    let page_size = if args.all {
        records.len().max(1)
    } else {
        args.page_size.unwrap_or(default_size)
    };

    let mut view = LogView::with_page_size(records, page_size);
    if let Some(term) = &args.search {
        view.set_search_term(term.as_str());
    }
    view
}

/// Move to `page`, rejecting pages past the end
fn select_page<R: LogRecord>(view: &mut LogView<R>, page: usize) -> Result<()> {
    if page == 1 || view.go_to_page(page) {
        return Ok(());
    }
    bail!(
        "page {} is out of range, the filtered list has {} page(s)",
        page,
        view.total_pages()
    )
}

/// Category report request: config defaults, then command-line overrides
fn category_request(
    config: &Config,
    today: NaiveDate,
    category: &str,
    after: Option<NaiveDate>,
    before: Option<NaiveDate>,
    limit: Option<u32>,
) -> Result<CategoryReportRequest> {
    let mut request = CategoryReportRequest::with_defaults(today);
    request.category = category.parse::<ReportCategory>()?;
    request.date_after = after.or_else(|| {
        today.checked_sub_signed(chrono::Duration::days(config.reports.lookback_days))
    });
    request.date_before = before;
    request.limit = limit.unwrap_or(config.reports.limit);
    request.validate()?;
    Ok(request)
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn open_file(path: &Path) {
    match open::that(path) {
        Ok(()) => debug!("Opened {}", path.display()),
        Err(e) => warn!("Failed to open {}: {}", path.display(), e),
    }
}

fn dump_config(config: &Config, show_paths: bool) {
    println!("\n=== devscope Configuration ===");
    println!("\n[Backend]");
    println!("Base URL: {}", config.backend.base_url);
    println!("Request timeout: {} seconds", config.backend.request_timeout_secs);

    println!("\n[Display]");
    println!("Page size: {}", config.display.page_size);

    println!("\n[Presence]");
    println!("Poll interval: {} seconds", config.presence.poll_interval_secs);

    println!("\n[Reports]");
    println!("Default limit: {}", config.reports.limit);
    println!("Lookback: {} days", config.reports.lookback_days);
    println!("Open after download: {}", config.reports.open_after_download);

    if show_paths {
        let paths: [(&str, PathBuf); 4] = [
            ("Config", config.paths.config_dir.clone()),
            ("Config file", config.config_path()),
            ("Session", config.paths.token_path.clone()),
            ("Downloads", config.reports.output_dir.clone()),
        ];
        println!("\n[Paths]");
        for (label, path) in paths {
            println!("{}: {:?}", label, path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devscope_core::{CallLogRecord, DeviceError};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calls(n: usize) -> Vec<CallLogRecord> {
        (0..n)
            .map(|i| CallLogRecord {
                phone_number: format!("+1 555 {:04}", i),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_category_request_uses_config_defaults() {
        let mut config = Config::default();
        config.reports.lookback_days = 7;
        config.reports.limit = 25;

        let request =
            category_request(&config, day(2024, 5, 10), "videos", None, None, None).unwrap();
        assert_eq!(request.category, ReportCategory::Videos);
        assert_eq!(request.date_after, Some(day(2024, 5, 3)));
        assert_eq!(request.limit, 25);

        let request = category_request(
            &config,
            day(2024, 5, 10),
            "images",
            Some(day(2024, 1, 1)),
            Some(day(2024, 2, 1)),
            Some(3),
        )
        .unwrap();
        assert_eq!(request.date_after, Some(day(2024, 1, 1)));
        assert_eq!(request.date_before, Some(day(2024, 2, 1)));
        assert_eq!(request.limit, 3);
    }

    #[test]
    fn test_category_request_rejects_inverted_range() {
        let config = Config::default();
        let err = category_request(
            &config,
            day(2024, 5, 10),
            "images",
            Some(day(2024, 3, 1)),
            Some(day(2024, 2, 1)),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeviceError>(),
            Some(DeviceError::Validation { .. })
        ));
    }

    #[test]
    fn test_all_flag_shows_everything_on_one_page() {
        let args = FilterArgs {
            all: true,
            page: 1,
            ..Default::default()
        };
        let view = build_view(calls(37), &args, 10);
        assert_eq!(view.total_pages(), 1);
        assert_eq!(view.page().items.len(), 37);
    }

    #[test]
    fn test_page_size_and_out_of_range_page() {
        let args = FilterArgs {
            page: 1,
            page_size: Some(5),
            ..Default::default()
        };
        let mut view = build_view(calls(12), &args, 10);
        assert_eq!(view.total_pages(), 3);

        select_page(&mut view, 3).unwrap();
        assert_eq!(view.page().items.len(), 2);
        assert!(select_page(&mut view, 4).is_err());
    }

    #[test]
    fn test_first_page_of_empty_list_is_fine() {
        let mut view = build_view(Vec::<CallLogRecord>::new(), &FilterArgs::default(), 10);
        assert!(select_page(&mut view, 1).is_ok());
    }

    #[test]
    fn test_search_flag_applied() {
        let args = FilterArgs {
            search: Some("0011".to_string()),
            page: 1,
            ..Default::default()
        };
        let view = build_view(calls(20), &args, 10);
        assert_eq!(view.total_matching(), 1);
    }
}
