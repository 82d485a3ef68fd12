//! Backend client
//!
//! [`DeviceBackend`] is the seam between the dashboard logic and the local
//! HTTP service that talks to the phone. [`HttpBackend`] implements it over
//! `reqwest`; tests substitute an in-memory implementation.
//!
//! ## Failure classification
//!
//! | Situation | Error |
//! |-----------|-------|
//! | payload carries an `error` field | [`DeviceError::DeviceNotConnected`] |
//! | HTTP 404 / 503 on a device endpoint | [`DeviceError::DeviceNotConnected`] |
//! | HTTP 401 | [`DeviceError::Unauthorized`] |
//! | other non-success status | [`DeviceError::Http`] |
//! | connection refused, reset, DNS | [`DeviceError::NetworkError`] |
//!
//! Requests are never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::files::FileCatalog;
use crate::fs_utils::sanitize_filename;
use crate::records::{CallLogRecord, SmsRecord};
use crate::reports::{
    CategoryReportRequest, MessagesReportRequest, PathReportRequest, ReportFile,
    CALLS_REPORT_FILENAME, MESSAGES_REPORT_FILENAME,
};
use crate::session::{AuthResponse, LoginForm, ProfileUpdate, RegisterRequest, UserProfile};
use crate::status::SystemInfo;
use crate::{DeviceError, Result};

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the dashboard asks of the backend
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Serials of attached devices (`GET /`)
    async fn devices(&self) -> Result<Vec<String>>;

    async fn call_logs(&self) -> Result<Vec<CallLogRecord>>;

    async fn sms(&self) -> Result<Vec<SmsRecord>>;

    async fn system_info(&self) -> Result<SystemInfo>;

    async fn all_files(&self) -> Result<FileCatalog>;

    /// Pull one file off the device (`GET /download-file?path=`)
    async fn download_file(&self, device_path: &str) -> Result<ReportFile>;

    async fn category_report(&self, request: &CategoryReportRequest) -> Result<ReportFile>;

    async fn path_report(&self, request: &PathReportRequest) -> Result<ReportFile>;

    /// Report over the given (already filtered) call logs
    async fn calls_report(&self, records: &[CallLogRecord]) -> Result<ReportFile>;

    async fn messages_report(&self, request: &MessagesReportRequest) -> Result<ReportFile>;

    async fn login(&self, form: &LoginForm) -> Result<AuthResponse>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;

    async fn profile(&self, token: &str) -> Result<UserProfile>;

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<()>;

    async fn resend_verification(&self, email: &str) -> Result<()>;
}

/// Outcome of loading one dashboard view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    /// Backend reachable, phone not; user-facing message
    DeviceNotConnected(String),
    /// Anything else; user-facing message
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => ViewState::Ready(data),
            Err(e) if e.is_device_unavailable() => ViewState::DeviceNotConnected(e.user_message()),
            Err(e) => ViewState::Failed(e.user_message()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// Error text for the failure states
    pub fn message(&self) -> Option<&str> {
        match self {
            ViewState::DeviceNotConnected(msg) | ViewState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Which status table applies to an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    /// 404/503 mean "no phone attached"
    Device,
    /// 404 is an ordinary failure (unknown user)
    Auth,
}

/// `reqwest` implementation of [`DeviceBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            DeviceError::Configuration(format!("invalid backend URL {:?}: {}", base_url, e))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Configuration(format!("building HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| DeviceError::Configuration(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Send and reject non-success statuses
    async fn send(&self, request: RequestBuilder, context: &str, kind: Endpoint) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| DeviceError::from_reqwest(e, context))?;

        let status = response.status();
        if status.is_success() {
            debug!("{}: HTTP {}", context, status.as_u16());
            return Ok(response);
        }

        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| server_detail(&body));
        warn!("{}: HTTP {} {:?}", context, status.as_u16(), detail);

        let message = detail.unwrap_or_else(|| context.to_string());
        Err(match (kind, status.as_u16()) {
            (_, 401) => DeviceError::Unauthorized,
            (Endpoint::Device, code) => match DeviceError::from_status(code, context) {
                DeviceError::Http { status, .. } => DeviceError::Http { status, message },
                other => other,
            },
            (Endpoint::Auth, code) => DeviceError::Http {
                status: code,
                message,
            },
        })
    }

    /// GET a device endpoint and decode the JSON body
    async fn get_payload(&self, path: &str, context: &str) -> Result<Value> {
        let request = self.client.get(self.endpoint(path)?);
        let response = self.send(request, context, Endpoint::Device).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| DeviceError::from_reqwest(e, context))?;
        reject_error_payload(body)
    }

    /// GET a device endpoint and take one array field out of it
    async fn get_list<T: DeserializeOwned>(&self, path: &str, field: &str, context: &str) -> Result<Vec<T>> {
        let mut body = self.get_payload(path, context).await?;
        match body.get_mut(field).map(Value::take) {
            Some(Value::Array(items)) => Ok(serde_json::from_value(Value::Array(items))?),
            Some(Value::Null) | None => Err(DeviceError::InvalidResponse(format!(
                "{}: missing \"{}\"",
                context, field
            ))),
            Some(_) => Err(DeviceError::InvalidResponse(format!(
                "{}: \"{}\" is not a list",
                context, field
            ))),
        }
    }

    /// Send a request that answers with a file
    async fn fetch_file(&self, request: RequestBuilder, context: &str, default_name: &str) -> Result<ReportFile> {
        let response = self.send(request, context, Endpoint::Device).await?;
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DeviceError::from_reqwest(e, context))?;

        let file = ReportFile::new(disposition.as_deref(), default_name, bytes.to_vec());
        info!("{}: received {} ({} bytes)", context, file.filename, file.len());
        Ok(file)
    }

    async fn auth_json<T: DeserializeOwned>(&self, request: RequestBuilder, context: &str) -> Result<T> {
        let response = self.send(request, context, Endpoint::Auth).await?;
        response
            .json()
            .await
            .map_err(|e| DeviceError::from_reqwest(e, context))
    }
}

/// `detail` or `error` text from a FastAPI-style error body
fn server_detail(body: &Value) -> Option<String> {
    ["detail", "error"]
        .iter()
        .find_map(|key| match body.get(*key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
}

/// Turn `{"error": ...}` payloads into [`DeviceError::DeviceNotConnected`]
fn reject_error_payload(body: Value) -> Result<Value> {
    match body.get("error") {
        None | Some(Value::Null) => Ok(body),
        Some(Value::String(msg)) => Err(DeviceError::DeviceNotConnected(msg.clone())),
        Some(other) => Err(DeviceError::DeviceNotConnected(other.to_string())),
    }
}

#[async_trait]
impl DeviceBackend for HttpBackend {
    async fn devices(&self) -> Result<Vec<String>> {
        self.get_list("", "devices", "listing devices").await
    }

    async fn call_logs(&self) -> Result<Vec<CallLogRecord>> {
        self.get_list("call_logs", "call_logs", "fetching call logs").await
    }

    async fn sms(&self) -> Result<Vec<SmsRecord>> {
        self.get_list("sms", "sms_messages", "fetching messages").await
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        let body = self.get_payload("system-info", "fetching system info").await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn all_files(&self) -> Result<FileCatalog> {
        let body = self.get_payload("all-files", "listing files").await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn download_file(&self, device_path: &str) -> Result<ReportFile> {
        let default_name = device_path
            .rsplit('/')
            .next()
            .and_then(sanitize_filename)
            .unwrap_or_else(|| "download.bin".to_string());
        let request = self
            .client
            .get(self.endpoint("download-file")?)
            .query(&[("path", device_path)]);
        self.fetch_file(request, "downloading file", &default_name).await
    }

    async fn category_report(&self, request: &CategoryReportRequest) -> Result<ReportFile> {
        let query = request.query()?;
        let http = self
            .client
            .get(self.endpoint("generate-category-report")?)
            .header(ACCEPT, "application/pdf")
            .query(&query);
        self.fetch_file(http, "generating category report", &request.default_filename())
            .await
    }

    async fn path_report(&self, request: &PathReportRequest) -> Result<ReportFile> {
        request.validate()?;
        let mut url = self.endpoint("report/generate/")?;
        url.path_segments_mut()
            .map_err(|_| DeviceError::Configuration("backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(request.category.trim());
        let http = self.client.post(url).query(&[
            ("filter_path", request.filter_path.clone()),
            ("limit", request.limit.to_string()),
        ]);
        self.fetch_file(http, "generating report", &request.default_filename())
            .await
    }

    async fn calls_report(&self, records: &[CallLogRecord]) -> Result<ReportFile> {
        let http = self
            .client
            .post(self.endpoint("report/calls/from_json")?)
            .json(records);
        self.fetch_file(http, "generating call report", CALLS_REPORT_FILENAME)
            .await
    }

    async fn messages_report(&self, request: &MessagesReportRequest) -> Result<ReportFile> {
        let http = self
            .client
            .get(self.endpoint("report/messages")?)
            .query(&request.query());
        self.fetch_file(http, "generating message report", MESSAGES_REPORT_FILENAME)
            .await
    }

    async fn login(&self, form: &LoginForm) -> Result<AuthResponse> {
        let request = self.client.post(self.endpoint("auth/login")?).json(form);
        self.auth_json(request, "logging in").await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let http = self.client.post(self.endpoint("auth/register")?).json(request);
        self.auth_json(http, "registering").await
    }

    async fn profile(&self, token: &str) -> Result<UserProfile> {
        let request = self
            .client
            .get(self.endpoint("auth/profile")?)
            .bearer_auth(token);
        self.auth_json(request, "fetching profile").await
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<()> {
        let request = self
            .client
            .put(self.endpoint("auth/profile")?)
            .bearer_auth(token)
            .json(update);
        self.send(request, "updating profile", Endpoint::Auth).await?;
        Ok(())
    }

    async fn resend_verification(&self, email: &str) -> Result<()> {
        let request = self
            .client
            .post(self.endpoint("auth/resend-verification")?)
            .json(&serde_json::json!({ "email": email }));
        self.send(request, "resending verification", Endpoint::Auth)
            .await?;
        Ok(())
    }
}
