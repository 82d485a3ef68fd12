//! devscope core library
//!
//! Inspection toolkit for data pulled off a mobile device through a local
//! backend service: call logs, SMS, files, installed apps and system status,
//! plus PDF report requests.
//!
//! The two pieces of real logic are the log filter/paginate engine
//! ([`filter`], [`paginate`], [`view`]) and the device-status text parsers
//! ([`status`]). Everything else is plumbing around the backend.

pub mod client;
pub mod files;
pub mod filter;
pub mod fs_utils;
pub mod paginate;
pub mod presence;
pub mod records;
pub mod reports;
pub mod session;
pub mod status;
pub mod timestamp;
pub mod view;

mod error;

pub use client::{DeviceBackend, HttpBackend, ViewState, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
pub use error::{DeviceError, Result};
pub use files::{FileCatalog, FileCategory, FileCounts, FileItem};
pub use filter::{filter, FilterCriteria};
pub use paginate::{paginate, total_pages, Page, DEFAULT_PAGE_SIZE};
pub use presence::{Presence, PresenceMonitor, DEFAULT_POLL_INTERVAL};
pub use records::{CallLogRecord, CallType, LogRecord, MessageType, SmsRecord};
pub use reports::{
    CategoryReportRequest, MessagesReportRequest, PathReportRequest, ReportCategory, ReportFile,
};
pub use session::{
    FieldErrors, LoginForm, ProfileUpdate, RegisterForm, Session, TokenStore, UserProfile,
};
pub use status::{DeviceStatus, Field, SystemInfo};
pub use view::LogView;
