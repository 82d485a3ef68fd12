//! Error handling for devscope
//!
//! Every fallible operation in this crate returns [`Result`], whose error type
//! [`DeviceError`] covers the failure categories a dashboard view has to tell
//! apart:
//!
//! - **Device not connected**: the backend answered, but no device is attached
//!   (an `error` field in the payload, or HTTP 404/503).
//! - **Network**: the backend could not be reached or the transfer broke off.
//! - **Validation**: a form field was rejected before anything was sent.
//!
//! Status-text parse failures are deliberately absent: parsers degrade to
//! placeholder values and never produce an error.
//!
//! ## Error Propagation
//!
//! ```rust
//! use devscope_core::Result;
//!
//! fn decode(data: &[u8]) -> Result<serde_json::Value> {
//!     let value: serde_json::Value = serde_json::from_slice(data)?;
//!     Ok(value)
//! }
//! ```
//!
//! ## Error Matching
//!
//! ```rust
//! use devscope_core::DeviceError;
//!
//! let error = DeviceError::DeviceNotConnected("no adb devices".to_string());
//! assert!(error.is_device_unavailable());
//! assert!(error.requires_user_action());
//! ```

use thiserror::Error;

/// Result type for devscope operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors that can occur while talking to the device backend
///
/// # Examples
///
/// ```rust
/// use devscope_core::DeviceError;
///
/// let error = DeviceError::NetworkError("connection reset".to_string());
/// assert_eq!(error.to_string(), "Network error: connection reset");
///
/// let error = DeviceError::Unauthorized;
/// assert_eq!(error.to_string(), "Not authorized");
/// ```
#[derive(Error, Debug)]
pub enum DeviceError {
    /// I/O error (token store, report output files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No device is attached to the backend
    #[error("Device not connected: {0}")]
    DeviceNotConnected(String),

    /// Transport-level failure (unreachable backend, broken connection)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Backend answered with a non-success status
    #[error("Backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Missing or rejected bearer token
    #[error("Not authorized")]
    Unauthorized,

    /// Form field rejected before submission
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Backend payload did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DeviceError {
    /// Classify a `reqwest` failure
    ///
    /// Timeouts and connection failures become [`DeviceError::Timeout`] and
    /// [`DeviceError::NetworkError`]; status errors keep their code.
    pub fn from_reqwest(error: reqwest::Error, context: &str) -> Self {
        if error.is_timeout() {
            DeviceError::Timeout(format!("{}: {}", context, error))
        } else if let Some(status) = error.status() {
            DeviceError::from_status(status.as_u16(), context)
        } else if error.is_decode() {
            DeviceError::InvalidResponse(format!("{}: {}", context, error))
        } else {
            DeviceError::NetworkError(format!("{}: {}", context, error))
        }
    }

    /// Map an HTTP status code to an error
    ///
    /// 404 and 503 mean the backend is up but has no device to talk to.
    pub fn from_status(status: u16, context: &str) -> Self {
        match status {
            401 => DeviceError::Unauthorized,
            404 | 503 => DeviceError::DeviceNotConnected(format!("{} (HTTP {})", context, status)),
            _ => DeviceError::Http {
                status,
                message: context.to_string(),
            },
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DeviceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the error means "plug the phone in and reload"
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, DeviceError::DeviceNotConnected(_))
    }

    /// Whether the user must act (reconnect, log in, fix a field) before a
    /// manual reload can succeed
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            DeviceError::DeviceNotConnected(_)
                | DeviceError::Unauthorized
                | DeviceError::Validation { .. }
                | DeviceError::Configuration(_)
        )
    }

    /// Message suitable for showing in a view's error state
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::DeviceNotConnected(_) => {
                "Device not connected. Please connect your device and try again.".to_string()
            }
            DeviceError::NetworkError(_) | DeviceError::Timeout(_) => {
                "Device not connected or server is unavailable. Please check your connections."
                    .to_string()
            }
            DeviceError::Http { .. } | DeviceError::InvalidResponse(_) | DeviceError::Json(_) => {
                "Failed to fetch data. Please try again later.".to_string()
            }
            DeviceError::Unauthorized => "Session expired. Please login again.".to_string(),
            DeviceError::Validation { message, .. } => message.clone(),
            DeviceError::Configuration(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            DeviceError::Io(e) => format!("I/O error: {}.", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DeviceError::DeviceNotConnected("adb".to_string());
        assert_eq!(error.to_string(), "Device not connected: adb");

        let error = DeviceError::validation("email", "Email is required");
        assert_eq!(error.to_string(), "Invalid email: Email is required");

        let error = DeviceError::Http {
            status: 500,
            message: "fetching sms".to_string(),
        };
        assert_eq!(error.to_string(), "Backend returned HTTP 500: fetching sms");
    }

    #[test]
    fn test_status_classification() {
        assert!(DeviceError::from_status(404, "call logs").is_device_unavailable());
        assert!(DeviceError::from_status(503, "call logs").is_device_unavailable());
        assert!(matches!(
            DeviceError::from_status(401, "profile"),
            DeviceError::Unauthorized
        ));
        assert!(matches!(
            DeviceError::from_status(500, "sms"),
            DeviceError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn test_user_messages_distinguish_device_and_network() {
        let device = DeviceError::DeviceNotConnected("x".to_string());
        let network = DeviceError::NetworkError("x".to_string());
        assert!(device.user_message().starts_with("Device not connected."));
        assert!(network.user_message().contains("server is unavailable"));
        assert!(!network.requires_user_action());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>(r#"{"broken"#).unwrap_err();
        let error: DeviceError = json_error.into();
        assert!(matches!(error, DeviceError::Json(_)));
    }
}
