//! Centralized error reporting for the CLI
//!
//! Every command returns `anyhow::Result`. Backend failures travel inside as a
//! [`DeviceError`], which is logged at a level matching its severity and then
//! shown to the user as the same message a dashboard view would display, plus a
//! hint about what to do next.

use devscope_core::DeviceError;
use tracing::{debug, error, warn};

/// Process exit codes
pub mod exit_code {
    pub const FAILURE: u8 = 1;
    pub const DEVICE_NOT_CONNECTED: u8 = 2;
    pub const UNREACHABLE: u8 = 3;
    pub const UNAUTHORIZED: u8 = 4;
    pub const INVALID_INPUT: u8 = 5;
}

/// Log `err`, print it for the user and pick an exit code
pub fn handle_error(err: &anyhow::Error, context: &str) -> u8 {
    let Some(device_error) = err.downcast_ref::<DeviceError>() else {
        error!("Failed {}: {:#}", context, err);
        eprintln!("Error: {:#}", err);
        return exit_code::FAILURE;
    };

    if device_error.requires_user_action() {
        warn!("User action required {}: {}", context, device_error);
    } else if matches!(
        device_error,
        DeviceError::NetworkError(_) | DeviceError::Timeout(_)
    ) {
        warn!("Backend unreachable {}: {}", context, device_error);
    } else {
        error!("Failed {}: {}", context, device_error);
    }

    eprintln!("{}", device_error.user_message());
    if let Some(hint) = recovery_hint(device_error) {
        debug!("Recovery hint: {}", hint);
        eprintln!("{}", hint);
    }

    exit_code_for(device_error)
}

/// Next step for the user, if there is an obvious one
pub fn recovery_hint(error: &DeviceError) -> Option<&'static str> {
    match error {
        DeviceError::DeviceNotConnected(_) => {
            Some("Check the USB cable and that USB debugging is authorized, then retry.")
        }
        DeviceError::NetworkError(_) | DeviceError::Timeout(_) => {
            Some("Make sure the backend is running, or pass --backend URL.")
        }
        DeviceError::Unauthorized => Some("Run `devscope login` to start a new session."),
        DeviceError::Configuration(_) => Some("Run `devscope dump-config --show-paths` to inspect settings."),
        _ => None,
    }
}

pub fn exit_code_for(error: &DeviceError) -> u8 {
    match error {
        DeviceError::DeviceNotConnected(_) => exit_code::DEVICE_NOT_CONNECTED,
        DeviceError::NetworkError(_) | DeviceError::Timeout(_) => exit_code::UNREACHABLE,
        DeviceError::Unauthorized => exit_code::UNAUTHORIZED,
        DeviceError::Validation { .. } | DeviceError::Configuration(_) => exit_code::INVALID_INPUT,
        _ => exit_code::FAILURE,
    }
}
