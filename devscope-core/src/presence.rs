//! Device presence polling
//!
//! The home screen shows whether a phone is attached. [`PresenceMonitor`]
//! asks the backend for its device list immediately and then once per
//! interval, publishing each answer on a `tokio::sync::watch` channel.
//! Receivers always see the latest state; intermediate states may be skipped.
//!
//! Polling stops when the monitor is stopped or dropped. A request already in
//! flight is abandoned with the task.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::client::DeviceBackend;
use crate::{DeviceError, Result};

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Latest known device presence
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Presence {
    /// No answer yet
    #[default]
    Unknown,
    /// Serials of the attached devices
    Connected(Vec<String>),
    /// Backend answered but has no device
    NotConnected(String),
    /// Backend could not be reached
    Unreachable(String),
}

impl Presence {
    pub fn from_result(result: Result<Vec<String>>) -> Self {
        match result {
            Ok(devices) if devices.is_empty() => {
                Presence::NotConnected("No devices attached".to_string())
            }
            Ok(devices) => Presence::Connected(devices),
            Err(e @ DeviceError::DeviceNotConnected(_)) => Presence::NotConnected(e.user_message()),
            Err(e) => Presence::Unreachable(e.user_message()),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Presence::Connected(_))
    }

    pub fn devices(&self) -> &[String] {
        match self {
            Presence::Connected(devices) => devices,
            _ => &[],
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Unknown => f.write_str("Checking for devices..."),
            Presence::Connected(devices) => write!(f, "Connected: {}", devices.join(", ")),
            Presence::NotConnected(msg) | Presence::Unreachable(msg) => f.write_str(msg),
        }
    }
}

/// Background poller; stops on [`stop`](Self::stop) or drop
pub struct PresenceMonitor {
    task: Option<JoinHandle<()>>,
    rx: watch::Receiver<Presence>,
}

impl PresenceMonitor {
    /// Start polling on the current tokio runtime
    pub fn spawn(backend: Arc<dyn DeviceBackend>, poll_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(Presence::Unknown);
        let period = poll_interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Presence polling started ({:?})", period);

            loop {
                ticker.tick().await;
                let presence = Presence::from_result(backend.devices().await);
                debug!("Presence: {}", presence);

                tx.send_if_modified(|current| {
                    if *current == presence {
                        false
                    } else {
                        *current = presence;
                        true
                    }
                });

                if tx.is_closed() {
                    debug!("All presence receivers dropped");
                    break;
                }
            }
        });

        Self {
            task: Some(task),
            rx,
        }
    }

    /// A receiver for presence changes
    pub fn subscribe(&self) -> watch::Receiver<Presence> {
        self.rx.clone()
    }

    /// Most recently published presence
    pub fn current(&self) -> Presence {
        self.rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Abort the polling task
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Presence polling stopped");
        }
    }
}

impl Drop for PresenceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
