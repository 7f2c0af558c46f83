//! # Status Module
//!
//! Connection status messages and the channel they are published on.
//!
//! Every step of the connect/emulate/disconnect flow produces one
//! [`Status`]. Failures are never retried; they end the step and show up
//! here as a message.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// One step of the connection flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    LookingForDevice,
    DeviceNotFound,
    DeviceFound,
    SendingInitData,
    SendingLedData,
    UsbInitComplete,
    UsbInitFailed(String),
    ConnectingHid,
    ConnectedHid,
    HidFailed(String),
    EmulationActive,
    EmulationFailed(String),
    ReadLoopError(String),
    Disconnected,
}

impl Status {
    /// Progress percentage reached when this status is shown.
    ///
    /// `None` leaves the previous progress in place.
    #[must_use]
    pub fn progress(&self) -> Option<u8> {
        match self {
            Status::Ready | Status::Disconnected => Some(0),
            Status::LookingForDevice => Some(10),
            Status::DeviceFound => Some(30),
            Status::SendingInitData => Some(50),
            Status::SendingLedData => Some(70),
            Status::UsbInitComplete => Some(90),
            Status::ConnectedHid => Some(100),
            _ => None,
        }
    }

    /// Whether this status ends the current step with a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Status::DeviceNotFound
                | Status::UsbInitFailed(_)
                | Status::HidFailed(_)
                | Status::EmulationFailed(_)
                | Status::ReadLoopError(_)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "Ready to connect"),
            Status::LookingForDevice => write!(f, "Looking for device..."),
            Status::DeviceNotFound => write!(f, "Device not found"),
            Status::DeviceFound => write!(f, "Device found"),
            Status::SendingInitData => write!(f, "Sending initialization data..."),
            Status::SendingLedData => write!(f, "Sending LED data..."),
            Status::UsbInitComplete => write!(f, "USB initialization complete"),
            Status::UsbInitFailed(e) => write!(f, "USB initialization failed: {}", e),
            Status::ConnectingHid => write!(f, "Connecting via HID..."),
            Status::ConnectedHid => write!(f, "Connected via HID"),
            Status::HidFailed(e) => write!(f, "HID connection failed: {}", e),
            Status::EmulationActive => write!(f, "Xbox 360 emulation active"),
            Status::EmulationFailed(e) => write!(f, "Failed to start emulation: {}", e),
            Status::ReadLoopError(e) => write!(f, "Read loop error: {}", e),
            Status::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Publishes status updates to any number of watchers.
///
/// Cheap to clone; the input loop thread holds its own copy.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: Arc<watch::Sender<Status>>,
}

/// Log target of every reported status.
///
/// The CLI keeps this target on the terminal even when logging to a file.
pub const STATUS_TARGET: &str = "gc_enabler::status";

impl StatusReporter {
    /// Creates a reporter and a receiver starting at [`Status::Ready`].
    #[must_use]
    pub fn channel() -> (Self, watch::Receiver<Status>) {
        let (tx, rx) = watch::channel(Status::Ready);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Publishes a status, replacing the previous one.
    ///
    /// Works with no receivers attached.
    pub fn report(&self, status: Status) {
        match status.progress() {
            _ if status.is_failure() => warn!(target: STATUS_TARGET, "{}", status),
            Some(progress) => info!(target: STATUS_TARGET, "[{:>3}%] {}", progress, status),
            None => info!(target: STATUS_TARGET, "{}", status),
        }
        self.tx.send_replace(status);
    }

    #[must_use]
    pub fn current(&self) -> Status {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        assert_eq!(Status::Ready.to_string(), "Ready to connect");
        assert_eq!(Status::LookingForDevice.to_string(), "Looking for device...");
        assert_eq!(
            Status::UsbInitFailed("Timeout".into()).to_string(),
            "USB initialization failed: Timeout"
        );
        assert_eq!(
            Status::HidFailed("busy".into()).to_string(),
            "HID connection failed: busy"
        );
        assert_eq!(Status::EmulationActive.to_string(), "Xbox 360 emulation active");
        assert_eq!(
            Status::ReadLoopError("gone".into()).to_string(),
            "Read loop error: gone"
        );
    }

    #[test]
    fn test_progress_is_monotonic_through_connect() {
        let steps = [
            Status::LookingForDevice,
            Status::DeviceFound,
            Status::SendingInitData,
            Status::SendingLedData,
            Status::UsbInitComplete,
            Status::ConnectedHid,
        ];
        let progress: Vec<u8> = steps.iter().filter_map(Status::progress).collect();
        assert_eq!(progress, vec![10, 30, 50, 70, 90, 100]);
    }

    #[test]
    fn test_failure_keeps_progress() {
        assert_eq!(Status::DeviceNotFound.progress(), None);
        assert!(Status::DeviceNotFound.is_failure());
        assert!(!Status::ConnectedHid.is_failure());
    }

    #[test]
    fn test_reporter_replaces_value() {
        let (reporter, mut rx) = StatusReporter::channel();
        assert_eq!(*rx.borrow(), Status::Ready);

        reporter.report(Status::DeviceFound);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Status::DeviceFound);
        assert_eq!(reporter.current(), Status::DeviceFound);
    }

    #[test]
    fn test_reporter_without_receivers() {
        let (reporter, rx) = StatusReporter::channel();
        drop(rx);
        reporter.report(Status::Disconnected);
        assert_eq!(reporter.current(), Status::Disconnected);
    }
}
