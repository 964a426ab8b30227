//! Error types for tailhook.
//!
//! Each module owns a focused error enum; [`MonitorError`] aggregates the ones
//! a [`crate::forwarder::Forwarder`] can fail with while being set up.
//!
//! | Failure | Type | Handling |
//! |---------|------|----------|
//! | Invalid settings | [`crate::config::ConfigError`] | fatal at startup |
//! | Watch cannot be attached | [`crate::watcher::WatcherError`] | fatal at startup |
//! | Watch backend error while running | [`crate::watcher::WatchSignal::Error`] | logged, keep watching |
//! | File unreadable mid-run | [`TrackerError`] | logged, state unchanged |
//! | Delivery failed | [`SenderError`] / [`crate::dispatcher::DispatchError`] | logged, dropped |

use thiserror::Error;

use crate::sender::SenderError;
use crate::tracker::TrackerError;

/// Errors that can occur while running the monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The monitored file could not be read.
    #[error("file access error: {0}")]
    FileAccess(#[from] TrackerError),

    /// HTTP delivery error.
    #[error("delivery error: {0}")]
    Sender(#[from] SenderError),
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
