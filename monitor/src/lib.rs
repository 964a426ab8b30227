//! tailhook - forward lines appended to a file to a webhook.
//!
//! This crate watches one text file and, each time a line is appended, POSTs
//! it to a webhook as `{"text": <path>, "attachments": [{"title": <line>,
//! "color": <tag>}]}`.
//!
//! # Overview
//!
//! A [`FileWatcher`] turns file system events into [`WatchSignal`]s. A single
//! task feeds them to a [`Forwarder`], which asks its [`FileDeltaTracker`]
//! for the newly appended line and hands it to the [`NotificationDispatcher`]
//! for fire-and-forget delivery.
//!
//! # Modules
//!
//! - [`types`]: Webhook payload and extracted line types
//! - [`tracker`]: Offset bookkeeping and new line extraction
//! - [`watcher`]: File system watcher for the monitored file
//! - [`sender`]: HTTP client for the webhook
//! - [`dispatcher`]: Bounded queue and worker pool for delivery
//! - [`forwarder`]: Signal handling loop body
//! - [`config`]: Configuration from flags and environment variables
//! - [`error`]: Error types for monitor operations

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod sender;
pub mod tracker;
pub mod types;
pub mod watcher;

pub use config::{Config, ConfigError, ConfigOverrides, LogFormat};
pub use dispatcher::{DispatchError, DispatcherConfig, DispatcherStats, NotificationDispatcher};
pub use error::{MonitorError, Result};
pub use forwarder::{Forwarder, SignalOutcome};
pub use sender::{SenderError, WebhookSender};
pub use tracker::{FileDeltaTracker, StartupPolicy, TrackerError, WatchState};
pub use types::{Attachment, ExtractedLine, Notification, DEFAULT_COLOR};
pub use watcher::{FileWatcher, WatchSignal, WatcherError};
