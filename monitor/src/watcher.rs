//! File watcher for the monitored file.
//!
//! This module attaches a [`notify`] watch to a single file and turns raw
//! file system events into [`WatchSignal`]s on a Tokio channel.
//!
//! # Architecture
//!
//! The notify callback runs on the watcher's own thread and is kept
//! lightweight: it classifies the event and `try_send`s a signal. All file
//! I/O happens in the consumer of the channel, which owns the delta tracker.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tokio::sync::mpsc;
//! use tailhook_monitor::watcher::{FileWatcher, WatchSignal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let _watcher = FileWatcher::new(PathBuf::from("/var/log/app.log"), tx)?;
//!
//!     while let Some(signal) = rx.recv().await {
//!         match signal {
//!             WatchSignal::Modified => println!("file changed"),
//!             WatchSignal::Error(e) => eprintln!("watch error: {e}"),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use notify::{
    event::ModifyKind, Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Signals delivered to the consumer of a [`FileWatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    /// The file content was modified.
    Modified,

    /// The watch backend reported an error. Watching continues.
    Error(String),
}

/// Errors that can occur while setting up a watch.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to initialize the file system watcher.
    #[error("failed to create watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    /// The file to watch does not exist or is inaccessible.
    #[error("watched file does not exist: {0}")]
    FileNotFound(PathBuf),

    /// The path exists but is not a regular file.
    #[error("watched path is not a file: {0}")]
    NotAFile(PathBuf),
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Watches a single file for modifications.
///
/// Dropping the `FileWatcher` stops the watch.
#[derive(Debug)]
pub struct FileWatcher {
    /// Kept alive to maintain the watch subscription.
    #[allow(dead_code)]
    watcher: RecommendedWatcher,

    path: PathBuf,
}

impl FileWatcher {
    /// Starts watching `path`, sending signals to `signal_sender`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - The path is not a regular file
    /// - The file system watcher cannot be initialized or attached
    pub fn new(path: PathBuf, signal_sender: mpsc::Sender<WatchSignal>) -> Result<Self> {
        if !path.exists() {
            return Err(WatcherError::FileNotFound(path));
        }
        if !path.is_file() {
            return Err(WatcherError::NotAFile(path));
        }

        let watcher = create_watcher(signal_sender, &path)?;

        info!(path = %path.display(), "Initialized file watcher");

        Ok(Self { watcher, path })
    }

    /// Returns the watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Creates the underlying notify watcher with a lightweight callback.
fn create_watcher(
    signal_sender: mpsc::Sender<WatchSignal>,
    path: &Path,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<Event, notify::Error>| {
            handle_notify_event(res, &signal_sender);
        },
        Config::default(),
    )?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;

    debug!(path = %path.display(), "Started file watch");

    Ok(watcher)
}

/// Handles events from the notify crate.
fn handle_notify_event(
    res: std::result::Result<Event, notify::Error>,
    signal_sender: &mpsc::Sender<WatchSignal>,
) {
    let signal = match res {
        Ok(event) => {
            trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");
            if !is_content_change(&event.kind) {
                trace!(kind = ?event.kind, "Ignoring event kind");
                return;
            }
            WatchSignal::Modified
        }
        Err(e) => WatchSignal::Error(e.to_string()),
    };

    // Never block the notify thread. Dropped signals are harmless because the
    // next one recomputes from the file size.
    if let Err(e) = signal_sender.try_send(signal) {
        warn!(error = %e, "Failed to queue watch signal, channel may be full");
    }
}

/// Returns true for events that may have changed the file content.
fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}
