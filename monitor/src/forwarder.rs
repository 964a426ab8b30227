//! Glue between watch signals, the delta tracker and the dispatcher.
//!
//! A [`Forwarder`] is driven by exactly one task. It owns the
//! [`FileDeltaTracker`], so the watch state is only ever touched from that
//! task and needs no lock.

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dispatcher::NotificationDispatcher;
use crate::error::Result;
use crate::sender::WebhookSender;
use crate::tracker::{FileDeltaTracker, StartupPolicy};
use crate::types::{ExtractedLine, Notification};
use crate::watcher::WatchSignal;

/// What handling one signal led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// A new line was queued for delivery.
    Dispatched,

    /// A new line was found but could not be queued.
    Dropped,

    /// Nothing new in the file.
    Unchanged,

    /// The file could not be read or the watch reported an error.
    Failed,
}

/// Turns watch signals into webhook notifications.
#[derive(Debug)]
pub struct Forwarder {
    tracker: FileDeltaTracker,
    dispatcher: NotificationDispatcher,
    color: String,
}

impl Forwarder {
    /// Creates a forwarder from its parts.
    #[must_use]
    pub fn new(
        tracker: FileDeltaTracker,
        dispatcher: NotificationDispatcher,
        color: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            dispatcher,
            color: color.into(),
        }
    }

    /// Builds the sender, dispatcher and tracker described by `config`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let sender = WebhookSender::new(config.webhook_url.clone(), config.request_timeout)?;
        let dispatcher = NotificationDispatcher::start(sender, config.dispatcher);
        let tracker = FileDeltaTracker::new(config.file.clone());

        Ok(Self::new(tracker, dispatcher, config.color.clone()))
    }

    /// Applies the startup policy, dispatching the existing last line if the
    /// policy asks for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn start(&mut self, policy: StartupPolicy) -> Result<SignalOutcome> {
        let outcome = match self.tracker.start(policy)? {
            Some(line) => self.forward(line),
            None => SignalOutcome::Unchanged,
        };

        info!(
            path = %self.tracker.path().display(),
            policy = ?policy,
            last_offset = self.tracker.state().last_offset,
            last_file_size = self.tracker.state().last_file_size,
            "Watching for appended lines"
        );

        Ok(outcome)
    }

    /// Handles one signal from the watcher.
    pub fn handle_signal(&mut self, signal: WatchSignal) -> SignalOutcome {
        match signal {
            WatchSignal::Modified => match self.tracker.compute_delta() {
                Ok(Some(line)) => self.forward(line),
                Ok(None) => SignalOutcome::Unchanged,
                Err(e) => {
                    warn!(
                        path = %self.tracker.path().display(),
                        error = %e,
                        "Failed to read appended content"
                    );
                    SignalOutcome::Failed
                }
            },
            WatchSignal::Error(message) => {
                error!(error = %message, "File watcher error");
                SignalOutcome::Failed
            }
        }
    }

    /// Returns the tracker.
    #[must_use]
    pub fn tracker(&self) -> &FileDeltaTracker {
        &self.tracker
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Consumes the forwarder, returning its dispatcher.
    #[must_use]
    pub fn into_dispatcher(self) -> NotificationDispatcher {
        self.dispatcher
    }

    fn forward(&self, line: ExtractedLine) -> SignalOutcome {
        debug!(
            path = %line.path.display(),
            offset = line.offset,
            file_size = line.file_size,
            bytes = line.content.len(),
            "Extracted appended line"
        );

        let notification = Notification::from_line(line, self.color.as_str());
        match self.dispatcher.dispatch(notification) {
            Ok(()) => SignalOutcome::Dispatched,
            Err(e) => {
                warn!(error = %e, "Notification not queued");
                SignalOutcome::Dropped
            }
        }
    }
}
