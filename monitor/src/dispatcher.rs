//! Fire-and-forget notification dispatch.
//!
//! [`NotificationDispatcher`] owns a bounded queue drained by a fixed pool of
//! worker tasks, each delivering through a shared [`WebhookSender`].
//! [`NotificationDispatcher::dispatch`] never waits: when the queue is full
//! the notification is dropped and counted, so a slow webhook cannot stall
//! the file watcher or grow memory without bound.
//!
//! Delivery outcomes are logged and counted in [`DispatcherStats`]; they are
//! never reported back to the caller and never retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::sender::WebhookSender;
use crate::types::Notification;

/// Default number of delivery workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default capacity of the dispatch queue.
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// Errors returned when a notification cannot be queued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The queue is at capacity; the notification was dropped.
    #[error("dispatch queue full, notification dropped")]
    QueueFull,

    /// All workers have stopped.
    #[error("dispatcher closed")]
    Closed,
}

/// Sizing of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Number of concurrent deliveries.
    pub workers: usize,

    /// Notifications that may wait for a free worker.
    pub queue_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

/// Delivery counters shared by the dispatcher and its workers.
#[derive(Debug, Default)]
pub struct DispatcherStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DispatcherStats {
    /// Notifications accepted by the webhook (2xx).
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Notifications that failed in transport or got a non-2xx status.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Notifications dropped because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Bounded queue plus worker pool for webhook delivery.
#[derive(Debug)]
pub struct NotificationDispatcher {
    queue: mpsc::Sender<Notification>,
    stats: Arc<DispatcherStats>,
    workers: Vec<JoinHandle<()>>,
}

impl NotificationDispatcher {
    /// Spawns the worker pool on the current Tokio runtime.
    ///
    /// Zero-sized settings are raised to one.
    #[must_use]
    pub fn start(sender: WebhookSender, config: DispatcherConfig) -> Self {
        let (queue, rx) = mpsc::channel::<Notification>(config.queue_size.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(DispatcherStats::default());

        let workers = (0..config.workers.max(1))
            .map(|id| {
                let rx = Arc::clone(&rx);
                let sender = sender.clone();
                let stats = Arc::clone(&stats);
                tokio::spawn(async move {
                    run_worker(id, rx, sender, stats).await;
                })
            })
            .collect();

        debug!(
            workers = config.workers.max(1),
            queue_size = config.queue_size.max(1),
            url = %sender.url(),
            "Dispatcher started"
        );

        Self {
            queue,
            stats,
            workers,
        }
    }

    /// Queues a notification for delivery without waiting.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::QueueFull` if the queue is at capacity (the
    /// notification is dropped) or `DispatchError::Closed` if the workers
    /// are gone.
    pub fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
        match self.queue.try_send(notification) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Err(DispatchError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }

    /// Returns the shared delivery counters.
    #[must_use]
    pub fn stats(&self) -> Arc<DispatcherStats> {
        Arc::clone(&self.stats)
    }

    /// Returns the number of notifications waiting for a worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }

    /// Stops accepting notifications and waits for queued ones to finish.
    pub async fn close(self) {
        drop(self.queue);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Dispatch worker panicked");
            }
        }
    }
}

/// Delivers queued notifications until the queue closes.
async fn run_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Notification>>>,
    sender: WebhookSender,
    stats: Arc<DispatcherStats>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(notification) = next else {
            break;
        };

        match sender.send(&notification).await {
            Ok(status) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(
                    worker = id,
                    status = status.as_u16(),
                    file = %notification.text,
                    "Notification delivered"
                );
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    worker = id,
                    error = %e,
                    file = %notification.text,
                    "Failed to deliver notification"
                );
            }
        }
    }

    debug!(worker = id, "Dispatch worker shutting down");
}
