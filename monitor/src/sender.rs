//! HTTP delivery of notifications to the webhook.
//!
//! [`WebhookSender`] serializes a [`Notification`] and POSTs it with
//! `Content-Type: application/json`. It makes exactly one attempt per call;
//! the response status is reported to the caller and never retried.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use tailhook_monitor::sender::WebhookSender;
//! use tailhook_monitor::types::Notification;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sender = WebhookSender::new("https://hooks.example.com/in/abc", Duration::from_secs(30))
//!         .unwrap();
//!     let notification = Notification::new(Path::new("/var/log/app.log"), "started", "info");
//!     sender.send(&notification).await.unwrap();
//! }
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::types::Notification;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while delivering a notification.
#[derive(Error, Debug)]
pub enum SenderError {
    /// HTTP request failed (connection, timeout, client construction).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Webhook answered with a non-success status.
    #[error("webhook returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// POSTs notifications to a single webhook endpoint.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: Client,
    url: String,
}

impl WebhookSender {
    /// Creates a sender for `url` with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `SenderError::Http` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SenderError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Returns the webhook URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one notification.
    ///
    /// # Errors
    ///
    /// Returns `SenderError` if serialization or the request fails, or if the
    /// webhook answers with a non-2xx status.
    pub async fn send(&self, notification: &Notification) -> Result<StatusCode, SenderError> {
        let body = serde_json::to_string(notification)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(url = %self.url, bytes = body.len(), "Posting notification");

        let response = self
            .client
            .post(&self.url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(status);
        }

        let message = response.text().await.unwrap_or_default();
        Err(SenderError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
