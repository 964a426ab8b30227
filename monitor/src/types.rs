//! Domain and wire types for tailhook.
//!
//! [`Notification`] is the JSON body POSTed to the webhook. [`ExtractedLine`]
//! is what the tracker hands to the forwarder once a new line is found.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default attachment color when none is configured.
pub const DEFAULT_COLOR: &str = "info";

/// A single attachment in the webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// The appended line content.
    pub title: String,

    /// Severity tag shown by the receiving service (`info`, `error`, ...).
    pub color: String,
}

/// Webhook payload.
///
/// Serializes to:
///
/// ```json
/// {"text": "/var/log/app.log", "attachments": [{"title": "line", "color": "info"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Path of the monitored file.
    pub text: String,

    /// Attachments, in display order.
    pub attachments: Vec<Attachment>,
}

impl Notification {
    /// Builds a notification carrying one line from `path`.
    #[must_use]
    pub fn new(path: &Path, title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            text: path.display().to_string(),
            attachments: vec![Attachment {
                title: title.into(),
                color: color.into(),
            }],
        }
    }

    /// Builds a notification from an extracted line, consuming it.
    #[must_use]
    pub fn from_line(line: ExtractedLine, color: impl Into<String>) -> Self {
        Self::new(&line.path, line.content, color)
    }
}

/// A line the tracker found appended to the monitored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLine {
    /// File the line was read from.
    pub path: PathBuf,

    /// Line content without its terminator.
    pub content: String,

    /// Byte offset the line was read from.
    pub offset: u64,

    /// File size observed when the line was read.
    pub file_size: u64,
}
