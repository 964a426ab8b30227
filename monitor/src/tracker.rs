//! Delta tracking for the monitored file.
//!
//! [`FileDeltaTracker`] keeps a [`WatchState`] (offset of the last extracted
//! line, file size at that time) and, each time the file changes, works out
//! which line was appended since the previous extraction.
//!
//! # Algorithm
//!
//! - Size unchanged: nothing to do. Duplicate change events land here.
//! - Size shrank: the file was truncated or rotated. State is reset and the
//!   file is treated as never seen before.
//! - Never seen before (`last_file_size == 0`): the file is scanned line by
//!   line to find the length of its final line.
//! - Otherwise the appended window is `current_size - last_file_size - 1`
//!   bytes, the `- 1` being the newline that terminates the new content.
//!   A file already observed empty takes this path too, so every line of
//!   its first append is reported.
//!
//! In both cases the window is read at `current_size - (window_len + 1)`
//! together with its terminator. A window whose terminator is not `\n` is a
//! line still being written and is left for a later event.
//!
//! The tracker takes `&mut self`; callers that share one across tasks must
//! hold a lock around the whole [`FileDeltaTracker::compute_delta`] call.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::types::ExtractedLine;

/// Errors that can occur while computing a delta.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The monitored file could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The line is too large to buffer on this platform.
    #[error("line of {0} bytes is too large to read")]
    LineTooLarge(u64),
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Progress of the tracker through the monitored file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchState {
    /// Byte offset of the last extracted line.
    pub last_offset: u64,

    /// File size when the last line was extracted. Zero means no line has
    /// been extracted yet.
    pub last_file_size: u64,
}

impl WatchState {
    /// Returns true if nothing has been recorded yet.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.last_file_size == 0
    }
}

/// What to do with the last line already in the file when monitoring starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartupPolicy {
    /// Record the existing content as a baseline without notifying.
    #[default]
    SkipExistingTail,

    /// Treat the existing last line as new and notify for it.
    NotifyExistingTail,
}

/// Where the file ends, as found by a line scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tail {
    /// Start offset and length (without `\n`) of the final complete line.
    last_line: Option<(u64, u64)>,

    /// Bytes after the final `\n`.
    partial_len: u64,
}

/// Computes newly appended lines for a single file.
#[derive(Debug)]
pub struct FileDeltaTracker {
    path: PathBuf,
    state: WatchState,

    /// The file was observed with no complete line since the last reset.
    seen_empty: bool,
}

impl FileDeltaTracker {
    /// Creates a tracker with empty state.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_state(path, WatchState::default())
    }

    /// Creates a tracker resuming from a known state.
    #[must_use]
    pub fn with_state(path: impl Into<PathBuf>, state: WatchState) -> Self {
        Self {
            path: path.into(),
            state,
            seen_empty: false,
        }
    }

    /// Returns the monitored path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current watch state.
    #[must_use]
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Applies the startup policy.
    ///
    /// With [`StartupPolicy::NotifyExistingTail`] the existing last line is
    /// returned for dispatch. With [`StartupPolicy::SkipExistingTail`] it is
    /// recorded as a baseline and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn start(&mut self, policy: StartupPolicy) -> Result<Option<ExtractedLine>> {
        match policy {
            StartupPolicy::NotifyExistingTail => self.compute_delta(),
            StartupPolicy::SkipExistingTail => {
                self.prime()?;
                Ok(None)
            }
        }
    }

    /// Records the current end of the file as the baseline.
    ///
    /// A trailing partial line is left outside the baseline so that it is
    /// reported in full once its newline is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn prime(&mut self) -> Result<WatchState> {
        let mut file = File::open(&self.path)?;
        let size = file.metadata()?.len();
        let tail = scan_tail(&mut file, size)?;

        self.state = WatchState {
            last_offset: tail.last_line.map_or(0, |(offset, _)| offset),
            last_file_size: size - tail.partial_len,
        };
        self.seen_empty = self.state.is_fresh();

        debug!(
            path = %self.path.display(),
            last_offset = self.state.last_offset,
            last_file_size = self.state.last_file_size,
            "Recorded baseline"
        );

        Ok(self.state)
    }

    /// Returns the line appended since the last extraction, if any.
    ///
    /// State is only updated when a complete line was found. On error the
    /// state is left untouched so the next call recomputes from the last
    /// good position.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn compute_delta(&mut self) -> Result<Option<ExtractedLine>> {
        let mut file = File::open(&self.path)?;
        let current_size = file.metadata()?.len();

        if current_size == 0 && self.state.is_fresh() {
            self.seen_empty = true;
        }

        if current_size == self.state.last_file_size {
            trace!(path = %self.path.display(), size = current_size, "Size unchanged");
            return Ok(None);
        }

        if current_size < self.state.last_file_size {
            info!(
                path = %self.path.display(),
                old_size = self.state.last_file_size,
                new_size = current_size,
                "File truncated, resetting watch state"
            );
            self.state = WatchState::default();
            self.seen_empty = current_size == 0;

            if self.seen_empty {
                return Ok(None);
            }
        }

        let window_len = if self.state.is_fresh() && !self.seen_empty {
            let tail = scan_tail(&mut file, current_size)?;
            if tail.partial_len > 0 {
                trace!(path = %self.path.display(), "Final line not terminated yet");
                return Ok(None);
            }
            match tail.last_line {
                Some((_, len)) => len,
                None => return Ok(None),
            }
        } else {
            current_size - self.state.last_file_size - 1
        };

        let read_offset = current_size - (window_len + 1);

        // Only reachable from a state handed to `with_state`; extracted
        // states always satisfy `last_offset < last_file_size <= read_offset`.
        if !self.state.is_fresh() && read_offset == self.state.last_offset {
            trace!(path = %self.path.display(), offset = read_offset, "Offset already extracted");
            return Ok(None);
        }

        let mut window = read_window(&mut file, read_offset, window_len + 1)?;

        if window.pop() != Some(b'\n') {
            trace!(
                path = %self.path.display(),
                offset = read_offset,
                "Appended content not terminated yet"
            );
            return Ok(None);
        }
        if window.last() == Some(&b'\r') {
            window.pop();
        }

        self.state = WatchState {
            last_offset: read_offset,
            last_file_size: current_size,
        };
        self.seen_empty = false;

        if window.is_empty() {
            debug!(path = %self.path.display(), offset = read_offset, "Empty line appended");
            return Ok(None);
        }

        Ok(Some(ExtractedLine {
            path: self.path.clone(),
            content: String::from_utf8_lossy(&window).into_owned(),
            offset: read_offset,
            file_size: current_size,
        }))
    }
}

/// Scans the first `limit` bytes of `file` line by line.
fn scan_tail(file: &mut File, limit: u64) -> io::Result<Tail> {
    file.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(file.take(limit));
    let mut buf = Vec::new();
    let mut position = 0u64;
    let mut tail = Tail::default();

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)? as u64;
        if read == 0 {
            break;
        }

        if buf.ends_with(b"\n") {
            tail.last_line = Some((position, read - 1));
            tail.partial_len = 0;
        } else {
            tail.partial_len = read;
        }
        position += read;
    }

    Ok(tail)
}

/// Reads exactly `len` bytes at `offset`.
fn read_window(file: &mut File, offset: u64, len: u64) -> Result<Vec<u8>> {
    let size = usize::try_from(len).map_err(|_| TrackerError::LineTooLarge(len))?;
    let mut window = vec![0u8; size];
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(&mut window)?;
    Ok(window)
}
