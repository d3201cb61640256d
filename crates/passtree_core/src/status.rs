//! Progress reporting and cooperative cancellation for long operations.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Severity of a status message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusType {
    /// Normal progress information.
    #[default]
    Info,
    /// Something unexpected that did not stop the operation.
    Warning,
    /// A failure.
    Error,
    /// Detail that is only interesting when debugging.
    AdditionalInfo,
}

/// Receives progress of a long operation and decides whether it continues.
///
/// Every method that returns `bool` doubles as a cancellation poll: `false`
/// asks the operation to stop at the next safe point.
pub trait StatusLogger: Send + Sync {
    /// Called once when an operation starts.
    fn start_logging(&self, operation: &str);

    /// Called once when an operation ends, also after cancellation.
    fn end_logging(&self);

    /// Reports progress in percent (0..=100).
    fn set_progress(&self, percent: u32) -> bool;

    /// Reports a message.
    fn set_text(&self, message: &str, kind: StatusType) -> bool;

    /// Polled between units of work.
    fn continue_work(&self) -> bool;
}

/// Logger that ignores every report and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatusLogger;

impl StatusLogger for NullStatusLogger {
    fn start_logging(&self, _operation: &str) {}

    fn end_logging(&self) {}

    fn set_progress(&self, _percent: u32) -> bool {
        true
    }

    fn set_text(&self, _message: &str, _kind: StatusType) -> bool {
        true
    }

    fn continue_work(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
struct Recorded {
    operation: String,
    progress: u32,
    texts: Vec<(String, StatusType)>,
    polls: usize,
    ended: bool,
}

/// Logger that keeps what it was told and can be cancelled from outside.
///
/// With `echo` set, every report is also emitted as a `tracing` event.
/// [`RecordingStatusLogger::cancel_after_polls`] makes cancellation
/// deterministic for tests.
#[derive(Debug, Default)]
pub struct RecordingStatusLogger {
    state: Mutex<Recorded>,
    cancelled: AtomicBool,
    cancel_after: Option<usize>,
    echo: bool,
}

impl RecordingStatusLogger {
    /// Creates a logger that never cancels on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Echoes every report as a `tracing` event.
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Cancels once `continue_work` has been polled `polls` times.
    #[must_use]
    pub fn cancel_after_polls(mut self, polls: usize) -> Self {
        self.cancel_after = Some(polls);
        self
    }

    /// Requests cancellation; every later poll returns `false`.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Name of the most recently started operation.
    #[must_use]
    pub fn operation(&self) -> String {
        self.state.lock().operation.clone()
    }

    /// Last reported progress.
    #[must_use]
    pub fn progress(&self) -> u32 {
        self.state.lock().progress
    }

    /// Every message reported so far.
    #[must_use]
    pub fn texts(&self) -> Vec<(String, StatusType)> {
        self.state.lock().texts.clone()
    }

    /// Number of `continue_work` polls so far.
    #[must_use]
    pub fn polls(&self) -> usize {
        self.state.lock().polls
    }

    /// Returns `true` if `end_logging` was called after the last start.
    #[must_use]
    pub fn ended(&self) -> bool {
        self.state.lock().ended
    }
}

impl StatusLogger for RecordingStatusLogger {
    fn start_logging(&self, operation: &str) {
        let mut state = self.state.lock();
        state.operation = operation.to_string();
        state.ended = false;
        if self.echo {
            info!(operation, "operation started");
        }
    }

    fn end_logging(&self) {
        self.state.lock().ended = true;
        if self.echo {
            info!("operation ended");
        }
    }

    fn set_progress(&self, percent: u32) -> bool {
        self.state.lock().progress = percent.min(100);
        if self.echo {
            debug!(percent, "progress");
        }
        !self.is_cancelled()
    }

    fn set_text(&self, message: &str, kind: StatusType) -> bool {
        self.state.lock().texts.push((message.to_string(), kind));
        if self.echo {
            match kind {
                StatusType::Warning | StatusType::Error => warn!(?kind, message),
                StatusType::Info | StatusType::AdditionalInfo => info!(?kind, message),
            }
        }
        !self.is_cancelled()
    }

    fn continue_work(&self) -> bool {
        let polls = {
            let mut state = self.state.lock();
            state.polls += 1;
            state.polls
        };
        if self.cancel_after.is_some_and(|limit| polls > limit) {
            self.cancel();
        }
        !self.is_cancelled()
    }
}
