//! Long-running-operation monitor.
//!
//! [`LongRunningOperation`] blocks the calling thread on a [`Poller`] and
//! keeps the user informed: a start message, one progress marker per poll,
//! and a closing line that is written on every exit path.
//!
//! With the default dots style the output is exactly
//!
//! ```text
//! <start_msg>\n
//! ....            one '.' per pending poll
//! \n
//! <finish_msg>\n  on success, an empty line otherwise
//! ```
//!
//! The closing lines come from a drop guard, so an operation fault, a
//! cancellation, a timeout or even a panic inside the poller still leaves the
//! stream newline-terminated.

mod poller;
mod sink;
mod spinner;

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use poller::{Poller, ThreadPoller};
pub use sink::{ProgressSink, SharedWriter, default_sink, set_default_sink};
pub use spinner::format_duration;

use spinner::Spinner;

/// Interval between polls when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Longest uninterrupted sleep; bounds how late a cancellation is noticed.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// How progress is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStyle {
    /// Plain `.` markers.
    #[default]
    Dots,
    /// Animated spinner on stderr.
    Spinner,
    /// Spinner when stderr is an interactive terminal, dots otherwise.
    Auto,
}

/// Why [`LongRunningOperation::run`] did not return a result.
#[derive(Debug, Error)]
pub enum MonitorError<E> {
    /// The poller's `result()` reported a failure.
    #[error("{0}")]
    Operation(E),
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),
}

impl<E> MonitorError<E> {
    /// The operation's own error, if that is what stopped the monitor.
    pub fn into_operation(self) -> Option<E> {
        match self {
            MonitorError::Operation(err) => Some(err),
            _ => None,
        }
    }
}

/// Blocking progress loop around a [`Poller`].
#[derive(Debug, Clone)]
pub struct LongRunningOperation {
    start_msg: String,
    finish_msg: String,
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
    sink: ProgressSink,
    style: MonitorStyle,
}

impl LongRunningOperation {
    /// New monitor writing to the current [`default_sink`].
    pub fn new(start_msg: impl Into<String>, finish_msg: impl Into<String>) -> Self {
        Self {
            start_msg: start_msg.into(),
            finish_msg: finish_msg.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            cancel: None,
            sink: default_sink(),
            style: MonitorStyle::default(),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up once the operation has been pending this long.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn sink(mut self, sink: ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn style(mut self, style: MonitorStyle) -> Self {
        self.style = style;
        self
    }

    /// Apply the `[monitor]` section of the configuration.
    pub fn with_config(self, config: &crate::config::MonitorConfig) -> Self {
        self.poll_interval(Duration::from_millis(config.poll_interval_ms))
            .style(config.style)
    }

    /// Block until `poller` is done and return its result.
    pub fn run<P: Poller>(&self, mut poller: P) -> Result<P::Output, MonitorError<P::Error>> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut progress = Progress::start(self);
        let mut polls: u64 = 0;

        while !poller.done() {
            self.check_stop(deadline)?;
            polls += 1;
            progress.tick(polls);
            self.wait(deadline)?;
        }

        let output = poller.result().map_err(MonitorError::Operation)?;
        progress.succeeded = true;
        Ok(output)
    }

    fn check_stop<E>(&self, deadline: Option<Instant>) -> Result<(), MonitorError<E>> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(MonitorError::Cancelled);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(MonitorError::TimedOut(self.timeout.unwrap_or_default()));
        }
        Ok(())
    }

    fn wait<E>(&self, deadline: Option<Instant>) -> Result<(), MonitorError<E>> {
        let mut remaining = self.poll_interval;
        while !remaining.is_zero() {
            self.check_stop(deadline)?;
            let slice = remaining.min(WAIT_SLICE);
            thread::sleep(slice);
            remaining -= slice;
        }
        Ok(())
    }
}

/// Progress renderer; its `Drop` is the finalizer.
struct Progress<'a> {
    sink: &'a ProgressSink,
    spinner: Option<Spinner>,
    start_msg: &'a str,
    finish_msg: &'a str,
    succeeded: bool,
}

impl<'a> Progress<'a> {
    fn start(op: &'a LongRunningOperation) -> Self {
        let spinner = match (op.style, &op.sink) {
            (_, sink) if !sink.is_stderr() => None,
            (MonitorStyle::Spinner, _) => Some(Spinner::new(&op.start_msg)),
            (MonitorStyle::Auto, _) if console::Term::stderr().is_term() => {
                Some(Spinner::new(&op.start_msg))
            }
            _ => None,
        };
        if spinner.is_none() {
            op.sink.emit(&format!("{}\n", op.start_msg));
        }
        Self {
            sink: &op.sink,
            spinner,
            start_msg: &op.start_msg,
            finish_msg: &op.finish_msg,
            succeeded: false,
        }
    }

    fn tick(&self, polls: u64) {
        match &self.spinner {
            Some(spinner) => spinner.poll(polls),
            None => self.sink.emit("."),
        }
    }
}

impl Drop for Progress<'_> {
    fn drop(&mut self) {
        match &self.spinner {
            Some(spinner) if self.succeeded => spinner.finish_success(self.finish_msg),
            Some(spinner) => spinner.finish_error(self.start_msg),
            None => {
                let closing = if self.succeeded { self.finish_msg } else { "" };
                self.sink.emit(&format!("\n{closing}\n"));
            }
        }
    }
}
