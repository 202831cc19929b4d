//! Progress stream shared by long-running-operation monitors.
//!
//! The default sink is process-wide: changing it affects every monitor
//! constructed afterwards, not the ones already built.

use std::io::{self, Write};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

/// A writer shared between monitors.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Where progress output goes.
#[derive(Clone, Default)]
pub enum ProgressSink {
    /// The process's standard error stream.
    #[default]
    Stderr,
    /// No progress output at all.
    Disabled,
    /// Any other writer.
    Shared(SharedWriter),
}

static DEFAULT_SINK: Lazy<RwLock<ProgressSink>> = Lazy::new(|| RwLock::new(ProgressSink::Stderr));

/// Sink picked up by newly constructed monitors.
pub fn default_sink() -> ProgressSink {
    DEFAULT_SINK.read().clone()
}

/// Replace the process-wide default sink, returning the previous one.
pub fn set_default_sink(sink: ProgressSink) -> ProgressSink {
    std::mem::replace(&mut *DEFAULT_SINK.write(), sink)
}

impl ProgressSink {
    pub fn is_disabled(&self) -> bool {
        matches!(self, ProgressSink::Disabled)
    }

    pub fn is_stderr(&self) -> bool {
        matches!(self, ProgressSink::Stderr)
    }

    /// Write and flush. Progress output is best effort: failures are logged, not returned.
    pub(crate) fn emit(&self, text: &str) {
        let outcome = match self {
            ProgressSink::Disabled => Ok(()),
            ProgressSink::Stderr => write_flush(&mut io::stderr().lock(), text),
            ProgressSink::Shared(writer) => write_flush(&mut *writer.lock(), text),
        };
        if let Err(err) = outcome {
            tracing::trace!(error = %err, "progress write failed");
        }
    }
}

fn write_flush<W: Write + ?Sized>(writer: &mut W, text: &str) -> io::Result<()> {
    writer.write_all(text.as_bytes())?;
    writer.flush()
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressSink::Stderr => f.write_str("Stderr"),
            ProgressSink::Disabled => f.write_str("Disabled"),
            ProgressSink::Shared(_) => f.write_str("Shared(..)"),
        }
    }
}
