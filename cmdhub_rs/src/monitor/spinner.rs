//! Terminal spinner for interactive progress.
//!
//! Draws on stderr; only chosen when the progress sink is stderr.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

const TICK_STRINGS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub(crate) struct Spinner {
    bar: ProgressBar,
    started: Instant,
}

impl Spinner {
    pub(crate) fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::default_spinner()
            .tick_strings(TICK_STRINGS)
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            bar,
            started: Instant::now(),
        }
    }

    pub(crate) fn poll(&self, polls: u64) {
        self.bar.set_position(polls);
        self.bar.tick();
    }

    /// Finish with success message (green checkmark)
    pub(crate) fn finish_success(&self, message: &str) {
        self.bar.finish_and_clear();
        if !message.is_empty() {
            eprintln!(
                "{} {} {}",
                style("✓").green().bold(),
                message,
                style(format!("({})", format_duration(self.started.elapsed()))).dim()
            );
        }
    }

    /// Finish with error marker (red), naming what was being waited on
    pub(crate) fn finish_error(&self, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", style("✗").red().bold(), message);
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }
}
