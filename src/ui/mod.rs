//! Console reporting.
//!
//! The loader reports through the [`Reporter`] trait:
//! - log lines (per-file progress, summaries)
//! - warnings (skips, unmatched boundaries, empty schemas)
//! - progress (current/total for large files)

mod console;

pub use console::ConsoleReporter;

/// Files above this many records get a progress bar
pub const PROGRESS_THRESHOLD: u64 = 10_000;

/// Trait for reporters - allows both the console and silent/test modes
pub trait Reporter {
    fn log(&mut self, message: impl Into<String>);
    fn warn(&mut self, message: impl Into<String>);
    fn set_progress(&mut self, current: u64, total: u64, label: &str);
    fn clear_progress(&mut self);
}

/// Silent reporter for testing and non-interactive use.
///
/// Nothing is printed; messages are kept so callers can inspect them.
#[derive(Debug, Default)]
pub struct SilentReporter {
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
    /// Last progress seen, as (current, total)
    pub progress: Option<(u64, u64)>,
}

impl SilentReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any log line or warning contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.messages
            .iter()
            .chain(self.warnings.iter())
            .any(|m| m.contains(needle))
    }
}

impl Reporter for SilentReporter {
    fn log(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn set_progress(&mut self, current: u64, total: u64, _label: &str) {
        self.progress = Some((current, total));
    }

    fn clear_progress(&mut self) {
        self.progress = None;
    }
}
