use indicatif::{ProgressBar, ProgressStyle};

use super::{Reporter, PROGRESS_THRESHOLD};

/// Prints to stdout and draws a progress bar for large files
#[derive(Default)]
pub struct ConsoleReporter {
    bar: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }

    fn new_bar(total: u64) -> ProgressBar {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("  {msg:24} [{bar:40.cyan/blue}] {human_pos}/{human_len} ({percent}%)")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar
    }
}

impl Reporter for ConsoleReporter {
    fn log(&mut self, message: impl Into<String>) {
        self.print(&message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message: String = message.into();
        self.print(&format!("  WARNING: {}", message));
    }

    fn set_progress(&mut self, current: u64, total: u64, label: &str) {
        if total <= PROGRESS_THRESHOLD {
            return;
        }
        let bar = self.bar.get_or_insert_with(|| Self::new_bar(total));
        bar.set_message(label.to_string());
        bar.set_position(current);
    }

    fn clear_progress(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
