//! Progress bar implementation for CLI operations.

use console::Term;
use hermes_core::IngestObserver;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;

/// CLI progress display implementing `IngestObserver`.
///
/// Zip and 7z announce their entry count up front and get a bar; tar.gz is
/// streamed, so it gets a spinner with a running count. Cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
    message: String,
    bytes_written: u64,
}

impl CliProgress {
    /// Creates a hidden progress display; it appears on the first
    /// [`IngestObserver::on_start`].
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            message: message.to_string(),
            bytes_written: 0,
        }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }

    fn bar_style() -> ProgressStyle {
        // "Ingesting [████████░░░░] 42/100 entries (15.2 MB)"
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} entries ({prefix})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner} {msg} {pos} entries ({prefix})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl IngestObserver for CliProgress {
    fn on_start(&mut self, total_entries: Option<usize>) {
        self.bar = match total_entries {
            Some(total) => {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(Self::bar_style());
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(Self::spinner_style());
                bar
            }
        };
        self.bar.set_message(self.message.clone());
        self.bar.set_prefix(humanize_bytes(self.bytes_written));
    }

    fn on_entry(&mut self, _path: &str, _index: usize) {
        self.bar.inc(1);
    }

    fn on_bytes(&mut self, bytes: u64) {
        self.bytes_written += bytes;
        // The prefix slot carries the byte total.
        self.bar.set_prefix(humanize_bytes(self.bytes_written));
    }

    fn on_finish(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
