//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use hermes_core::ArchiveFormat;
use hermes_core::ExtractionResult;
use hermes_core::IngestError;
use std::path::Path;

/// Items listed before the rest are summarized.
const MAX_LISTED_ITEMS: usize = 10;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();

        for (i, c) in s.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }

        result.chars().rev().collect()
    }

    fn headline(&self, text: &str) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {text}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(text);
        }
    }

    fn item_lines(items: &[String], verbose: bool) -> Vec<String> {
        let shown = if verbose {
            items.len()
        } else {
            items.len().min(MAX_LISTED_ITEMS)
        };
        let mut lines: Vec<_> = items[..shown].iter().map(|item| format!("    {item}")).collect();
        if shown < items.len() {
            lines.push(format!("    ... and {} more", items.len() - shown));
        }
        lines
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_ingest_result(&self, result: &ExtractionResult) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(&format!(
            "Extracted into {}",
            result.created_path.display()
        ));
        let _ = self.term.write_line(&format!(
            "  Paths extracted: {}",
            Self::format_number(result.total_extracted_paths)
        ));
        let _ = self.term.write_line(&format!(
            "  Archive: {} ({}, {})",
            result.filename,
            result.archive_type,
            Self::format_size(result.file_size)
        ));

        if !result.extracted_items.is_empty() {
            let _ = self.term.write_line("  Top-level items:");
            for line in Self::item_lines(&result.extracted_items, self.verbose) {
                let _ = self.term.write_line(&line);
            }
        }

        Ok(())
    }

    fn format_ingest_error(&self, _error: &IngestError) {}

    fn format_detection(&self, archive: &Path, format: ArchiveFormat) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("{}: {format}", archive.display()));
        } else {
            let _ = self.term.write_line(format.as_str());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(HumanFormatter::format_size(0), "0 B");
        assert_eq!(HumanFormatter::format_size(1023), "1023 B");
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
        assert_eq!(HumanFormatter::format_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(HumanFormatter::format_size(1536 * 1024 * 1024), "1.5 GB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(HumanFormatter::format_number(0), "0");
        assert_eq!(HumanFormatter::format_number(999), "999");
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_item_lines_truncate_unless_verbose() {
        let items: Vec<String> = (0..15).map(|i| format!("item{i}")).collect();

        let short = HumanFormatter::item_lines(&items, false);
        assert_eq!(short.len(), MAX_LISTED_ITEMS + 1);
        assert_eq!(short.last().map(String::as_str), Some("    ... and 5 more"));

        let long = HumanFormatter::item_lines(&items, true);
        assert_eq!(long.len(), 15);
    }
}
