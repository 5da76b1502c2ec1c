//! Output formatter trait for CLI results.

use anyhow::Result;
use hermes_core::ArchiveFormat;
use hermes_core::ExtractionResult;
use hermes_core::IngestError;
use std::path::Path;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format a successful ingestion
    fn format_ingest_result(&self, result: &ExtractionResult) -> Result<()>;

    /// Format a failed ingestion. Human output leaves this to the error
    /// message printed on exit.
    fn format_ingest_error(&self, error: &IngestError);

    /// Format a detected archive format
    fn format_detection(&self, archive: &Path, format: ArchiveFormat) -> Result<()>;
}
