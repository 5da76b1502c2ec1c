//! JSON output formatter for machine-readable results.
//!
//! Ingest output is the same payload an HTTP front end would return:
//! `status: "extracted"` on success, `status: "error"` on failure.

use super::formatter::OutputFormatter;
use anyhow::Result;
use hermes_core::ArchiveFormat;
use hermes_core::ErrorResponse;
use hermes_core::ExtractionResult;
use hermes_core::IngestError;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use tracing::warn;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        Self::write_to(&mut io::stdout(), value)
    }

    fn write_to<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(out, "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DetectionOutput<'a> {
    archive: String,
    archive_type: &'a str,
}

impl OutputFormatter for JsonFormatter {
    fn format_ingest_result(&self, result: &ExtractionResult) -> Result<()> {
        Self::output(&result.response())
    }

    fn format_ingest_error(&self, error: &IngestError) {
        if let Err(e) = Self::output(&ErrorResponse::from(error)) {
            warn!(error = %e, "could not write error payload");
        }
    }

    fn format_detection(&self, archive: &Path, format: ArchiveFormat) -> Result<()> {
        Self::output(&DetectionOutput {
            archive: archive.display().to_string(),
            archive_type: format.as_str(),
        })
    }
}
