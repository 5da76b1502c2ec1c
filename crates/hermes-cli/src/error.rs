//! Error conversion utilities for CLI.
//!
//! Converts hermes-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use hermes_core::IngestError;
use std::path::Path;

/// Converts `IngestError` to a user-friendly anyhow error with context.
pub fn convert_ingest_error(err: IngestError, archive: &Path) -> anyhow::Error {
    match err {
        IngestError::UnsafePath { path, reason } => {
            anyhow!(
                "Security violation: Archive '{}' contains unsafe entry '{path}' ({reason})\n\
                 HINT: This archive may be malicious. Nothing was written.",
                archive.display()
            )
        }
        IngestError::UnsupportedEntryKind { path, kind } => {
            anyhow!(
                "Archive '{}' contains an entry that cannot be extracted: '{path}' ({kind})\n\
                 HINT: Only regular files and directories are accepted. Repack without links or devices.",
                archive.display()
            )
        }
        IngestError::QuotaExceeded { resource } => {
            anyhow!(
                "Extraction limit exceeded for '{}': {resource}\n\
                 HINT: Use --max-files, --max-total-size, or --max-file-size to increase limits.",
                archive.display()
            )
        }
        IngestError::UnsupportedFormat { filename } => {
            anyhow!(
                "Archive format not supported: {filename}\n\
                 HINT: Supported formats: .tar.gz, .tgz, .zip, .7z. Use --filename to override the name."
            )
        }
        IngestError::FormatMismatch { declared, detected } => {
            anyhow!(
                "Archive '{}' is named as {declared} but its content is {detected}\n\
                 HINT: Rename the file or pass --filename with the correct suffix.",
                archive.display()
            )
        }
        IngestError::InvalidTarget { reason } => {
            anyhow!("Invalid target path: {reason}")
        }
        IngestError::CorruptArchive(reason) | IngestError::TruncatedArchive(reason) => {
            anyhow!(
                "Invalid archive '{}': {reason}\n\
                 HINT: The archive may be corrupted or incompletely uploaded.",
                archive.display()
            )
        }
        err @ IngestError::RollbackFailed { .. } => anyhow::Error::from(err).context(format!(
            "Ingesting '{}' failed and the previous content could not be restored",
            archive.display()
        )),
        err @ IngestError::Filesystem { .. } => anyhow::Error::from(err)
            .context(format!("Error ingesting archive '{}'", archive.display())),
    }
}
