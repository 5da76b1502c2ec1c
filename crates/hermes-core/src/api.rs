//! One-call entry points for callers that don't keep an [`Ingestor`].

use std::path::Path;

use crate::ArchiveRequest;
use crate::ExtractionResult;
use crate::IngestConfig;
use crate::Ingestor;
use crate::Result;
use crate::formats::ArchiveFormat;
use crate::formats::detect::read_leading;
use crate::formats::sniff;
use crate::types::TargetPath;

/// Ingests an uploaded archive held in memory.
///
/// `url_path` is the decoded request path (`/deployments/v1`); `filename`
/// is the name the client uploaded under.
///
/// # Errors
///
/// Returns [`crate::IngestError::InvalidTarget`] for a bad `url_path`, or
/// any error from [`Ingestor::ingest`].
///
/// # Examples
///
/// ```no_run
/// use hermes_core::IngestConfig;
/// use hermes_core::ingest_bytes;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IngestConfig::new("/srv/hermes")?;
/// let bytes = std::fs::read("site.zip")?;
/// let result = ingest_bytes(&config, "/deployments/v1", "site.zip", bytes)?;
/// println!("extracted {:?}", result.extracted_items);
/// # Ok(())
/// # }
/// ```
pub fn ingest_bytes(
    config: &IngestConfig,
    url_path: &str,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<ExtractionResult> {
    let target = TargetPath::parse(url_path)?;
    Ingestor::new(config.clone()).ingest(ArchiveRequest::from_bytes(target, filename, bytes))
}

/// Ingests an archive file from disk.
///
/// # Errors
///
/// Same as [`ingest_bytes`], plus [`crate::IngestError::Filesystem`] if the
/// file cannot be opened.
pub fn ingest_file(
    config: &IngestConfig,
    url_path: &str,
    archive_path: &Path,
    filename: Option<String>,
) -> Result<ExtractionResult> {
    let target = TargetPath::parse(url_path)?;
    Ingestor::new(config.clone()).ingest(ArchiveRequest::from_file(target, archive_path, filename)?)
}

/// Detects the format of an archive file without extracting it.
///
/// `filename` overrides the name used for suffix matching.
///
/// # Errors
///
/// Returns [`crate::IngestError::UnsupportedFormat`] or
/// [`crate::IngestError::FormatMismatch`] as [`sniff`] does, or
/// [`crate::IngestError::Filesystem`] if the file cannot be opened.
pub fn detect_file(archive_path: &Path, filename: Option<&str>) -> Result<ArchiveFormat> {
    let mut file = std::fs::File::open(archive_path)
        .map_err(|e| crate::IngestError::filesystem("opening archive", archive_path, e))?;
    let leading = read_leading(&mut file)?;
    let name = match filename {
        Some(name) => name.to_string(),
        None => archive_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    sniff(&name, &leading)
}
