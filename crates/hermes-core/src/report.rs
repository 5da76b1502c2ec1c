//! Ingestion results and progress reporting.

use std::path::PathBuf;

use serde::Serialize;

use crate::IngestError;
use crate::formats::ArchiveFormat;

/// Result of a successful ingestion.
///
/// Serializes to the success payload via [`ExtractionResult::response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    /// Absolute path of the target directory.
    pub created_path: PathBuf,

    /// Detected archive format.
    pub archive_type: ArchiveFormat,

    /// Filename the archive was uploaded under.
    pub filename: String,

    /// Size of the uploaded archive in bytes.
    pub file_size: u64,

    /// Distinct names directly under the target, in first-seen order.
    pub extracted_items: Vec<String>,

    /// Number of file and directory entries materialized.
    ///
    /// Parent directories created implicitly for nested files, without an
    /// entry of their own, are not counted. A `src/app.py` entry with no
    /// `src/` entry counts once.
    pub total_extracted_paths: usize,
}

impl ExtractionResult {
    /// Wraps the result with `status: "extracted"` for the wire.
    ///
    /// # Examples
    ///
    /// ```
    /// use hermes_core::ExtractionResult;
    /// use hermes_core::formats::ArchiveFormat;
    ///
    /// let result = ExtractionResult {
    ///     created_path: "/srv/hermes/deployments/v1".into(),
    ///     archive_type: ArchiveFormat::TarGz,
    ///     filename: "site.tar.gz".into(),
    ///     file_size: 512,
    ///     extracted_items: vec!["README.md".into(), "src".into()],
    ///     total_extracted_paths: 3,
    /// };
    /// let json = serde_json::to_value(result.response()).unwrap();
    /// assert_eq!(json["status"], "extracted");
    /// assert_eq!(json["archive_type"], "tar.gz");
    /// ```
    #[must_use]
    pub fn response(&self) -> ExtractionResponse<'_> {
        ExtractionResponse {
            result: self,
            status: "extracted",
        }
    }
}

/// Success payload: the result fields plus `status`.
#[derive(Debug, Serialize)]
pub struct ExtractionResponse<'a> {
    #[serde(flatten)]
    result: &'a ExtractionResult,
    status: &'static str,
}

/// Failure payload: `{ status: "error", error: <kind code>, detail }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    status: &'static str,
    /// Machine-readable kind code.
    pub error: &'static str,
    /// Human-readable message.
    pub detail: String,
}

impl From<&IngestError> for ErrorResponse {
    fn from(err: &IngestError) -> Self {
        Self {
            status: "error",
            error: err.kind().as_str(),
            detail: err.to_string(),
        }
    }
}

/// Accumulates per-entry facts into an [`ExtractionResult`].
///
/// Only materialized entries are recorded. Directories created implicitly as
/// parents are not entries and are not counted, though their names still
/// appear as top-level items through the entries beneath them.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    top_level: Vec<String>,
    total: usize,
}

impl ResultAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one materialized entry by its first path segment.
    pub fn record(&mut self, top_level: &str) {
        if !self.top_level.iter().any(|seen| seen == top_level) {
            self.top_level.push(top_level.to_string());
        }
        self.total += 1;
    }

    /// Number of entries recorded so far.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Builds the final result.
    #[must_use]
    pub fn finish(
        self,
        created_path: PathBuf,
        archive_type: ArchiveFormat,
        filename: String,
        file_size: u64,
    ) -> ExtractionResult {
        ExtractionResult {
            created_path,
            archive_type,
            filename,
            file_size,
            extracted_items: self.top_level,
            total_extracted_paths: self.total,
        }
    }
}

/// Observer notified while an archive is materialized.
///
/// Requires `Send` so an ingestion can move to a blocking worker thread.
///
/// # Examples
///
/// ```
/// use hermes_core::IngestObserver;
///
/// #[derive(Default)]
/// struct Counter {
///     entries: usize,
///     bytes: u64,
/// }
///
/// impl IngestObserver for Counter {
///     fn on_entry(&mut self, _path: &str, index: usize) {
///         self.entries = index + 1;
///     }
///
///     fn on_bytes(&mut self, bytes: u64) {
///         self.bytes += bytes;
///     }
///
///     fn on_finish(&mut self) {}
/// }
/// ```
pub trait IngestObserver: Send {
    /// Called once before the first entry. `total_entries` is known for
    /// formats with a manifest.
    fn on_start(&mut self, _total_entries: Option<usize>) {}

    /// Called before an entry is materialized. `index` is zero-based.
    fn on_entry(&mut self, path: &str, index: usize);

    /// Called after a file's payload has been written.
    fn on_bytes(&mut self, bytes: u64);

    /// Called after the new content has been committed.
    fn on_finish(&mut self);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl IngestObserver for NoopObserver {
    fn on_entry(&mut self, _path: &str, _index: usize) {}

    fn on_bytes(&mut self, _bytes: u64) {}

    fn on_finish(&mut self) {}
}
