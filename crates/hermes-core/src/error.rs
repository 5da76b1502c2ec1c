//! Error types for archive ingestion.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::formats::ArchiveFormat;

/// Result type alias using `IngestError`.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Represents a specific quota resource that was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResource {
    /// File count quota exceeded.
    FileCount {
        /// Current file count.
        current: usize,
        /// Maximum allowed file count.
        max: usize,
    },
    /// Total size quota exceeded.
    TotalSize {
        /// Current total size in bytes.
        current: u64,
        /// Maximum allowed total size in bytes.
        max: u64,
    },
    /// Single file size quota exceeded.
    FileSize {
        /// File size in bytes.
        size: u64,
        /// Maximum allowed file size in bytes.
        max: u64,
    },
    /// Integer overflow detected in quota tracking.
    IntegerOverflow,
}

impl fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileCount { current, max } => {
                write!(f, "quota exceeded: file count ({current} > {max})")
            }
            Self::TotalSize { current, max } => {
                write!(f, "quota exceeded: total size ({current} > {max})")
            }
            Self::FileSize { size, max } => {
                write!(f, "quota exceeded: single file size ({size} > {max})")
            }
            Self::IntegerOverflow => {
                write!(f, "quota exceeded: integer overflow in quota tracking")
            }
        }
    }
}

/// Stable, machine-readable classification of an [`IngestError`].
///
/// The HTTP layer maps these onto status codes; the string form is what the
/// failure payload carries in its `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Filename does not carry a recognized archive suffix.
    UnsupportedFormat,
    /// Filename suffix and magic bytes disagree.
    FormatMismatch,
    /// Target path segments are not acceptable.
    InvalidTarget,
    /// Structural parse failure.
    CorruptArchive,
    /// Archive ended before its declared content.
    TruncatedArchive,
    /// An entry would resolve outside the target root.
    UnsafePath,
    /// Symlink, hardlink or special file entry.
    UnsupportedEntryKind,
    /// Configured size or count limits exceeded.
    QuotaExceeded,
    /// Filesystem operation failed; previous content preserved.
    Filesystem,
    /// Rollback failed; previous content possibly lost.
    RollbackFailed,
}

impl ErrorKind {
    /// Returns the wire code for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::FormatMismatch => "format_mismatch",
            Self::InvalidTarget => "invalid_target",
            Self::CorruptArchive => "corrupt_archive",
            Self::TruncatedArchive => "truncated_archive",
            Self::UnsafePath => "unsafe_path",
            Self::UnsupportedEntryKind => "unsupported_entry_kind",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Filesystem => "filesystem_error",
            Self::RollbackFailed => "rollback_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while ingesting an archive.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Filename does not match any supported archive kind.
    #[error("unsupported archive format: {filename}")]
    UnsupportedFormat {
        /// The declared filename.
        filename: String,
    },

    /// Filename suffix says one format, the leading bytes say another.
    #[error("format mismatch: filename declares {declared} but content is {detected}")]
    FormatMismatch {
        /// Format implied by the filename suffix.
        declared: ArchiveFormat,
        /// Format implied by the magic bytes.
        detected: ArchiveFormat,
    },

    /// Target path is not acceptable.
    #[error("invalid target path: {reason}")]
    InvalidTarget {
        /// Why the target was rejected.
        reason: String,
    },

    /// Archive structure could not be parsed.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// Archive ended before its declared content.
    #[error("truncated archive: {0}")]
    TruncatedArchive(String),

    /// Entry path would escape the target root.
    #[error("unsafe entry path '{path}': {reason}")]
    UnsafePath {
        /// The raw entry path as stored in the archive.
        path: String,
        /// Which rule rejected it.
        reason: String,
    },

    /// Entry is not a regular file or directory.
    #[error("unsupported entry kind for '{path}': {kind}")]
    UnsupportedEntryKind {
        /// The raw entry path.
        path: String,
        /// Description of the entry kind.
        kind: String,
    },

    /// Configured limits exceeded.
    #[error("{resource}")]
    QuotaExceeded {
        /// Description of the exceeded resource.
        resource: QuotaResource,
    },

    /// Filesystem operation failed.
    #[error("filesystem error while {context} '{}': {source}", path.display())]
    Filesystem {
        /// Operation being performed.
        context: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Rollback after a failure did not complete.
    #[error(
        "rollback failed after error ({original}); restoring '{}' failed: {rollback}",
        path.display()
    )]
    RollbackFailed {
        /// The failure that triggered rollback.
        original: Box<IngestError>,
        /// Path that could not be restored.
        path: PathBuf,
        /// Why rollback failed.
        rollback: io::Error,
    },
}

impl IngestError {
    /// Shorthand for building a [`IngestError::Filesystem`].
    pub fn filesystem(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            context,
            path: path.into(),
            source,
        }
    }

    /// Shorthand for building a [`IngestError::UnsafePath`].
    pub fn unsafe_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsafePath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Classifies an I/O error raised while reading archive data.
    ///
    /// `UnexpectedEof` means the stream ended early; everything else is
    /// treated as a structural problem with the archive.
    pub fn from_archive_io(err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::TruncatedArchive(err.to_string())
        } else {
            Self::CorruptArchive(err.to_string())
        }
    }

    /// Returns the machine-readable kind of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use hermes_core::IngestError;
    /// use hermes_core::error::ErrorKind;
    ///
    /// let err = IngestError::unsafe_path("../etc/passwd", "parent directory segment");
    /// assert_eq!(err.kind(), ErrorKind::UnsafePath);
    /// assert_eq!(err.kind().as_str(), "unsafe_path");
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::FormatMismatch { .. } => ErrorKind::FormatMismatch,
            Self::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            Self::CorruptArchive(_) => ErrorKind::CorruptArchive,
            Self::TruncatedArchive(_) => ErrorKind::TruncatedArchive,
            Self::UnsafePath { .. } => ErrorKind::UnsafePath,
            Self::UnsupportedEntryKind { .. } => ErrorKind::UnsupportedEntryKind,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::RollbackFailed { .. } => ErrorKind::RollbackFailed,
        }
    }

    /// Returns `true` if this error represents a security violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use hermes_core::IngestError;
    ///
    /// let err = IngestError::unsafe_path("/etc/passwd", "absolute path");
    /// assert!(err.is_security_violation());
    ///
    /// let err = IngestError::CorruptArchive("bad header".into());
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::UnsafePath { .. } | Self::UnsupportedEntryKind { .. } | Self::QuotaExceeded { .. }
        )
    }

    /// Returns `true` unless rollback itself failed.
    ///
    /// Every failure other than [`IngestError::RollbackFailed`] leaves the
    /// target exactly as it was before the request.
    #[must_use]
    pub const fn previous_content_preserved(&self) -> bool {
        !matches!(self, Self::RollbackFailed { .. })
    }

    /// Returns the quota resource that was exceeded, if applicable.
    #[must_use]
    pub const fn quota_resource(&self) -> Option<&QuotaResource> {
        match self {
            Self::QuotaExceeded { resource } => Some(resource),
            _ => None,
        }
    }
}
