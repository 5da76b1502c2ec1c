//! Ingestion configuration.

use std::path::PathBuf;

use crate::Result;
use crate::types::StorageRoot;

/// Resource limits applied to every archive.
///
/// Limits are checked against declared entry sizes before anything is
/// written, and again against the bytes actually copied.
///
/// # Examples
///
/// ```
/// use hermes_core::config::Limits;
///
/// // Tighten the defaults for an upload endpoint.
/// let limits = Limits {
///     max_file_size: 10 * 1024 * 1024,   // 10 MB
///     max_total_size: 100 * 1024 * 1024, // 100 MB
///     ..Default::default()
/// };
/// assert_eq!(limits.max_path_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size for a single file in bytes.
    pub max_file_size: u64,

    /// Maximum total size for all extracted files in bytes.
    pub max_total_size: u64,

    /// Maximum number of entries (files and directories).
    pub max_file_count: usize,

    /// Maximum number of segments in an entry path.
    pub max_path_depth: usize,
}

impl Default for Limits {
    /// Default values:
    /// - `max_file_size`: 512 MiB
    /// - `max_total_size`: 2 GiB
    /// - `max_file_count`: 100,000
    /// - `max_path_depth`: 64
    fn default() -> Self {
        Self {
            max_file_size: 512 * 1024 * 1024,
            max_total_size: 2 * 1024 * 1024 * 1024,
            max_file_count: 100_000,
            max_path_depth: 64,
        }
    }
}

impl Limits {
    /// Disables size and count limits. Depth stays bounded by the platform's
    /// own path length.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_file_size: u64::MAX,
            max_total_size: u64::MAX,
            max_file_count: usize::MAX,
            max_path_depth: usize::MAX,
        }
    }
}

/// Configuration for an [`crate::Ingestor`].
///
/// The storage root is always supplied by the embedding process, so there is
/// no `Default`.
///
/// # Examples
///
/// ```no_run
/// use hermes_core::IngestConfig;
/// use hermes_core::config::Limits;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IngestConfig::new("/srv/hermes")?.with_limits(Limits::default());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Base directory every target path resolves under.
    pub storage_root: StorageRoot,

    /// Resource limits.
    pub limits: Limits,
}

impl IngestConfig {
    /// Creates a configuration with default limits.
    ///
    /// # Errors
    ///
    /// Returns an error if `storage_root` is not an absolute, existing,
    /// writable directory.
    pub fn new(storage_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            storage_root: StorageRoot::new(storage_root)?,
            limits: Limits::default(),
        })
    }

    /// Replaces the limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_file_size, 512 * 1024 * 1024);
        assert_eq!(limits.max_file_count, 100_000);
        assert_eq!(limits.max_path_depth, 64);
    }

    #[test]
    fn test_unlimited() {
        let limits = Limits::unlimited();
        assert_eq!(limits.max_total_size, u64::MAX);
        assert_eq!(limits.max_file_count, usize::MAX);
    }

    #[test]
    fn test_config_requires_existing_root() {
        let temp = TempDir::new().expect("failed to create temp dir");
        assert!(IngestConfig::new(temp.path()).is_ok());
        assert!(IngestConfig::new(temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_with_limits() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let limits = Limits {
            max_file_count: 3,
            ..Limits::default()
        };
        let config = IngestConfig::new(temp.path()).unwrap().with_limits(limits);
        assert_eq!(config.limits.max_file_count, 3);
    }
}
