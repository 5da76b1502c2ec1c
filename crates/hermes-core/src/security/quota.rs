//! Extraction quota tracking and validation.

use crate::IngestError;
use crate::QuotaResource;
use crate::Result;
use crate::config::Limits;

/// Tracks resource usage across the entries of one archive.
///
/// Sizes recorded here are declared sizes. The copy loop enforces the
/// per-file ceiling again on actual bytes.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    entries: usize,
    bytes: u64,
}

impl QuotaTracker {
    /// Creates a new quota tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a directory entry. Directories count toward the entry limit
    /// but not toward bytes.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::QuotaExceeded`] if the entry limit is exceeded.
    pub fn record_directory(&mut self, limits: &Limits) -> Result<()> {
        self.bump_count(limits)
    }

    /// Records a file entry of the given declared size.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::QuotaExceeded`] if the entry count, the single
    /// file size or the total size limit is exceeded.
    pub fn record_file(&mut self, size: u64, limits: &Limits) -> Result<()> {
        if size > limits.max_file_size {
            return Err(IngestError::QuotaExceeded {
                resource: QuotaResource::FileSize {
                    size,
                    max: limits.max_file_size,
                },
            });
        }

        self.bump_count(limits)?;

        self.bytes = self
            .bytes
            .checked_add(size)
            .ok_or(IngestError::QuotaExceeded {
                resource: QuotaResource::IntegerOverflow,
            })?;
        if self.bytes > limits.max_total_size {
            return Err(IngestError::QuotaExceeded {
                resource: QuotaResource::TotalSize {
                    current: self.bytes,
                    max: limits.max_total_size,
                },
            });
        }

        Ok(())
    }

    fn bump_count(&mut self, limits: &Limits) -> Result<()> {
        self.entries = self
            .entries
            .checked_add(1)
            .ok_or(IngestError::QuotaExceeded {
                resource: QuotaResource::IntegerOverflow,
            })?;
        if self.entries > limits.max_file_count {
            return Err(IngestError::QuotaExceeded {
                resource: QuotaResource::FileCount {
                    current: self.entries,
                    max: limits.max_file_count,
                },
            });
        }
        Ok(())
    }

    /// Returns the number of entries recorded.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Returns the total declared bytes recorded.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}
