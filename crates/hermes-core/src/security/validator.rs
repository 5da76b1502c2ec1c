//! Entry validation orchestrator.
//!
//! This module provides the `EntryValidator` type that coordinates the
//! per-entry checks every format goes through before anything is written.

use crate::IngestError;
use crate::Result;
use crate::config::Limits;
use crate::security::quota::QuotaTracker;
use crate::types::EntryKind;
use crate::types::SafePath;
use crate::types::is_scratch_name;

/// Result of entry validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEntry {
    /// Normalized path relative to the target root.
    pub safe_path: SafePath,

    /// What to materialize.
    pub entry_type: ValidatedEntryType,
}

/// Validated entry type variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatedEntryType {
    /// Regular file with its declared size.
    File {
        /// Declared uncompressed size.
        size: u64,
    },

    /// Directory.
    Directory,

    /// A directory entry naming the target root itself (`./`). Accepted,
    /// never materialized, never counted.
    TargetRoot,
}

impl ValidatedEntry {
    /// Returns `true` if this entry produces something on disk and counts
    /// toward the result.
    #[must_use]
    pub const fn is_materialized(&self) -> bool {
        !matches!(self.entry_type, ValidatedEntryType::TargetRoot)
    }
}

/// Orchestrates validation for the entries of one archive.
///
/// Holds quota state across entries, so one validator serves exactly one
/// pass over an archive.
///
/// # Lifecycle
///
/// 1. Create with `EntryValidator::new(&limits)`
/// 2. For each entry, call `validate_entry()`
/// 3. The first error aborts the request
///
/// # Examples
///
/// ```
/// use hermes_core::config::Limits;
/// use hermes_core::security::EntryValidator;
/// use hermes_core::types::EntryKind;
///
/// let limits = Limits::default();
/// let mut validator = EntryValidator::new(&limits);
///
/// let entry = validator.validate_entry("src/app.py", &EntryKind::File, 42)?;
/// assert_eq!(entry.safe_path.top_level(), Some("src"));
///
/// assert!(validator.validate_entry("../escape", &EntryKind::File, 1).is_err());
/// # Ok::<(), hermes_core::IngestError>(())
/// ```
#[derive(Debug)]
pub struct EntryValidator<'a> {
    limits: &'a Limits,
    quota_tracker: QuotaTracker,
    reserve_scratch_names: bool,
}

impl<'a> EntryValidator<'a> {
    /// Creates a new entry validator.
    #[must_use]
    pub fn new(limits: &'a Limits) -> Self {
        Self {
            limits,
            quota_tracker: QuotaTracker::new(),
            reserve_scratch_names: false,
        }
    }

    /// Refuses top-level entries named like scratch directories when
    /// `reserve` is set.
    ///
    /// Needed when the target is the storage root: its scratch directories
    /// live among the extracted entries, and the swap skips scratch names.
    /// Below the root they are siblings of the target and no entry can
    /// collide with them.
    #[must_use]
    pub fn reserving_scratch_names(mut self, reserve: bool) -> Self {
        self.reserve_scratch_names = reserve;
        self
    }

    /// Validates an archive entry.
    ///
    /// Checks run in this order, and the first failure wins:
    /// 1. Lexical path safety and depth ([`SafePath::validate`])
    /// 2. Scratch-name collisions, when reserved
    /// 3. Entry kind (only files and directories are accepted)
    /// 4. Zero-segment handling (root directory accepted, root file rejected)
    /// 5. Quotas
    ///
    /// # Errors
    ///
    /// - [`IngestError::UnsafePath`] for traversal, absolute paths, depth, a
    ///   reserved scratch name or a file entry naming the root
    /// - [`IngestError::UnsupportedEntryKind`] for links and special files
    /// - [`IngestError::QuotaExceeded`] when limits are exceeded
    pub fn validate_entry(
        &mut self,
        raw_path: &str,
        kind: &EntryKind,
        size: u64,
    ) -> Result<ValidatedEntry> {
        let safe_path = SafePath::validate(raw_path, self.limits)?;

        if self.reserve_scratch_names
            && safe_path
                .top_level()
                .is_some_and(|name| is_scratch_name(name.as_bytes()))
        {
            return Err(IngestError::unsafe_path(
                raw_path,
                "name is reserved for staging directories",
            ));
        }

        if !kind.is_materializable() {
            return Err(IngestError::UnsupportedEntryKind {
                path: raw_path.to_string(),
                kind: kind.to_string(),
            });
        }

        let entry_type = match (kind, safe_path.is_root()) {
            (EntryKind::Directory, true) => ValidatedEntryType::TargetRoot,
            (_, true) => {
                return Err(IngestError::unsafe_path(
                    raw_path,
                    "file entry resolves to the target root",
                ));
            }
            (EntryKind::Directory, false) => {
                self.quota_tracker.record_directory(self.limits)?;
                ValidatedEntryType::Directory
            }
            _ => {
                self.quota_tracker.record_file(size, self.limits)?;
                ValidatedEntryType::File { size }
            }
        };

        Ok(ValidatedEntry {
            safe_path,
            entry_type,
        })
    }

    /// Returns the number of entries accepted so far.
    #[must_use]
    pub fn entries_validated(&self) -> usize {
        self.quota_tracker.entries()
    }

    /// Returns the total declared bytes accepted so far.
    #[must_use]
    pub fn bytes_declared(&self) -> u64 {
        self.quota_tracker.bytes()
    }
}
