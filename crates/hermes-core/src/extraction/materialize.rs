//! Writes validated entries into a staging directory.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::IngestError;
use crate::Result;
use crate::config::Limits;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_limit;
use crate::security::resolve_contained;
use crate::types::SafePath;

/// Remembers directories already created so each is made at most once.
#[derive(Debug, Default)]
pub struct DirCache {
    created: HashSet<PathBuf>,
}

impl DirCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `path` and any missing ancestors. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Filesystem`] if creation fails, including when
    /// a non-directory already occupies the path.
    pub fn ensure_dir(&mut self, path: &Path) -> Result<()> {
        if self.created.contains(path) {
            return Ok(());
        }
        std::fs::create_dir_all(path)
            .map_err(|e| IngestError::filesystem("creating directory", path, e))?;
        self.created.insert(path.to_path_buf());
        Ok(())
    }

    /// Creates the parent directory of `path`.
    ///
    /// # Errors
    ///
    /// Same as [`DirCache::ensure_dir`].
    pub fn ensure_parent_dir(&mut self, path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) => self.ensure_dir(parent),
            None => Ok(()),
        }
    }
}

/// Materializes entries under one root.
///
/// Parents are created on demand, so a file may arrive before the directory
/// entry that contains it.
#[derive(Debug)]
pub struct Materializer<'a> {
    root: &'a Path,
    limits: &'a Limits,
    dirs: DirCache,
    buffer: CopyBuffer,
}

impl<'a> Materializer<'a> {
    /// Creates a materializer writing under `root`, which must be canonical.
    #[must_use]
    pub fn new(root: &'a Path, limits: &'a Limits) -> Self {
        Self {
            root,
            limits,
            dirs: DirCache::new(),
            buffer: CopyBuffer::new(),
        }
    }

    /// Creates a directory entry (and its ancestors) idempotently.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::UnsafePath`] if the path escapes the root, or
    /// [`IngestError::Filesystem`] if creation fails.
    pub fn create_directory(&mut self, safe: &SafePath) -> Result<PathBuf> {
        let dest = resolve_contained(safe, self.root)?;
        self.dirs.ensure_dir(&dest)?;
        debug!(path = %safe.as_path().display(), "created directory");
        Ok(dest)
    }

    /// Writes a file entry, consuming its whole payload before returning.
    ///
    /// The payload must be exactly `declared` bytes long and no longer than
    /// the per-file limit.
    ///
    /// # Errors
    ///
    /// - [`IngestError::TruncatedArchive`] if the payload ends early
    /// - [`IngestError::CorruptArchive`] if it runs past its declared size
    /// - [`IngestError::QuotaExceeded`] if it exceeds the per-file limit
    /// - [`IngestError::UnsafePath`] / [`IngestError::Filesystem`] as for
    ///   directories
    pub fn write_file(
        &mut self,
        safe: &SafePath,
        declared: u64,
        payload: &mut dyn Read,
    ) -> Result<u64> {
        let dest = resolve_contained(safe, self.root)?;
        self.dirs.ensure_parent_dir(&dest)?;

        let file =
            File::create(&dest).map_err(|e| IngestError::filesystem("creating file", &dest, e))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        let written = copy_with_limit(
            payload,
            &mut writer,
            &mut self.buffer,
            self.limits.max_file_size,
            &dest,
        )?;
        writer
            .flush()
            .map_err(|e| IngestError::filesystem("writing file", &dest, e))?;

        if written < declared {
            return Err(IngestError::TruncatedArchive(format!(
                "'{}' ended after {written} of {declared} bytes",
                safe.as_path().display()
            )));
        }
        if written > declared {
            return Err(IngestError::CorruptArchive(format!(
                "'{}' holds {written} bytes but declares {declared}",
                safe.as_path().display()
            )));
        }

        debug!(path = %safe.as_path().display(), bytes = written, "wrote file");
        Ok(written)
    }
}
