//! ZIP entry source.
//!
//! The central directory is read when the source is opened, which yields the
//! full manifest before any payload is touched. Entries are then visited in
//! archive order. Directory entries are explicit (trailing `/`) or implied by
//! the paths of the files beneath them.

use std::io::Read;
use std::io::Seek;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::IngestError;
use crate::Result;
use crate::types::EntryKind;

use super::detect::ArchiveFormat;
use super::traits::ArchiveEntry;
use super::traits::EntryHeader;
use super::traits::EntrySource;

/// Symlink targets longer than this are cut short in the manifest.
const MAX_LINK_TARGET: u64 = 4096;

/// ZIP entry source.
pub struct ZipSource<R: Read + Seek> {
    archive: ZipArchive<R>,
    manifest: Vec<EntryHeader>,
}

impl<R: Read + Seek> ZipSource<R> {
    /// Opens a zip archive and reads its central directory.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::CorruptArchive`] if the central directory is
    /// missing or malformed, or if an entry is encrypted.
    pub fn new(source: R) -> Result<Self> {
        let mut archive = ZipArchive::new(source).map_err(zip_error)?;

        let mut manifest = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            manifest.push(read_header(&mut archive, index)?);
        }

        Ok(Self { archive, manifest })
    }
}

impl<R: Read + Seek> std::fmt::Debug for ZipSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipSource")
            .field("entries", &self.manifest.len())
            .finish_non_exhaustive()
    }
}

impl<R: Read + Seek> EntrySource for ZipSource<R> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn manifest(&self) -> Option<&[EntryHeader]> {
        Some(&self.manifest)
    }

    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
    ) -> Result<()> {
        for (index, header) in self.manifest.iter().enumerate() {
            let mut file = self.archive.by_index(index).map_err(zip_error)?;
            visit(ArchiveEntry {
                path: header.path.clone(),
                kind: header.kind.clone(),
                size: header.size,
                payload: &mut file,
            })?;
        }
        Ok(())
    }
}

fn read_header<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize) -> Result<EntryHeader> {
    let (path, size, is_dir, mode) = {
        let file = archive.by_index_raw(index).map_err(zip_error)?;
        if file.encrypted() {
            return Err(IngestError::CorruptArchive(format!(
                "encrypted zip entry '{}' is not supported",
                file.name()
            )));
        }
        (
            file.name().to_string(),
            file.size(),
            file.is_dir(),
            file.unix_mode(),
        )
    };

    let kind = match mode.and_then(EntryKind::from_unix_mode) {
        Some(EntryKind::Symlink { .. }) => EntryKind::Symlink {
            target: read_link_target(archive, index)?,
        },
        Some(special) => special,
        None if is_dir => EntryKind::Directory,
        None => EntryKind::File,
    };

    Ok(EntryHeader { path, kind, size })
}

/// Zip stores a symlink's target as the entry's content.
fn read_link_target<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize) -> Result<String> {
    let file = archive.by_index(index).map_err(zip_error)?;
    let mut target = Vec::new();
    file.take(MAX_LINK_TARGET)
        .read_to_end(&mut target)
        .map_err(|e| IngestError::from_archive_io(&e))?;
    Ok(String::from_utf8_lossy(&target).into_owned())
}

fn zip_error(err: ZipError) -> IngestError {
    match err {
        ZipError::Io(e) => IngestError::from_archive_io(&e),
        other => IngestError::CorruptArchive(format!("zip: {other}")),
    }
}
