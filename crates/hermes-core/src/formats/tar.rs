//! Gzip-compressed tar entry source.
//!
//! Tar is a stream of header/payload records with no index, so entries are
//! validated one at a time as they arrive and no manifest is offered. Entries
//! may list a file before its parent directory; the materializer creates
//! missing parents on demand.

use std::io;
use std::io::Read;

use flate2::read::GzDecoder;

use crate::IngestError;
use crate::Result;
use crate::types::EntryKind;

use super::detect::ArchiveFormat;
use super::traits::ArchiveEntry;
use super::traits::EntryHeader;
use super::traits::EntrySource;

/// Tar+gzip entry source.
pub struct TarGzSource<R: Read> {
    archive: tar::Archive<GzDecoder<R>>,
}

impl<R: Read> TarGzSource<R> {
    /// Wraps a gzip stream. Nothing is read until iteration starts.
    pub fn new(source: R) -> Self {
        Self {
            archive: tar::Archive::new(GzDecoder::new(source)),
        }
    }
}

impl<R: Read> std::fmt::Debug for TarGzSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarGzSource").finish_non_exhaustive()
    }
}

impl<R: Read> EntrySource for TarGzSource<R> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::TarGz
    }

    fn manifest(&self) -> Option<&[EntryHeader]> {
        None
    }

    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
    ) -> Result<()> {
        let entries = self.archive.entries().map_err(|e| tar_error(&e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| tar_error(&e))?;

            let Some(kind) = entry_kind(&entry) else {
                continue;
            };
            let path = entry_path(&entry)?;
            // Pre-POSIX tars mark directories as regular files with a trailing slash.
            let kind = if kind.is_file() && path.ends_with('/') {
                EntryKind::Directory
            } else {
                kind
            };
            let size = entry.size();

            visit(ArchiveEntry {
                path,
                kind,
                size,
                payload: &mut entry,
            })?;
        }

        Ok(())
    }
}

fn entry_path<R: Read>(entry: &tar::Entry<'_, R>) -> Result<String> {
    let raw = entry.path_bytes();
    String::from_utf8(raw.to_vec()).map_err(|_| {
        IngestError::unsafe_path(
            String::from_utf8_lossy(&raw).into_owned(),
            "entry name is not valid UTF-8",
        )
    })
}

/// Maps a tar header type to an entry kind. `None` means a metadata record
/// that carries no filesystem object.
fn entry_kind<R: Read>(entry: &tar::Entry<'_, R>) -> Option<EntryKind> {
    let link_target = || {
        entry
            .link_name_bytes()
            .map(|t| String::from_utf8_lossy(&t).into_owned())
            .unwrap_or_default()
    };

    let kind = match entry.header().entry_type() {
        tar::EntryType::Regular | tar::EntryType::Continuous => EntryKind::File,
        tar::EntryType::Directory => EntryKind::Directory,
        tar::EntryType::Symlink => EntryKind::Symlink {
            target: link_target(),
        },
        tar::EntryType::Link => EntryKind::Hardlink {
            target: link_target(),
        },
        tar::EntryType::Char => EntryKind::Special("character device"),
        tar::EntryType::Block => EntryKind::Special("block device"),
        tar::EntryType::Fifo => EntryKind::Special("fifo"),
        tar::EntryType::GNUSparse => EntryKind::Special("sparse file"),
        tar::EntryType::XGlobalHeader => return None,
        _ => EntryKind::Special("unknown tar entry"),
    };
    Some(kind)
}

fn tar_error(err: &io::Error) -> IngestError {
    IngestError::from_archive_io(err)
}
