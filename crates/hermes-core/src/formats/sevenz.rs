//! 7z entry source.
//!
//! The archive header is parsed once on open, which yields the full manifest.
//! Payloads are decompressed lazily, one entry at a time, during iteration.
//!
//! # Entry kinds
//!
//! 7z has no entry type field. Kinds are recovered from attributes:
//!
//! - Windows `FILE_ATTRIBUTE_REPARSE_POINT` marks symlinks and junctions
//! - Archives written on Unix carry `st_mode` in the high 16 attribute bits
//!   (flagged by `0x8000`), from which symlinks and special files are read
//!
//! A Unix symlink's target is its payload, which the manifest does not read,
//! so such entries are reported with an unknown target.
//!
//! # Encryption
//!
//! Password-protected archives are rejected as corrupt: the payload cannot be
//! inspected, so nothing about it can be validated.

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use sevenz_rust2::Archive;
use sevenz_rust2::Password;

use crate::IngestError;
use crate::Result;
use crate::types::EntryKind;

use super::detect::ArchiveFormat;
use super::traits::ArchiveEntry;
use super::traits::EntryHeader;
use super::traits::EntrySource;

const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0000_0400;
const FILE_ATTRIBUTE_UNIX_EXTENSION: u32 = 0x0000_8000;

/// 7z entry source.
pub struct SevenZipSource<R: Read + Seek> {
    source: R,
    manifest: Vec<EntryHeader>,
    is_solid: bool,
}

impl<R: Read + Seek> SevenZipSource<R> {
    /// Opens a 7z archive and reads its header.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::CorruptArchive`] if the header is invalid or the
    /// archive is encrypted, and [`IngestError::TruncatedArchive`] if the
    /// header lies past the end of the data.
    pub fn new(mut source: R) -> Result<Self> {
        let archive = Archive::read(&mut source, &Password::empty()).map_err(sevenz_error)?;

        let manifest = archive
            .files
            .iter()
            .map(|entry| EntryHeader {
                path: entry.name.clone(),
                kind: entry_kind(entry),
                size: entry.size,
            })
            .collect();
        let is_solid = archive.is_solid;

        source
            .seek(SeekFrom::Start(0))
            .map_err(|e| IngestError::from_archive_io(&e))?;

        Ok(Self {
            source,
            manifest,
            is_solid,
        })
    }

    /// Returns `true` if several entries share one compressed block.
    #[must_use]
    pub fn is_solid(&self) -> bool {
        self.is_solid
    }
}

impl<R: Read + Seek> std::fmt::Debug for SevenZipSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SevenZipSource")
            .field("entries", &self.manifest.len())
            .field("is_solid", &self.is_solid)
            .finish_non_exhaustive()
    }
}

impl<R: Read + Seek> EntrySource for SevenZipSource<R> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::SevenZip
    }

    fn manifest(&self) -> Option<&[EntryHeader]> {
        Some(&self.manifest)
    }

    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
    ) -> Result<()> {
        let mut reader = sevenz_rust2::ArchiveReader::new(&mut self.source, Password::empty())
            .map_err(sevenz_error)?;

        // The callback must return the library's error type, so the real
        // error is parked here and recovered after iteration stops.
        let mut rejected: Option<IngestError> = None;

        let outcome = reader.for_each_entries(|entry, payload| {
            let visited = visit(ArchiveEntry {
                path: entry.name.clone(),
                kind: entry_kind(entry),
                size: entry.size,
                payload,
            });
            match visited {
                Ok(()) => Ok(true),
                Err(err) => {
                    rejected = Some(err);
                    Err(sevenz_rust2::Error::Other("entry rejected".into()))
                }
            }
        });

        if let Some(err) = rejected {
            return Err(err);
        }
        outcome.map_err(sevenz_error)
    }
}

fn entry_kind(entry: &sevenz_rust2::ArchiveEntry) -> EntryKind {
    if entry.has_windows_attributes {
        let attributes = entry.windows_attributes;

        if attributes & FILE_ATTRIBUTE_REPARSE_POINT != 0 {
            return EntryKind::Symlink {
                target: String::from("<reparse point>"),
            };
        }

        if attributes & FILE_ATTRIBUTE_UNIX_EXTENSION != 0 {
            match EntryKind::from_unix_mode(attributes >> 16) {
                Some(EntryKind::Symlink { .. }) => {
                    return EntryKind::Symlink {
                        target: String::from("<unknown>"),
                    };
                }
                Some(special) => return special,
                None => {}
            }
        }
    }

    if entry.is_directory() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

/// Classifies library errors. The library does not expose a structured kind
/// for every failure, so the message is inspected.
fn sevenz_error(err: sevenz_rust2::Error) -> IngestError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if lower.contains("password") || lower.contains("encrypt") {
        IngestError::CorruptArchive(format!(
            "encrypted 7z archives are not supported: {message}"
        ))
    } else if lower.contains("eof") || lower.contains("end of file") {
        IngestError::TruncatedArchive(format!("7z: {message}"))
    } else {
        IngestError::CorruptArchive(format!("7z: {message}"))
    }
}
