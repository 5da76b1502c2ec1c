//! Common shape for archive entry sources.

use std::io::Read;

use crate::Result;
use crate::types::EntryKind;

use super::detect::ArchiveFormat;

/// Metadata for one entry, available before any payload is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Raw path as stored in the archive.
    pub path: String,
    /// Normalized entry kind.
    pub kind: EntryKind,
    /// Declared uncompressed size.
    pub size: u64,
}

/// One entry handed to a visitor, with its payload stream.
///
/// The payload is only valid during the visit; the source advances past it
/// once the visitor returns.
pub struct ArchiveEntry<'a> {
    /// Raw path as stored in the archive.
    pub path: String,
    /// Normalized entry kind.
    pub kind: EntryKind,
    /// Declared uncompressed size.
    pub size: u64,
    /// Payload bytes. Empty for directories.
    pub payload: &'a mut dyn Read,
}

impl std::fmt::Debug for ArchiveEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A finite, non-restartable sequence of archive entries.
///
/// Every format normalizes into this shape so extraction is format-agnostic.
pub trait EntrySource {
    /// Returns the archive format.
    fn format(&self) -> ArchiveFormat;

    /// Returns the full entry listing when the format provides one up front
    /// (zip central directory, 7z header). Streaming formats return `None`.
    fn manifest(&self) -> Option<&[EntryHeader]>;

    /// Visits every entry in archive order.
    ///
    /// Stops at the first error, whether raised by the archive or by
    /// `visit`, and returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`crate::IngestError::CorruptArchive`] or
    /// [`crate::IngestError::TruncatedArchive`] for malformed input, or
    /// whatever error `visit` returns.
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
    ) -> Result<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct ListSource(Vec<EntryHeader>);

    impl EntrySource for ListSource {
        fn format(&self) -> ArchiveFormat {
            ArchiveFormat::Zip
        }

        fn manifest(&self) -> Option<&[EntryHeader]> {
            Some(&self.0)
        }

        fn for_each_entry(
            &mut self,
            visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
        ) -> Result<()> {
            for header in &self.0 {
                let mut payload = Cursor::new(Vec::new());
                visit(ArchiveEntry {
                    path: header.path.clone(),
                    kind: header.kind.clone(),
                    size: header.size,
                    payload: &mut payload,
                })?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_visitor_error_stops_iteration() {
        let headers = ["a", "b", "c"]
            .into_iter()
            .map(|p| EntryHeader {
                path: p.into(),
                kind: EntryKind::File,
                size: 0,
            })
            .collect();
        let mut source = ListSource(headers);

        let mut seen = Vec::new();
        let result = source.for_each_entry(&mut |entry| {
            seen.push(entry.path.clone());
            if entry.path == "b" {
                return Err(crate::IngestError::CorruptArchive("stop".into()));
            }
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(seen, ["a", "b"]);
        assert_eq!(source.manifest().unwrap().len(), 3);
    }
}
