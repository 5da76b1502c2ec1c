//! Closed dispatch over the supported formats.

use std::io::Read;
use std::io::Seek;

use crate::Result;

use super::detect::ArchiveFormat;
use super::sevenz::SevenZipSource;
use super::tar::TarGzSource;
use super::traits::ArchiveEntry;
use super::traits::EntryHeader;
use super::traits::EntrySource;
use super::zip::ZipSource;

/// An opened archive of any supported format.
///
/// # Examples
///
/// ```no_run
/// use hermes_core::formats::ArchiveFormat;
/// use hermes_core::formats::ArchiveReader;
/// use hermes_core::formats::EntrySource;
/// use std::fs::File;
///
/// # fn main() -> Result<(), hermes_core::IngestError> {
/// let file = File::open("site.zip").map_err(|e| hermes_core::IngestError::from_archive_io(&e))?;
/// let reader = ArchiveReader::open(ArchiveFormat::Zip, file)?;
/// if let Some(manifest) = reader.manifest() {
///     println!("{} entries", manifest.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub enum ArchiveReader<R: Read + Seek> {
    /// Gzip-compressed tar.
    TarGz(TarGzSource<R>),
    /// ZIP.
    Zip(ZipSource<R>),
    /// 7z.
    SevenZip(SevenZipSource<R>),
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Opens `source` as `format`.
    ///
    /// Zip and 7z read their index here; tar.gz defers all reading to
    /// iteration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::IngestError::CorruptArchive`] or
    /// [`crate::IngestError::TruncatedArchive`] if the index cannot be read.
    pub fn open(format: ArchiveFormat, source: R) -> Result<Self> {
        Ok(match format {
            ArchiveFormat::TarGz => Self::TarGz(TarGzSource::new(source)),
            ArchiveFormat::Zip => Self::Zip(ZipSource::new(source)?),
            ArchiveFormat::SevenZip => Self::SevenZip(SevenZipSource::new(source)?),
        })
    }
}

impl<R: Read + Seek> EntrySource for ArchiveReader<R> {
    fn format(&self) -> ArchiveFormat {
        match self {
            Self::TarGz(inner) => inner.format(),
            Self::Zip(inner) => inner.format(),
            Self::SevenZip(inner) => inner.format(),
        }
    }

    fn manifest(&self) -> Option<&[EntryHeader]> {
        match self {
            Self::TarGz(inner) => inner.manifest(),
            Self::Zip(inner) => inner.manifest(),
            Self::SevenZip(inner) => inner.manifest(),
        }
    }

    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
    ) -> Result<()> {
        match self {
            Self::TarGz(inner) => inner.for_each_entry(visit),
            Self::Zip(inner) => inner.for_each_entry(visit),
            Self::SevenZip(inner) => inner.for_each_entry(visit),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::SevenZipTestBuilder;
    use crate::test_utils::TarGzTestBuilder;
    use crate::test_utils::ZipTestBuilder;
    use std::io::Cursor;

    fn count(format: ArchiveFormat, data: Vec<u8>) -> usize {
        let mut reader = ArchiveReader::open(format, Cursor::new(data)).unwrap();
        assert_eq!(reader.format(), format);
        let mut n = 0;
        reader
            .for_each_entry(&mut |_| {
                n += 1;
                Ok(())
            })
            .unwrap();
        n
    }

    #[test]
    fn test_dispatch_every_format() {
        let tar = TarGzTestBuilder::new().add_file("a", b"1").build();
        let zip = ZipTestBuilder::new().add_file("a", b"1").build();
        let sevenz = SevenZipTestBuilder::new().add_file("a", b"1").build();

        assert_eq!(count(ArchiveFormat::TarGz, tar), 1);
        assert_eq!(count(ArchiveFormat::Zip, zip), 1);
        assert_eq!(count(ArchiveFormat::SevenZip, sevenz), 1);
    }

    #[test]
    fn test_manifest_only_for_indexed_formats() {
        let tar = TarGzTestBuilder::new().add_file("a", b"1").build();
        let reader = ArchiveReader::open(ArchiveFormat::TarGz, Cursor::new(tar)).unwrap();
        assert!(reader.manifest().is_none());

        let zip = ZipTestBuilder::new().add_file("a", b"1").build();
        let reader = ArchiveReader::open(ArchiveFormat::Zip, Cursor::new(zip)).unwrap();
        assert_eq!(reader.manifest().unwrap().len(), 1);
    }
}
