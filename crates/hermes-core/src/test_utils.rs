//! In-memory archive builders for tests.
//!
//! Entry names are written exactly as given, including `..` segments and
//! absolute paths, so hostile archives can be built as easily as benign ones.
//!
//! # Panics
//!
//! Every builder panics on I/O errors; these are for tests only.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Builds gzip-compressed tar archives.
///
/// # Examples
///
/// ```
/// use hermes_core::test_utils::TarGzTestBuilder;
///
/// let data = TarGzTestBuilder::new()
///     .add_file("README.md", b"# site")
///     .add_directory("src/")
///     .add_symlink("escape", "../../etc")
///     .build();
/// assert_eq!(&data[..2], &[0x1F, 0x8B]);
/// ```
pub struct TarGzTestBuilder {
    builder: tar::Builder<GzEncoder<Vec<u8>>>,
}

impl TarGzTestBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast())),
        }
    }

    /// Adds a regular file.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.append(path, tar::EntryType::Regular, 0o644, None, data)
    }

    /// Adds a regular file whose header declares `declared` bytes but whose
    /// payload is `data`. The archive is cut off after the payload, so a
    /// short payload reads as a truncated stream.
    #[must_use]
    pub fn add_truncated_file(mut self, path: &str, data: &[u8], declared: u64) -> Self {
        let mut header = header(path, tar::EntryType::Regular, 0o644, None);
        header.set_size(declared);
        header.set_cksum();
        let inner = self.builder.get_mut();
        inner.write_all(header.as_bytes()).unwrap();
        inner.write_all(data).unwrap();
        self
    }

    /// Adds a directory.
    #[must_use]
    pub fn add_directory(self, path: &str) -> Self {
        self.append(path, tar::EntryType::Directory, 0o755, None, &[])
    }

    /// Adds a symbolic link.
    #[must_use]
    pub fn add_symlink(self, path: &str, target: &str) -> Self {
        self.append(path, tar::EntryType::Symlink, 0o777, Some(target), &[])
    }

    /// Adds a hard link.
    #[must_use]
    pub fn add_hardlink(self, path: &str, target: &str) -> Self {
        self.append(path, tar::EntryType::Link, 0o644, Some(target), &[])
    }

    /// Adds a FIFO.
    #[must_use]
    pub fn add_fifo(self, path: &str) -> Self {
        self.append(path, tar::EntryType::Fifo, 0o644, None, &[])
    }

    /// Finishes the archive and returns its compressed bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap().finish().unwrap()
    }

    /// Returns the compressed bytes without the end-of-archive marker.
    ///
    /// Pair with [`TarGzTestBuilder::add_truncated_file`].
    #[must_use]
    pub fn build_unterminated(mut self) -> Vec<u8> {
        let inner = std::mem::replace(
            self.builder.get_mut(),
            GzEncoder::new(Vec::new(), Compression::fast()),
        );
        // The builder still writes its trailer into the replacement on drop.
        drop(self);
        inner.finish().unwrap()
    }

    fn append(
        mut self,
        path: &str,
        kind: tar::EntryType,
        mode: u32,
        link: Option<&str>,
        data: &[u8],
    ) -> Self {
        let mut header = header(path, kind, mode, link);
        header.set_size(data.len() as u64);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }
}

impl Default for TarGzTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// GNU header with raw name bytes; `tar::Header::set_path` would refuse
/// `..` and absolute names.
fn header(path: &str, kind: tar::EntryType, mode: u32, link: Option<&str>) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_mtime(0);

    let name = path.as_bytes();
    assert!(name.len() <= 100, "test entry name too long: {path}");
    header.as_old_mut().name[..name.len()].copy_from_slice(name);

    if let Some(link) = link {
        let link = link.as_bytes();
        assert!(link.len() <= 100, "test link target too long");
        header.as_old_mut().linkname[..link.len()].copy_from_slice(link);
    }
    header
}

/// Builds zip archives.
///
/// # Examples
///
/// ```
/// use hermes_core::test_utils::ZipTestBuilder;
///
/// let data = ZipTestBuilder::new()
///     .add_file("ok.txt", b"fine")
///     .add_file("../../etc/passwd", b"root:x:0:0")
///     .build();
/// assert_eq!(&data[..4], b"PK\x03\x04");
/// ```
pub struct ZipTestBuilder {
    zip: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Adds a deflated file.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);
        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        self.zip.add_directory(path, options).unwrap();
        self
    }

    /// Adds a symbolic link (unix mode `S_IFLNK`).
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        let options = zip::write::SimpleFileOptions::default();
        self.zip.add_symlink(path, target, options).unwrap();
        self
    }

    /// Finishes the archive and returns its bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds 7z archives.
///
/// # Examples
///
/// ```
/// use hermes_core::test_utils::SevenZipTestBuilder;
///
/// let data = SevenZipTestBuilder::new()
///     .add_directory("src")
///     .add_file("src/main.rs", b"fn main() {}")
///     .build();
/// assert_eq!(&data[..6], &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]);
/// ```
pub struct SevenZipTestBuilder {
    writer: sevenz_rust2::ArchiveWriter<Cursor<Vec<u8>>>,
}

impl SevenZipTestBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: sevenz_rust2::ArchiveWriter::new(Cursor::new(Vec::new())).unwrap(),
        }
    }

    /// Adds a file.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        self.writer
            .push_archive_entry(sevenz_rust2::ArchiveEntry::new_file(path), Some(data))
            .unwrap();
        self
    }

    /// Adds a directory.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        self.writer
            .push_archive_entry::<&[u8]>(sevenz_rust2::ArchiveEntry::new_directory(path), None)
            .unwrap();
        self
    }

    /// Finishes the archive and returns its bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

impl Default for SevenZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
