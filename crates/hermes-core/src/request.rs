//! A single ingestion request.

use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

use crate::IngestError;
use crate::Result;
use crate::types::TargetPath;

/// Everything the engine needs for one upload: where it goes, what it claims
/// to be, and its bytes.
///
/// The source must be seekable: zip and 7z read their index from the end,
/// and the sniffer rewinds after peeking at the leading bytes.
///
/// # Examples
///
/// ```
/// use hermes_core::ArchiveRequest;
/// use hermes_core::types::TargetPath;
///
/// let target = TargetPath::parse("/deployments/v1").unwrap();
/// let request = ArchiveRequest::from_bytes(target, "site.zip", vec![0u8; 22]);
/// assert_eq!(request.file_size(), 22);
/// assert_eq!(request.filename(), "site.zip");
/// ```
#[derive(Debug)]
pub struct ArchiveRequest<R> {
    target: TargetPath,
    filename: String,
    source: R,
    file_size: u64,
}

impl<R: Read + Seek> ArchiveRequest<R> {
    /// Wraps a seekable source. Its size is measured by seeking to the end;
    /// the source is left at position 0.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Filesystem`] if the source cannot be seeked.
    pub fn new(target: TargetPath, filename: impl Into<String>, mut source: R) -> Result<Self> {
        let filename = filename.into();
        let file_size = source
            .seek(SeekFrom::End(0))
            .and_then(|size| source.seek(SeekFrom::Start(0)).map(|_| size))
            .map_err(|e| IngestError::filesystem("measuring archive", &filename, e))?;

        Ok(Self {
            target,
            filename,
            source,
            file_size,
        })
    }
}

impl ArchiveRequest<Cursor<Vec<u8>>> {
    /// Wraps an in-memory upload.
    #[must_use]
    pub fn from_bytes(target: TargetPath, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            target,
            filename: filename.into(),
            file_size: bytes.len() as u64,
            source: Cursor::new(bytes),
        }
    }
}

impl ArchiveRequest<File> {
    /// Opens an archive on disk.
    ///
    /// `filename` defaults to the file's own name. Pass it explicitly when the
    /// upload was spooled to a temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Filesystem`] if the file cannot be opened.
    pub fn from_file(target: TargetPath, path: &Path, filename: Option<String>) -> Result<Self> {
        let file = File::open(path).map_err(|e| IngestError::filesystem("opening archive", path, e))?;
        let filename = filename.unwrap_or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        Self::new(target, filename, file)
    }
}

impl<R> ArchiveRequest<R> {
    /// Target path relative to the storage root.
    #[must_use]
    pub fn target(&self) -> &TargetPath {
        &self.target
    }

    /// Declared filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Total size of the upload in bytes.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Splits the request into target, filename, source and size.
    #[must_use]
    pub fn into_parts(self) -> (TargetPath, String, R, u64) {
        (self.target, self.filename, self.source, self.file_size)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_measures_and_rewinds() {
        let mut cursor = Cursor::new(b"0123456789".to_vec());
        cursor.seek(SeekFrom::Start(4)).unwrap();

        let request = ArchiveRequest::new(TargetPath::root(), "a.zip", cursor).unwrap();
        assert_eq!(request.file_size(), 10);

        let (_, _, mut source, _) = request.into_parts();
        let mut first = [0u8; 1];
        source.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"0");
    }

    #[test]
    fn test_from_file_defaults_filename() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upload.tgz");
        std::fs::write(&path, b"abc").unwrap();

        let request = ArchiveRequest::from_file(TargetPath::root(), &path, None).unwrap();
        assert_eq!(request.filename(), "upload.tgz");
        assert_eq!(request.file_size(), 3);

        let renamed =
            ArchiveRequest::from_file(TargetPath::root(), &path, Some("site.zip".into())).unwrap();
        assert_eq!(renamed.filename(), "site.zip");
    }

    #[test]
    fn test_from_file_missing() {
        let temp = TempDir::new().unwrap();
        let err = ArchiveRequest::from_file(TargetPath::root(), &temp.path().join("nope.zip"), None)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Filesystem);
    }
}
