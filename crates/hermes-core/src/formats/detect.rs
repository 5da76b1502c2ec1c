//! Archive format detection.

use std::fmt;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use serde::Serialize;

use crate::IngestError;
use crate::Result;

/// Gzip member header: `1F 8B`.
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Zip local file header: `PK\x03\x04`.
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Zip end-of-central-directory record, which is all an empty zip contains.
const ZIP_EMPTY_MAGIC: [u8; 4] = *b"PK\x05\x06";

/// 7z signature: `37 7A BC AF 27 1C`.
const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// Number of leading bytes the sniffer inspects.
pub const SNIFF_LEN: usize = 8;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive.
    #[serde(rename = "tar.gz")]
    TarGz,
    /// ZIP archive.
    #[serde(rename = "zip")]
    Zip,
    /// 7z archive.
    #[serde(rename = "7z")]
    SevenZip,
}

impl ArchiveFormat {
    /// Returns the wire name: `tar.gz`, `zip` or `7z`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
            Self::SevenZip => "7z",
        }
    }

    /// Returns `true` if the format lists every entry before any payload is
    /// read, so the whole archive can be validated up front.
    #[must_use]
    pub const fn has_manifest(self) -> bool {
        matches!(self, Self::Zip | Self::SevenZip)
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects the format implied by a filename suffix, case-insensitively.
///
/// Recognized suffixes are `.tar.gz`, `.tgz`, `.zip` and `.7z`.
#[must_use]
pub fn format_from_suffix(filename: &str) -> Option<ArchiveFormat> {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        Some(ArchiveFormat::TarGz)
    } else if lower.ends_with(".zip") {
        Some(ArchiveFormat::Zip)
    } else if lower.ends_with(".7z") {
        Some(ArchiveFormat::SevenZip)
    } else {
        None
    }
}

/// Detects the format implied by leading bytes.
///
/// Returns `None` when the bytes match no known signature, including when
/// fewer bytes than a signature are available.
///
/// # Examples
///
/// ```
/// use hermes_core::formats::ArchiveFormat;
/// use hermes_core::formats::sniff_magic;
///
/// assert_eq!(sniff_magic(b"PK\x03\x04rest"), Some(ArchiveFormat::Zip));
/// assert_eq!(sniff_magic(&[0x1F, 0x8B, 0x08]), Some(ArchiveFormat::TarGz));
/// assert_eq!(sniff_magic(b"plain text"), None);
/// ```
#[must_use]
pub fn sniff_magic(leading: &[u8]) -> Option<ArchiveFormat> {
    if leading.starts_with(&SEVENZ_MAGIC) {
        Some(ArchiveFormat::SevenZip)
    } else if leading.starts_with(&ZIP_MAGIC) || leading.starts_with(&ZIP_EMPTY_MAGIC) {
        Some(ArchiveFormat::Zip)
    } else if leading.starts_with(&GZIP_MAGIC) {
        Some(ArchiveFormat::TarGz)
    } else {
        None
    }
}

/// Determines the archive format from the declared filename and the leading
/// bytes of the content.
///
/// The suffix decides. When the leading bytes carry a recognized signature it
/// must agree with the suffix; unrecognized bytes leave the decision to the
/// suffix and the extractor reports the corruption later.
///
/// # Errors
///
/// - [`IngestError::UnsupportedFormat`] if the filename has no recognized
///   suffix
/// - [`IngestError::FormatMismatch`] if suffix and signature disagree
///
/// # Examples
///
/// ```
/// use hermes_core::formats::ArchiveFormat;
/// use hermes_core::formats::sniff;
///
/// let format = sniff("site.ZIP", b"PK\x03\x04").unwrap();
/// assert_eq!(format, ArchiveFormat::Zip);
///
/// // A zip uploaded under a tar.gz name is refused.
/// assert!(sniff("a.tar.gz", b"PK\x03\x04").is_err());
/// ```
pub fn sniff(filename: &str, leading: &[u8]) -> Result<ArchiveFormat> {
    let declared =
        format_from_suffix(filename).ok_or_else(|| IngestError::UnsupportedFormat {
            filename: filename.to_string(),
        })?;

    match sniff_magic(leading) {
        Some(detected) if detected != declared => {
            Err(IngestError::FormatMismatch { declared, detected })
        }
        _ => Ok(declared),
    }
}

/// Reads up to [`SNIFF_LEN`] leading bytes from `source` and rewinds it.
///
/// # Errors
///
/// Returns [`IngestError::CorruptArchive`] if the source cannot be read or
/// rewound.
pub fn read_leading<R: Read + Seek>(source: &mut R) -> Result<Vec<u8>> {
    let mut leading = Vec::with_capacity(SNIFF_LEN);
    source
        .by_ref()
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut leading)
        .map_err(|e| IngestError::from_archive_io(&e))?;
    source
        .seek(SeekFrom::Start(0))
        .map_err(|e| IngestError::from_archive_io(&e))?;
    Ok(leading)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    #[test]
    fn test_suffix_detection() {
        assert_eq!(format_from_suffix("a.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(format_from_suffix("a.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(format_from_suffix("a.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(format_from_suffix("a.7z"), Some(ArchiveFormat::SevenZip));
    }

    #[test]
    fn test_suffix_case_insensitive() {
        assert_eq!(format_from_suffix("ARCHIVE.7Z"), Some(ArchiveFormat::SevenZip));
        assert_eq!(format_from_suffix("Site.Tar.Gz"), Some(ArchiveFormat::TarGz));
    }

    #[test]
    fn test_suffix_unsupported() {
        for name in ["archive.rar", "archive.tar", "archive.gz", "archive", "zip"] {
            assert_eq!(format_from_suffix(name), None, "{name} should not match");
        }
    }

    #[test]
    fn test_sniff_unsupported_before_content() {
        let err = sniff("notes.txt", b"PK\x03\x04").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_sniff_agreement() {
        assert_eq!(
            sniff("a.tgz", &[0x1F, 0x8B, 0x08, 0x00]).unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            sniff("a.7z", &SEVENZ_MAGIC).unwrap(),
            ArchiveFormat::SevenZip
        );
        assert_eq!(sniff("empty.zip", b"PK\x05\x06").unwrap(), ArchiveFormat::Zip);
    }

    #[test]
    fn test_zip_named_tar_gz_is_mismatch() {
        let err = sniff("a.tar.gz", b"PK\x03\x04\x14\x00").unwrap_err();
        assert!(matches!(
            err,
            IngestError::FormatMismatch {
                declared: ArchiveFormat::TarGz,
                detected: ArchiveFormat::Zip,
            }
        ));
    }

    #[test]
    fn test_unknown_magic_defers_to_suffix() {
        assert_eq!(sniff("a.zip", b"garbage!").unwrap(), ArchiveFormat::Zip);
        assert_eq!(sniff("a.7z", b"").unwrap(), ArchiveFormat::SevenZip);
    }

    #[test]
    fn test_read_leading_rewinds() {
        let mut source = Cursor::new(b"PK\x03\x04 and a lot more data".to_vec());
        let leading = read_leading(&mut source).unwrap();
        assert_eq!(leading.len(), SNIFF_LEN);
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn test_read_leading_short_source() {
        let mut source = Cursor::new(vec![0x1F]);
        let leading = read_leading(&mut source).unwrap();
        assert_eq!(leading, [0x1F]);
        assert_eq!(sniff_magic(&leading), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(ArchiveFormat::TarGz.to_string(), "tar.gz");
        assert_eq!(
            serde_json::to_string(&ArchiveFormat::SevenZip).unwrap(),
            "\"7z\""
        );
        assert!(ArchiveFormat::Zip.has_manifest());
        assert!(!ArchiveFormat::TarGz.has_manifest());
    }
}
