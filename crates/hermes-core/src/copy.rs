//! File copy with a reusable buffer and a hard byte ceiling.
//!
//! Entry payloads are copied through a single heap buffer owned by the
//! extraction session. The ceiling is enforced while copying, so an entry
//! whose header understates its size still cannot write past the limit.

use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use crate::IngestError;
use crate::QuotaResource;
use crate::Result;

/// Buffer size for I/O operations (64KB).
///
/// Matches typical filesystem block sizes.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable buffer for copying entry payloads.
///
/// # Examples
///
/// ```
/// use hermes_core::copy::CopyBuffer;
/// use hermes_core::copy::copy_with_limit;
/// use std::path::Path;
///
/// let mut buffer = CopyBuffer::new();
/// let mut input: &[u8] = b"hello";
/// let mut output = Vec::new();
///
/// let copied = copy_with_limit(&mut input, &mut output, &mut buffer, 1024, Path::new("out"))?;
/// assert_eq!(copied, 5);
/// # Ok::<(), hermes_core::IngestError>(())
/// ```
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Creates a new zeroed copy buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer`, failing once more than `limit` bytes have
/// been produced.
///
/// Read failures are classified as archive errors (truncated on unexpected
/// EOF, corrupt otherwise). Write failures are filesystem errors against
/// `dest`.
///
/// # Errors
///
/// - [`IngestError::QuotaExceeded`] with [`QuotaResource::FileSize`] when the
///   payload exceeds `limit`
/// - [`IngestError::TruncatedArchive`] / [`IngestError::CorruptArchive`] on
///   read failure
/// - [`IngestError::Filesystem`] on write failure
pub fn copy_with_limit<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    limit: u64,
    dest: &Path,
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(IngestError::from_archive_io(&e)),
        };

        total = total
            .checked_add(bytes_read as u64)
            .ok_or(IngestError::QuotaExceeded {
                resource: QuotaResource::IntegerOverflow,
            })?;
        if total > limit {
            return Err(IngestError::QuotaExceeded {
                resource: QuotaResource::FileSize {
                    size: total,
                    max: limit,
                },
            });
        }

        writer
            .write_all(&buffer.buf[..bytes_read])
            .map_err(|e| IngestError::filesystem("writing file", dest, e))?;
    }

    Ok(total)
}
