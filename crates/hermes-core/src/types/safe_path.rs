//! Validated safe path type for archive entries.

use std::path::Path;
use std::path::PathBuf;

use crate::IngestError;
use crate::Result;
use crate::config::Limits;

/// A lexically validated, normalized entry path relative to a target root.
///
/// `SafePath` represents an archive entry path that has been checked to not
/// contain:
/// - Absolute paths or Windows drive prefixes
/// - Parent directory segments (`..`)
/// - Backslash separators or NUL bytes
/// - More segments than the configured depth limit
///
/// `.` segments and empty segments from doubled or trailing slashes are
/// collapsed. A path that collapses to nothing (`./`) denotes the target root
/// itself; see [`SafePath::is_root`].
///
/// # Security Properties
///
/// - Can ONLY be constructed through [`SafePath::validate`]
/// - NO `From<PathBuf>` or `From<String>` implementation
/// - Archives use `/` regardless of host OS, so splitting happens on `/` only
///
/// Containment against the real filesystem (symlinked parents) is checked
/// separately by [`crate::security::resolve_contained`], once a root exists.
///
/// # Examples
///
/// ```
/// use hermes_core::config::Limits;
/// use hermes_core::types::SafePath;
///
/// let limits = Limits::default();
/// let safe = SafePath::validate("./src/./app.py", &limits).unwrap();
/// assert_eq!(safe.as_path(), std::path::Path::new("src/app.py"));
/// assert_eq!(safe.top_level(), Some("src"));
///
/// assert!(SafePath::validate("../../etc/passwd", &limits).is_err());
/// assert!(SafePath::validate("/etc/passwd", &limits).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath {
    segments: Vec<String>,
    path: PathBuf,
}

impl SafePath {
    /// Validates and normalizes a raw entry path.
    ///
    /// # Validation Steps
    ///
    /// 1. Reject empty paths, NUL bytes and backslashes
    /// 2. Reject absolute paths (`/...`) and drive prefixes (`C:...`)
    /// 3. Split on `/`, dropping `.` and empty segments
    /// 4. Reject any `..` segment
    /// 5. Enforce the depth limit
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::UnsafePath`] naming the rule that failed.
    pub fn validate(raw: &str, limits: &Limits) -> Result<Self> {
        if raw.is_empty() {
            return Err(IngestError::unsafe_path(raw, "empty path"));
        }
        if raw.contains('\0') {
            return Err(IngestError::unsafe_path(raw, "path contains a NUL byte"));
        }
        if raw.starts_with('/') {
            return Err(IngestError::unsafe_path(raw, "absolute path"));
        }
        if raw.contains('\\') {
            return Err(IngestError::unsafe_path(raw, "backslash separator"));
        }
        if has_drive_prefix(raw) {
            return Err(IngestError::unsafe_path(raw, "drive-letter prefix"));
        }

        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(IngestError::unsafe_path(raw, "parent directory segment"));
                }
                normal => segments.push(normal.to_string()),
            }
        }

        if segments.len() > limits.max_path_depth {
            return Err(IngestError::unsafe_path(
                raw,
                format!(
                    "path depth {} exceeds maximum {}",
                    segments.len(),
                    limits.max_path_depth
                ),
            ));
        }

        let path = segments.iter().collect();
        Ok(Self { segments, path })
    }

    /// Returns the normalized relative path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Returns the normalized segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the first segment: the name this entry contributes directly
    /// under the target root.
    #[must_use]
    pub fn top_level(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Returns `true` if the path collapsed to the target root itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Matches `C:`, `c:foo`, `Z:/...` style prefixes.
fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
