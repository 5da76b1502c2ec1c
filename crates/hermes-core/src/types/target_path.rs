//! Validated target path derived from a request URL.

use std::fmt;

use crate::IngestError;
use crate::Result;

/// Name prefix of the directory a request stages new content in.
pub const STAGING_PREFIX: &str = ".hermes-staging-";

/// Name prefix of the directory holding replaced content until it is deleted.
pub const PREVIOUS_PREFIX: &str = ".hermes-previous-";

/// Returns `true` if `name` lies in the scratch namespace, i.e. starts with
/// [`STAGING_PREFIX`] or [`PREVIOUS_PREFIX`].
///
/// Scratch directories are created beside a target, or inside the storage
/// root when the root is the target. Target segments may not use these
/// names, and the storage-root swap never touches entries that do.
///
/// # Examples
///
/// ```
/// use hermes_core::types::is_scratch_name;
///
/// assert!(is_scratch_name(b".hermes-staging-412-0"));
/// assert!(!is_scratch_name(b".hermes-notes.md"));
/// ```
#[must_use]
pub fn is_scratch_name(name: &[u8]) -> bool {
    name.starts_with(STAGING_PREFIX.as_bytes()) || name.starts_with(PREVIOUS_PREFIX.as_bytes())
}

/// Ordered, validated sequence of path segments naming where an archive is
/// extracted, relative to the storage root.
///
/// Every segment is non-empty and is neither `.` nor `..`. Segments never
/// contain `/`, `\` or NUL, and are never scratch names (see
/// [`is_scratch_name`]). The
/// empty sequence denotes the storage root itself.
///
/// # Examples
///
/// ```
/// use hermes_core::types::TargetPath;
///
/// let target = TargetPath::parse("/deployments/v1").unwrap();
/// assert_eq!(target.segments(), ["deployments", "v1"]);
/// assert_eq!(target.to_string(), "/deployments/v1");
///
/// assert!(TargetPath::parse("/a/../b").is_err());
/// assert!(TargetPath::parse("/").unwrap().is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TargetPath(Vec<String>);

impl TargetPath {
    /// The storage root itself.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses a URL-style path such as `/deployments/v1`.
    ///
    /// Leading, trailing and repeated slashes are ignored. Percent-decoding is
    /// the HTTP layer's job; this only sees decoded text.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidTarget`] if any segment is rejected.
    pub fn parse(url_path: &str) -> Result<Self> {
        Self::from_segments(url_path.split('/').filter(|s| !s.is_empty()))
    }

    /// Builds a target from already-split segments.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidTarget`] if any segment is empty or unsafe.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(Into::into)
            .map(|segment| validate_segment(&segment).map(|()| segment))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(segments))
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if this is the storage root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    let reason = if segment.is_empty() {
        "empty segment"
    } else if segment == "." || segment == ".." {
        "relative segment"
    } else if segment.contains(['/', '\\', '\0']) {
        "segment contains a separator or NUL byte"
    } else if is_scratch_name(segment.as_bytes()) {
        "segment is a reserved scratch name"
    } else {
        return Ok(());
    };

    Err(IngestError::InvalidTarget {
        reason: format!("{reason}: {segment:?}"),
    })
}
