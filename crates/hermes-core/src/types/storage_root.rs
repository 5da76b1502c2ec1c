//! Validated storage root type.

use crate::IngestError;
use crate::Result;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use super::TargetPath;

/// The base directory every ingestion lands under.
///
/// A `StorageRoot` is guaranteed at construction to:
/// - Have been supplied as an absolute path
/// - Exist and be a directory
/// - Be writable by the current process
/// - Be stored in canonical form (symlinks resolved)
///
/// The embedding process supplies it once at startup; there is no default
/// location.
///
/// # Examples
///
/// ```no_run
/// use hermes_core::types::StorageRoot;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = StorageRoot::new("/srv/hermes")?;
/// println!("Storing under: {}", root.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot(PathBuf);

impl StorageRoot {
    /// Creates a new `StorageRoot` after validating the path.
    ///
    /// # Security Considerations
    ///
    /// The path is canonicalized once here. Every entry path is later checked
    /// against this canonical form, so a root that is itself reached through a
    /// symlink still yields correct containment checks.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Filesystem`] if the path is relative, does not
    /// exist, is not a directory, cannot be canonicalized, or is not writable.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.is_absolute() {
            return Err(IngestError::filesystem(
                "opening storage root",
                &path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "storage root must be an absolute path",
                ),
            ));
        }

        let metadata = std::fs::metadata(&path)
            .map_err(|e| IngestError::filesystem("opening storage root", &path, e))?;
        if !metadata.is_dir() {
            return Err(IngestError::filesystem(
                "opening storage root",
                &path,
                io::Error::new(io::ErrorKind::InvalidInput, "path is not a directory"),
            ));
        }

        let canonical = path
            .canonicalize()
            .map_err(|e| IngestError::filesystem("canonicalizing storage root", &path, e))?;

        check_writable(&canonical)?;

        Ok(Self(canonical))
    }

    /// Returns the canonical root path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Resolves a target path to its absolute location under this root.
    ///
    /// The empty target resolves to the root itself.
    #[must_use]
    pub fn resolve(&self, target: &TargetPath) -> PathBuf {
        let mut path = self.0.clone();
        for segment in target.segments() {
            path.push(segment);
        }
        path
    }
}

/// Checks effective write permission with `access(2)`.
#[cfg(unix)]
fn check_writable(path: &Path) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let path_cstring = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        IngestError::filesystem(
            "opening storage root",
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte"),
        )
    })?;

    // SAFETY: `path_cstring` is a valid NUL-terminated string that outlives
    // the call; access() only reads it.
    #[allow(unsafe_code)]
    let result = unsafe { libc::access(path_cstring.as_ptr(), libc::W_OK) };

    if result != 0 {
        return Err(IngestError::filesystem(
            "opening storage root",
            path,
            io::Error::new(io::ErrorKind::PermissionDenied, "directory is not writable"),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_writable(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| IngestError::filesystem("opening storage root", path, e))?;
    if metadata.permissions().readonly() {
        return Err(IngestError::filesystem(
            "opening storage root",
            path,
            io::Error::new(io::ErrorKind::PermissionDenied, "directory is read-only"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_storage_root_valid() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = StorageRoot::new(temp.path()).expect("should accept temp dir");
        assert!(root.as_path().is_absolute());
        assert_eq!(root.as_path(), temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_storage_root_relative_rejected() {
        let result = StorageRoot::new("relative/dir");
        assert!(matches!(
            result.map_err(|e| e.kind()),
            Err(ErrorKind::Filesystem)
        ));
    }

    #[test]
    fn test_storage_root_missing_rejected() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let result = StorageRoot::new(temp.path().join("does-not-exist"));
        assert!(result.is_err());
    }

    #[test]
    fn test_storage_root_file_rejected() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        let result = StorageRoot::new(&file);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_empty_target_is_root() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = StorageRoot::new(temp.path()).unwrap();
        let target = TargetPath::root();
        assert_eq!(root.resolve(&target), root.as_path());
    }

    #[test]
    fn test_resolve_nested_target() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = StorageRoot::new(temp.path()).unwrap();
        let target = TargetPath::parse("/deployments/v1").unwrap();
        assert_eq!(
            root.resolve(&target),
            root.as_path().join("deployments").join("v1")
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_storage_root_through_symlink_is_canonical() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().expect("failed to create temp dir");
        let real = temp.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = temp.path().join("link");
        symlink(&real, &link).unwrap();

        let root = StorageRoot::new(&link).unwrap();
        assert_eq!(root.as_path(), real.canonicalize().unwrap());
    }
}
