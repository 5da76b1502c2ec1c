//! Containment checks against the real filesystem.

use std::io;
use std::path::MAIN_SEPARATOR;
use std::path::Path;
use std::path::PathBuf;

use crate::IngestError;
use crate::Result;
use crate::types::SafePath;

/// Resolves a lexically validated entry path under `root` and verifies the
/// result is contained in it.
///
/// `root` must already be canonical (the staging directory always is, since
/// it is created by name under the canonical storage root).
///
/// Two checks run:
/// 1. The joined path's byte form must start with `root` followed by a
///    separator. A zero-segment path resolves to `root` itself.
/// 2. The nearest ancestor that already exists on disk is canonicalized and
///    must still lie under `root`, and the entry itself must not already be a
///    symlink. This catches a parent that was smuggled in as a link.
///
/// # Performance
///
/// Involves one `canonicalize()` and one `symlink_metadata()` syscall per
/// call.
///
/// # Errors
///
/// Returns [`IngestError::UnsafePath`] if the path escapes `root`, or
/// [`IngestError::Filesystem`] if an ancestor cannot be canonicalized.
///
/// # Examples
///
/// ```no_run
/// use hermes_core::config::Limits;
/// use hermes_core::security::resolve_contained;
/// use hermes_core::types::SafePath;
/// use std::path::Path;
///
/// # fn main() -> Result<(), hermes_core::IngestError> {
/// let safe = SafePath::validate("src/app.py", &Limits::default())?;
/// let resolved = resolve_contained(&safe, Path::new("/srv/hermes/site"))?;
/// assert!(resolved.ends_with("src/app.py"));
/// # Ok(())
/// # }
/// ```
pub fn resolve_contained(safe: &SafePath, root: &Path) -> Result<PathBuf> {
    if safe.is_root() {
        return Ok(root.to_path_buf());
    }

    let joined = root.join(safe.as_path());
    let display = safe.as_path().display().to_string();

    if !has_root_prefix(&joined, root) {
        return Err(IngestError::unsafe_path(display, "resolves outside the target root"));
    }

    let existing = nearest_existing_ancestor(&joined, root);
    let canonical = existing
        .canonicalize()
        .map_err(|e| IngestError::filesystem("canonicalizing", &existing, e))?;
    if !canonical.starts_with(root) {
        return Err(IngestError::unsafe_path(
            display,
            "existing ancestor resolves outside the target root",
        ));
    }

    match std::fs::symlink_metadata(&joined) {
        Ok(meta) if meta.file_type().is_symlink() => {
            return Err(IngestError::unsafe_path(display, "path is an existing symlink"));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(IngestError::filesystem("inspecting", &joined, e)),
    }

    Ok(joined)
}

/// Byte-level prefix check: `path` must start with `root` plus a separator.
fn has_root_prefix(path: &Path, root: &Path) -> bool {
    let path = path.as_os_str().as_encoded_bytes();
    let root = root.as_os_str().as_encoded_bytes();
    let root = root.strip_suffix(&[MAIN_SEPARATOR as u8]).unwrap_or(root);

    path.len() > root.len() + 1
        && path.starts_with(root)
        && path[root.len()] == MAIN_SEPARATOR as u8
}

/// Walks up from `path` until an existing entry is found, stopping at `root`.
fn nearest_existing_ancestor(path: &Path, root: &Path) -> PathBuf {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || dir.exists() {
            return dir.to_path_buf();
        }
        current = dir.parent();
    }
    root.to_path_buf()
}
