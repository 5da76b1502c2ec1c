//! Stage-then-swap replacement of a target directory.
//!
//! New content is written into a scratch directory beside the target. Only
//! once every entry has landed is the old content renamed aside and the
//! scratch directory renamed into place. Readers of the target path see
//! either the complete old tree or the complete new one.
//!
//! Scratch directories are named `.hermes-staging-<pid>-<n>` and
//! `.hermes-previous-<pid>-<n>`, so their length does not depend on the
//! target. Target segments can never take a scratch name. Top-level archive
//! entries only share a directory with scratch names when the storage root is
//! the target, and are refused there.
//!
//! When the target is the storage root itself it cannot be renamed, so its
//! children are moved instead, skipping scratch names. That swap is not
//! atomic for readers, but it is fully rolled back on failure.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tracing::debug;
use tracing::warn;

use crate::IngestError;
use crate::Result;
use crate::types::PREVIOUS_PREFIX;
use crate::types::STAGING_PREFIX;
use crate::types::StorageRoot;
use crate::types::TargetPath;
use crate::types::is_scratch_name;

// Makes scratch names unique within this process.
static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

type Rename<'a> = &'a mut dyn FnMut(&Path, &Path) -> io::Result<()>;

/// Where the new tree goes relative to the scratch directories.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    /// Target is a directory below the root; scratch dirs are its siblings.
    Subdirectory { parent: PathBuf },
    /// Target is the storage root; scratch dirs live inside it.
    Root,
}

/// An in-progress replacement of one target directory.
///
/// Created by [`StagedReplacement::begin`], finished by exactly one of
/// [`StagedReplacement::commit`] or [`StagedReplacement::abort`]. Dropping it
/// unfinished discards the staged content and leaves the old content alone.
///
/// # Examples
///
/// ```no_run
/// use hermes_core::extraction::StagedReplacement;
/// use hermes_core::types::StorageRoot;
/// use hermes_core::types::TargetPath;
///
/// # fn main() -> Result<(), hermes_core::IngestError> {
/// let root = StorageRoot::new("/srv/hermes")?;
/// let target = TargetPath::parse("/deployments/v1")?;
///
/// StagedReplacement::preflight(&root, &target)?;
/// let staged = StagedReplacement::begin(&root, &target)?;
/// std::fs::write(staged.staging_dir().join("index.html"), b"<h1>hi</h1>")
///     .map_err(|e| hermes_core::IngestError::filesystem("writing", "index.html", e))?;
/// let created = staged.commit()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StagedReplacement {
    target: PathBuf,
    staging: PathBuf,
    layout: Layout,
    created_ancestors: Vec<PathBuf>,
    finished: bool,
}

impl StagedReplacement {
    /// Checks, without side effects, that `target` can be replaced.
    ///
    /// Every existing ancestor between the root and the target must be a real
    /// directory (not a symlink), and the target itself must be absent or a
    /// real directory.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Filesystem`] naming the offending path.
    pub fn preflight(root: &StorageRoot, target: &TargetPath) -> Result<()> {
        let mut path = root.as_path().to_path_buf();
        for segment in target.segments() {
            path.push(segment);
            match fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    return Err(IngestError::filesystem(
                        "checking target",
                        &path,
                        io::Error::new(
                            io::ErrorKind::AlreadyExists,
                            "exists and is not a directory",
                        ),
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(IngestError::filesystem("checking target", &path, e)),
            }
        }
        Ok(())
    }

    /// Creates missing ancestors and a fresh, empty staging directory.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Filesystem`] if a directory cannot be created.
    /// Anything created before the failure is removed again.
    pub fn begin(root: &StorageRoot, target: &TargetPath) -> Result<Self> {
        let target_dir = root.resolve(target);
        let staging_name = scratch_name(STAGING_PREFIX);

        let mut staged = match target_dir.parent() {
            Some(parent) if !target.is_root() => Self {
                staging: parent.join(&staging_name),
                layout: Layout::Subdirectory {
                    parent: parent.to_path_buf(),
                },
                target: target_dir.clone(),
                created_ancestors: Vec::new(),
                finished: false,
            },
            _ => Self {
                staging: target_dir.join(&staging_name),
                layout: Layout::Root,
                target: target_dir.clone(),
                created_ancestors: Vec::new(),
                finished: false,
            },
        };

        if let Layout::Subdirectory { parent } = &staged.layout {
            let parent = parent.clone();
            staged.create_ancestors(root.as_path(), &parent)?;
        }

        fs::create_dir(&staged.staging)
            .map_err(|e| IngestError::filesystem("creating staging directory", &staged.staging, e))?;
        debug!(staging = %staged.staging.display(), "staging directory created");

        Ok(staged)
    }

    /// Directory the new content must be written into.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Final location of the content.
    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target
    }

    /// Swaps the staged tree into place and deletes the old content.
    ///
    /// Returns the target path.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Filesystem`] if the swap fails and the old content
    ///   was restored
    /// - [`IngestError::RollbackFailed`] if the swap fails and restoring the
    ///   old content fails too
    pub fn commit(self) -> Result<PathBuf> {
        self.commit_with(&mut |from, to| fs::rename(from, to))
    }

    fn commit_with(mut self, rename: Rename<'_>) -> Result<PathBuf> {
        self.finished = true;
        let previous_name = scratch_name(PREVIOUS_PREFIX);

        let swapped = match &self.layout {
            Layout::Subdirectory { parent } => {
                let previous = parent.join(&previous_name);
                self.swap_directory(&previous, rename).map(|()| previous)
            }
            Layout::Root => {
                let previous = self.target.join(&previous_name);
                self.swap_children(&previous, rename).map(|()| previous)
            }
        };

        match swapped {
            Ok(previous) => {
                remove_tree_logged(&previous);
                Ok(self.target.clone())
            }
            Err(err) => {
                if err.previous_content_preserved() {
                    self.discard();
                }
                Err(err)
            }
        }
    }

    /// Discards the staged content, leaving the old content untouched, and
    /// returns `cause` for propagation.
    #[must_use]
    pub fn abort(mut self, cause: IngestError) -> IngestError {
        self.finished = true;
        warn!(target = %self.target.display(), error = %cause, "rolling back staged content");
        self.discard();
        cause
    }

    fn create_ancestors(&mut self, root: &Path, parent: &Path) -> Result<()> {
        let Ok(relative) = parent.strip_prefix(root) else {
            return Ok(());
        };

        let mut path = root.to_path_buf();
        for component in relative.components() {
            path.push(component);
            match fs::create_dir(&path) {
                Ok(()) => self.created_ancestors.push(path.clone()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {}
                Err(e) => {
                    self.remove_created_ancestors();
                    return Err(IngestError::filesystem("creating directory", &path, e));
                }
            }
        }
        Ok(())
    }

    /// Renames target aside, staging into place. Restores on failure.
    fn swap_directory(&self, previous: &Path, rename: Rename<'_>) -> Result<()> {
        let had_previous = self.target.exists();
        if had_previous {
            rename(&self.target, previous)
                .map_err(|e| IngestError::filesystem("moving previous content aside", &self.target, e))?;
        }

        if let Err(e) = rename(&self.staging, &self.target) {
            let original = IngestError::filesystem("moving staged content into place", &self.target, e);
            if had_previous && let Err(rollback) = rename(previous, &self.target) {
                return Err(IngestError::RollbackFailed {
                    original: Box::new(original),
                    path: self.target.clone(),
                    rollback,
                });
            }
            return Err(original);
        }

        debug!(target = %self.target.display(), "staged content committed");
        Ok(())
    }

    /// Moves the root's children aside and the staged children in.
    fn swap_children(&self, previous: &Path, rename: Rename<'_>) -> Result<()> {
        fs::create_dir(previous)
            .map_err(|e| IngestError::filesystem("creating directory", previous, e))?;

        let old_names = match list_children(&self.target) {
            Ok(names) => names,
            Err(e) => {
                remove_tree_logged(previous);
                return Err(e);
            }
        };

        let mut moved_out = Vec::with_capacity(old_names.len());
        for name in &old_names {
            if let Err(e) = rename(&self.target.join(name), &previous.join(name)) {
                let original =
                    IngestError::filesystem("moving previous content aside", self.target.join(name), e);
                return self.restore_children(original, previous, &moved_out, &[], rename);
            }
            moved_out.push(name.clone());
        }

        let new_names = match list_children(&self.staging) {
            Ok(names) => names,
            Err(e) => return self.restore_children(e, previous, &moved_out, &[], rename),
        };

        let mut moved_in = Vec::with_capacity(new_names.len());
        for name in &new_names {
            if let Err(e) = rename(&self.staging.join(name), &self.target.join(name)) {
                let original =
                    IngestError::filesystem("moving staged content into place", self.target.join(name), e);
                return self.restore_children(original, previous, &moved_out, &moved_in, rename);
            }
            moved_in.push(name.clone());
        }

        remove_tree_logged(&self.staging);
        debug!(target = %self.target.display(), "staged children committed");
        Ok(())
    }

    /// Undoes a partial child swap: removes what was moved in, moves back
    /// what was moved out.
    fn restore_children(
        &self,
        original: IngestError,
        previous: &Path,
        moved_out: &[std::ffi::OsString],
        moved_in: &[std::ffi::OsString],
        rename: Rename<'_>,
    ) -> Result<()> {
        for name in moved_in {
            let path = self.target.join(name);
            if let Err(e) = rename(&path, &self.staging.join(name)) {
                warn!(path = %path.display(), error = %e, "could not withdraw staged entry");
            }
        }
        for name in moved_out {
            if let Err(rollback) = rename(&previous.join(name), &self.target.join(name)) {
                return Err(IngestError::RollbackFailed {
                    original: Box::new(original),
                    path: self.target.join(name),
                    rollback,
                });
            }
        }
        remove_tree_logged(previous);
        Err(original)
    }

    /// Removes staging and any ancestors this request created.
    fn discard(&mut self) {
        remove_tree_logged(&self.staging);
        self.remove_created_ancestors();
    }

    fn remove_created_ancestors(&mut self) {
        // Innermost first; a non-empty directory now belongs to someone else.
        for dir in self.created_ancestors.drain(..).rev() {
            if fs::remove_dir(&dir).is_err() {
                break;
            }
        }
    }
}

impl Drop for StagedReplacement {
    fn drop(&mut self) {
        if !self.finished {
            warn!(staging = %self.staging.display(), "staged replacement dropped unfinished");
            self.discard();
        }
    }
}

fn scratch_name(prefix: &str) -> String {
    let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{}-{n}", process::id())
}

/// Lists entries of `dir`, skipping scratch directories.
fn list_children(dir: &Path) -> Result<Vec<std::ffi::OsString>> {
    let entries = fs::read_dir(dir).map_err(|e| IngestError::filesystem("listing directory", dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IngestError::filesystem("listing directory", dir, e))?;
        let name = entry.file_name();
        if !is_scratch_name(name.as_encoded_bytes()) {
            names.push(name);
        }
    }
    Ok(names)
}

fn remove_tree_logged(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "leaked scratch directory"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StorageRoot) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = StorageRoot::new(temp.path()).unwrap();
        (temp, root)
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_commit_into_new_target() {
        let (_temp, root) = setup();
        let target = TargetPath::parse("/deployments/v1").unwrap();

        let staged = StagedReplacement::begin(&root, &target).unwrap();
        fs::write(staged.staging_dir().join("a.txt"), "new").unwrap();
        let created = staged.commit().unwrap();

        assert_eq!(created, root.as_path().join("deployments/v1"));
        assert_eq!(fs::read_to_string(created.join("a.txt")).unwrap(), "new");
        assert_eq!(names(&root.as_path().join("deployments")), ["v1"]);
    }

    #[test]
    fn test_commit_replaces_old_content() {
        let (_temp, root) = setup();
        let target = TargetPath::parse("/site").unwrap();
        let site = root.as_path().join("site");
        fs::create_dir_all(site.join("stale")).unwrap();
        fs::write(site.join("old.txt"), "old").unwrap();

        let staged = StagedReplacement::begin(&root, &target).unwrap();
        fs::write(staged.staging_dir().join("new.txt"), "new").unwrap();
        staged.commit().unwrap();

        assert_eq!(names(&site), ["new.txt"]);
        assert_eq!(names(root.as_path()), ["site"]);
    }

    #[test]
    fn test_abort_leaves_old_content() {
        let (_temp, root) = setup();
        let target = TargetPath::parse("/site").unwrap();
        let site = root.as_path().join("site");
        fs::create_dir_all(&site).unwrap();
        fs::write(site.join("old.txt"), "old").unwrap();

        let staged = StagedReplacement::begin(&root, &target).unwrap();
        fs::write(staged.staging_dir().join("partial.txt"), "x").unwrap();
        let err = staged.abort(IngestError::CorruptArchive("bad".into()));

        assert_eq!(err.kind(), ErrorKind::CorruptArchive);
        assert_eq!(names(&site), ["old.txt"]);
        assert_eq!(names(root.as_path()), ["site"]);
    }

    #[test]
    fn test_abort_removes_created_ancestors() {
        let (_temp, root) = setup();
        let target = TargetPath::parse("/a/b/c").unwrap();

        let staged = StagedReplacement::begin(&root, &target).unwrap();
        assert!(root.as_path().join("a/b").is_dir());
        let _ = staged.abort(IngestError::CorruptArchive("bad".into()));

        assert!(names(root.as_path()).is_empty());
    }

    #[test]
    fn test_drop_without_commit_cleans_up() {
        let (_temp, root) = setup();
        let target = TargetPath::parse("/site").unwrap();

        {
            let staged = StagedReplacement::begin(&root, &target).unwrap();
            fs::write(staged.staging_dir().join("x"), "x").unwrap();
        }

        assert!(names(root.as_path()).is_empty());
    }

    #[test]
    fn test_preflight_rejects_file_target() {
        let (_temp, root) = setup();
        fs::write(root.as_path().join("site"), "i am a file").unwrap();
        let target = TargetPath::parse("/site").unwrap();

        let err = StagedReplacement::preflight(&root, &target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert_eq!(
            fs::read_to_string(root.as_path().join("site")).unwrap(),
            "i am a file"
        );
    }

    #[test]
    fn test_preflight_rejects_file_ancestor() {
        let (_temp, root) = setup();
        fs::write(root.as_path().join("a"), "file").unwrap();
        let target = TargetPath::parse("/a/b").unwrap();

        let err = StagedReplacement::preflight(&root, &target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[cfg(unix)]
    #[test]
    fn test_preflight_rejects_symlinked_target() {
        let (_temp, root) = setup();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.as_path().join("site")).unwrap();
        let target = TargetPath::parse("/site").unwrap();

        assert!(StagedReplacement::preflight(&root, &target).is_err());
    }

    #[test]
    fn test_root_target_swaps_children() {
        let (_temp, root) = setup();
        fs::write(root.as_path().join("old.txt"), "old").unwrap();
        fs::create_dir(root.as_path().join("old-dir")).unwrap();
        let target = TargetPath::root();

        let staged = StagedReplacement::begin(&root, &target).unwrap();
        assert!(staged.staging_dir().starts_with(root.as_path()));
        fs::write(staged.staging_dir().join("new.txt"), "new").unwrap();
        let created = staged.commit().unwrap();

        assert_eq!(created, root.as_path());
        assert_eq!(names(root.as_path()), ["new.txt"]);
    }

    #[test]
    fn test_root_target_abort_keeps_children() {
        let (_temp, root) = setup();
        fs::write(root.as_path().join("old.txt"), "old").unwrap();

        let staged = StagedReplacement::begin(&root, &TargetPath::root()).unwrap();
        let _ = staged.abort(IngestError::CorruptArchive("bad".into()));

        assert_eq!(names(root.as_path()), ["old.txt"]);
    }

    /// Renames for real, except the calls whose 1-based index is listed.
    fn failing_rename(fail_on: &'static [usize]) -> impl FnMut(&Path, &Path) -> io::Result<()> {
        let mut calls = 0;
        move |from: &Path, to: &Path| {
            calls += 1;
            if fail_on.contains(&calls) {
                return Err(io::Error::other("injected rename failure"));
            }
            fs::rename(from, to)
        }
    }

    fn site_with_old_content(root: &StorageRoot) -> PathBuf {
        let site = root.as_path().join("site");
        fs::create_dir(&site).unwrap();
        fs::write(site.join("old.txt"), "old").unwrap();
        site
    }

    fn parked(root: &Path) -> Vec<String> {
        names(root)
            .into_iter()
            .filter(|n| n.starts_with(PREVIOUS_PREFIX))
            .collect()
    }

    #[test]
    fn test_long_target_name() {
        let (_temp, root) = setup();
        let leaf = "a".repeat(240);
        let existing = root.as_path().join(&leaf);
        fs::create_dir(&existing).unwrap();
        fs::write(existing.join("old.txt"), "old").unwrap();
        let target = TargetPath::parse(&format!("/{leaf}")).unwrap();

        let staged = StagedReplacement::begin(&root, &target).unwrap();
        assert!(staged.staging_dir().file_name().unwrap().len() < 64);
        fs::write(staged.staging_dir().join("new.txt"), "new").unwrap();
        let created = staged.commit().unwrap();

        assert_eq!(created, existing);
        assert_eq!(names(&existing), ["new.txt"]);
        assert_eq!(names(root.as_path()), [leaf]);
    }

    #[test]
    fn test_failed_swap_keeps_old_content() {
        let (_temp, root) = setup();
        let site = site_with_old_content(&root);

        let staged = StagedReplacement::begin(&root, &TargetPath::parse("/site").unwrap()).unwrap();
        fs::write(staged.staging_dir().join("new.txt"), "new").unwrap();
        // The second rename moves staging into place.
        let err = staged.commit_with(&mut failing_rename(&[2])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(err.previous_content_preserved());
        assert_eq!(names(&site), ["old.txt"]);
        assert_eq!(names(root.as_path()), ["site"]);
    }

    #[test]
    fn test_failed_restore_is_rollback_failed() {
        let (_temp, root) = setup();
        let site = site_with_old_content(&root);

        let staged = StagedReplacement::begin(&root, &TargetPath::parse("/site").unwrap()).unwrap();
        fs::write(staged.staging_dir().join("new.txt"), "new").unwrap();
        let err = staged.commit_with(&mut failing_rename(&[2, 3])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RollbackFailed);
        assert!(!err.previous_content_preserved());
        assert!(matches!(
            &err,
            IngestError::RollbackFailed { original, .. } if original.kind() == ErrorKind::Filesystem
        ));

        // Old content is parked aside, never deleted.
        assert!(!site.exists());
        let parked = parked(root.as_path());
        assert_eq!(parked.len(), 1);
        assert_eq!(
            fs::read_to_string(root.as_path().join(&parked[0]).join("old.txt")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_root_failed_swap_restores_children() {
        let (_temp, root) = setup();
        fs::write(root.as_path().join("old.txt"), "old").unwrap();

        let staged = StagedReplacement::begin(&root, &TargetPath::root()).unwrap();
        fs::write(staged.staging_dir().join("new.txt"), "new").unwrap();
        // Call 1 moves old.txt aside, call 2 moves new.txt in.
        let err = staged.commit_with(&mut failing_rename(&[2])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert_eq!(names(root.as_path()), ["old.txt"]);
    }

    #[test]
    fn test_root_failed_restore_is_rollback_failed() {
        let (_temp, root) = setup();
        fs::write(root.as_path().join("old.txt"), "old").unwrap();

        let staged = StagedReplacement::begin(&root, &TargetPath::root()).unwrap();
        fs::write(staged.staging_dir().join("new.txt"), "new").unwrap();
        // Call 3 moves old.txt back.
        let err = staged.commit_with(&mut failing_rename(&[2, 3])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RollbackFailed);
        assert!(!err.previous_content_preserved());
        assert!(!root.as_path().join("old.txt").exists());
        let parked = parked(root.as_path());
        assert_eq!(parked.len(), 1);
        assert!(root.as_path().join(&parked[0]).join("old.txt").is_file());
    }

    #[test]
    fn test_concurrent_staging_names_disjoint() {
        let (_temp, root) = setup();
        let target = TargetPath::parse("/site").unwrap();

        let first = StagedReplacement::begin(&root, &target).unwrap();
        let second = StagedReplacement::begin(&root, &target).unwrap();
        assert_ne!(first.staging_dir(), second.staging_dir());

        fs::write(first.staging_dir().join("first"), "1").unwrap();
        fs::write(second.staging_dir().join("second"), "2").unwrap();
        first.commit().unwrap();
        second.commit().unwrap();

        // Last commit wins.
        assert_eq!(names(&root.as_path().join("site")), ["second"]);
    }
}
