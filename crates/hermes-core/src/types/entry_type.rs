//! Archive entry kind enumeration.

use std::fmt;

const S_IFMT: u32 = 0o170_000;
const S_IFREG: u32 = 0o100_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFIFO: u32 = 0o010_000;
const S_IFSOCK: u32 = 0o140_000;

/// Kind of an entry inside an archive, normalized across formats.
///
/// Only [`EntryKind::File`] and [`EntryKind::Directory`] are ever
/// materialized. The remaining variants exist so that every format reports
/// what it actually found, and the validator can reject it by name.
///
/// # Examples
///
/// ```
/// use hermes_core::types::EntryKind;
///
/// let link = EntryKind::Symlink {
///     target: "../../etc".into(),
/// };
/// assert!(!link.is_materializable());
/// assert_eq!(link.to_string(), "symlink -> ../../etc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file.
    File,

    /// Directory.
    Directory,

    /// Symbolic link. The target has NOT been validated.
    Symlink {
        /// Raw link target as stored in the archive.
        target: String,
    },

    /// Hard link. The target has NOT been validated.
    Hardlink {
        /// Raw link target as stored in the archive.
        target: String,
    },

    /// Device node, FIFO, socket, or anything else.
    Special(&'static str),
}

impl EntryKind {
    /// Returns `true` if this is a regular file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns `true` if this is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` for the kinds the engine writes to disk.
    #[must_use]
    pub const fn is_materializable(&self) -> bool {
        matches!(self, Self::File | Self::Directory)
    }

    /// Classifies the file type bits of a Unix `st_mode`, as stored by zip
    /// and 7z archives written on Unix.
    ///
    /// Returns `None` for regular files, directories and an empty type field,
    /// leaving the decision to the format's own directory flag. A symlink's
    /// target is not part of the mode, so it is returned empty for the caller
    /// to fill in.
    ///
    /// # Examples
    ///
    /// ```
    /// use hermes_core::types::EntryKind;
    ///
    /// assert_eq!(EntryKind::from_unix_mode(0o010_644), Some(EntryKind::Special("fifo")));
    /// assert_eq!(EntryKind::from_unix_mode(0o100_644), None);
    /// ```
    #[must_use]
    pub fn from_unix_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG | S_IFDIR | 0 => None,
            S_IFLNK => Some(Self::Symlink {
                target: String::new(),
            }),
            S_IFCHR => Some(Self::Special("character device")),
            S_IFBLK => Some(Self::Special("block device")),
            S_IFIFO => Some(Self::Special("fifo")),
            S_IFSOCK => Some(Self::Special("socket")),
            _ => Some(Self::Special("unknown unix file type")),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
            Self::Symlink { target } => write!(f, "symlink -> {target}"),
            Self::Hardlink { target } => write!(f, "hardlink -> {target}"),
            Self::Special(what) => f.write_str(what),
        }
    }
}
