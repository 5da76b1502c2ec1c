//! Archive format detection and entry sources.

pub mod detect;
pub mod reader;
pub mod sevenz;
pub mod tar;
pub mod traits;
pub mod zip;

pub use detect::ArchiveFormat;
pub use detect::sniff;
pub use detect::sniff_magic;
pub use reader::ArchiveReader;
pub use traits::ArchiveEntry;
pub use traits::EntryHeader;
pub use traits::EntrySource;
