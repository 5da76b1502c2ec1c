//! Type-safe wrappers for ingestion inputs.
//!
//! This module provides newtypes that enforce validation at the type level.
//! All types are validated upon construction and cannot be created from raw
//! types without going through validation.
//!
//! # Design Principles
//!
//! - Type-driven security: Invalid states cannot be represented
//! - No `From<RawType>` implementations for security types
//! - All constructors perform validation

pub mod entry_type;
pub mod safe_path;
pub mod storage_root;
pub mod target_path;

pub use entry_type::EntryKind;
pub use safe_path::SafePath;
pub use storage_root::StorageRoot;
pub use target_path::PREVIOUS_PREFIX;
pub use target_path::STAGING_PREFIX;
pub use target_path::TargetPath;
pub use target_path::is_scratch_name;
