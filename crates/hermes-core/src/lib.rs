//! Safe archive ingestion.
//!
//! `hermes-core` takes an uploaded archive (tar.gz, zip or 7z) and a target
//! path under a storage root, and replaces whatever the target held with the
//! archive's contents. Entries that would land outside the target, links,
//! device files and oversized payloads are rejected. Until the last entry is
//! written the old content is untouched; on any failure it stays exactly as
//! it was.
//!
//! # Examples
//!
//! ```no_run
//! use hermes_core::ArchiveRequest;
//! use hermes_core::IngestConfig;
//! use hermes_core::Ingestor;
//! use hermes_core::types::TargetPath;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ingestor = Ingestor::new(IngestConfig::new("/srv/hermes")?);
//! let request = ArchiveRequest::from_file(
//!     TargetPath::parse("/deployments/v1")?,
//!     std::path::Path::new("upload.tar.gz"),
//!     None,
//! )?;
//! let result = ingestor.ingest(request)?;
//! println!("{}", serde_json::to_string(&result.response())?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod report;
pub mod request;
pub mod security;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use api::detect_file;
pub use api::ingest_bytes;
pub use api::ingest_file;
pub use config::IngestConfig;
pub use config::Limits;
pub use error::ErrorKind;
pub use error::IngestError;
pub use error::QuotaResource;
pub use error::Result;
pub use extraction::Ingestor;
pub use formats::ArchiveFormat;
pub use report::ErrorResponse;
pub use report::ExtractionResult;
pub use report::IngestObserver;
pub use report::NoopObserver;
pub use request::ArchiveRequest;
pub use types::StorageRoot;
pub use types::TargetPath;
