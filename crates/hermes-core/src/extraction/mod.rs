//! Materializing archives into the storage root.
//!
//! [`Ingestor`] drives one request through sniffing, validation, staging and
//! commit. [`StagedReplacement`] owns the on-disk side of that: the scratch
//! directory, the swap and the rollback.

mod engine;
mod materialize;
mod staging;
mod state;

pub use engine::Ingestor;
pub use materialize::DirCache;
pub use materialize::Materializer;
pub use staging::StagedReplacement;
pub use state::RequestState;
