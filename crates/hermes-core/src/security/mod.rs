//! Security validation modules.

pub mod path;
pub mod quota;
pub mod validator;

pub use path::resolve_contained;
pub use quota::QuotaTracker;
pub use validator::EntryValidator;
pub use validator::ValidatedEntry;
pub use validator::ValidatedEntryType;
