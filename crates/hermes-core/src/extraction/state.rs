//! Per-request lifecycle.

use std::fmt;

use crate::formats::ArchiveFormat;

/// Where a request is in the ingestion pipeline.
///
/// ```text
/// Received -> Sniffed -> Validating -> Staging -> Committed
///     \__________\___________\____________\_____-> RolledBack
/// ```
///
/// `Committed` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Request accepted, nothing inspected yet.
    Received,
    /// Format determined.
    Sniffed(ArchiveFormat),
    /// Entries being checked against path rules and limits.
    Validating,
    /// Entries being written into the staging directory.
    Staging,
    /// New content swapped into place.
    Committed,
    /// Request failed; the target is as it was.
    RolledBack,
}

impl RequestState {
    /// Returns `true` for `Committed` and `RolledBack`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }

    /// Moves to `next` if the transition is legal.
    ///
    /// Returns `false`, leaving the state unchanged, otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use hermes_core::extraction::RequestState;
    /// use hermes_core::formats::ArchiveFormat;
    ///
    /// let mut state = RequestState::Received;
    /// assert!(state.advance(RequestState::Sniffed(ArchiveFormat::Zip)));
    /// assert!(state.advance(RequestState::RolledBack));
    /// assert!(!state.advance(RequestState::Validating));
    /// ```
    pub fn advance(&mut self, next: Self) -> bool {
        let legal = match (*self, next) {
            (current, _) if current.is_terminal() => false,
            (_, Self::RolledBack)
            | (Self::Received, Self::Sniffed(_))
            | (Self::Sniffed(_), Self::Validating)
            | (Self::Validating, Self::Staging)
            | (Self::Staging, Self::Committed) => true,
            _ => false,
        };
        if legal {
            *self = next;
        }
        legal
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::Sniffed(format) => write!(f, "sniffed ({format})"),
            Self::Validating => f.write_str("validating"),
            Self::Staging => f.write_str("staging"),
            Self::Committed => f.write_str("committed"),
            Self::RolledBack => f.write_str("rolled back"),
        }
    }
}
