//! Observable loader state.

use crate::error::FetchError;

/// The state of the incremental loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    /// No fetch in flight.
    #[default]
    Idle,
    /// A fetch for `page` is in flight.
    Pending {
        /// Page being fetched.
        page: usize,
    },
    /// The last fetch failed. Loaded rows are untouched.
    Failed(FetchError),
}

impl LoadState {
    /// Check if no fetch is in flight and the last one succeeded
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Check if a fetch is in flight
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Check if the last fetch failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Get the page being fetched
    pub fn pending_page(&self) -> Option<usize> {
        match self {
            Self::Pending { page } => Some(*page),
            _ => None,
        }
    }

    /// Get the error if present
    pub fn as_error(&self) -> Option<&FetchError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}
