//! Page-fetch error type

use thiserror::Error;

/// Failure reported by a [`PageFetcher`](crate::loader::PageFetcher).
///
/// The loader stores the last failure in its observable state, so the error
/// is cloneable and carries only a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("page fetch failed: {message}")]
pub struct FetchError {
    /// Error message
    pub message: String,
}

impl FetchError {
    /// Create a new fetch error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for FetchError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
