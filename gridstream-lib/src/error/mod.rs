//! Error types

mod fetch;

pub use fetch::*;

/// Errors surfaced by the data view, the windowing engine and the loader.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The data view was disposed and its streams are closed.
    #[error("data source has been disposed")]
    Disposed,

    /// The operation needs an attached viewport.
    #[error("no viewport attached")]
    Detached,

    /// The page-fetch capability failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
