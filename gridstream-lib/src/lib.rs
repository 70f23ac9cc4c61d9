//! Virtualized table data pipeline
//!
//! Keeps only a window of rows materialized while supporting live filtering,
//! sorting and paged loading:
//!
//! - [`source::DataSource`] combines raw rows, filters and sort into an
//!   ordered view and slices it to the rendered range.
//! - [`scroll::ScrollStrategy`] turns scroll offset, row height and data
//!   length into the range to materialize and keeps the viewport anchored
//!   when the row height changes.
//! - [`loader::Loader`] appends pages as the rendered range nears the end of
//!   the loaded rows, with at most one fetch in flight.
//!
//! The render surface, sort control and page fetcher are supplied by the
//! host through [`viewport::Viewport`], a `watch` channel of
//! [`sort::Sort`], and [`loader::PageFetcher`].

pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod scroll;
pub mod sort;
pub mod source;
pub mod viewport;

pub use config::{LoaderConfig, ScrollConfig};
pub use error::{Error, FetchError, Result};
pub use filter::Filter;
pub use loader::{LoadState, Loader, PageFetcher};
pub use model::{Lookup, Record, Value};
pub use scroll::ScrollStrategy;
pub use sort::{Direction, Sort};
pub use source::DataSource;
pub use viewport::{ListRange, ScrollBehavior, Viewport, ViewportEvent};
