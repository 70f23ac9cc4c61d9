//! Windowing engine: which rows to materialize for a scroll position.

mod strategy;
mod window;

pub use strategy::*;
pub use window::*;
