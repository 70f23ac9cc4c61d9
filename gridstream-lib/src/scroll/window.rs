//! Window arithmetic for uniform-height rows.

use crate::viewport::ListRange;

/// The rows to materialize for one scroll position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Materialized index range.
    pub range: ListRange,
    /// Index of the row at the scroll offset.
    pub center_index: usize,
    /// Pixel offset at which `range.start` is drawn.
    pub content_offset: f64,
}

/// Computes the materialized window.
///
/// The row at `offset` is the center; `buffer` extra rows are materialized
/// on each side of the visible rows, clamped to `[0, data_length)`. When the
/// offset lies past the end of the data the range collapses to an empty
/// range at `data_length`.
///
/// `item_height` must be positive.
pub fn compute_window(
    offset: f64,
    viewport_size: f64,
    item_height: f64,
    buffer: usize,
    data_length: usize,
) -> Window {
    let amount_visible = (viewport_size.max(0.0) / item_height).ceil() as usize;
    let center_index = (offset / item_height).round().max(0.0) as usize;

    let end = center_index
        .saturating_add(amount_visible)
        .saturating_add(buffer)
        .min(data_length);
    let start = center_index.saturating_sub(buffer).min(end);

    Window {
        range: ListRange { start, end },
        center_index,
        content_offset: item_height * start as f64,
    }
}

/// Total scrollable size: every row plus the header offset.
pub fn content_size(data_length: usize, item_height: f64, header_offset: f64) -> f64 {
    data_length as f64 * item_height + header_offset
}
