//! The render surface as seen by the windowing engine.

use std::ops::Range;

/// Half-open index range of materialized rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListRange {
    /// First materialized index.
    pub start: usize,
    /// One past the last materialized index.
    pub end: usize,
}

impl ListRange {
    /// Creates a range, swapping the bounds if they are reversed.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Number of indices in the range.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Clamps the range to a collection of `len` items.
    pub fn clamp(&self, len: usize) -> Range<usize> {
        let end = self.end.min(len);
        self.start.min(end)..end
    }
}

impl From<Range<usize>> for ListRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<ListRange> for Range<usize> {
    fn from(range: ListRange) -> Self {
        range.start..range.end
    }
}

/// Motion hint for programmatic scrolls, passed to the viewport unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScrollBehavior {
    /// Let the viewport decide.
    #[default]
    Auto,
    /// Jump without animation.
    Instant,
    /// Animate the scroll.
    Smooth,
}

/// Events the viewport delivers to the windowing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    /// The content was scrolled.
    Scrolled,
    /// The viewport was resized.
    Resized,
}

/// A scrollable render surface.
///
/// Implemented by the host's scroll container. All measurements are in
/// pixels along the scroll axis.
pub trait Viewport: Send {
    /// Current scroll offset.
    fn measure_scroll_offset(&self) -> f64;

    /// Size of the visible area.
    fn viewport_size(&self) -> f64;

    /// Sets the total scrollable content size.
    fn set_total_content_size(&mut self, size: f64);

    /// Sets the rows to materialize.
    fn set_rendered_range(&mut self, range: ListRange);

    /// Sets the offset at which the first materialized row is drawn.
    fn set_rendered_content_offset(&mut self, offset: f64);

    /// Scrolls to an absolute offset.
    fn scroll_to_offset(&mut self, offset: f64, behavior: ScrollBehavior);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_shorter_collection() {
        assert_eq!(ListRange::new(15, 35).clamp(20), 15..20);
        assert_eq!(ListRange::new(15, 35).clamp(10), 10..10);
        assert_eq!(ListRange::new(0, 15).clamp(100), 0..15);
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        let range = ListRange::new(9, 3);
        assert_eq!((range.start, range.end), (3, 9));
        assert_eq!(range.len(), 6);
    }

    #[test]
    fn test_inverted_literal_is_empty() {
        let range = ListRange { start: 9, end: 3 };
        assert_eq!(range.len(), 0);
        assert!(range.is_empty());
        assert_eq!(range.clamp(20), 3..3);
    }
}
