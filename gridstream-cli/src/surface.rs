//! In-memory render surface.

use std::sync::{Arc, Mutex};

use gridstream_lib::viewport::{ListRange, ScrollBehavior, Viewport};

#[derive(Debug, Default)]
struct Surface {
    offset: f64,
    size: f64,
    content_size: f64,
    range: ListRange,
    content_offset: f64,
}

/// A viewport with no pixels. Clones share the same surface.
#[derive(Debug, Clone, Default)]
pub struct MemoryViewport {
    surface: Arc<Mutex<Surface>>,
}

impl MemoryViewport {
    pub fn new(size: f64) -> Self {
        let viewport = Self::default();
        if let Ok(mut surface) = viewport.surface.lock() {
            surface.size = size;
        }
        viewport
    }

    /// Moves the scroll position the way a user drag would, clamped to the content.
    pub fn drag_to(&self, offset: f64) {
        if let Ok(mut surface) = self.surface.lock() {
            let max = (surface.content_size - surface.size).max(0.0);
            surface.offset = offset.clamp(0.0, max);
        }
    }

    pub fn offset(&self) -> f64 {
        self.surface.lock().map(|s| s.offset).unwrap_or(0.0)
    }

    pub fn size(&self) -> f64 {
        self.surface.lock().map(|s| s.size).unwrap_or(0.0)
    }

    pub fn content_size(&self) -> f64 {
        self.surface.lock().map(|s| s.content_size).unwrap_or(0.0)
    }

    pub fn range(&self) -> ListRange {
        self.surface.lock().map(|s| s.range).unwrap_or_default()
    }

    pub fn content_offset(&self) -> f64 {
        self.surface.lock().map(|s| s.content_offset).unwrap_or(0.0)
    }
}

impl Viewport for MemoryViewport {
    fn measure_scroll_offset(&self) -> f64 {
        self.offset()
    }

    fn viewport_size(&self) -> f64 {
        self.size()
    }

    fn set_total_content_size(&mut self, size: f64) {
        if let Ok(mut surface) = self.surface.lock() {
            surface.content_size = size;
        }
    }

    fn set_rendered_range(&mut self, range: ListRange) {
        if let Ok(mut surface) = self.surface.lock() {
            surface.range = range;
        }
    }

    fn set_rendered_content_offset(&mut self, offset: f64) {
        if let Ok(mut surface) = self.surface.lock() {
            surface.content_offset = offset;
        }
    }

    fn scroll_to_offset(&mut self, offset: f64, _behavior: ScrollBehavior) {
        self.drag_to(offset);
    }
}
