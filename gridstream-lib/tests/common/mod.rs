//! Shared test doubles.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gridstream_lib::viewport::{ListRange, ScrollBehavior, Viewport};

/// Everything the strategy told the viewport, plus its simulated geometry.
#[derive(Debug, Default)]
pub struct ViewportLog {
    pub offset: f64,
    pub size: f64,
    pub content_size: Option<f64>,
    pub content_sizes: Vec<f64>,
    pub range: Option<ListRange>,
    pub content_offset: Option<f64>,
    pub scrolls: Vec<(f64, ScrollBehavior)>,
}

/// A viewport that records every call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingViewport {
    pub log: Arc<Mutex<ViewportLog>>,
}

impl RecordingViewport {
    pub fn new(size: f64) -> Self {
        let viewport = Self::default();
        viewport.log.lock().unwrap().size = size;
        viewport
    }

    /// Simulates the user scrolling to `offset`.
    pub fn scroll_by_user(&self, offset: f64) {
        self.log.lock().unwrap().offset = offset;
    }

    pub fn resize(&self, size: f64) {
        self.log.lock().unwrap().size = size;
    }

    pub fn offset(&self) -> f64 {
        self.log.lock().unwrap().offset
    }

    pub fn range(&self) -> Option<ListRange> {
        self.log.lock().unwrap().range
    }

    pub fn content_size(&self) -> Option<f64> {
        self.log.lock().unwrap().content_size
    }

    pub fn content_offset(&self) -> Option<f64> {
        self.log.lock().unwrap().content_offset
    }

    pub fn scrolls(&self) -> Vec<(f64, ScrollBehavior)> {
        self.log.lock().unwrap().scrolls.clone()
    }
}

impl Viewport for RecordingViewport {
    fn measure_scroll_offset(&self) -> f64 {
        self.log.lock().unwrap().offset
    }

    fn viewport_size(&self) -> f64 {
        self.log.lock().unwrap().size
    }

    fn set_total_content_size(&mut self, size: f64) {
        let mut log = self.log.lock().unwrap();
        log.content_size = Some(size);
        log.content_sizes.push(size);
    }

    fn set_rendered_range(&mut self, range: ListRange) {
        self.log.lock().unwrap().range = Some(range);
    }

    fn set_rendered_content_offset(&mut self, offset: f64) {
        self.log.lock().unwrap().content_offset = Some(offset);
    }

    fn scroll_to_offset(&mut self, offset: f64, behavior: ScrollBehavior) {
        let mut log = self.log.lock().unwrap();
        log.offset = offset;
        log.scrolls.push((offset, behavior));
    }
}

/// A row height the test can change mid-session.
#[derive(Debug, Clone)]
pub struct Height(Arc<Mutex<f64>>);

impl Height {
    pub fn new(height: f64) -> Self {
        Self(Arc::new(Mutex::new(height)))
    }

    pub fn set(&self, height: f64) {
        *self.0.lock().unwrap() = height;
    }

    pub fn get(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}

/// Yields to spawned tasks until `cond` holds, failing after a few seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
