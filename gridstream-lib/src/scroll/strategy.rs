//! Virtual-scroll strategy for uniform-height rows.

use std::sync::{Arc, Mutex, Weak};

use log::{debug, trace};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::{ReanchorMode, ScrollConfig};
use crate::error::{Error, Result};
use crate::viewport::{ListRange, ScrollBehavior, Viewport, ViewportEvent};

use super::window::{compute_window, content_size};

/// A live pixel measurement supplied by the host (row height, header offset).
pub type Measure = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Capacity of the scrolled-index broadcast channel.
const INDEX_CHANNEL_CAPACITY: usize = 64;

/// Offset drift, in pixels, that counts as the viewport having moved.
const OFFSET_TOLERANCE: f64 = 0.5;

/// Internal state for the scroll strategy.
struct StrategyInner {
    config: ScrollConfig,
    row_height: Measure,
    header_offset: Measure,
    /// Bound viewport; `None` while detached.
    viewport: Option<Box<dyn Viewport>>,
    /// Length of the data being scrolled.
    data_length: usize,
    /// Scroll offset measured by the last update.
    offset: f64,
    /// Row height used by the last update.
    prev_height: Option<f64>,
    /// Content size last reported to the viewport.
    reported_size: Option<f64>,
    /// Range last computed.
    range: ListRange,
    /// Center index last emitted.
    index: Option<usize>,
    /// Fractional index awaiting the second half of a two-phase re-anchor.
    pending_correction: Option<f64>,
    /// Open streams; `None` once detached.
    index_tx: Option<broadcast::Sender<usize>>,
    range_tx: Option<watch::Sender<ListRange>>,
    /// Event listener and data-length subscriptions.
    tasks: Vec<JoinHandle<()>>,
}

impl StrategyInner {
    fn row_height(&self) -> f64 {
        let height = (self.row_height)();
        if height.is_finite() && height > 0.0 {
            height
        } else {
            self.config.default_row_height
        }
    }

    fn header_offset(&self) -> f64 {
        let offset = (self.header_offset)();
        if offset.is_finite() && offset >= 0.0 {
            offset
        } else {
            self.config.default_header_offset
        }
    }

    /// Reports the total content size if it changed.
    fn on_data_length_changed(&mut self) {
        let size = content_size(self.data_length, self.row_height(), self.header_offset());
        let Some(viewport) = self.viewport.as_deref_mut() else {
            return;
        };
        if self.reported_size != Some(size) {
            trace!("Total content size {}", size);
            viewport.set_total_content_size(size);
            self.reported_size = Some(size);
        }
    }

    fn scroll_to_fractional(&mut self, index: f64, behavior: ScrollBehavior) {
        let height = self.row_height();
        if let Some(viewport) = self.viewport.as_deref_mut() {
            viewport.scroll_to_offset(index * height, behavior);
        }
    }

    /// Keeps the row at the top of the viewport in place across a height change.
    fn reanchor(&mut self, prev_height: f64, height: f64) {
        let skip = self.offset / prev_height;
        debug!(
            "Row height changed {} -> {}, re-anchoring at index {:.2}",
            prev_height, height, skip
        );
        self.on_data_length_changed();
        self.scroll_to_fractional(skip, ScrollBehavior::Auto);
        if self.config.reanchor == ReanchorMode::TwoPhase {
            self.pending_correction = Some(skip);
        }
    }

    /// Drops a pending correction once the viewport has moved since the last update.
    fn discard_stale_correction(&mut self) {
        if self.pending_correction.is_none() {
            return;
        }
        let Some(viewport) = self.viewport.as_deref() else {
            return;
        };
        let measured = viewport.measure_scroll_offset();
        if (measured - self.offset).abs() > OFFSET_TOLERANCE {
            debug!(
                "Viewport moved to {} before the re-anchor settled, dropping correction",
                measured
            );
            self.pending_correction = None;
        }
    }

    /// Recomputes the window for the current scroll position.
    fn update_content(&mut self) {
        if self.viewport.is_none() {
            return;
        }
        self.discard_stale_correction();

        let height = self.row_height();
        if let Some(prev_height) = self.prev_height
            && prev_height != height
        {
            self.reanchor(prev_height, height);
        }
        self.prev_height = Some(height);

        let Some(viewport) = self.viewport.as_deref_mut() else {
            return;
        };
        self.offset = viewport.measure_scroll_offset();
        let window = compute_window(
            self.offset,
            viewport.viewport_size(),
            height,
            self.config.buffer,
            self.data_length,
        );
        trace!(
            "Window {:?} at offset {} (center {})",
            window.range, self.offset, window.center_index
        );

        viewport.set_rendered_range(window.range);
        viewport.set_rendered_content_offset(window.content_offset);
        self.range = window.range;

        if self.index != Some(window.center_index) {
            self.index = Some(window.center_index);
            if let Some(tx) = &self.index_tx {
                // No receivers is fine
                let _ = tx.send(window.center_index);
            }
        }
        if let Some(tx) = &self.range_tx {
            tx.send_if_modified(|range| {
                if *range == window.range {
                    return false;
                }
                *range = window.range;
                true
            });
        }
    }

    fn settle(&mut self) {
        self.discard_stale_correction();
        if let Some(skip) = self.pending_correction.take() {
            trace!("Settling re-anchor at index {:.2}", skip);
            self.scroll_to_fractional(skip, ScrollBehavior::Auto);
            self.update_content();
        }
    }
}

/// Virtual-scroll strategy for rows of uniform (but changeable) height.
///
/// Given the scroll offset, viewport size, row height and data length, the
/// strategy tells the [`Viewport`] which rows to materialize, where to draw
/// them, and how large the scrollable content is. When the row height
/// changes it scrolls so that the same row stays at the top of the viewport.
///
/// The strategy is inert until a viewport is attached; every recomputation
/// requested before that is a no-op. `ScrollStrategy` is a cheap handle;
/// clones share the same state.
///
/// The row-height and header-offset accessors run while the state is locked
/// and must not call back into the strategy.
///
/// # Example
///
/// ```ignore
/// let strategy = ScrollStrategy::new(|| 20.0, || 0.0, ScrollConfig::default().with_buffer(5));
/// strategy.attach(viewport);
/// strategy.set_data_length(1000);
///
/// let mut ranges = strategy.rendered_range_stream()?;
/// strategy.on_content_scrolled();
/// ```
#[derive(Clone)]
pub struct ScrollStrategy {
    inner: Arc<Mutex<StrategyInner>>,
}

impl ScrollStrategy {
    /// Creates a strategy reading row height and header offset on demand.
    ///
    /// Non-positive or non-finite heights fall back to
    /// [`ScrollConfig::default_row_height`]; negative or non-finite header
    /// offsets to [`ScrollConfig::default_header_offset`].
    pub fn new<H, O>(row_height: H, header_offset: O, config: ScrollConfig) -> Self
    where
        H: Fn() -> f64 + Send + Sync + 'static,
        O: Fn() -> f64 + Send + Sync + 'static,
    {
        let (index_tx, _) = broadcast::channel(INDEX_CHANNEL_CAPACITY);
        let (range_tx, _) = watch::channel(ListRange::default());
        Self {
            inner: Arc::new(Mutex::new(StrategyInner {
                config,
                row_height: Arc::new(row_height),
                header_offset: Arc::new(header_offset),
                viewport: None,
                data_length: 0,
                offset: 0.0,
                prev_height: None,
                reported_size: None,
                range: ListRange::default(),
                index: None,
                pending_correction: None,
                index_tx: Some(index_tx),
                range_tx: Some(range_tx),
                tasks: Vec::new(),
            })),
        }
    }

    /// Creates a strategy using the configured default row height and header offset.
    pub fn with_config(config: ScrollConfig) -> Self {
        let height = config.default_row_height;
        let header = config.default_header_offset;
        Self::new(move || height, move || header, config)
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut StrategyInner) -> R) -> Option<R> {
        self.inner.lock().ok().map(|mut guard| f(&mut guard))
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Binds a viewport and computes the initial window.
    pub fn attach(&self, viewport: impl Viewport + 'static) {
        self.with_inner(|inner| {
            debug!("Viewport attached");
            inner.viewport = Some(Box::new(viewport));
            inner.reported_size = None;
            inner.on_data_length_changed();
            inner.update_content();
        });
        self.schedule_settle();
    }

    /// Releases the viewport, stops event listeners and closes every stream.
    ///
    /// Streams stay closed; a later [`attach`](Self::attach) lays out rows
    /// again but publishes nothing.
    pub fn detach(&self) {
        self.with_inner(|inner| {
            for task in inner.tasks.drain(..) {
                task.abort();
            }
            inner.viewport = None;
            inner.pending_correction = None;
            inner.index_tx = None;
            inner.range_tx = None;
            debug!("Viewport detached");
        });
    }

    /// Returns `true` while a viewport is attached.
    pub fn is_attached(&self) -> bool {
        self.with_inner(|inner| inner.viewport.is_some()).unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Handles a scroll event.
    pub fn on_content_scrolled(&self) {
        self.with_inner(|inner| inner.update_content());
        self.schedule_settle();
    }

    /// Handles a resize event.
    pub fn on_resized(&self) {
        self.with_inner(|inner| {
            inner.on_data_length_changed();
            inner.update_content();
        });
        self.schedule_settle();
    }

    /// Sets the number of rows being scrolled.
    pub fn set_data_length(&self, length: usize) {
        self.with_inner(|inner| {
            inner.data_length = length;
            inner.on_data_length_changed();
            inner.update_content();
        });
        self.schedule_settle();
    }

    /// Reports the content size for the current data length, row height and header.
    pub fn on_data_length_changed(&self) {
        self.with_inner(|inner| inner.on_data_length_changed());
    }

    /// Restores the viewport to the last measured offset.
    pub fn on_rendered_offset_changed(&self) {
        self.with_inner(|inner| {
            let offset = inner.offset;
            if let Some(viewport) = inner.viewport.as_deref_mut() {
                viewport.scroll_to_offset(offset, ScrollBehavior::Auto);
            }
        });
    }

    /// Scrolls so that row `index` is at the top of the viewport.
    pub fn scroll_to_index(&self, index: usize, behavior: ScrollBehavior) -> Result<()> {
        self.with_inner(|inner| {
            if inner.viewport.is_none() {
                return Err(Error::Detached);
            }
            inner.scroll_to_fractional(index as f64, behavior);
            Ok(())
        })
        .unwrap_or(Err(Error::Detached))
    }

    /// Applies the deferred half of a two-phase re-anchor.
    ///
    /// Inside a tokio runtime this runs by itself after the re-anchoring call
    /// yields; without one, call it after the render surface has laid out the
    /// new row height. Does nothing when no correction is pending, and drops
    /// the correction if the viewport has scrolled since the re-anchor.
    pub fn settle(&self) {
        self.with_inner(|inner| inner.settle());
    }

    /// Returns `true` if a two-phase re-anchor awaits [`settle`](Self::settle).
    pub fn has_pending_correction(&self) -> bool {
        self.with_inner(|inner| inner.pending_correction.is_some()).unwrap_or(false)
    }

    /// Settles a pending re-anchor on the runtime once the caller yields.
    fn schedule_settle(&self) {
        if !self.has_pending_correction() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let weak = self.downgrade();
        self.track(runtime.spawn(async move {
            tokio::task::yield_now().await;
            if let Some(strategy) = upgrade(&weak) {
                strategy.settle();
            }
        }));
    }

    /// Follows viewport events on a spawned task until the sender closes or
    /// the strategy is detached.
    ///
    /// Runs one resize pass on start. Must be called within a tokio runtime.
    pub fn listen(&self, mut events: mpsc::Receiver<ViewportEvent>) {
        let weak = self.downgrade();
        self.track(tokio::spawn(async move {
            if let Some(strategy) = upgrade(&weak) {
                strategy.on_resized();
            }
            while let Some(event) = events.recv().await {
                let Some(strategy) = upgrade(&weak) else { break };
                match event {
                    ViewportEvent::Scrolled => strategy.on_content_scrolled(),
                    ViewportEvent::Resized => strategy.on_resized(),
                }
            }
        }));
    }

    /// Follows the length of a row stream, typically a data source's
    /// filtered rows.
    ///
    /// Must be called within a tokio runtime.
    pub fn bind_data_length<T>(&self, mut rows: watch::Receiver<Arc<Vec<T>>>)
    where
        T: Send + Sync + 'static,
    {
        self.set_data_length(rows.borrow_and_update().len());
        let weak = self.downgrade();
        self.track(tokio::spawn(async move {
            while rows.changed().await.is_ok() {
                let Some(strategy) = upgrade(&weak) else { break };
                let length = rows.borrow_and_update().len();
                strategy.set_data_length(length);
            }
        }));
    }

    fn track(&self, handle: JoinHandle<()>) {
        match self.inner.lock() {
            Ok(mut guard) if guard.index_tx.is_some() => {
                guard.tasks.retain(|task| !task.is_finished());
                guard.tasks.push(handle);
            }
            _ => handle.abort(),
        }
    }

    fn downgrade(&self) -> Weak<Mutex<StrategyInner>> {
        Arc::downgrade(&self.inner)
    }

    // -------------------------------------------------------------------------
    // Outputs
    // -------------------------------------------------------------------------

    /// Subscribes to the materialized range.
    ///
    /// Publishes only when the range changes. Fails once detached.
    pub fn rendered_range_stream(&self) -> Result<watch::Receiver<ListRange>> {
        self.with_inner(|inner| inner.range_tx.as_ref().map(watch::Sender::subscribe))
            .flatten()
            .ok_or(Error::Detached)
    }

    /// Subscribes to the index of the row at the scroll offset.
    ///
    /// Emits only when the index changes. Fails once detached.
    pub fn scrolled_index_change(&self) -> Result<broadcast::Receiver<usize>> {
        self.with_inner(|inner| inner.index_tx.as_ref().map(broadcast::Sender::subscribe))
            .flatten()
            .ok_or(Error::Detached)
    }

    /// The materialized range last computed.
    pub fn rendered_range(&self) -> ListRange {
        self.with_inner(|inner| inner.range).unwrap_or_default()
    }

    /// The index of the row at the scroll offset, once computed.
    pub fn scrolled_index(&self) -> Option<usize> {
        self.with_inner(|inner| inner.index).flatten()
    }

    /// The scroll offset measured by the last update.
    pub fn measured_offset(&self) -> f64 {
        self.with_inner(|inner| inner.offset).unwrap_or(0.0)
    }

    /// The current row height (after fallback).
    pub fn item_height(&self) -> f64 {
        self.with_inner(|inner| inner.row_height())
            .unwrap_or(ScrollConfig::default().default_row_height)
    }

    /// The number of rows being scrolled.
    pub fn data_length(&self) -> usize {
        self.with_inner(|inner| inner.data_length).unwrap_or(0)
    }

    /// The buffer size in rows.
    pub fn buffer(&self) -> usize {
        self.with_inner(|inner| inner.config.buffer).unwrap_or(0)
    }
}

impl std::fmt::Debug for ScrollStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollStrategy")
            .field("attached", &self.is_attached())
            .field("data_length", &self.data_length())
            .field("range", &self.rendered_range())
            .finish_non_exhaustive()
    }
}

fn upgrade(weak: &Weak<Mutex<StrategyInner>>) -> Option<ScrollStrategy> {
    weak.upgrade().map(|inner| ScrollStrategy { inner })
}
