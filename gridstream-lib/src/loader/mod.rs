//! Incremental page loading driven by the materialized range.

mod fetcher;
mod state;

pub use fetcher::*;
pub use state::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::source::DataSource;
use crate::viewport::ListRange;

/// Appends pages to a [`DataSource`] as the rendered range nears its end.
///
/// The loader watches the materialized range. Whenever
/// `range.end + buffer` exceeds the number of loaded rows it fetches the next
/// page and appends it to the source's raw rows.
///
/// At most one fetch is in flight. Range updates that arrive during a fetch
/// are collapsed: once the fetch resolves, the loader evaluates the latest
/// range once more and issues at most one follow-up fetch. A failed fetch
/// leaves the loaded rows untouched, records [`LoadState::Failed`] and
/// releases the gate for the next trigger.
///
/// A fetch is never cancelled. If the loader is stopped while a fetch is in
/// flight, the fetch completes and its rows are discarded.
///
/// # Example
///
/// ```ignore
/// let loader = Loader::new(source.clone(), fetcher_fn(fetch), LoaderConfig::default());
/// let handle = loader.spawn(strategy.rendered_range_stream()?);
/// // ...
/// loader.stop();
/// handle.await?;
/// ```
pub struct Loader<T> {
    source: DataSource<T>,
    fetcher: Arc<dyn PageFetcher<T>>,
    config: LoaderConfig,
    state: Arc<watch::Sender<LoadState>>,
    stop: Arc<watch::Sender<bool>>,
    requested: Arc<AtomicUsize>,
}

impl<T> Loader<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a loader appending to `source`.
    pub fn new(
        source: DataSource<T>,
        fetcher: impl PageFetcher<T> + 'static,
        config: LoaderConfig,
    ) -> Self {
        Self::with_shared_fetcher(source, Arc::new(fetcher), config)
    }

    /// Creates a loader from an already shared fetcher.
    pub fn with_shared_fetcher(
        source: DataSource<T>,
        fetcher: Arc<dyn PageFetcher<T>>,
        config: LoaderConfig,
    ) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);
        let (stop, _) = watch::channel(false);
        Self {
            source,
            fetcher,
            config,
            state: Arc::new(state),
            stop: Arc::new(stop),
            requested: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Returns `true` while a fetch is in flight.
    pub fn is_pending(&self) -> bool {
        self.state.borrow().is_pending()
    }

    /// Subscribes to state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    /// Number of fetches issued so far.
    pub fn pages_requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }

    /// Stops loading. A fetch in flight completes and is discarded.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// The page to fetch for a range ending at `end`, if one is needed.
    pub fn next_page(&self, end: usize) -> Option<usize> {
        let loaded = self.source.len();
        (end.saturating_add(self.config.buffer) > loaded)
            .then(|| self.config.paging.page_for(loaded, self.config.page_size))
    }

    /// Follows `ranges` until it closes or the loader is stopped.
    ///
    /// The current range is evaluated immediately.
    pub async fn run(&self, mut ranges: watch::Receiver<ListRange>) {
        let mut stop = self.stop.subscribe();
        let mut end = ranges.borrow_and_update().end;

        loop {
            if self.is_stopped() {
                break;
            }

            if let Some(page) = self.next_page(end) {
                if let Err(e) = self.fetch(page).await {
                    warn!("Loading page {} failed: {}", page, e);
                }
                // Triggers seen during the fetch collapse into one follow-up
                if ranges.has_changed().unwrap_or(false) {
                    end = ranges.borrow_and_update().end;
                    continue;
                }
            }

            tokio::select! {
                changed = ranges.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = stop.changed() => break,
            }
            end = ranges.borrow_and_update().end;
        }
        debug!("Loader stopped after {} page requests", self.pages_requested());
    }

    /// Runs [`run`](Self::run) on a spawned task.
    pub fn spawn(&self, ranges: watch::Receiver<ListRange>) -> JoinHandle<()> {
        let loader = self.clone();
        tokio::spawn(async move { loader.run(ranges).await })
    }

    /// Fetches `page` and appends it, returning the number of rows appended.
    async fn fetch(&self, page: usize) -> Result<usize> {
        self.requested.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(LoadState::Pending { page });
        debug!("Requesting page {} ({} rows)", page, self.config.page_size);

        let result = self.fetcher.fetch_page(page, self.config.page_size).await;

        if self.is_stopped() {
            debug!("Discarding page {} fetched after stop", page);
            self.state.send_replace(LoadState::Idle);
            return Ok(0);
        }

        match result {
            Ok(rows) => {
                let count = rows.len();
                self.source.append(rows);
                self.state.send_replace(LoadState::Idle);
                debug!("Appended {} rows from page {}", count, page);
                Ok(count)
            }
            Err(e) => {
                self.state.send_replace(LoadState::Failed(e.clone()));
                Err(Error::Fetch(e))
            }
        }
    }
}

impl<T> Clone for Loader<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            fetcher: Arc::clone(&self.fetcher),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            stop: Arc::clone(&self.stop),
            requested: Arc::clone(&self.requested),
        }
    }
}

impl<T> std::fmt::Debug for Loader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .field("requested", &self.requested.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
