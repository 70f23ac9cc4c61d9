//! Integration tests for the incremental loader.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::wait_until;
use gridstream_lib::config::{LoaderConfig, PageIndexing};
use gridstream_lib::error::FetchError;
use gridstream_lib::filter::Filter;
use gridstream_lib::loader::{LoadState, Loader, PageFetcher, fetcher_fn};
use gridstream_lib::model::Value;
use gridstream_lib::source::DataSource;
use gridstream_lib::viewport::ListRange;
use tokio::sync::{Semaphore, watch};

/// A fetcher that holds every request until the test releases it.
struct GatedFetcher {
    gate: Semaphore,
    pages: Mutex<Vec<usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_next: AtomicBool,
}

impl GatedFetcher {
    fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            pages: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }

    fn pages(&self) -> Vec<usize> {
        self.pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher<Value> for GatedFetcher {
    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<Vec<Value>, FetchError> {
        self.pages.lock().unwrap().push(page);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(FetchError::new("backend unavailable"));
        }
        let first = page * page_size;
        Ok((first..first + page_size).map(Value::from).collect())
    }
}

/// A source seeded with one placeholder row, a gated fetcher and its loader.
fn setup(config: LoaderConfig) -> (DataSource<Value>, Arc<GatedFetcher>, Loader<Value>) {
    let source = DataSource::new(vec![Value::Null]);
    let fetcher = Arc::new(GatedFetcher::new());
    let loader = Loader::with_shared_fetcher(source.clone(), fetcher.clone(), config);
    (source, fetcher, loader)
}

// =============================================================================
// Trigger
// =============================================================================

#[test]
fn test_next_page_trigger() {
    let (source, _, loader) = setup(LoaderConfig::default());
    assert_eq!(loader.next_page(0), Some(0));

    source.set_data((0..51).map(Value::from).collect::<Vec<_>>());
    assert_eq!(loader.next_page(40), None);
    assert_eq!(loader.next_page(46), None);
    assert_eq!(loader.next_page(47), Some(1));
    assert_eq!(loader.next_page(usize::MAX), Some(1));
}

#[test]
fn test_next_page_indexing() {
    let source = DataSource::new((0..50).map(Value::from).collect::<Vec<_>>());
    let fetcher = Arc::new(GatedFetcher::new());

    let last_row =
        Loader::with_shared_fetcher(source.clone(), fetcher.clone(), LoaderConfig::default());
    assert_eq!(last_row.next_page(50), Some(0));

    let next_page = Loader::with_shared_fetcher(
        source,
        fetcher,
        LoaderConfig::default().with_paging(PageIndexing::NextPage),
    );
    assert_eq!(next_page.next_page(50), Some(1));
}

// =============================================================================
// Fetch discipline
// =============================================================================

#[tokio::test]
async fn test_single_fetch_in_flight() {
    let (source, fetcher, loader) = setup(LoaderConfig::default());
    let (ranges, rx) = watch::channel(ListRange::new(0, 10));
    let handle = loader.spawn(rx);

    wait_until(|| loader.is_pending()).await;
    assert_eq!(loader.state(), LoadState::Pending { page: 0 });

    ranges.send_replace(ListRange::new(0, 12));
    ranges.send_replace(ListRange::new(0, 14));
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(fetcher.pages(), vec![0]);

    fetcher.release();
    wait_until(|| loader.state().is_idle()).await;
    assert_eq!(source.len(), 51);
    assert_eq!(loader.pages_requested(), 1);
    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);

    loader.stop();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_triggers_during_fetch_collapse_into_one_follow_up() {
    let (source, fetcher, loader) = setup(LoaderConfig::default());
    let (ranges, rx) = watch::channel(ListRange::new(0, 10));
    let handle = loader.spawn(rx);
    wait_until(|| loader.is_pending()).await;

    for end in [30, 40, 48] {
        ranges.send_replace(ListRange::new(end - 10, end));
        tokio::task::yield_now().await;
    }
    fetcher.release();

    wait_until(|| loader.state().pending_page() == Some(1)).await;
    assert_eq!(fetcher.pages(), vec![0, 1]);

    fetcher.release();
    wait_until(|| source.len() == 101).await;
    wait_until(|| loader.state().is_idle()).await;
    assert_eq!(loader.pages_requested(), 2);
    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);

    loader.stop();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_failure_keeps_rows_and_releases_gate() {
    let (source, fetcher, loader) = setup(LoaderConfig::default());
    fetcher.fail_next.store(true, Ordering::SeqCst);
    let (ranges, rx) = watch::channel(ListRange::new(0, 10));
    let handle = loader.spawn(rx);

    wait_until(|| loader.is_pending()).await;
    fetcher.release();
    wait_until(|| loader.state().is_failed()).await;
    assert_eq!(source.len(), 1);
    assert_eq!(
        loader.state().as_error().map(|e| e.message.clone()),
        Some("backend unavailable".to_string())
    );

    ranges.send_replace(ListRange::new(0, 11));
    wait_until(|| loader.is_pending()).await;
    fetcher.release();
    wait_until(|| source.len() == 51).await;
    assert_eq!(fetcher.pages(), vec![0, 0]);

    loader.stop();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_append_uses_rows_current_at_completion() {
    let (source, fetcher, loader) = setup(LoaderConfig::default().with_page_size(2));
    let (_ranges, rx) = watch::channel(ListRange::new(0, 1));
    let handle = loader.spawn(rx);
    wait_until(|| loader.is_pending()).await;

    source.set_data(vec![Value::from("x"), Value::from("y")]);
    fetcher.release();
    wait_until(|| loader.state().is_idle()).await;

    assert_eq!(
        source.data(),
        vec![Value::from("x"), Value::from("y"), Value::from(0), Value::from(1)]
    );

    loader.stop();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_appended_page_passes_through_filters() {
    let (source, fetcher, loader) = setup(LoaderConfig::default());
    source.set_filter(Filter::with_value_fn(
        "even",
        |v| v.and_then(Value::as_i64).is_some_and(|n| n % 2 == 0),
        |row: &Value| Some(row.clone()),
    ));
    let mut filtered = source.filtered_data().unwrap();
    let (_ranges, rx) = watch::channel(ListRange::new(0, 10));
    let handle = loader.spawn(rx);

    fetcher.release();
    filtered.changed().await.unwrap();
    assert_eq!(filtered.borrow_and_update().len(), 25);
    assert_eq!(source.len(), 51);

    loader.stop();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_stop_discards_fetch_in_flight() {
    let (source, fetcher, loader) = setup(LoaderConfig::default());
    let (_ranges, rx) = watch::channel(ListRange::new(0, 10));
    let handle = loader.spawn(rx);
    wait_until(|| loader.is_pending()).await;

    loader.stop();
    assert!(loader.is_stopped());
    fetcher.release();
    handle.await.unwrap();

    assert_eq!(source.len(), 1);
    assert!(loader.state().is_idle());
    assert_eq!(loader.pages_requested(), 1);
}

#[tokio::test]
async fn test_loader_ends_when_ranges_close() {
    let source = DataSource::new((0..100).map(Value::from).collect::<Vec<_>>());
    let fetcher = fetcher_fn(|_page: usize, _size: usize| async {
        Ok::<Vec<Value>, FetchError>(Vec::new())
    });
    let loader = Loader::new(source, fetcher, LoaderConfig::default());
    let (ranges, rx) = watch::channel(ListRange::new(0, 10));
    let handle = loader.spawn(rx);

    drop(ranges);
    handle.await.unwrap();
    assert_eq!(loader.pages_requested(), 0);
}

#[tokio::test]
async fn test_state_subscription() {
    let (_, fetcher, loader) = setup(LoaderConfig::default());
    let mut states = loader.subscribe_state();
    let (_ranges, rx) = watch::channel(ListRange::new(0, 10));
    let handle = loader.spawn(rx);

    states.changed().await.unwrap();
    assert_eq!(*states.borrow_and_update(), LoadState::Pending { page: 0 });

    fetcher.release();
    states.changed().await.unwrap();
    assert!(states.borrow_and_update().is_idle());

    loader.stop();
    handle.await.unwrap();
}
