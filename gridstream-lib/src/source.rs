//! The data view pipeline: raw rows, filters, sort and the visible slice.

use std::sync::{Arc, RwLock, Weak};

use log::{debug, trace};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::filter::{Filter, FilterSet, apply_filters};
use crate::model::Lookup;
use crate::sort::{Sort, SortAccessor, order_rows, path_accessor};
use crate::viewport::ListRange;

/// Shared, immutable snapshot of a row sequence.
pub type Rows<T> = Arc<Vec<T>>;

/// Senders for the streams a data source publishes.
struct Streams<T> {
    filtered: watch::Sender<Rows<T>>,
    visible: watch::Sender<Rows<T>>,
}

/// Internal state for the data source.
struct DataSourceInner<T> {
    /// Raw rows, as last assigned.
    all: Rows<T>,
    /// Registered filters.
    filters: FilterSet<T>,
    /// Rows passing every filter, in raw order.
    filtered: Rows<T>,
    /// Current sort.
    sort: Sort,
    /// Filtered rows in sort order.
    ordered: Rows<T>,
    /// Rendered range reported by the viewport; `None` shows every row.
    range: Option<ListRange>,
    /// Ordered rows sliced to the rendered range.
    visible: Rows<T>,
    /// Open streams; `None` once disposed.
    streams: Option<Streams<T>>,
    /// Subscriptions to external change streams.
    tasks: Vec<JoinHandle<()>>,
}

impl<T: Clone> DataSourceInner<T> {
    fn new(rows: Vec<T>) -> Self {
        let all = Arc::new(rows);
        let (filtered_tx, _) = watch::channel(Arc::clone(&all));
        let (visible_tx, _) = watch::channel(Arc::clone(&all));
        Self {
            filtered: Arc::clone(&all),
            ordered: Arc::clone(&all),
            visible: Arc::clone(&all),
            all,
            filters: FilterSet::new(),
            sort: Sort::none(),
            range: None,
            streams: Some(Streams {
                filtered: filtered_tx,
                visible: visible_tx,
            }),
            tasks: Vec::new(),
        }
    }

    fn is_disposed(&self) -> bool {
        self.streams.is_none()
    }

    /// Publishes new filtered rows and re-derives everything downstream.
    fn push_filtered(&mut self, filtered: Vec<T>, accessor: &SortAccessor<T>) {
        self.filtered = Arc::new(filtered);
        if let Some(streams) = &self.streams {
            streams.filtered.send_replace(Arc::clone(&self.filtered));
        }
        self.reorder(accessor);
    }

    fn reorder(&mut self, accessor: &SortAccessor<T>) {
        self.ordered = if self.sort.is_active() {
            Arc::new(order_rows(&self.filtered, &self.sort, accessor))
        } else {
            Arc::clone(&self.filtered)
        };
        self.reslice();
    }

    fn reslice(&mut self) {
        self.visible = match self.range {
            Some(range) => Arc::new(self.ordered[range.clamp(self.ordered.len())].to_vec()),
            None => Arc::clone(&self.ordered),
        };
        trace!(
            "Visible rows recomputed: {} of {} ordered",
            self.visible.len(),
            self.ordered.len()
        );
        if let Some(streams) = &self.streams {
            streams.visible.send_replace(Arc::clone(&self.visible));
        }
    }
}

/// A filtered, sorted, windowed view over a collection of rows.
///
/// `DataSource<T>` owns the raw rows and derives three views from them:
///
/// - **filtered**: rows passing every registered [`Filter`], in raw order
/// - **ordered**: the filtered rows in the current [`Sort`] order
/// - **visible**: the ordered rows sliced to the rendered range
///
/// Each view is recomputed only when one of its inputs changes, and the
/// filtered and visible views are published on `watch` channels that replay
/// the latest value to every new subscriber.
///
/// The handle is cheap to clone; clones share the same state. Filter
/// predicates and sort accessors run while the state is locked and must not
/// call back into the data source.
///
/// # Example
///
/// ```
/// use gridstream_lib::filter::Filter;
/// use gridstream_lib::model::{Record, Value};
/// use gridstream_lib::source::DataSource;
/// use gridstream_lib::sort::Sort;
///
/// let source = DataSource::new(vec![
///     Record::new().set("name", "b").set("age", 30),
///     Record::new().set("name", "a").set("age", 12),
///     Record::new().set("name", "c").set("age", 45),
/// ]);
///
/// source.set_filter(Filter::new("age", |v| v.and_then(Value::as_i64).is_some_and(|a| a >= 18)));
/// source.set_sort(Sort::asc("name"));
///
/// let names: Vec<_> = source
///     .visible()
///     .iter()
///     .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_owned))
///     .collect();
/// assert_eq!(names, ["b", "c"]);
/// ```
pub struct DataSource<T> {
    inner: Arc<RwLock<DataSourceInner<T>>>,
    accessor: SortAccessor<T>,
}

impl<T> DataSource<T>
where
    T: Lookup + Clone + Send + Sync + 'static,
{
    /// Creates a data source that sorts by dot-path lookup.
    ///
    /// `None` is treated as an empty collection.
    pub fn new(rows: impl Into<Option<Vec<T>>>) -> Self {
        Self::with_accessor(rows, path_accessor())
    }
}

impl<T> DataSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a data source with a custom sort value accessor.
    pub fn with_accessor(rows: impl Into<Option<Vec<T>>>, accessor: SortAccessor<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(DataSourceInner::new(
                rows.into().unwrap_or_default(),
            ))),
            accessor,
        }
    }

    // -------------------------------------------------------------------------
    // Raw data
    // -------------------------------------------------------------------------

    /// Returns a copy of the raw rows.
    pub fn data(&self) -> Vec<T> {
        self.inner
            .read()
            .map(|g| g.all.to_vec())
            .unwrap_or_default()
    }

    /// Replaces the raw rows and re-applies every filter.
    ///
    /// `None` is treated as an empty collection.
    pub fn set_data(&self, rows: impl Into<Option<Vec<T>>>) {
        let rows = rows.into().unwrap_or_default();
        if let Ok(mut guard) = self.inner.write() {
            if guard.is_disposed() {
                debug!("Ignoring data on disposed data source");
                return;
            }
            guard.all = Arc::new(rows);
            let filtered = guard.filters.apply(&guard.all);
            guard.push_filtered(filtered, &self.accessor);
        }
    }

    /// Appends rows to the raw rows as they are at the time of the call.
    ///
    /// Only the appended rows are run through the filters; the filtered rows
    /// already published are kept.
    pub fn append(&self, rows: Vec<T>) {
        if let Ok(mut guard) = self.inner.write() {
            if guard.is_disposed() {
                debug!("Ignoring appended rows on disposed data source");
                return;
            }
            let appended = guard.filters.apply(&rows);
            let mut all = guard.all.to_vec();
            all.extend(rows);
            guard.all = Arc::new(all);

            let mut filtered = guard.filtered.to_vec();
            filtered.extend(appended);
            guard.push_filtered(filtered, &self.accessor);
        }
    }

    /// Number of raw rows.
    pub fn len(&self) -> usize {
        self.inner.read().map(|g| g.all.len()).unwrap_or(0)
    }

    /// Returns `true` if there are no raw rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -------------------------------------------------------------------------
    // Filters
    // -------------------------------------------------------------------------

    /// The registered filters, in unspecified order.
    pub fn filters(&self) -> Vec<Filter<T>> {
        self.inner
            .read()
            .map(|g| g.filters.to_vec())
            .unwrap_or_default()
    }

    /// Returns `true` if a filter with this key is registered.
    pub fn has_filter(&self, key: &str) -> bool {
        self.inner
            .read()
            .map(|g| g.filters.contains(key))
            .unwrap_or(false)
    }

    /// Registers a filter, replacing any filter with the same key.
    ///
    /// A new key narrows the already-filtered rows with just the new filter.
    /// Replacing a key re-filters the raw rows through every filter, since the
    /// replaced filter may have removed rows the new one keeps.
    pub fn set_filter(&self, filter: Filter<T>) {
        if let Ok(mut guard) = self.inner.write() {
            if guard.is_disposed() {
                return;
            }
            let replaced = guard.filters.insert(filter.clone()).is_some();
            let filtered = if replaced {
                debug!(
                    "Replacing filter {:?}, re-filtering {} rows",
                    filter.key(),
                    guard.all.len()
                );
                guard.filters.apply(&guard.all)
            } else {
                debug!(
                    "Adding filter {:?} over {} filtered rows",
                    filter.key(),
                    guard.filtered.len()
                );
                apply_filters(&guard.filtered, std::iter::once(&filter))
            };
            guard.push_filtered(filtered, &self.accessor);
        }
    }

    /// Removes the filter with the given key and re-filters the raw rows.
    ///
    /// Returns `false` if no such filter was registered.
    pub fn remove_filter(&self, key: &str) -> bool {
        if let Ok(mut guard) = self.inner.write() {
            if guard.is_disposed() || guard.filters.remove(key).is_none() {
                return false;
            }
            debug!("Removed filter {:?}", key);
            let filtered = guard.filters.apply(&guard.all);
            guard.push_filtered(filtered, &self.accessor);
            return true;
        }
        false
    }

    /// Removes every filter.
    pub fn clear_filters(&self) {
        if let Ok(mut guard) = self.inner.write() {
            if guard.is_disposed() {
                return;
            }
            guard.filters.clear();
            let all = guard.all.to_vec();
            guard.push_filtered(all, &self.accessor);
        }
    }

    // -------------------------------------------------------------------------
    // Sort and range inputs
    // -------------------------------------------------------------------------

    /// The current sort.
    pub fn sort(&self) -> Sort {
        self.inner
            .read()
            .map(|g| g.sort.clone())
            .unwrap_or_default()
    }

    /// Sets the sort. Re-orders only if the sort actually changed.
    pub fn set_sort(&self, sort: Sort) {
        if let Ok(mut guard) = self.inner.write() {
            if guard.is_disposed() || guard.sort == sort {
                return;
            }
            debug!("Sort changed to {:?}", sort);
            guard.sort = sort;
            guard.reorder(&self.accessor);
        }
    }

    /// The rendered range the visible rows are sliced to.
    pub fn rendered_range(&self) -> Option<ListRange> {
        self.inner.read().ok().and_then(|g| g.range)
    }

    /// Sets the rendered range. `None` makes every ordered row visible.
    pub fn set_rendered_range(&self, range: Option<ListRange>) {
        if let Ok(mut guard) = self.inner.write() {
            if guard.is_disposed() || guard.range == range {
                return;
            }
            guard.range = range;
            guard.reslice();
        }
    }

    /// Follows an external sort control.
    ///
    /// Applies the control's current value immediately, then every change on
    /// a spawned task until the control closes or the source is disposed.
    /// Must be called within a tokio runtime.
    pub fn bind_sort(&self, mut sort: watch::Receiver<Sort>) {
        self.set_sort(sort.borrow_and_update().clone());
        let weak = self.downgrade();
        self.track(tokio::spawn(async move {
            while sort.changed().await.is_ok() {
                let Some(source) = weak.upgrade() else { break };
                source.set_sort(sort.borrow_and_update().clone());
            }
        }));
    }

    /// Follows the rendered range published by a viewport.
    ///
    /// Must be called within a tokio runtime.
    pub fn bind_rendered_range(&self, mut range: watch::Receiver<ListRange>) {
        self.set_rendered_range(Some(*range.borrow_and_update()));
        let weak = self.downgrade();
        self.track(tokio::spawn(async move {
            while range.changed().await.is_ok() {
                let Some(source) = weak.upgrade() else { break };
                let next = *range.borrow_and_update();
                source.set_rendered_range(Some(next));
            }
        }));
    }

    fn track(&self, handle: JoinHandle<()>) {
        match self.inner.write() {
            Ok(mut guard) if !guard.is_disposed() => guard.tasks.push(handle),
            _ => handle.abort(),
        }
    }

    fn downgrade(&self) -> WeakDataSource<T> {
        WeakDataSource {
            inner: Arc::downgrade(&self.inner),
            accessor: Arc::clone(&self.accessor),
        }
    }

    // -------------------------------------------------------------------------
    // Derived views
    // -------------------------------------------------------------------------

    /// Rows passing every filter, in raw order.
    pub fn filtered(&self) -> Rows<T> {
        self.inner
            .read()
            .map(|g| Arc::clone(&g.filtered))
            .unwrap_or_default()
    }

    /// Number of rows passing every filter.
    pub fn filtered_len(&self) -> usize {
        self.inner.read().map(|g| g.filtered.len()).unwrap_or(0)
    }

    /// Filtered rows in sort order.
    pub fn ordered(&self) -> Rows<T> {
        self.inner
            .read()
            .map(|g| Arc::clone(&g.ordered))
            .unwrap_or_default()
    }

    /// Ordered rows sliced to the rendered range.
    pub fn visible(&self) -> Rows<T> {
        self.inner
            .read()
            .map(|g| Arc::clone(&g.visible))
            .unwrap_or_default()
    }

    /// Subscribes to the filtered rows.
    ///
    /// The receiver starts with the current value and sees every filter or
    /// data change after it.
    pub fn filtered_data(&self) -> Result<watch::Receiver<Rows<T>>> {
        self.inner
            .read()
            .ok()
            .and_then(|g| g.streams.as_ref().map(|s| s.filtered.subscribe()))
            .ok_or(Error::Disposed)
    }

    /// Subscribes to the visible rows.
    ///
    /// Every subscriber shares the cached latest value; subscribing never
    /// triggers a recomputation.
    pub fn visible_data(&self) -> Result<watch::Receiver<Rows<T>>> {
        self.inner
            .read()
            .ok()
            .and_then(|g| g.streams.as_ref().map(|s| s.visible.subscribe()))
            .ok_or(Error::Disposed)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Closes every stream and stops following external inputs.
    ///
    /// Subscribers observe the close on their next `changed()`. Later input
    /// is ignored and later subscriptions fail with [`Error::Disposed`].
    pub fn dispose(&self) {
        if let Ok(mut guard) = self.inner.write() {
            for task in guard.tasks.drain(..) {
                task.abort();
            }
            if guard.streams.take().is_some() {
                debug!("Data source disposed");
            }
        }
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.read().map(|g| g.is_disposed()).unwrap_or(true)
    }
}

impl<T> Clone for DataSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<T> std::fmt::Debug for DataSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (rows, filtered, filters) = self
            .inner
            .read()
            .map(|g| (g.all.len(), g.filtered.len(), g.filters.len()))
            .unwrap_or_default();
        f.debug_struct("DataSource")
            .field("rows", &rows)
            .field("filtered", &filtered)
            .field("filters", &filters)
            .finish_non_exhaustive()
    }
}

/// Non-owning handle held by subscription tasks.
struct WeakDataSource<T> {
    inner: Weak<RwLock<DataSourceInner<T>>>,
    accessor: SortAccessor<T>,
}

impl<T> WeakDataSource<T> {
    fn upgrade(&self) -> Option<DataSource<T>> {
        self.inner.upgrade().map(|inner| DataSource {
            inner,
            accessor: Arc::clone(&self.accessor),
        })
    }
}
