//! Named row filters and their conjunctive application.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::model::{Lookup, Value, resolve_path};

/// Extracts the value a filter tests from a row.
pub type ValueFn<T> = Arc<dyn Fn(&T) -> Option<Value> + Send + Sync>;

/// Tests an extracted value. Receives `None` when the value is absent.
pub type Predicate = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// A named predicate over rows.
///
/// The `key` identifies the filter in the registry (setting a filter with an
/// existing key replaces it) and, for [`Filter::new`], doubles as the dot
/// path the value is read from.
///
/// # Example
///
/// ```
/// use gridstream_lib::filter::Filter;
/// use gridstream_lib::model::{Record, Value};
///
/// // Keep rows whose `owner.city` is "Oslo"
/// let filter = Filter::<Record>::new("owner.city", |v| v.and_then(Value::as_str) == Some("Oslo"));
///
/// // Custom extractor, for rows without named fields
/// let odd = Filter::<i64>::with_value_fn(
///     "odd",
///     |v| v.and_then(Value::as_i64).is_some_and(|n| n % 2 == 1),
///     |n| Some(Value::Int(*n)),
/// );
/// ```
pub struct Filter<T> {
    key: String,
    predicate: Predicate,
    value_fn: ValueFn<T>,
}

impl<T: Lookup + 'static> Filter<T> {
    /// Creates a filter reading its value from the dot path `key`.
    pub fn new<P>(key: impl Into<String>, predicate: P) -> Self
    where
        P: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        let key = key.into();
        let path = key.clone();
        Self {
            key,
            predicate: Arc::new(predicate),
            value_fn: Arc::new(move |row: &T| resolve_path(row, &path).cloned()),
        }
    }
}

impl<T> Filter<T> {
    /// Creates a filter with a custom value extractor.
    pub fn with_value_fn<P, F>(key: impl Into<String>, predicate: P, value_fn: F) -> Self
    where
        P: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
        F: Fn(&T) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            predicate: Arc::new(predicate),
            value_fn: Arc::new(value_fn),
        }
    }

    /// The registry key of this filter.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` if the row passes this filter.
    pub fn matches(&self, row: &T) -> bool {
        let value = (self.value_fn)(row);
        (self.predicate)(value.as_ref())
    }
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            predicate: Arc::clone(&self.predicate),
            value_fn: Arc::clone(&self.value_fn),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("key", &self.key).finish_non_exhaustive()
    }
}

/// Filters keyed by name, applied as a conjunction.
///
/// Iteration order of the underlying map is irrelevant: a row is kept only if
/// every filter accepts it. An empty set accepts every row.
#[derive(Debug)]
pub struct FilterSet<T> {
    filters: HashMap<String, Filter<T>>,
}

impl<T> Default for FilterSet<T> {
    fn default() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }
}

impl<T> Clone for FilterSet<T> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
        }
    }
}

impl<T> FilterSet<T> {
    /// Creates an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a filter, returning the one it replaced.
    pub fn insert(&mut self, filter: Filter<T>) -> Option<Filter<T>> {
        self.filters.insert(filter.key.clone(), filter)
    }

    /// Removes the filter with the given key.
    pub fn remove(&mut self, key: &str) -> Option<Filter<T>> {
        self.filters.remove(key)
    }

    /// Removes every filter.
    pub fn clear(&mut self) {
        self.filters.clear();
    }

    /// Returns `true` if a filter with this key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.filters.contains_key(key)
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filter is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// The registered filters, in unspecified order.
    pub fn to_vec(&self) -> Vec<Filter<T>> {
        self.filters.values().cloned().collect()
    }

    /// Returns `true` if the row passes every filter.
    pub fn matches(&self, row: &T) -> bool {
        self.filters.values().all(|filter| filter.matches(row))
    }
}

impl<T: Clone> FilterSet<T> {
    /// Keeps the rows that pass every filter, preserving their order.
    pub fn apply(&self, rows: &[T]) -> Vec<T> {
        apply_filters(rows, self.filters.values())
    }
}

/// Keeps the rows that pass every filter in `filters`, preserving order.
pub fn apply_filters<'a, T, I>(rows: &[T], filters: I) -> Vec<T>
where
    T: Clone + 'a,
    I: IntoIterator<Item = &'a Filter<T>>,
    I::IntoIter: Clone,
{
    let filters = filters.into_iter();
    rows.iter()
        .filter(|row| filters.clone().all(|filter| filter.matches(row)))
        .cloned()
        .collect()
}
