//! Sort settings and stable row ordering.

use std::sync::Arc;

use crate::model::{Lookup, Value, compare_keys, resolve_path};

/// Sort direction for ordering rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending order (A-Z, 0-9).
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

/// The active sort, as reported by a sort control.
///
/// A sort applies only when both `active` and `direction` are set; otherwise
/// rows keep the order they arrived in.
///
/// # Example
///
/// ```
/// use gridstream_lib::sort::{Direction, Sort};
///
/// let by_name = Sort::asc("name");
/// let by_city = Sort::new("owner.city", Direction::Desc);
/// assert!(by_name.is_active());
/// assert!(!Sort::none().is_active());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sort {
    /// Key (dot path) of the sorted column.
    pub active: Option<String>,
    /// Direction, or `None` when the control is cleared.
    pub direction: Option<Direction>,
}

impl Sort {
    /// Creates a sort on `key` in the given direction.
    pub fn new(key: impl Into<String>, direction: Direction) -> Self {
        Self {
            active: Some(key.into()),
            direction: Some(direction),
        }
    }

    /// Creates an ascending sort on `key`.
    pub fn asc(key: impl Into<String>) -> Self {
        Self::new(key, Direction::Asc)
    }

    /// Creates a descending sort on `key`.
    pub fn desc(key: impl Into<String>) -> Self {
        Self::new(key, Direction::Desc)
    }

    /// No sort: rows pass through unchanged.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns the key and direction when both are set.
    pub fn applied(&self) -> Option<(&str, Direction)> {
        match (&self.active, self.direction) {
            (Some(key), Some(direction)) if !key.is_empty() => Some((key, direction)),
            _ => None,
        }
    }

    /// Returns `true` if this sort reorders rows.
    pub fn is_active(&self) -> bool {
        self.applied().is_some()
    }
}

/// Extracts the sort value for `key` from a row.
pub type SortAccessor<T> = Arc<dyn Fn(&T, &str) -> Option<Value> + Send + Sync>;

/// The default accessor: dot-path resolution through [`Lookup`].
pub fn path_accessor<T: Lookup + 'static>() -> SortAccessor<T> {
    Arc::new(|row: &T, key: &str| resolve_path(row, key).cloned())
}

/// Orders rows by the active sort.
///
/// The sort is stable in both directions: rows with equal keys keep their
/// relative input order. Each row's key is extracted exactly once. When the
/// sort is inactive the input order is returned unchanged.
pub fn order_rows<T: Clone>(rows: &[T], sort: &Sort, accessor: &SortAccessor<T>) -> Vec<T> {
    let Some((key, direction)) = sort.applied() else {
        return rows.to_vec();
    };

    let keys: Vec<Option<Value>> = rows.iter().map(|row| accessor(row, key)).collect();
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    indices.sort_by(|&a, &b| {
        let ord = compare_keys(keys[a].as_ref(), keys[b].as_ref());
        match direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    });

    indices.into_iter().map(|i| rows[i].clone()).collect()
}
