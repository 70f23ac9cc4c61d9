//! Field lookup and dot-path resolution.

use super::Record;
use super::Value;

/// Single-segment field access on a row or a nested value.
///
/// Implement this for application row types to make them addressable by the
/// default filter and sort extractors. Types without named fields return
/// `None` for every key.
pub trait Lookup {
    /// Returns the value stored under `key`, if any.
    fn lookup(&self, key: &str) -> Option<&Value>;
}

impl Lookup for Record {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl Lookup for Value {
    fn lookup(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(record) => record.get(key),
            Value::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

impl<T: Lookup + ?Sized> Lookup for &T {
    fn lookup(&self, key: &str) -> Option<&Value> {
        (**self).lookup(key)
    }
}

impl<T: Lookup + ?Sized> Lookup for std::sync::Arc<T> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        (**self).lookup(key)
    }
}

/// Resolves a dot-separated path such as `"a.b.c"` against a row.
///
/// Each segment is looked up on the result of the previous one; the walk
/// stops with `None` as soon as a segment is missing.
///
/// # Example
///
/// ```
/// use gridstream_lib::model::{resolve_path, Record, Value};
///
/// let row = Record::new().set("a", Record::new().set("b", Record::new().set("c", 5)));
/// assert_eq!(resolve_path(&row, "a.b.c"), Some(&Value::Int(5)));
/// assert_eq!(resolve_path(&row, "a.x.c"), None);
/// ```
pub fn resolve_path<'a, T: Lookup + ?Sized>(row: &'a T, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(row.lookup(first)?, |value, segment| value.lookup(segment))
}
