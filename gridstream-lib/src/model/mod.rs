//! Row model: dynamic values, records and path lookup.

mod path;
mod record;
mod value;

pub use path::*;
pub use record::*;
pub use value::*;
