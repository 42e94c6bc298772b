//! Collections: an ordered, identifier-unique sequence of documents behind a lock.

mod core;
mod ops;

pub use self::core::Collection;
pub(crate) use ops::insert_into;
