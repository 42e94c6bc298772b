//! Document model: ordered BSON documents with identity, path navigation and value semantics.

mod core;
mod path;
mod types;
mod value;

pub use self::core::Document;
pub use path::{MAX_PATH_DEPTH, get_path, get_path_values, set_path, unset_path};
pub(crate) use path::{set_path_mut, unset_path_mut};
pub use types::Metadata;
pub use value::{
    add_numbers, as_f64, compare_values, is_numeric, is_truthy, sort_cmp, type_rank, values_equal,
};
