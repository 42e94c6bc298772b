// Telemetry is a submodule of query
pub mod telemetry;

// Submodules for separation of concerns
mod bulk;
mod cursor;
mod eval;
mod exec;
mod expr;
mod parse;
mod types;
mod update;

pub use bulk::{bulk_write, parse_write_models};
pub use cursor::Cursor;
pub use eval::{compare_docs, eval_filter, project_document};
pub use exec::{
    count_docs, delete_many, delete_one, find_docs, find_one, find_one_and_replace,
    find_one_and_update, insert_many, insert_one, update_many, update_one,
};
pub use expr::{eval_expr, eval_expr_bool};
pub(crate) use expr::parse_expr;
pub use parse::{
    FindOptionsSerde, parse_filter, parse_filter_json, parse_filter_with, parse_find_options,
    parse_find_options_json, parse_update, parse_update_json, parse_update_with,
    validate_replacement,
};
pub(crate) use parse::{parse_projection, parse_sort};
pub use types::{
    BulkWriteReport, CmpOp, DeleteReport, Expr, Filter, FindOneAndModifyOptions, FindOptions,
    Order, Projection, PullCond, ReturnDocument, SortSpec, UpdateDoc, UpdateOp, UpdateReport,
    ValueSet, WriteModel,
};
pub use update::apply_update;
