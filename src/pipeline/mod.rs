//! Aggregation pipelines: `$unwind`, `$match`, `$group`, `$sort`, `$project`, `$limit`,
//! `$skip` and `$count` over a document stream.

mod accumulator;
mod exec;
mod parse;
mod types;

pub use exec::{aggregate, run_pipeline};
pub use parse::{parse_pipeline, parse_pipeline_json, parse_pipeline_with};
pub use types::{Accumulator, GroupStage, Pipeline, Stage, UnwindStage};
