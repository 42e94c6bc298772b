use bson::{Bson, Document as BsonDocument};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::accumulator::AccState;
use super::types::{GroupStage, Pipeline, Stage, UnwindStage};
use crate::collection::Collection;
use crate::document::{as_f64, get_path, set_path_mut};
use crate::errors::DbError;
use crate::query::{compare_docs, eval_expr, eval_filter, project_document, telemetry};
use crate::types::ID_FIELD;
use crate::utils::devlog::bench_line;
use crate::utils::num::{elapsed_ms, usize_to_u64};

/// Runs `pipeline` over `docs`, stage by stage.
///
/// # Errors
/// Returns `MalformedPipeline` if a stage cannot be applied to the stream.
pub fn run_pipeline(docs: Vec<BsonDocument>, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
    let mut docs = docs;
    for stage in &pipeline.stages {
        let before = docs.len();
        docs = run_stage(docs, stage)?;
        log::trace!("{}: {before} -> {} document(s)", stage.name(), docs.len());
    }
    Ok(docs)
}

fn run_stage(docs: Vec<BsonDocument>, stage: &Stage) -> Result<Vec<BsonDocument>, DbError> {
    Ok(match stage {
        Stage::Unwind(u) => unwind(docs, u)?,
        Stage::Match(f) => docs.into_iter().filter(|d| eval_filter(d, f)).collect(),
        Stage::Group(g) => group(&docs, g),
        Stage::Sort(spec) => {
            let mut docs = docs;
            docs.sort_by(|a, b| compare_docs(a, b, spec));
            docs
        }
        Stage::Project(p) => docs.iter().map(|d| project_document(d, p)).collect(),
        Stage::Limit(n) => docs.into_iter().take(*n).collect(),
        Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
        Stage::Count(name) => {
            if docs.is_empty() {
                Vec::new()
            } else {
                let n = i32::try_from(docs.len())
                    .map_or_else(|_| Bson::Int64(i64::try_from(docs.len()).unwrap_or(i64::MAX)), Bson::Int32);
                let mut out = BsonDocument::new();
                out.insert(name.clone(), n);
                vec![out]
            }
        }
    })
}

fn unwind(docs: Vec<BsonDocument>, stage: &UnwindStage) -> Result<Vec<BsonDocument>, DbError> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        let items = match get_path(&doc, &stage.path) {
            Some(Bson::Array(items)) if !items.is_empty() => items.clone(),
            Some(Bson::Array(_) | Bson::Null) | None => {
                if stage.preserve_null_and_empty {
                    out.push(doc);
                }
                continue;
            }
            // a scalar unwinds to itself
            Some(_) => {
                out.push(doc);
                continue;
            }
        };
        for item in items {
            let mut d = doc.clone();
            set_path_mut(&mut d, &stage.path, item)
                .map_err(|e| DbError::MalformedPipeline(format!("$unwind: {e}")))?;
            out.push(d);
        }
    }
    Ok(out)
}

const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

// Group keys that are equal under value semantics (e.g. 1 and 1.0) share a fingerprint.
fn fingerprint(v: &Bson) -> String {
    fn normalize(v: &Bson) -> Bson {
        match v {
            Bson::Int32(i) => Bson::Int64(i64::from(*i)),
            Bson::Double(_) | Bson::Decimal128(_) => match as_f64(v) {
                // every integral double in [-2^63, 2^63) converts to i64 exactly
                #[allow(clippy::cast_possible_truncation)]
                Some(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f) => {
                    Bson::Int64(f as i64)
                }
                Some(f) => Bson::Double(f),
                None => v.clone(),
            },
            Bson::Array(items) => Bson::Array(items.iter().map(normalize).collect()),
            Bson::Document(d) => {
                Bson::Document(d.iter().map(|(k, v)| (k.clone(), normalize(v))).collect())
            }
            other => other.clone(),
        }
    }
    format!("{:?}", normalize(v))
}

fn group(docs: &[BsonDocument], stage: &GroupStage) -> Vec<BsonDocument> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Bson, Vec<AccState>)> = Vec::new();
    for doc in docs {
        let key = eval_expr(doc, &stage.key).unwrap_or(Bson::Null);
        let slot = *index.entry(fingerprint(&key)).or_insert_with(|| {
            groups.push((key, stage.accumulators.iter().map(|(_, a)| AccState::new(a)).collect()));
            groups.len() - 1
        });
        for (state, (_, acc)) in groups[slot].1.iter_mut().zip(&stage.accumulators) {
            state.update(acc, doc);
        }
    }
    groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = BsonDocument::new();
            out.insert(ID_FIELD, key);
            for (state, (name, _)) in states.into_iter().zip(&stage.accumulators) {
                out.insert(name.clone(), state.finish());
            }
            out
        })
        .collect()
}

/// Runs `pipeline` over a snapshot of the collection taken under its read lock.
///
/// # Errors
/// See [`run_pipeline`].
pub fn aggregate(col: &Arc<Collection>, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
    let start = Instant::now();
    let name = col.name_str();
    let input: Vec<BsonDocument> = col.read().iter().map(|d| d.data.clone()).collect();
    let out = run_pipeline(input, pipeline).inspect_err(|e| telemetry::log_error(&name, "aggregate", e))?;
    let ms = elapsed_ms(start);
    crate::dev6!(
        "{}",
        bench_line(
            "aggregate",
            &name,
            ms,
            &[
                ("stages", serde_json::json!(usize_to_u64(pipeline.stages.len()))),
                ("result_count", serde_json::json!(usize_to_u64(out.len()))),
            ],
        )
    );
    telemetry::log_query(&name, "aggregate", ms, out.len());
    log::debug!("aggregate on {name}: {} stage(s), {} result(s) in {ms}ms", pipeline.stages.len(), out.len());
    Ok(out)
}
