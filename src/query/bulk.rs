//! Ordered bulk writes.
//!
//! Operations run in order against a working copy of the collection, so a later operation sees
//! the effects of earlier ones. The copy replaces the collection only when every operation
//! succeeded; the collection's write lock is held throughout.

use crate::collection::Collection;
use crate::config::QueryConfig;
use crate::document::Document;
use crate::errors::DbError;
use crate::utils::devlog::bench_line;
use crate::utils::num::{elapsed_ms, usize_to_u64};
use bson::{Bson, Document as BsonDocument};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use super::exec::{delete_in, insert_docs_in, replace_at, select_one, update_in};
use super::parse::{parse_filter_with, parse_update_with, validate_replacement};
use super::telemetry;
use super::types::{BulkWriteReport, UpdateDoc, WriteModel};

fn apply_model(
    state: &mut Vec<Document>,
    model: WriteModel,
    report: &mut BulkWriteReport,
    touched: &mut Vec<String>,
) -> Result<(), DbError> {
    match model {
        WriteModel::InsertOne { document } => {
            let ids = insert_docs_in(state, vec![document])?;
            touched.extend(ids.iter().map(ToString::to_string));
            report.inserted_ids.extend(ids);
        }
        WriteModel::UpdateOne { filter, update } => {
            let (r, ids) = update_in(state, &filter, &update, false)?;
            report.matched += r.matched;
            report.modified += r.modified;
            touched.extend(ids);
        }
        WriteModel::UpdateMany { filter, update } => {
            let (r, ids) = update_in(state, &filter, &update, true)?;
            report.matched += r.matched;
            report.modified += r.modified;
            touched.extend(ids);
        }
        WriteModel::ReplaceOne { filter, replacement } => {
            if let Some(idx) = select_one(state, &filter, &[]) {
                report.matched += 1;
                if replace_at(state, idx, &replacement)? {
                    report.modified += 1;
                    touched.push(state[idx].id().to_string());
                }
            }
        }
        WriteModel::DeleteOne { filter } => {
            let removed = delete_in(state, &filter, false);
            report.deleted += usize_to_u64(removed.len());
            touched.extend(removed);
        }
        WriteModel::DeleteMany { filter } => {
            let removed = delete_in(state, &filter, true);
            report.deleted += usize_to_u64(removed.len());
            touched.extend(removed);
        }
    }
    Ok(())
}

/// Runs `models` in order as one unit: either all of them take effect or none do.
///
/// # Errors
/// Returns the first failing operation's error; the collection is left unchanged.
pub fn bulk_write(col: &Arc<Collection>, models: Vec<WriteModel>) -> Result<BulkWriteReport, DbError> {
    let start = Instant::now();
    let name = col.name_str();
    let total = models.len();
    let mut report = BulkWriteReport::default();
    let mut touched = Vec::new();
    {
        let mut docs = col.write();
        let mut work = docs.clone();
        for (i, model) in models.into_iter().enumerate() {
            if let Err(e) = apply_model(&mut work, model, &mut report, &mut touched) {
                log::debug!("bulk_write on {name}: operation {i} of {total} failed, nothing committed");
                telemetry::log_error(&name, "bulk_write", &e);
                return Err(e);
            }
        }
        *docs = work;
    }
    let ms = elapsed_ms(start);
    crate::dev6!(
        "{}",
        bench_line(
            "bulk_write",
            &name,
            ms,
            &[
                ("operations", json!(usize_to_u64(total))),
                ("inserted", json!(report.inserted_count())),
                ("matched", json!(report.matched)),
                ("modified", json!(report.modified)),
                ("deleted", json!(report.deleted)),
            ],
        )
    );
    telemetry::log_write("bulk_write", &name, &touched);
    log::debug!("bulk_write on {name}: {total} operation(s) in {ms}ms");
    Ok(report)
}

fn model_body<'a>(kind: &str, v: &'a Bson) -> Result<&'a BsonDocument, DbError> {
    match v {
        Bson::Document(d) => Ok(d),
        _ => Err(DbError::MalformedUpdate(format!("{kind} requires a document"))),
    }
}

fn sub_doc<'a>(kind: &str, body: &'a BsonDocument, key: &str) -> Result<&'a BsonDocument, DbError> {
    match body.get(key) {
        Some(Bson::Document(d)) => Ok(d),
        Some(_) => Err(DbError::MalformedUpdate(format!("{kind}.{key} must be a document"))),
        None => Err(DbError::MalformedUpdate(format!("{kind} requires '{key}'"))),
    }
}

fn update_arg(kind: &str, body: &BsonDocument, cfg: &QueryConfig) -> Result<UpdateDoc, DbError> {
    parse_update_with(sub_doc(kind, body, "update")?, cfg)
}

/// Parses driver-style write models: `{insertOne: {document}}`, `{updateOne: {filter, update}}`,
/// `{updateMany: ...}`, `{replaceOne: {filter, replacement}}`, `{deleteOne: {filter}}`,
/// `{deleteMany: {filter}}`.
///
/// # Errors
/// Returns `MalformedUpdate` for unknown or ill-shaped models, and the filter/update parse
/// error for bad arguments.
pub fn parse_write_models(
    ops: &[BsonDocument],
    cfg: &QueryConfig,
) -> Result<Vec<WriteModel>, DbError> {
    ops.iter()
        .map(|op| {
            if op.len() != 1 {
                return Err(DbError::MalformedUpdate(
                    "each bulk operation must have exactly one key".into(),
                ));
            }
            let Some((kind, v)) = op.iter().next() else {
                return Err(DbError::MalformedUpdate("empty bulk operation".into()));
            };
            let kind = kind.as_str();
            let body = model_body(kind, v)?;
            let filter = || parse_filter_with(sub_doc(kind, body, "filter")?, cfg);
            Ok(match kind {
                "insertOne" => {
                    WriteModel::InsertOne { document: sub_doc(kind, body, "document")?.clone() }
                }
                "updateOne" => {
                    WriteModel::UpdateOne { filter: filter()?, update: update_arg(kind, body, cfg)? }
                }
                "updateMany" => {
                    WriteModel::UpdateMany { filter: filter()?, update: update_arg(kind, body, cfg)? }
                }
                "replaceOne" => {
                    let replacement = sub_doc(kind, body, "replacement")?;
                    validate_replacement(replacement)?;
                    WriteModel::ReplaceOne { filter: filter()?, replacement: replacement.clone() }
                }
                "deleteOne" => WriteModel::DeleteOne { filter: filter()? },
                "deleteMany" => WriteModel::DeleteMany { filter: filter()? },
                other => {
                    return Err(DbError::MalformedUpdate(format!("unknown bulk operation '{other}'")));
                }
            })
        })
        .collect()
}
