use crate::collection::{Collection, insert_into};
use crate::document::{Document, values_equal};
use crate::errors::DbError;
use crate::types::{DocumentId, ID_FIELD};
use crate::utils::devlog::bench_line;
use crate::utils::num::{elapsed_ms, usize_to_u64};
use bson::Document as BsonDocument;
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use super::cursor::Cursor;
use super::eval::{compare_docs, eval_filter, project_document};
use super::parse::validate_replacement;
use super::telemetry;
use super::types::{
    DeleteReport, Filter, FindOneAndModifyOptions, FindOptions, Projection, ReturnDocument,
    SortSpec, UpdateDoc, UpdateReport,
};
use super::update::apply_update;

fn emit_bench(op: &str, collection: &str, start: Instant, extra: &[(&str, Value)]) -> u64 {
    let ms = elapsed_ms(start);
    crate::dev6!("{}", bench_line(op, collection, ms, extra));
    ms
}

fn record_read(op: &str, col: &Collection, start: Instant, result_count: usize) {
    let name = col.name_str();
    let ms = emit_bench(op, &name, start, &[("result_count", json!(usize_to_u64(result_count)))]);
    telemetry::log_query(&name, op, ms, result_count);
    log::debug!("{op} on {name}: {result_count} result(s) in {ms}ms");
}

fn record_write(op: &str, col: &Collection, start: Instant, ids: &[String], extra: &[(&str, Value)]) {
    let name = col.name_str();
    let ms = emit_bench(op, &name, start, extra);
    telemetry::log_write(op, &name, ids);
    log::debug!("{op} on {name}: {} document(s) written in {ms}ms", ids.len());
}

fn project(doc: BsonDocument, projection: Option<&Projection>) -> BsonDocument {
    match projection {
        Some(p) => project_document(&doc, p),
        None => doc,
    }
}

/// Index of the document `find_one_and_*` acts on: the first match in collection order, or
/// the first match in `sort` order (ties resolved by collection order).
pub(crate) fn select_one(state: &[Document], filter: &Filter, sort: &[SortSpec]) -> Option<usize> {
    let mut matches = state.iter().enumerate().filter(|(_, d)| eval_filter(&d.data, filter));
    if sort.is_empty() {
        return matches.next().map(|(i, _)| i);
    }
    let (mut best, mut best_doc) = matches.next()?;
    for (i, d) in matches {
        if compare_docs(&d.data, &best_doc.data, sort) == Ordering::Less {
            best = i;
            best_doc = d;
        }
    }
    Some(best)
}

/// Applies `update` to matching documents in `state`. All replacements are computed before any
/// is stored, so an error leaves `state` untouched. Returns the report and the modified ids.
pub(crate) fn update_in(
    state: &mut [Document],
    filter: &Filter,
    update: &UpdateDoc,
    multi: bool,
) -> Result<(UpdateReport, Vec<String>), DbError> {
    let mut report = UpdateReport::default();
    let mut staged: Vec<(usize, Document)> = Vec::new();
    for (i, d) in state.iter().enumerate() {
        if !eval_filter(&d.data, filter) {
            continue;
        }
        report.matched += 1;
        let (new_data, changed) = apply_update(&d.data, update)?;
        if changed {
            staged.push((i, d.revise(new_data)));
        }
        if !multi {
            break;
        }
    }
    report.modified = usize_to_u64(staged.len());
    let mut ids = Vec::with_capacity(staged.len());
    for (i, d) in staged {
        ids.push(d.id().to_string());
        state[i] = d;
    }
    Ok((report, ids))
}

/// Replaces the document at `idx`, keeping its `_id`. Returns whether the content changed.
///
/// `replacement` must already have passed [`validate_replacement`].
pub(crate) fn replace_at(
    state: &mut [Document],
    idx: usize,
    replacement: &BsonDocument,
) -> Result<bool, DbError> {
    let Some(current) = state.get(idx) else {
        return Ok(false);
    };
    if let Some(id) = replacement.get(ID_FIELD)
        && !values_equal(id, current.id().as_bson())
    {
        return Err(DbError::MalformedUpdate("replacement cannot change _id".into()));
    }
    let next = current.revise(replacement.clone());
    let changed = next.data != current.data;
    if changed {
        state[idx] = next;
    }
    Ok(changed)
}

/// Removes matching documents; returns the removed ids.
pub(crate) fn delete_in(state: &mut Vec<Document>, filter: &Filter, multi: bool) -> Vec<String> {
    let mut removed = Vec::new();
    state.retain(|d| {
        if (multi || removed.is_empty()) && eval_filter(&d.data, filter) {
            removed.push(d.id().to_string());
            false
        } else {
            true
        }
    });
    removed
}

/// # Errors
/// Returns `DuplicateKey` or `InvalidDocumentId` when the `_id` cannot be stored.
pub fn insert_one(col: &Arc<Collection>, doc: BsonDocument) -> Result<DocumentId, DbError> {
    let start = Instant::now();
    let id = col.insert_document(Document::new(doc)).inspect_err(|e| {
        telemetry::log_error(&col.name_str(), "insert_one", e);
    })?;
    record_write("insert_one", col, start, &[id.to_string()], &[("inserted", json!(1))]);
    Ok(id)
}

/// Inserts every document or none.
///
/// # Errors
/// See [`insert_one`].
pub fn insert_many(col: &Arc<Collection>, docs: Vec<BsonDocument>) -> Result<Vec<DocumentId>, DbError> {
    let start = Instant::now();
    let docs: Vec<Document> = docs.into_iter().map(Document::new).collect();
    let ids = col.insert_documents(docs).inspect_err(|e| {
        telemetry::log_error(&col.name_str(), "insert_many", e);
    })?;
    let id_strings: Vec<String> = ids.iter().map(ToString::to_string).collect();
    record_write("insert_many", col, start, &id_strings, &[("inserted", json!(ids.len()))]);
    Ok(ids)
}

/// Matching documents: filter → sort → skip → limit → project.
#[must_use]
pub fn find_docs(col: &Arc<Collection>, filter: &Filter, opts: &FindOptions) -> Cursor {
    let start = Instant::now();
    let mut docs: Vec<BsonDocument> = col
        .read()
        .iter()
        .filter(|d| eval_filter(&d.data, filter))
        .map(|d| d.data.clone())
        .collect();
    if !opts.sort.is_empty() {
        docs.sort_by(|a, b| compare_docs(a, b, &opts.sort));
    }
    let limit = opts.limit.filter(|n| *n > 0).unwrap_or(usize::MAX);
    let docs: Vec<BsonDocument> = docs
        .into_iter()
        .skip(opts.skip.unwrap_or(0))
        .take(limit)
        .map(|d| project(d, opts.projection.as_ref()))
        .collect();
    record_read("find", col, start, docs.len());
    Cursor::new(docs)
}

#[must_use]
pub fn find_one(col: &Arc<Collection>, filter: &Filter) -> Option<BsonDocument> {
    let start = Instant::now();
    let found = col.read().iter().find(|d| eval_filter(&d.data, filter)).map(|d| d.data.clone());
    record_read("find_one", col, start, usize::from(found.is_some()));
    found
}

#[must_use]
pub fn count_docs(col: &Arc<Collection>, filter: &Filter) -> usize {
    let start = Instant::now();
    let n = col.read().iter().filter(|d| eval_filter(&d.data, filter)).count();
    record_read("count", col, start, n);
    n
}

fn run_update(
    op: &str,
    col: &Arc<Collection>,
    filter: &Filter,
    update: &UpdateDoc,
    multi: bool,
) -> Result<UpdateReport, DbError> {
    let start = Instant::now();
    let (report, ids) = {
        let mut docs = col.write();
        update_in(&mut docs, filter, update, multi)
    }
    .inspect_err(|e| telemetry::log_error(&col.name_str(), op, e))?;
    record_write(
        op,
        col,
        start,
        &ids,
        &[("matched", json!(report.matched)), ("modified", json!(report.modified))],
    );
    Ok(report)
}

/// Applies `update` to every matching document, atomically: if any document fails, none change.
///
/// # Errors
/// Returns `MalformedUpdate` if the update cannot be applied to a matched document.
pub fn update_many(
    col: &Arc<Collection>,
    filter: &Filter,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    run_update("update_many", col, filter, update, true)
}

/// # Errors
/// Returns `MalformedUpdate` if the update cannot be applied to the matched document.
pub fn update_one(
    col: &Arc<Collection>,
    filter: &Filter,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    run_update("update_one", col, filter, update, false)
}

/// Updates the first matching document and returns it (before or after the update, per
/// `opts`). `Ok(None)` when nothing matches.
///
/// # Errors
/// Returns `MalformedUpdate` if the update cannot be applied; the document is left unchanged.
pub fn find_one_and_update(
    col: &Arc<Collection>,
    filter: &Filter,
    update: &UpdateDoc,
    opts: &FindOneAndModifyOptions,
) -> Result<Option<BsonDocument>, DbError> {
    let start = Instant::now();
    let op = "find_one_and_update";
    let outcome = {
        let mut docs = col.write();
        match select_one(&docs, filter, &opts.sort) {
            None => Ok(None),
            Some(idx) => {
                let before = docs[idx].data.clone();
                apply_update(&before, update).map(|(new_data, changed)| {
                    let mut ids = Vec::new();
                    if changed {
                        let next = docs[idx].revise(new_data);
                        ids.push(next.id().to_string());
                        docs[idx] = next;
                    }
                    let after = docs[idx].data.clone();
                    Some((before, after, ids))
                })
            }
        }
    }
    .inspect_err(|e| telemetry::log_error(&col.name_str(), op, e))?;
    let Some((before, after, ids)) = outcome else {
        record_write(op, col, start, &[], &[("matched", json!(0))]);
        return Ok(None);
    };
    record_write(op, col, start, &ids, &[("matched", json!(1)), ("modified", json!(ids.len()))]);
    let chosen = match opts.return_document {
        ReturnDocument::Before => before,
        ReturnDocument::After => after,
    };
    Ok(Some(project(chosen, opts.projection.as_ref())))
}

/// Replaces the first matching document wholesale, keeping its `_id`. `Ok(None)` when nothing
/// matches.
///
/// # Errors
/// Returns `MalformedUpdate` if `replacement` contains operators or a different `_id`.
pub fn find_one_and_replace(
    col: &Arc<Collection>,
    filter: &Filter,
    replacement: &BsonDocument,
    opts: &FindOneAndModifyOptions,
) -> Result<Option<BsonDocument>, DbError> {
    let start = Instant::now();
    let op = "find_one_and_replace";
    validate_replacement(replacement).inspect_err(|e| telemetry::log_error(&col.name_str(), op, e))?;
    let outcome = {
        let mut docs = col.write();
        match select_one(&docs, filter, &opts.sort) {
            None => Ok(None),
            Some(idx) => {
                let before = docs[idx].data.clone();
                replace_at(&mut docs, idx, replacement).map(|changed| {
                    let ids = if changed { vec![docs[idx].id().to_string()] } else { Vec::new() };
                    Some((before, docs[idx].data.clone(), ids))
                })
            }
        }
    }
    .inspect_err(|e| telemetry::log_error(&col.name_str(), op, e))?;
    let Some((before, after, ids)) = outcome else {
        record_write(op, col, start, &[], &[("matched", json!(0))]);
        return Ok(None);
    };
    record_write(op, col, start, &ids, &[("matched", json!(1)), ("modified", json!(ids.len()))]);
    let chosen = match opts.return_document {
        ReturnDocument::Before => before,
        ReturnDocument::After => after,
    };
    Ok(Some(project(chosen, opts.projection.as_ref())))
}

fn run_delete(op: &str, col: &Arc<Collection>, filter: &Filter, multi: bool) -> DeleteReport {
    let start = Instant::now();
    let removed = delete_in(&mut col.write(), filter, multi);
    let deleted = usize_to_u64(removed.len());
    record_write(op, col, start, &removed, &[("deleted", json!(deleted))]);
    DeleteReport { deleted }
}

pub fn delete_many(col: &Arc<Collection>, filter: &Filter) -> DeleteReport {
    run_delete("delete_many", col, filter, true)
}

pub fn delete_one(col: &Arc<Collection>, filter: &Filter) -> DeleteReport {
    run_delete("delete_one", col, filter, false)
}

/// Appends documents to `state` (used by bulk writes on their working copy).
pub(crate) fn insert_docs_in(
    state: &mut Vec<Document>,
    docs: Vec<BsonDocument>,
) -> Result<Vec<DocumentId>, DbError> {
    insert_into(state, docs.into_iter().map(Document::new).collect())
}
