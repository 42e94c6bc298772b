use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::expr::{eval_expr, eval_expr_bool};
use super::types::{CmpOp, Filter, Order, Projection, SortSpec, ValueSet};
use crate::document::{compare_values, get_path, get_path_values, sort_cmp, values_equal};
use crate::types::ID_FIELD;

/// Evaluates `filter` against `doc`. Pure and deterministic.
#[must_use]
pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => !get_path_values(doc, path).is_empty() == *exists,
        Filter::In { path, set } => matches_in(doc, path, set),
        Filter::Nin { path, set } => !matches_in(doc, path, set),
        Filter::Cmp { path, op: CmpOp::Eq, value } => matches_eq(doc, path, value),
        Filter::Cmp { path, op: CmpOp::Ne, value } => !matches_eq(doc, path, value),
        Filter::Cmp { path, op, value } => candidates(doc, path).any(|v| {
            compare_values(v, value).is_some_and(|ord| match op {
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::Gte => ord != Ordering::Less,
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Lte => ord != Ordering::Greater,
                CmpOp::Eq | CmpOp::Ne => false,
            })
        }),
        Filter::Regex { path, regex } => candidates(doc, path).any(|v| match v {
            Bson::String(s) | Bson::Symbol(s) => regex.is_match(s),
            _ => false,
        }),
        Filter::Expr(e) => eval_expr_bool(doc, e),
    }
}

// Resolved values at `path` plus the elements of any arrays among them.
fn candidates<'a>(doc: &'a BsonDocument, path: &str) -> impl Iterator<Item = &'a Bson> {
    get_path_values(doc, path).into_iter().flat_map(|v| {
        let elems: &[Bson] = match v {
            Bson::Array(items) => items,
            _ => &[],
        };
        std::iter::once(v).chain(elems.iter())
    })
}

fn matches_eq(doc: &BsonDocument, path: &str, value: &Bson) -> bool {
    let resolved = get_path_values(doc, path);
    if resolved.is_empty() {
        // `{field: null}` also selects documents without the field
        return matches!(value, Bson::Null);
    }
    candidates(doc, path).any(|v| values_equal(v, value))
}

fn matches_in(doc: &BsonDocument, path: &str, set: &ValueSet) -> bool {
    if get_path_values(doc, path).is_empty() {
        return set.contains_null();
    }
    candidates(doc, path).any(|v| set.contains(v))
}

/// Orders two documents by `sort`; missing fields sort lowest.
#[must_use]
pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort {
        let ord = sort_cmp(get_path(a, &s.field), get_path(b, &s.field));
        if ord != Ordering::Equal {
            return if matches!(s.order, Order::Asc) { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Applies `projection` to `doc`. Included fields keep the input order; computed fields follow.
#[must_use]
pub fn project_document(doc: &BsonDocument, projection: &Projection) -> BsonDocument {
    match projection {
        Projection::Include { paths, computed, keep_id } => {
            let mut split: Vec<Vec<&str>> = Vec::with_capacity(paths.len() + 1);
            if *keep_id {
                split.push(vec![ID_FIELD]);
            }
            split.extend(paths.iter().map(|p| p.split('.').collect()));
            let mut out = include_paths(doc, &split);
            for (name, expr) in computed {
                if let Some(v) = eval_expr(doc, expr) {
                    out.insert(name.clone(), v);
                }
            }
            out
        }
        Projection::Exclude { paths } => {
            let mut out = doc.clone();
            for p in paths {
                let segs: Vec<&str> = p.split('.').collect();
                exclude_path(&mut out, &segs);
            }
            out
        }
    }
}

fn include_paths(doc: &BsonDocument, paths: &[Vec<&str>]) -> BsonDocument {
    let mut out = BsonDocument::new();
    for (k, v) in doc {
        let rests: Vec<Vec<&str>> =
            paths.iter().filter(|p| p.first() == Some(&k.as_str())).map(|p| p[1..].to_vec()).collect();
        if rests.is_empty() {
            continue;
        }
        if rests.iter().any(Vec::is_empty) {
            out.insert(k.clone(), v.clone());
            continue;
        }
        match v {
            Bson::Document(d) => {
                out.insert(k.clone(), include_paths(d, &rests));
            }
            Bson::Array(items) => {
                let kept = items
                    .iter()
                    .filter_map(|item| match item {
                        Bson::Document(d) => Some(Bson::Document(include_paths(d, &rests))),
                        _ => None,
                    })
                    .collect();
                out.insert(k.clone(), Bson::Array(kept));
            }
            _ => {}
        }
    }
    out
}

fn exclude_path(doc: &mut BsonDocument, segs: &[&str]) {
    let Some((head, tail)) = segs.split_first() else {
        return;
    };
    if tail.is_empty() {
        doc.remove(*head);
        return;
    }
    match doc.get_mut(*head) {
        Some(Bson::Document(d)) => exclude_path(d, tail),
        Some(Bson::Array(items)) => {
            for item in items {
                if let Bson::Document(d) = item {
                    exclude_path(d, tail);
                }
            }
        }
        _ => {}
    }
}
