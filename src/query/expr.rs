//! `$expr` expressions: parsing from BSON and evaluation against a document.

use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{CmpOp, Expr};
use crate::document::{get_path, get_path_values, is_truthy, sort_cmp, values_equal};

const MAX_EXPR_DEPTH: usize = 64;

/// Parses an expression. Strings starting with `$` are field references; a document whose
/// single key is an operator is an operator call; any other document builds an object.
pub(crate) fn parse_expr(v: &Bson) -> Result<Expr, String> {
    parse_at(v, 0)
}

fn parse_at(v: &Bson, depth: usize) -> Result<Expr, String> {
    if depth > MAX_EXPR_DEPTH {
        return Err("expression nested too deeply".into());
    }
    match v {
        Bson::String(s) if s.starts_with("$$") => {
            Err(format!("variables are not supported in expressions: '{s}'"))
        }
        Bson::String(s) if s.starts_with('$') => {
            let path = &s[1..];
            if path.is_empty() {
                return Err("empty field reference '$'".into());
            }
            Ok(Expr::Field(path.to_string()))
        }
        Bson::Array(items) => Ok(Expr::Array(
            items.iter().map(|i| parse_at(i, depth + 1)).collect::<Result<_, _>>()?,
        )),
        Bson::Document(d) => parse_document(d, depth),
        other => Ok(Expr::Literal(other.clone())),
    }
}

fn parse_document(d: &BsonDocument, depth: usize) -> Result<Expr, String> {
    let op_keys = d.keys().filter(|k| k.starts_with('$')).count();
    if op_keys == 0 {
        let mut fields = Vec::with_capacity(d.len());
        for (k, v) in d {
            fields.push((k.clone(), parse_at(v, depth + 1)?));
        }
        return Ok(Expr::Object(fields));
    }
    if op_keys != d.len() || d.len() != 1 {
        return Err("an operator expression must have exactly one '$' key".into());
    }
    let Some((op, arg)) = d.iter().next() else {
        return Err("empty expression".into());
    };
    match op.as_str() {
        "$literal" => Ok(Expr::Literal(arg.clone())),
        "$and" => Ok(Expr::And(parse_args(arg, depth)?)),
        "$or" => Ok(Expr::Or(parse_args(arg, depth)?)),
        "$not" => {
            let inner = match arg {
                Bson::Array(items) if items.len() == 1 => parse_at(&items[0], depth + 1)?,
                Bson::Array(_) => return Err("$not takes exactly one argument".into()),
                other => parse_at(other, depth + 1)?,
            };
            Ok(Expr::Not(Box::new(inner)))
        }
        "$in" => {
            let [needle, haystack] = two_args(op, arg, depth)?;
            Ok(Expr::In(Box::new(needle), Box::new(haystack)))
        }
        "$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte" => {
            let cmp = match op.as_str() {
                "$eq" => CmpOp::Eq,
                "$ne" => CmpOp::Ne,
                "$gt" => CmpOp::Gt,
                "$gte" => CmpOp::Gte,
                "$lt" => CmpOp::Lt,
                _ => CmpOp::Lte,
            };
            let [lhs, rhs] = two_args(op, arg, depth)?;
            Ok(Expr::Cmp(cmp, Box::new(lhs), Box::new(rhs)))
        }
        other => Err(format!("unknown expression operator '{other}'")),
    }
}

fn parse_args(arg: &Bson, depth: usize) -> Result<Vec<Expr>, String> {
    match arg {
        Bson::Array(items) => items.iter().map(|i| parse_at(i, depth + 1)).collect(),
        other => Ok(vec![parse_at(other, depth + 1)?]),
    }
}

fn two_args(op: &str, arg: &Bson, depth: usize) -> Result<[Expr; 2], String> {
    match arg {
        Bson::Array(items) if items.len() == 2 => {
            Ok([parse_at(&items[0], depth + 1)?, parse_at(&items[1], depth + 1)?])
        }
        _ => Err(format!("{op} takes an array of two arguments")),
    }
}

/// Evaluates `expr` against `doc`. `None` means the value is missing.
#[must_use]
pub fn eval_expr(doc: &BsonDocument, expr: &Expr) -> Option<Bson> {
    match expr {
        Expr::Literal(v) => Some(v.clone()),
        Expr::Field(path) => resolve_field(doc, path),
        Expr::Array(items) => Some(Bson::Array(
            items.iter().map(|e| eval_expr(doc, e).unwrap_or(Bson::Null)).collect(),
        )),
        Expr::Object(fields) => {
            let mut out = BsonDocument::new();
            for (k, e) in fields {
                if let Some(v) = eval_expr(doc, e) {
                    out.insert(k.clone(), v);
                }
            }
            Some(Bson::Document(out))
        }
        Expr::Not(inner) => Some(Bson::Boolean(!is_truthy(eval_expr(doc, inner).as_ref()))),
        Expr::And(items) => {
            Some(Bson::Boolean(items.iter().all(|e| is_truthy(eval_expr(doc, e).as_ref()))))
        }
        Expr::Or(items) => {
            Some(Bson::Boolean(items.iter().any(|e| is_truthy(eval_expr(doc, e).as_ref()))))
        }
        Expr::In(needle, haystack) => {
            let needle = eval_expr(doc, needle).unwrap_or(Bson::Null);
            let found = match eval_expr(doc, haystack) {
                Some(Bson::Array(items)) => items.iter().any(|x| values_equal(x, &needle)),
                _ => false,
            };
            Some(Bson::Boolean(found))
        }
        Expr::Cmp(op, lhs, rhs) => {
            let ord = sort_cmp(eval_expr(doc, lhs).as_ref(), eval_expr(doc, rhs).as_ref());
            Some(Bson::Boolean(match op {
                CmpOp::Eq => ord == Ordering::Equal,
                CmpOp::Ne => ord != Ordering::Equal,
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::Gte => ord != Ordering::Less,
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Lte => ord != Ordering::Greater,
            }))
        }
    }
}

// A reference that only resolves by fanning out over sub-documents yields the array of hits.
fn resolve_field(doc: &BsonDocument, path: &str) -> Option<Bson> {
    if let Some(v) = get_path(doc, path) {
        return Some(v.clone());
    }
    let hits = get_path_values(doc, path);
    if hits.is_empty() { None } else { Some(Bson::Array(hits.into_iter().cloned().collect())) }
}

/// Evaluates an expression as a predicate.
#[must_use]
pub fn eval_expr_bool(doc: &BsonDocument, expr: &Expr) -> bool {
    is_truthy(eval_expr(doc, expr).as_ref())
}
