use bson::{Bson, Document as BsonDocument};

use super::types::{UpdateDoc, UpdateOp};
use crate::document::{add_numbers, get_path, set_path_mut, unset_path_mut, values_equal};
use crate::errors::DbError;

/// Applies `update` to a copy of `doc`. Returns the new document and whether it differs from
/// the input. The input is never modified.
///
/// # Errors
/// Returns `MalformedUpdate` when an operator meets a value of the wrong type (e.g. `$push`
/// onto a string, `$inc` of a non-number) or a path crosses a scalar.
pub fn apply_update(doc: &BsonDocument, update: &UpdateDoc) -> Result<(BsonDocument, bool), DbError> {
    let mut out = doc.clone();
    for op in &update.ops {
        apply_op(&mut out, op)?;
    }
    let changed = out != *doc;
    Ok((out, changed))
}

fn apply_op(out: &mut BsonDocument, op: &UpdateOp) -> Result<(), DbError> {
    match op {
        UpdateOp::Set { path, value } => set_path_mut(out, path, value.clone()),
        UpdateOp::Unset { path } => {
            unset_path_mut(out, path);
            Ok(())
        }
        UpdateOp::Inc { path, by } => {
            let next = match get_path(out, path) {
                None => by.clone(),
                Some(cur) => add_numbers(cur, by).ok_or_else(|| {
                    DbError::MalformedUpdate(format!("cannot $inc non-numeric field '{path}'"))
                })?,
            };
            set_path_mut(out, path, next)
        }
        UpdateOp::Push { path, values } => {
            let mut items = existing_array(out, path, "$push")?;
            items.extend(values.iter().cloned());
            set_path_mut(out, path, Bson::Array(items))
        }
        UpdateOp::AddToSet { path, values } => {
            let mut items = existing_array(out, path, "$addToSet")?;
            for v in values {
                if !items.iter().any(|x| values_equal(x, v)) {
                    items.push(v.clone());
                }
            }
            set_path_mut(out, path, Bson::Array(items))
        }
        UpdateOp::Pull { path, cond } => match get_path(out, path) {
            None => Ok(()),
            Some(Bson::Array(items)) => {
                let kept: Vec<Bson> = items.iter().filter(|v| !cond.matches(v)).cloned().collect();
                set_path_mut(out, path, Bson::Array(kept))
            }
            Some(_) => Err(DbError::MalformedUpdate(format!("cannot $pull from non-array field '{path}'"))),
        },
    }
}

fn existing_array(doc: &BsonDocument, path: &str, op: &str) -> Result<Vec<Bson>, DbError> {
    match get_path(doc, path) {
        None => Ok(Vec::new()),
        Some(Bson::Array(items)) => Ok(items.clone()),
        Some(_) => Err(DbError::MalformedUpdate(format!("cannot {op} to non-array field '{path}'"))),
    }
}
