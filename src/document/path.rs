use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};

/// Paths deeper than this resolve to "does not exist".
pub const MAX_PATH_DEPTH: usize = 32;
// Upper bound on how far a positional `$set` may pad an array with nulls.
const MAX_ARRAY_PAD: usize = 1024;

/// Resolves a dot-separated path. Numeric segments index into arrays.
#[must_use]
pub fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.split('.').count() > MAX_PATH_DEPTH {
        return None;
    }
    let mut segs = path.split('.');
    let mut cur = doc.get(segs.next()?)?;
    for seg in segs {
        cur = match cur {
            Bson::Document(d) => d.get(seg)?,
            Bson::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Resolves a path for matching: like [`get_path`], but a non-numeric segment applied to an
/// array of sub-documents fans out over its elements.
#[must_use]
pub fn get_path_values<'a>(doc: &'a BsonDocument, path: &str) -> Vec<&'a Bson> {
    let segs: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if path.is_empty() || segs.len() > MAX_PATH_DEPTH {
        return out;
    }
    if let Some(v) = doc.get(segs[0]) {
        collect_values(v, &segs[1..], &mut out);
    }
    out
}

fn collect_values<'a>(v: &'a Bson, rest: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((seg, tail)) = rest.split_first() else {
        out.push(v);
        return;
    };
    match v {
        Bson::Document(d) => {
            if let Some(next) = d.get(*seg) {
                collect_values(next, tail, out);
            }
        }
        Bson::Array(items) => {
            if let Ok(idx) = seg.parse::<usize>() {
                if let Some(next) = items.get(idx) {
                    collect_values(next, tail, out);
                }
            } else {
                for item in items {
                    if let Bson::Document(d) = item
                        && let Some(next) = d.get(*seg)
                    {
                        collect_values(next, tail, out);
                    }
                }
            }
        }
        _ => {}
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, DbError> {
    let segs: Vec<&str> = path.split('.').collect();
    if path.is_empty() || segs.iter().any(|s| s.is_empty()) || segs.len() > MAX_PATH_DEPTH {
        return Err(DbError::MalformedUpdate(format!("invalid field path '{path}'")));
    }
    Ok(segs)
}

/// Returns a copy of `doc` with `path` set to `value`, creating intermediate documents.
///
/// # Errors
/// Returns `MalformedUpdate` if the path is invalid or crosses a non-container value.
pub fn set_path(doc: &BsonDocument, path: &str, value: Bson) -> Result<BsonDocument, DbError> {
    let mut out = doc.clone();
    set_path_mut(&mut out, path, value)?;
    Ok(out)
}

/// Returns a copy of `doc` without `path`, and whether anything was removed.
#[must_use]
pub fn unset_path(doc: &BsonDocument, path: &str) -> (BsonDocument, bool) {
    let mut out = doc.clone();
    let removed = unset_path_mut(&mut out, path);
    (out, removed)
}

pub(crate) fn set_path_mut(doc: &mut BsonDocument, path: &str, value: Bson) -> Result<(), DbError> {
    let segs = split_path(path)?;
    set_in_document(doc, &segs, value, path)
}

fn set_in_document(
    doc: &mut BsonDocument,
    segs: &[&str],
    value: Bson,
    path: &str,
) -> Result<(), DbError> {
    let Some((head, tail)) = segs.split_first() else {
        return Err(DbError::MalformedUpdate(format!("invalid field path '{path}'")));
    };
    if tail.is_empty() {
        doc.insert(*head, value);
        return Ok(());
    }
    if let Some(child) = doc.get_mut(*head) {
        return set_in_value(child, tail, value, path);
    }
    let mut sub = BsonDocument::new();
    set_in_document(&mut sub, tail, value, path)?;
    doc.insert(*head, sub);
    Ok(())
}

fn set_in_value(target: &mut Bson, segs: &[&str], value: Bson, path: &str) -> Result<(), DbError> {
    match target {
        Bson::Document(d) => set_in_document(d, segs, value, path),
        Bson::Array(items) => {
            let Some((head, tail)) = segs.split_first() else {
                return Err(DbError::MalformedUpdate(format!("invalid field path '{path}'")));
            };
            let idx = head.parse::<usize>().map_err(|_| {
                DbError::MalformedUpdate(format!("cannot create field '{head}' in array at '{path}'"))
            })?;
            if idx > items.len() + MAX_ARRAY_PAD {
                return Err(DbError::MalformedUpdate(format!(
                    "array index {idx} too far past the end at '{path}'"
                )));
            }
            let created = idx >= items.len();
            while items.len() <= idx {
                items.push(Bson::Null);
            }
            if tail.is_empty() {
                items[idx] = value;
                return Ok(());
            }
            if created {
                items[idx] = Bson::Document(BsonDocument::new());
            }
            set_in_value(&mut items[idx], tail, value, path)
        }
        _ => Err(DbError::MalformedUpdate(format!(
            "cannot create field '{}' in a non-container value at '{path}'",
            segs.first().copied().unwrap_or_default()
        ))),
    }
}

pub(crate) fn unset_path_mut(doc: &mut BsonDocument, path: &str) -> bool {
    match path.rsplit_once('.') {
        None => doc.remove(path).is_some(),
        Some((parent, leaf)) => match get_path_mut(doc, parent) {
            Some(Bson::Document(d)) => d.remove(leaf).is_some(),
            // Array slots are nulled rather than removed, keeping positions stable.
            Some(Bson::Array(items)) => match leaf.parse::<usize>() {
                Ok(i) if i < items.len() && items[i] != Bson::Null => {
                    items[i] = Bson::Null;
                    true
                }
                _ => false,
            },
            _ => false,
        },
    }
}

fn get_path_mut<'a>(doc: &'a mut BsonDocument, path: &str) -> Option<&'a mut Bson> {
    let mut segs = path.split('.');
    let mut cur = doc.get_mut(segs.next()?)?;
    for seg in segs {
        cur = match cur {
            Bson::Document(d) => d.get_mut(seg)?,
            Bson::Array(items) => items.get_mut(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}
