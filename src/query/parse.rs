use crate::config::{QueryConfig, RegexAnchor};
use crate::document::{MAX_PATH_DEPTH, is_numeric, is_truthy};
use crate::errors::DbError;
use crate::types::ID_FIELD;
use crate::utils::num::bson_to_usize;
use bson::{Bson, Document as BsonDocument};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::expr::parse_expr;
use super::types::{
    CmpOp, FindOptions, Filter, MAX_FILTER_DEPTH, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, Order,
    Projection, PullCond, SortSpec, UpdateDoc, UpdateOp, ValueSet,
};

fn valid_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('$')
        && path.split('.').all(|s| !s.is_empty())
        && path.split('.').count() <= MAX_PATH_DEPTH
}

/// Compiles a `$regex` pattern with its `$options` flags.
pub(crate) fn build_regex(pattern: &str, options: &str, cfg: &QueryConfig) -> Result<Regex, String> {
    let source = match cfg.regex_anchor {
        RegexAnchor::Start if !pattern.starts_with('^') => format!("^(?:{pattern})"),
        _ => pattern.to_string(),
    };
    let mut b = RegexBuilder::new(&source);
    b.size_limit(cfg.regex_size_limit).case_insensitive(cfg.regex_case_insensitive);
    for flag in options.chars() {
        match flag {
            'i' => b.case_insensitive(true),
            'm' => b.multi_line(true),
            's' => b.dot_matches_new_line(true),
            'x' => b.ignore_whitespace(true),
            'u' => b.unicode(true),
            other => return Err(format!("unsupported regex option '{other}'")),
        };
    }
    b.build().map_err(|e| format!("invalid regex '{pattern}': {e}"))
}

struct FilterParser<'a> {
    cfg: &'a QueryConfig,
}

impl FilterParser<'_> {
    fn document(&self, d: &BsonDocument, depth: usize) -> Result<Filter, String> {
        if depth > MAX_FILTER_DEPTH {
            return Err("filter nested too deeply".into());
        }
        let mut clauses = Vec::with_capacity(d.len());
        for (k, v) in d {
            let clause = match k.as_str() {
                "$and" => Filter::And(self.sub_filters(k, v, depth)?),
                "$or" => Filter::Or(self.sub_filters(k, v, depth)?),
                "$nor" => Filter::Nor(self.sub_filters(k, v, depth)?),
                "$expr" => Filter::Expr(parse_expr(v)?),
                op if op.starts_with('$') => return Err(format!("unknown top-level operator '{op}'")),
                path => {
                    if !valid_path(path) {
                        return Err(format!("invalid field path '{path}'"));
                    }
                    self.field(path, v, depth)?
                }
            };
            clauses.push(clause);
        }
        Ok(if clauses.len() > 1 { Filter::And(clauses) } else { clauses.pop().unwrap_or(Filter::True) })
    }

    fn sub_filters(&self, op: &str, v: &Bson, depth: usize) -> Result<Vec<Filter>, String> {
        let Bson::Array(items) = v else {
            return Err(format!("{op} requires an array of filters"));
        };
        if items.is_empty() {
            return Err(format!("{op} requires a non-empty array"));
        }
        items
            .iter()
            .map(|item| match item {
                Bson::Document(d) => self.document(d, depth + 1),
                _ => Err(format!("{op} entries must be documents")),
            })
            .collect()
    }

    fn field(&self, path: &str, v: &Bson, depth: usize) -> Result<Filter, String> {
        match v {
            Bson::Document(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                if !ops.keys().all(|k| k.starts_with('$')) {
                    return Err(format!("cannot mix operators and fields in the filter for '{path}'"));
                }
                self.operators(path, ops, depth)
            }
            Bson::RegularExpression(re) => Ok(Filter::Regex {
                path: path.to_string(),
                regex: build_regex(re.pattern.as_str(), re.options.as_str(), self.cfg)?,
            }),
            other => Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: other.clone() }),
        }
    }

    fn operators(&self, path: &str, ops: &BsonDocument, depth: usize) -> Result<Filter, String> {
        let mut clauses = Vec::with_capacity(ops.len());
        for (op, arg) in ops {
            let cmp = |op| Filter::Cmp { path: path.to_string(), op, value: arg.clone() };
            let clause = match op.as_str() {
                "$eq" => cmp(CmpOp::Eq),
                "$ne" => cmp(CmpOp::Ne),
                "$gt" => cmp(CmpOp::Gt),
                "$gte" => cmp(CmpOp::Gte),
                "$lt" => cmp(CmpOp::Lt),
                "$lte" => cmp(CmpOp::Lte),
                "$in" => Filter::In { path: path.to_string(), set: self.value_set(op, arg)? },
                "$nin" => Filter::Nin { path: path.to_string(), set: self.value_set(op, arg)? },
                "$exists" => match arg {
                    Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
                        Filter::Exists { path: path.to_string(), exists: is_truthy(Some(arg)) }
                    }
                    _ => return Err("$exists requires a boolean".into()),
                },
                "$regex" => {
                    let options = match ops.get("$options") {
                        None => "",
                        Some(Bson::String(s)) => s.as_str(),
                        Some(_) => return Err("$options must be a string".into()),
                    };
                    let regex = match arg {
                        Bson::String(p) => build_regex(p, options, self.cfg)?,
                        Bson::RegularExpression(re) => {
                            let merged = format!("{}{options}", re.options.as_str());
                            build_regex(re.pattern.as_str(), &merged, self.cfg)?
                        }
                        _ => return Err("$regex requires a string pattern".into()),
                    };
                    Filter::Regex { path: path.to_string(), regex }
                }
                "$options" => {
                    if !ops.contains_key("$regex") {
                        return Err("$options without $regex".into());
                    }
                    continue;
                }
                "$not" => match arg {
                    Bson::Document(inner)
                        if !inner.is_empty() && inner.keys().all(|k| k.starts_with('$')) =>
                    {
                        Filter::Not(Box::new(self.operators(path, inner, depth + 1)?))
                    }
                    Bson::RegularExpression(_) => {
                        Filter::Not(Box::new(self.field(path, arg, depth + 1)?))
                    }
                    _ => return Err("$not requires an operator document or a regex".into()),
                },
                other => return Err(format!("unknown operator '{other}' on field '{path}'")),
            };
            clauses.push(clause);
        }
        Ok(if clauses.len() > 1 { Filter::And(clauses) } else { clauses.pop().unwrap_or(Filter::True) })
    }

    fn value_set(&self, op: &str, arg: &Bson) -> Result<ValueSet, String> {
        let Bson::Array(items) = arg else {
            return Err(format!("{op} requires an array"));
        };
        if items.len() > self.cfg.max_in_set {
            return Err(format!("{op} has {} members, limit is {}", items.len(), self.cfg.max_in_set));
        }
        let mut set = ValueSet::default();
        for item in items {
            match item {
                Bson::RegularExpression(re) => set.patterns.push(build_regex(
                    re.pattern.as_str(),
                    re.options.as_str(),
                    self.cfg,
                )?),
                other => set.values.push(other.clone()),
            }
        }
        Ok(set)
    }
}

/// Parses a filter document using default limits.
///
/// # Errors
/// Returns `MalformedFilter` for unknown operators or ill-typed operands.
pub fn parse_filter(doc: &BsonDocument) -> Result<Filter, DbError> {
    parse_filter_with(doc, &QueryConfig::default())
}

/// # Errors
/// Returns `MalformedFilter` for unknown operators or ill-typed operands.
pub fn parse_filter_with(doc: &BsonDocument, cfg: &QueryConfig) -> Result<Filter, DbError> {
    FilterParser { cfg }.document(doc, 0).map_err(DbError::MalformedFilter)
}

fn each_values(arg: &Bson) -> Result<Vec<Bson>, String> {
    match arg {
        Bson::Document(d) if d.keys().any(|k| k.starts_with('$')) => {
            if d.len() != 1 {
                return Err("only the $each modifier is supported".into());
            }
            match d.get("$each") {
                Some(Bson::Array(items)) => Ok(items.clone()),
                Some(_) => Err("$each requires an array".into()),
                None => Err("only the $each modifier is supported".into()),
            }
        }
        other => Ok(vec![other.clone()]),
    }
}

fn pull_cond(arg: &Bson, cfg: &QueryConfig) -> Result<PullCond, String> {
    match arg {
        Bson::Document(d) if d.keys().any(|k| k.starts_with('$')) => match d.get("$in") {
            Some(set) if d.len() == 1 => {
                Ok(PullCond::In(FilterParser { cfg }.value_set("$pull.$in", set)?))
            }
            _ => Err("$pull supports a value or {$in: [...]}".into()),
        },
        other => Ok(PullCond::Equals(other.clone())),
    }
}

fn paths_conflict(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long == short || (long.starts_with(short) && long.as_bytes().get(short.len()) == Some(&b'.'))
}

fn parse_update_inner(doc: &BsonDocument, cfg: &QueryConfig) -> Result<UpdateDoc, String> {
    let mut ops = Vec::new();
    for (op, fields) in doc {
        if !op.starts_with('$') {
            return Err(format!("'{op}' is not an update operator; use $set to replace fields"));
        }
        let Bson::Document(fields) = fields else {
            return Err(format!("{op} requires a document of field paths"));
        };
        for (path, arg) in fields {
            if !valid_path(path) {
                return Err(format!("invalid field path '{path}'"));
            }
            if path == ID_FIELD || path.starts_with("_id.") {
                return Err("the _id field cannot be updated".into());
            }
            if let Some(existing) = ops.iter().map(UpdateOp::path).find(|p| paths_conflict(p, path)) {
                return Err(format!("conflicting update paths '{existing}' and '{path}'"));
            }
            let path = path.clone();
            ops.push(match op.as_str() {
                "$set" => UpdateOp::Set { path, value: arg.clone() },
                "$unset" => UpdateOp::Unset { path },
                "$inc" => {
                    if !is_numeric(arg) {
                        return Err(format!("$inc on '{path}' requires a numeric amount"));
                    }
                    UpdateOp::Inc { path, by: arg.clone() }
                }
                "$push" => UpdateOp::Push { path, values: each_values(arg)? },
                "$addToSet" => UpdateOp::AddToSet { path, values: each_values(arg)? },
                "$pull" => UpdateOp::Pull { path, cond: pull_cond(arg, cfg)? },
                other => return Err(format!("unknown update operator '{other}'")),
            });
        }
    }
    if ops.is_empty() {
        return Err("update document has no operations".into());
    }
    Ok(UpdateDoc::new(ops))
}

/// Parses an update document using default limits.
///
/// # Errors
/// Returns `MalformedUpdate` for unknown operators, `_id` targets or conflicting paths.
pub fn parse_update(doc: &BsonDocument) -> Result<UpdateDoc, DbError> {
    parse_update_with(doc, &QueryConfig::default())
}

/// # Errors
/// Returns `MalformedUpdate` for unknown operators, `_id` targets or conflicting paths.
pub fn parse_update_with(doc: &BsonDocument, cfg: &QueryConfig) -> Result<UpdateDoc, DbError> {
    parse_update_inner(doc, cfg).map_err(DbError::MalformedUpdate)
}

/// Checks that a replacement document is plain data: no top-level operator keys.
///
/// # Errors
/// Returns `MalformedUpdate` naming the first operator key found.
pub fn validate_replacement(doc: &BsonDocument) -> Result<(), DbError> {
    match doc.keys().find(|k| k.starts_with('$')) {
        Some(op) => Err(DbError::MalformedUpdate(format!(
            "replacement document cannot contain operator '{op}'"
        ))),
        None => Ok(()),
    }
}

/// Parses `{field: 1|-1, ...}`.
pub(crate) fn parse_sort(doc: &BsonDocument) -> Result<Vec<SortSpec>, String> {
    if doc.len() > MAX_SORT_FIELDS {
        return Err(format!("too many sort fields (limit {MAX_SORT_FIELDS})"));
    }
    doc.iter()
        .map(|(field, dir)| {
            if !valid_path(field) {
                return Err(format!("invalid sort field '{field}'"));
            }
            let order = match dir {
                Bson::Int32(1) | Bson::Int64(1) => Order::Asc,
                Bson::Int32(-1) | Bson::Int64(-1) => Order::Desc,
                Bson::Double(f) if *f == 1.0 => Order::Asc,
                Bson::Double(f) if *f == -1.0 => Order::Desc,
                _ => return Err(format!("sort direction for '{field}' must be 1 or -1")),
            };
            Ok(SortSpec { field: field.clone(), order })
        })
        .collect()
}

/// Parses a projection: inclusion (`1`/`true`), exclusion (`0`/`false`) or computed fields.
pub(crate) fn parse_projection(doc: &BsonDocument) -> Result<Projection, String> {
    if doc.len() > MAX_PROJECTION_FIELDS {
        return Err(format!("too many projection fields (limit {MAX_PROJECTION_FIELDS})"));
    }
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut computed = Vec::new();
    let mut keep_id = true;
    for (field, v) in doc {
        if !valid_path(field) {
            return Err(format!("invalid projection field '{field}'"));
        }
        match v {
            Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
                let on = is_truthy(Some(v));
                if field == ID_FIELD {
                    keep_id = on;
                } else if on {
                    include.push(field.clone());
                } else {
                    exclude.push(field.clone());
                }
            }
            Bson::String(_) | Bson::Document(_) if field.contains('.') => {
                return Err(format!("computed field '{field}' cannot be a dotted path"));
            }
            Bson::String(s) if s.starts_with('$') => computed.push((field.clone(), parse_expr(v)?)),
            Bson::Document(_) => computed.push((field.clone(), parse_expr(v)?)),
            _ => return Err(format!("invalid projection value for '{field}'")),
        }
    }
    if !exclude.is_empty() && !(include.is_empty() && computed.is_empty()) {
        return Err("cannot mix inclusion and exclusion in a projection".into());
    }
    if include.is_empty() && computed.is_empty() {
        if !keep_id {
            exclude.insert(0, ID_FIELD.to_string());
        }
        return Ok(Projection::Exclude { paths: exclude });
    }
    // computed `_id` replaces the stored one
    if computed.iter().any(|(k, _)| k == ID_FIELD) {
        keep_id = false;
    }
    Ok(Projection::Include { paths: include, computed, keep_id })
}

// Serde-facing options for JSON callers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOptionsSerde {
    #[serde(default)]
    pub sort: Option<BsonDocument>,
    #[serde(default)]
    pub skip: Option<Bson>,
    #[serde(default)]
    pub limit: Option<Bson>,
    #[serde(default, alias = "project")]
    pub projection: Option<BsonDocument>,
}

impl TryFrom<FindOptionsSerde> for FindOptions {
    type Error = DbError;
    fn try_from(fo: FindOptionsSerde) -> Result<Self, Self::Error> {
        let count = |name: &str, v: Option<Bson>| -> Result<Option<usize>, DbError> {
            v.map(|b| {
                bson_to_usize(&b).ok_or_else(|| {
                    DbError::MalformedFilter(format!("{name} must be a non-negative integer"))
                })
            })
            .transpose()
        };
        Ok(Self {
            sort: fo
                .sort
                .as_ref()
                .map(parse_sort)
                .transpose()
                .map_err(DbError::MalformedFilter)?
                .unwrap_or_default(),
            skip: count("skip", fo.skip)?,
            limit: count("limit", fo.limit)?.filter(|n| *n > 0),
            projection: fo
                .projection
                .as_ref()
                .map(parse_projection)
                .transpose()
                .map_err(DbError::MalformedFilter)?,
        })
    }
}

/// Parses `{sort, skip, limit, projection}`. A limit of 0 means no limit.
///
/// # Errors
/// Returns `MalformedFilter` for a bad sort, projection or count.
pub fn parse_find_options(doc: &BsonDocument) -> Result<FindOptions, DbError> {
    let mut fo = FindOptionsSerde::default();
    for (k, v) in doc {
        let sub_doc = || match v {
            Bson::Document(d) => Ok(Some(d.clone())),
            _ => Err(DbError::MalformedFilter(format!("find option '{k}' must be a document"))),
        };
        match k.as_str() {
            "sort" => fo.sort = sub_doc()?,
            "projection" | "project" => fo.projection = sub_doc()?,
            "skip" => fo.skip = Some(v.clone()),
            "limit" => fo.limit = Some(v.clone()),
            other => return Err(DbError::MalformedFilter(format!("unknown find option '{other}'"))),
        }
    }
    FindOptions::try_from(fo)
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into a filter structure.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    let doc: BsonDocument = serde_json::from_str(json)?;
    parse_filter(&doc)
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into an update structure.
pub fn parse_update_json(json: &str) -> Result<UpdateDoc, DbError> {
    let doc: BsonDocument = serde_json::from_str(json)?;
    parse_update(&doc)
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into find options.
pub fn parse_find_options_json(json: &str) -> Result<FindOptions, DbError> {
    let fo: FindOptionsSerde = serde_json::from_str(json)?;
    FindOptions::try_from(fo)
}
