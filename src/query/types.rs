use crate::document::values_equal;
use bson::{Bson, Document as BsonDocument};
use regex::Regex;
use serde::{Deserialize, Serialize};

// Safety limits to prevent resource abuse
pub(crate) const MAX_FILTER_DEPTH: usize = 64;
pub(crate) const MAX_SORT_FIELDS: usize = 32;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    #[must_use]
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), order: Order::Asc }
    }

    #[must_use]
    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), order: Order::Desc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Members of an `$in`/`$nin` set. Regex members match string values.
#[derive(Debug, Clone, Default)]
pub struct ValueSet {
    pub values: Vec<Bson>,
    pub patterns: Vec<Regex>,
}

impl ValueSet {
    #[must_use]
    pub fn from_values(values: Vec<Bson>) -> Self {
        Self { values, patterns: Vec::new() }
    }

    #[must_use]
    pub fn contains(&self, v: &Bson) -> bool {
        self.values.iter().any(|x| values_equal(x, v))
            || matches!(v, Bson::String(s) if self.patterns.iter().any(|re| re.is_match(s)))
    }

    #[must_use]
    pub fn contains_null(&self) -> bool {
        self.values.iter().any(|x| matches!(x, Bson::Null))
    }
}

/// A parsed `$expr` expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Bson),
    /// `"$path"` reference into the current document.
    Field(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// `$in: [needle, haystack]`
    In(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, set: ValueSet },
    Nin { path: String, set: ValueSet },
    Cmp { path: String, op: CmpOp, value: Bson },
    Regex { path: String, regex: Regex },
    Expr(Expr),
}

impl Filter {
    #[must_use]
    pub fn eq(path: &str, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.to_string(), op: CmpOp::Eq, value: value.into() }
    }

    #[must_use]
    pub fn cmp(path: &str, op: CmpOp, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.to_string(), op, value: value.into() }
    }
}

/// Condition selecting the array elements `$pull` removes.
#[derive(Debug, Clone)]
pub enum PullCond {
    Equals(Bson),
    In(ValueSet),
}

impl PullCond {
    #[must_use]
    pub fn matches(&self, v: &Bson) -> bool {
        match self {
            Self::Equals(x) => values_equal(x, v),
            Self::In(set) => set.contains(v),
        }
    }
}

#[derive(Debug, Clone)]
pub enum UpdateOp {
    Set { path: String, value: Bson },
    Unset { path: String },
    Inc { path: String, by: Bson },
    Push { path: String, values: Vec<Bson> },
    AddToSet { path: String, values: Vec<Bson> },
    Pull { path: String, cond: PullCond },
}

impl UpdateOp {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. }
            | Self::Unset { path }
            | Self::Inc { path, .. }
            | Self::Push { path, .. }
            | Self::AddToSet { path, .. }
            | Self::Pull { path, .. } => path,
        }
    }

    /// Position in the canonical application order: field writes before array mutators.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Set { .. } => 0,
            Self::Unset { .. } => 1,
            Self::Inc { .. } => 2,
            Self::Push { .. } => 3,
            Self::AddToSet { .. } => 4,
            Self::Pull { .. } => 5,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct UpdateDoc {
    pub ops: Vec<UpdateOp>,
}

impl UpdateDoc {
    /// Builds an update, ordering `ops` canonically.
    #[must_use]
    pub fn new(mut ops: Vec<UpdateOp>) -> Self {
        ops.sort_by_key(UpdateOp::rank);
        Self { ops }
    }

    #[must_use]
    pub fn set(path: &str, value: impl Into<Bson>) -> Self {
        Self::new(vec![UpdateOp::Set { path: path.to_string(), value: value.into() }])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Field selection shared by `find` and the `$project` stage.
#[derive(Debug, Clone)]
pub enum Projection {
    /// Keep only `paths` (and `_id` unless `keep_id` is false), then append `computed` fields.
    Include { paths: Vec<String>, computed: Vec<(String, Expr)>, keep_id: bool },
    /// Drop `paths`, keep everything else.
    Exclude { paths: Vec<String> },
}

/// Options for `find_docs`: filter → sort → skip → limit → project.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<SortSpec>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub projection: Option<Projection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnDocument {
    #[default]
    Before,
    After,
}

/// Options for `find_one_and_update` / `find_one_and_replace`.
#[derive(Debug, Clone, Default)]
pub struct FindOneAndModifyOptions {
    /// When non-empty, the first match in this order is modified instead of the first in
    /// collection order.
    pub sort: Vec<SortSpec>,
    pub projection: Option<Projection>,
    pub return_document: ReturnDocument,
}

impl FindOneAndModifyOptions {
    #[must_use]
    pub fn return_new() -> Self {
        Self { return_document: ReturnDocument::After, ..Self::default() }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u64,
}

/// One operation of a `bulk_write` batch.
#[derive(Debug, Clone)]
pub enum WriteModel {
    InsertOne { document: BsonDocument },
    UpdateOne { filter: Filter, update: UpdateDoc },
    UpdateMany { filter: Filter, update: UpdateDoc },
    ReplaceOne { filter: Filter, replacement: BsonDocument },
    DeleteOne { filter: Filter },
    DeleteMany { filter: Filter },
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BulkWriteReport {
    pub inserted_ids: Vec<crate::types::DocumentId>,
    pub matched: u64,
    pub modified: u64,
    pub deleted: u64,
}

impl BulkWriteReport {
    #[must_use]
    pub fn inserted_count(&self) -> usize {
        self.inserted_ids.len()
    }
}
