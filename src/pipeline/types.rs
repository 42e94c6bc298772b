use crate::query::{Expr, Filter, Projection, SortSpec};

/// An ordered sequence of stages; each consumes the whole output of the previous one.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone)]
pub enum Stage {
    Unwind(UnwindStage),
    Match(Filter),
    Group(GroupStage),
    Sort(Vec<SortSpec>),
    Project(Projection),
    /// Always greater than zero.
    Limit(usize),
    Skip(usize),
    /// Emits `{<name>: n}`, or nothing for an empty input.
    Count(String),
}

impl Stage {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unwind(_) => "$unwind",
            Self::Match(_) => "$match",
            Self::Group(_) => "$group",
            Self::Sort(_) => "$sort",
            Self::Project(_) => "$project",
            Self::Limit(_) => "$limit",
            Self::Skip(_) => "$skip",
            Self::Count(_) => "$count",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnwindStage {
    pub path: String,
    pub preserve_null_and_empty: bool,
}

#[derive(Debug, Clone)]
pub struct GroupStage {
    pub key: Expr,
    /// Output field name and accumulator, in stage order.
    pub accumulators: Vec<(String, Accumulator)>,
}

#[derive(Debug, Clone)]
pub enum Accumulator {
    First(Expr),
    Last(Expr),
    Avg(Expr),
    Sum(Expr),
    Min(Expr),
    Max(Expr),
    Push(Expr),
    AddToSet(Expr),
}

impl Accumulator {
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        match self {
            Self::First(e)
            | Self::Last(e)
            | Self::Avg(e)
            | Self::Sum(e)
            | Self::Min(e)
            | Self::Max(e)
            | Self::Push(e)
            | Self::AddToSet(e) => e,
        }
    }
}
