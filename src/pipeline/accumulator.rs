use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::Accumulator;
use crate::document::{add_numbers, as_f64, is_numeric, sort_cmp, values_equal};
use crate::query::eval_expr;

/// Running state of one accumulator within one group.
#[derive(Debug, Clone)]
pub(crate) enum AccState {
    /// `None` until the first document is seen.
    First(Option<Bson>),
    Last(Bson),
    Avg { sum: f64, count: u64 },
    Sum(Bson),
    Min(Option<Bson>),
    Max(Option<Bson>),
    Push(Vec<Bson>),
    AddToSet(Vec<Bson>),
}

impl AccState {
    pub(crate) const fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::First(_) => Self::First(None),
            Accumulator::Last(_) => Self::Last(Bson::Null),
            Accumulator::Avg(_) => Self::Avg { sum: 0.0, count: 0 },
            Accumulator::Sum(_) => Self::Sum(Bson::Int32(0)),
            Accumulator::Min(_) => Self::Min(None),
            Accumulator::Max(_) => Self::Max(None),
            Accumulator::Push(_) => Self::Push(Vec::new()),
            Accumulator::AddToSet(_) => Self::AddToSet(Vec::new()),
        }
    }

    pub(crate) fn update(&mut self, acc: &Accumulator, doc: &BsonDocument) {
        let value = eval_expr(doc, acc.expr());
        match self {
            Self::First(slot) => {
                if slot.is_none() {
                    *slot = Some(value.unwrap_or(Bson::Null));
                }
            }
            Self::Last(slot) => *slot = value.unwrap_or(Bson::Null),
            Self::Avg { sum, count } => {
                if let Some(f) = value.as_ref().filter(|v| is_numeric(v)).and_then(as_f64) {
                    *sum += f;
                    *count += 1;
                }
            }
            Self::Sum(total) => {
                if let Some(v) = value.filter(is_numeric)
                    && let Some(next) = add_numbers(total, &v)
                {
                    *total = next;
                }
            }
            Self::Min(best) => keep_extreme(best, value, Ordering::Less),
            Self::Max(best) => keep_extreme(best, value, Ordering::Greater),
            Self::Push(items) => {
                if let Some(v) = value {
                    items.push(v);
                }
            }
            Self::AddToSet(items) => {
                if let Some(v) = value
                    && !items.iter().any(|x| values_equal(x, &v))
                {
                    items.push(v);
                }
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn finish(self) -> Bson {
        match self {
            Self::First(v) | Self::Min(v) | Self::Max(v) => v.unwrap_or(Bson::Null),
            Self::Last(v) | Self::Sum(v) => v,
            Self::Avg { count: 0, .. } => Bson::Null,
            Self::Avg { sum, count } => Bson::Double(sum / count as f64),
            Self::Push(items) | Self::AddToSet(items) => Bson::Array(items),
        }
    }
}

// Missing and null values never win.
fn keep_extreme(best: &mut Option<Bson>, candidate: Option<Bson>, want: Ordering) {
    let Some(v) = candidate.filter(|v| !matches!(v, Bson::Null | Bson::Undefined)) else {
        return;
    };
    if best.as_ref().is_none_or(|b| sort_cmp(Some(&v), Some(b)) == want) {
        *best = Some(v);
    }
}
