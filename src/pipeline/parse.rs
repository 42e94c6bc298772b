use crate::config::QueryConfig;
use crate::errors::DbError;
use crate::query::{parse_expr, parse_filter_with, parse_projection, parse_sort};
use crate::types::ID_FIELD;
use crate::utils::num::bson_to_usize;
use bson::{Bson, Document as BsonDocument};

use super::types::{Accumulator, GroupStage, Pipeline, Stage, UnwindStage};

fn field_ref(stage: &str, v: &Bson) -> Result<String, String> {
    match v {
        Bson::String(s) if s.len() > 1 && s.starts_with('$') && !s.starts_with("$$") => {
            Ok(s[1..].to_string())
        }
        _ => Err(format!("{stage} requires a '$field' path")),
    }
}

fn parse_unwind(v: &Bson) -> Result<UnwindStage, String> {
    match v {
        Bson::String(_) => {
            Ok(UnwindStage { path: field_ref("$unwind", v)?, preserve_null_and_empty: false })
        }
        Bson::Document(d) => {
            let mut path = None;
            let mut preserve = false;
            for (k, v) in d {
                match k.as_str() {
                    "path" => path = Some(field_ref("$unwind", v)?),
                    "preserveNullAndEmptyArrays" => match v {
                        Bson::Boolean(b) => preserve = *b,
                        _ => return Err("preserveNullAndEmptyArrays must be a boolean".into()),
                    },
                    other => return Err(format!("unsupported $unwind option '{other}'")),
                }
            }
            let path = path.ok_or("$unwind requires 'path'")?;
            Ok(UnwindStage { path, preserve_null_and_empty: preserve })
        }
        _ => Err("$unwind requires a field path or an options document".into()),
    }
}

fn parse_accumulator(field: &str, v: &Bson) -> Result<Accumulator, String> {
    let Bson::Document(d) = v else {
        return Err(format!("$group field '{field}' must be an accumulator document"));
    };
    let mut it = d.iter();
    let (Some((op, arg)), None) = (it.next(), it.next()) else {
        return Err(format!("$group field '{field}' must name exactly one accumulator"));
    };
    let e = parse_expr(arg)?;
    Ok(match op.as_str() {
        "$first" => Accumulator::First(e),
        "$last" => Accumulator::Last(e),
        "$avg" => Accumulator::Avg(e),
        "$sum" => Accumulator::Sum(e),
        "$min" => Accumulator::Min(e),
        "$max" => Accumulator::Max(e),
        "$push" => Accumulator::Push(e),
        "$addToSet" => Accumulator::AddToSet(e),
        other => return Err(format!("unknown accumulator '{other}'")),
    })
}

fn parse_group(v: &Bson) -> Result<GroupStage, String> {
    let Bson::Document(d) = v else {
        return Err("$group requires a document".into());
    };
    let key = parse_expr(d.get(ID_FIELD).ok_or("$group requires an _id")?)?;
    let mut accumulators = Vec::with_capacity(d.len().saturating_sub(1));
    for (field, spec) in d {
        if field == ID_FIELD {
            continue;
        }
        if field.starts_with('$') || field.contains('.') {
            return Err(format!("invalid $group output field '{field}'"));
        }
        accumulators.push((field.clone(), parse_accumulator(field, spec)?));
    }
    Ok(GroupStage { key, accumulators })
}

fn parse_stage(stage: &BsonDocument, cfg: &QueryConfig) -> Result<Stage, String> {
    let mut it = stage.iter();
    let (Some((name, v)), None) = (it.next(), it.next()) else {
        return Err("each stage must have exactly one operator".into());
    };
    let as_doc = |v: &Bson| match v {
        Bson::Document(d) => Ok(d.clone()),
        _ => Err(format!("{name} requires a document")),
    };
    Ok(match name.as_str() {
        "$unwind" => Stage::Unwind(parse_unwind(v)?),
        "$match" => Stage::Match(parse_filter_with(&as_doc(v)?, cfg).map_err(|e| e.to_string())?),
        "$group" => Stage::Group(parse_group(v)?),
        "$sort" => {
            let spec = as_doc(v)?;
            if spec.is_empty() {
                return Err("$sort requires at least one field".into());
            }
            Stage::Sort(parse_sort(&spec)?)
        }
        "$project" => {
            let spec = as_doc(v)?;
            if spec.is_empty() {
                return Err("$project requires at least one field".into());
            }
            Stage::Project(parse_projection(&spec)?)
        }
        "$limit" => match bson_to_usize(v) {
            Some(n) if n > 0 => Stage::Limit(n),
            _ => return Err("$limit requires a positive integer".into()),
        },
        "$skip" => Stage::Skip(bson_to_usize(v).ok_or("$skip requires a non-negative integer")?),
        "$count" => match v {
            Bson::String(s) if !s.is_empty() && !s.starts_with('$') && !s.contains('.') => {
                Stage::Count(s.clone())
            }
            _ => return Err("$count requires a non-empty field name".into()),
        },
        other => return Err(format!("unknown stage '{other}'")),
    })
}

/// Parses a pipeline using default limits.
///
/// # Errors
/// Returns `MalformedPipeline` for an unknown stage or malformed stage arguments.
pub fn parse_pipeline(stages: &[BsonDocument]) -> Result<Pipeline, DbError> {
    parse_pipeline_with(stages, &QueryConfig::default())
}

/// # Errors
/// Returns `MalformedPipeline` for an unknown stage, malformed stage arguments, or more
/// stages than `cfg.max_pipeline_stages`.
pub fn parse_pipeline_with(stages: &[BsonDocument], cfg: &QueryConfig) -> Result<Pipeline, DbError> {
    if stages.len() > cfg.max_pipeline_stages {
        return Err(DbError::MalformedPipeline(format!(
            "{} stages exceeds the limit of {}",
            stages.len(),
            cfg.max_pipeline_stages
        )));
    }
    let stages = stages
        .iter()
        .enumerate()
        .map(|(i, s)| {
            parse_stage(s, cfg).map_err(|e| DbError::MalformedPipeline(format!("stage {i}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Pipeline { stages })
}

/// # Errors
/// Returns an error if the JSON is not an array of stage objects or a stage is malformed.
pub fn parse_pipeline_json(json: &str) -> Result<Pipeline, DbError> {
    let stages: Vec<BsonDocument> = serde_json::from_str(json)?;
    parse_pipeline(&stages)
}
