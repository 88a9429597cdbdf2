//! Template-driven projection of raw executor output.
//!
//! Extraction is a pure function of the raw value and the template. It never
//! fails: data that does not fit the template is a defect upstream, so it is
//! logged and rendered as `null`.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use sift_types::{Datum, PageMeta, RawPage, RawRecord, RawValue, ResultShape, UnionStorage};
use tracing::warn;

use crate::template::{ExtractionTemplate, Instruction, MemberTemplate, ValueTransform};

const UNION_TYPE_KEY: &str = "type";
const UNION_VALUE_KEY: &str = "value";

/// Records extracted from a raw value, before envelope formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Record(Value),
    Records(Vec<Value>),
    Page { results: Vec<Value>, meta: PageMeta },
    /// Scalar or untyped map passed through unchanged.
    Passthrough(Value),
    Nothing,
}

/// Why a raw value could not be matched to a result shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("executor returned {actual} for a {expected} result")]
pub struct ShapeMismatch {
    pub expected: &'static str,
    pub actual: &'static str,
}

/// Projects one record through `template`; the output has exactly the template's keys.
pub fn extract_record(record: &RawRecord, template: &ExtractionTemplate) -> Value {
    let mut output = Map::with_capacity(template.len());
    for (output_name, instruction) in template.iter() {
        let datum = record.get(instruction.source()).unwrap_or(&Datum::NotLoaded);
        output.insert(output_name.to_string(), apply(instruction, datum));
    }
    Value::Object(output)
}

/// Matches `raw` against the action's result shape and extracts it.
///
/// Empty results for record shapes are returned as [`Extracted::Nothing`];
/// the pipeline decides whether that means "not found".
pub fn extract_raw(raw: &RawValue, shape: &ResultShape, template: &ExtractionTemplate) -> Result<Extracted, ShapeMismatch> {
    let mismatch = |expected| ShapeMismatch {
        expected,
        actual: raw.kind_label(),
    };
    match shape {
        ResultShape::Record { .. } => match raw {
            RawValue::Record(record) => Ok(Extracted::Record(extract_record(record, template))),
            RawValue::Empty => Ok(Extracted::Nothing),
            RawValue::RecordList(_) | RawValue::Page(_) | RawValue::Scalar(_) | RawValue::Map(_) => Err(mismatch("record")),
        },
        ResultShape::Records { paginated, .. } => match raw {
            RawValue::RecordList(records) => Ok(Extracted::Records(extract_all(records, template))),
            RawValue::Page(page) => Ok(extract_page(page, template)),
            RawValue::Empty if !paginated => Ok(Extracted::Records(Vec::new())),
            RawValue::Empty | RawValue::Record(_) | RawValue::Scalar(_) | RawValue::Map(_) => Err(mismatch("record list")),
        },
        ResultShape::Passthrough => match raw {
            RawValue::Scalar(value) | RawValue::Map(value) => Ok(Extracted::Passthrough(value.clone())),
            RawValue::Empty => Ok(Extracted::Passthrough(Value::Null)),
            RawValue::Record(_) | RawValue::RecordList(_) | RawValue::Page(_) => Err(mismatch("scalar")),
        },
        ResultShape::Nothing => Ok(Extracted::Nothing),
    }
}

fn extract_all(records: &[RawRecord], template: &ExtractionTemplate) -> Vec<Value> {
    records.iter().map(|record| extract_record(record, template)).collect()
}

fn extract_page(page: &RawPage, template: &ExtractionTemplate) -> Extracted {
    Extracted::Page {
        results: extract_all(&page.records, template),
        meta: page.meta.clone(),
    }
}

fn apply(instruction: &Instruction, datum: &Datum) -> Value {
    if matches!(datum, Datum::NotLoaded | Datum::Null) {
        return Value::Null;
    }
    match instruction {
        Instruction::Extract { .. } => datum.to_json(),
        Instruction::Nested { source, template } | Instruction::CalcResult { source, template } => nested(source, datum, template),
        Instruction::Array { inner } => match datum {
            Datum::List(items) => Value::Array(items.iter().map(|item| apply(inner, item)).collect()),
            _ => {
                warn!(source = %instruction.source(), defect = true, "expected a collection; rendering null");
                Value::Null
            }
        },
        Instruction::UnionSelect { source, storage, members } => union_select(source, storage, members, datum),
        Instruction::Transform { source, transform } => apply_transform(source, transform, datum),
    }
}

fn nested(source: &str, datum: &Datum, template: &ExtractionTemplate) -> Value {
    match datum {
        Datum::Record(record) => extract_record(record, template),
        Datum::List(items) => Value::Array(items.iter().map(|item| nested(source, item, template)).collect()),
        Datum::NotLoaded | Datum::Null => Value::Null,
        Datum::Bool(_) | Datum::Number(_) | Datum::String(_) => {
            warn!(source = %source, defect = true, "expected a record; rendering null");
            Value::Null
        }
    }
}

fn union_select(source: &str, storage: &UnionStorage, members: &IndexMap<String, MemberTemplate>, datum: &Datum) -> Value {
    let Some((tag, payload)) = active_member(storage, datum) else {
        warn!(source = %source, defect = true, "union value carries no readable tag; rendering null");
        return Value::Null;
    };
    let mut output = Map::new();
    let Some(member) = members.get(tag) else {
        return Value::Object(output);
    };
    let value = match (&member.template, payload) {
        (None, payload) => payload.to_json(),
        (Some(_), Datum::NotLoaded | Datum::Null) => Value::Null,
        (Some(template), Datum::Record(record)) => extract_record(record, template),
        (Some(_), _) => {
            warn!(source = %source, tag = %tag, defect = true, "structured union member is not a record; rendering null");
            Value::Null
        }
    };
    output.insert(member.output_name.clone(), value);
    Value::Object(output)
}

/// Stored tag and payload of a union value.
fn active_member<'d>(storage: &UnionStorage, datum: &'d Datum) -> Option<(&'d str, &'d Datum)> {
    let record = datum.as_record()?;
    match storage {
        UnionStorage::TypeAndValue => {
            let tag = record.get(UNION_TYPE_KEY)?.as_str()?;
            Some((tag, record.get(UNION_VALUE_KEY).unwrap_or(&Datum::Null)))
        }
        UnionStorage::MapWithTag { tag_field } => Some((record.get(tag_field)?.as_str()?, datum)),
    }
}

fn apply_transform(source: &str, transform: &ValueTransform, datum: &Datum) -> Value {
    match transform {
        ValueTransform::Stringify => match datum {
            Datum::Number(number) => Value::String(number.to_string()),
            Datum::Bool(flag) => Value::String(flag.to_string()),
            other => other.to_json(),
        },
        ValueTransform::TupleToObject { fields } => {
            let Datum::List(items) = datum else {
                warn!(source = %source, defect = true, "tuple transform expects a list; rendering null");
                return Value::Null;
            };
            let object = fields
                .iter()
                .enumerate()
                .map(|(index, field)| (field.clone(), items.get(index).map_or(Value::Null, Datum::to_json)))
                .collect();
            Value::Object(object)
        }
    }
}
