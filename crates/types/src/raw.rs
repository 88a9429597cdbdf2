//! Raw values produced by an action executor.
//!
//! Record keys are the same source identifiers used in the fetch plan. A field
//! the executor did not fetch is either absent from its record or carries the
//! explicit [`Datum::NotLoaded`] sentinel; both are distinct from `Null`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A record as returned by the executor, keyed by source field name.
pub type RawRecord = IndexMap<String, Datum>;

/// Recursive backend value with a not-fetched sentinel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Datum {
    /// The field was not part of the fetch.
    #[default]
    NotLoaded,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Datum>),
    Record(RawRecord),
}

impl Datum {
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, Self::NotLoaded)
    }

    pub fn as_record(&self) -> Option<&RawRecord> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Converts to JSON; nested `NotLoaded` sentinels become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::NotLoaded | Self::Null => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Number(number) => Value::Number(number.clone()),
            Self::String(text) => Value::String(text.clone()),
            Self::List(items) => Value::Array(items.iter().map(Datum::to_json).collect()),
            Self::Record(record) => Value::Object(record.iter().map(|(key, value)| (key.clone(), value.to_json())).collect()),
        }
    }
}

impl From<Value> for Datum {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::String(text),
            Value::Array(items) => Self::List(items.into_iter().map(Datum::from).collect()),
            Value::Object(map) => Self::Record(record_from_map(map)),
        }
    }
}

impl From<Datum> for Value {
    fn from(datum: Datum) -> Self {
        datum.to_json()
    }
}

/// Builds a raw record from a JSON object.
pub fn record_from_map(map: Map<String, Value>) -> RawRecord {
    map.into_iter().map(|(key, value)| (key, Datum::from(value))).collect()
}

/// Pagination metadata attached to a page of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PageMeta {
    Offset {
        limit: u64,
        offset: u64,
        has_more: bool,
        #[serde(default)]
        count: Option<u64>,
    },
    Keyset {
        limit: u64,
        #[serde(default)]
        after: Option<String>,
        #[serde(default)]
        before: Option<String>,
        has_more: bool,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        previous_page: Option<String>,
        #[serde(default)]
        next_page: Option<String>,
    },
}

/// A page of records plus its envelope metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    pub records: Vec<RawRecord>,
    pub meta: PageMeta,
}

/// Everything an executor can hand back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RawValue {
    Record(RawRecord),
    RecordList(Vec<RawRecord>),
    Page(RawPage),
    Scalar(Value),
    /// Untyped map passed through as-is.
    Map(Value),
    /// No value, e.g. a destroy or a lookup that matched nothing.
    Empty,
}

impl RawValue {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::RecordList(_) => "record_list",
            Self::Page(_) => "page",
            Self::Scalar(_) => "scalar",
            Self::Map(_) => "map",
            Self::Empty => "empty",
        }
    }
}
