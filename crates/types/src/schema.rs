//! Resource schema definitions.
//!
//! A schema is a named, ordered list of [`FieldDefinition`]s. Resources and
//! embedded types share one namespace: every reference between schema nodes
//! (relation targets, embedded types, structured calculation returns, union
//! members) is a schema name that is resolved through the schema provider at
//! each recursion step. Cyclic schemas are therefore representable without
//! materialising a cyclic object graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Atomic value types understood by argument casting and primitive fields.
///
/// Manifests spell most types as a bare name (`type: string`); enums list
/// their values (`type: { enum: [draft, published] }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrimitiveTypeRepr", into = "PrimitiveTypeRepr")]
pub enum PrimitiveType {
    String,
    Integer,
    Float,
    /// Arbitrary precision number; travels as a string on the wire.
    Decimal,
    Boolean,
    Uuid,
    /// Calendar date in `YYYY-MM-DD` form.
    Date,
    /// RFC 3339 timestamp.
    DateTime,
    /// Untyped JSON object whose shape is unknown to the schema.
    Map,
    /// String restricted to a fixed set of values.
    Enum { values: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PrimitiveTypeRepr {
    Named(String),
    Enum {
        #[serde(rename = "enum")]
        values: Vec<String>,
    },
}

impl TryFrom<PrimitiveTypeRepr> for PrimitiveType {
    type Error = String;

    fn try_from(repr: PrimitiveTypeRepr) -> Result<Self, Self::Error> {
        let name = match repr {
            PrimitiveTypeRepr::Enum { values } => return Ok(Self::Enum { values }),
            PrimitiveTypeRepr::Named(name) => name,
        };
        match name.as_str() {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "decimal" => Ok(Self::Decimal),
            "boolean" => Ok(Self::Boolean),
            "uuid" => Ok(Self::Uuid),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "map" => Ok(Self::Map),
            other => Err(format!("unknown primitive type '{other}'")),
        }
    }
}

impl From<PrimitiveType> for PrimitiveTypeRepr {
    fn from(value: PrimitiveType) -> Self {
        match value {
            PrimitiveType::Enum { values } => Self::Enum { values },
            other => Self::Named(other.label().to_string()),
        }
    }
}

impl PrimitiveType {
    /// Short human readable name used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Map => "map",
            Self::Enum { .. } => "enum",
        }
    }
}

/// Whether a field holds a single value or a collection of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

impl Cardinality {
    pub fn is_many(self) -> bool {
        matches!(self, Self::Many)
    }
}

/// Output transformation applied to a primitive value during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TransformSpec {
    /// Render numbers as strings so clients do not lose precision.
    Stringify,
    /// Turn a positional array into an object keyed by `fields` (source names).
    TupleToObject { fields: Vec<String> },
}

/// Declared argument of a calculation or an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    /// Source name of the argument.
    pub name: String,
    /// Expected value type.
    #[serde(rename = "type")]
    pub value_type: PrimitiveType,
    /// When true the argument is a list of `value_type`.
    #[serde(default)]
    pub array: bool,
    /// Missing required arguments without a default are rejected.
    #[serde(default)]
    pub required: bool,
    /// Whether an explicit `null` is accepted.
    #[serde(default = "default_allow_nil")]
    pub allow_nil: bool,
    /// Value used when the client omits the argument.
    #[serde(default)]
    pub default: Option<Value>,
}

fn default_allow_nil() -> bool {
    true
}

/// What a calculation produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CalculationReturn {
    /// A plain value; selected by name, never nested.
    Scalar {
        #[serde(rename = "type")]
        value_type: PrimitiveType,
        #[serde(default)]
        cardinality: Cardinality,
    },
    /// A record shaped by another schema; requires its own field selection.
    Structured {
        schema: String,
        #[serde(default)]
        cardinality: Cardinality,
    },
}

/// A computed field, optionally parameterised by arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationSpec {
    #[serde(default)]
    pub arguments: Vec<ArgumentDefinition>,
    pub returns: CalculationReturn,
}

/// Aggregate function computed over a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Count,
    Exists,
    Sum,
    Min,
    Max,
    Avg,
    First,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub aggregate: AggregateKind,
    /// Type of the aggregated value (element type for `list`).
    #[serde(rename = "type")]
    pub value_type: PrimitiveType,
}

impl AggregateSpec {
    /// `list` aggregates produce collections; every other aggregate is a scalar.
    pub fn cardinality(&self) -> Cardinality {
        match self.aggregate {
            AggregateKind::List => Cardinality::Many,
            AggregateKind::Count
            | AggregateKind::Exists
            | AggregateKind::Sum
            | AggregateKind::Min
            | AggregateKind::Max
            | AggregateKind::Avg
            | AggregateKind::First => Cardinality::One,
        }
    }
}

/// Shape of one union member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnionMemberShape {
    /// Atomic payload; the member is selected by its bare tag.
    Primitive {
        #[serde(rename = "type")]
        value_type: PrimitiveType,
    },
    /// Structured payload shaped by an embedded schema.
    Embedded { schema: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionMember {
    #[serde(flatten)]
    pub shape: UnionMemberShape,
    /// Discriminant value stored by the backend; defaults to the member name.
    #[serde(default)]
    pub tag_value: Option<String>,
}

impl UnionMember {
    pub fn stored_tag<'a>(&'a self, member_name: &'a str) -> &'a str {
        self.tag_value.as_deref().unwrap_or(member_name)
    }
}

/// How the backend encodes the active member of a union value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnionStorage {
    /// `{"type": <tag>, "value": <payload>}`.
    #[default]
    TypeAndValue,
    /// The payload is a map that carries its own tag under `tag_field`.
    MapWithTag { tag_field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionSpec {
    pub members: IndexMap<String, UnionMember>,
    #[serde(default)]
    pub storage: UnionStorage,
    #[serde(default)]
    pub cardinality: Cardinality,
}

/// The single kind of a field. Every consumer matches this exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldKind {
    Primitive {
        #[serde(rename = "type")]
        value_type: PrimitiveType,
        #[serde(default)]
        cardinality: Cardinality,
        #[serde(default)]
        transform: Option<TransformSpec>,
    },
    Relation {
        target: String,
        #[serde(default)]
        cardinality: Cardinality,
    },
    Calculation(CalculationSpec),
    Aggregate(AggregateSpec),
    Embedded {
        schema: String,
        #[serde(default)]
        cardinality: Cardinality,
    },
    Union(UnionSpec),
}

impl FieldKind {
    /// Name of the kind as used in diagnostics and manifests.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primitive { .. } => "primitive",
            Self::Relation { .. } => "relation",
            Self::Calculation(_) => "calculation",
            Self::Aggregate(_) => "aggregate",
            Self::Embedded { .. } => "embedded",
            Self::Union(_) => "union",
        }
    }

    /// Schema names this kind points at, used for reference validation.
    pub fn referenced_schemas(&self) -> Vec<&str> {
        match self {
            Self::Primitive { .. } | Self::Aggregate(_) => Vec::new(),
            Self::Relation { target, .. } => vec![target.as_str()],
            Self::Embedded { schema, .. } => vec![schema.as_str()],
            Self::Calculation(calculation) => match &calculation.returns {
                CalculationReturn::Scalar { .. } => Vec::new(),
                CalculationReturn::Structured { schema, .. } => vec![schema.as_str()],
            },
            Self::Union(union) => union
                .members
                .values()
                .filter_map(|member| match &member.shape {
                    UnionMemberShape::Primitive { .. } => None,
                    UnionMemberShape::Embedded { schema } => Some(schema.as_str()),
                })
                .collect(),
        }
    }
}

/// One field of a resource or embedded type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Source (backend) name of the field.
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Explicit client-facing name overriding the naming convention.
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Ordered field set of one schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }
}
