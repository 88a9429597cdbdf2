//! Actions exposed to RPC clients.

use serde::{Deserialize, Serialize};

use crate::schema::{ArgumentDefinition, Cardinality, PrimitiveType};

/// Pagination modes an action supports.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationSupport {
    #[serde(default)]
    pub offset: bool,
    #[serde(default)]
    pub keyset: bool,
    /// Limit applied when the client does not send one.
    #[serde(default)]
    pub default_limit: Option<u64>,
    /// Upper bound on a client supplied limit.
    #[serde(default)]
    pub max_limit: Option<u64>,
}

/// Return type of a generic action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActionReturn {
    /// Records of a resource; requires a field selection.
    Resource {
        resource: String,
        #[serde(default)]
        cardinality: Cardinality,
    },
    /// Values of an embedded type; requires a field selection.
    Embedded {
        schema: String,
        #[serde(default)]
        cardinality: Cardinality,
    },
    /// A plain value passed through unchanged.
    Scalar {
        #[serde(rename = "type")]
        value_type: PrimitiveType,
    },
    /// A map whose shape the schema does not describe.
    UntypedMap,
    Nothing,
}

/// What an action does, which determines the result shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActionKind {
    Read {
        /// Single-record lookup rather than a list.
        #[serde(default)]
        get: bool,
        #[serde(default)]
        pagination: Option<PaginationSupport>,
    },
    Create,
    Update,
    Destroy,
    Generic { returns: ActionReturn },
}

/// How a raw executor result must be shaped for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    /// A single record of `schema`.
    Record { schema: String },
    /// A list of records of `schema`, optionally wrapped in a page envelope.
    Records { schema: String, paginated: bool },
    /// Scalar or untyped map; selection must be empty and the value passes through.
    Passthrough,
    /// No data; selection must be empty.
    Nothing,
}

impl ResultShape {
    /// Schema the selection is validated against, if any.
    pub fn schema(&self) -> Option<&str> {
        match self {
            Self::Record { schema } | Self::Records { schema, .. } => Some(schema.as_str()),
            Self::Passthrough | Self::Nothing => None,
        }
    }
}

/// One action exposed over RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Name clients use to call the action.
    pub name: String,
    /// Resource the action belongs to.
    pub resource: String,
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Accepted input arguments.
    #[serde(default)]
    pub arguments: Vec<ArgumentDefinition>,
    /// Dotted source paths (`author.posts`) that clients may not load.
    #[serde(default)]
    pub denied_loads: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ActionSpec {
    /// Derives the result shape from the action kind.
    pub fn result_shape(&self) -> ResultShape {
        match &self.kind {
            ActionKind::Read { get: true, .. } | ActionKind::Create | ActionKind::Update => ResultShape::Record {
                schema: self.resource.clone(),
            },
            ActionKind::Read { get: false, pagination } => ResultShape::Records {
                schema: self.resource.clone(),
                paginated: pagination.is_some(),
            },
            ActionKind::Destroy => ResultShape::Nothing,
            ActionKind::Generic { returns } => match returns {
                ActionReturn::Resource { resource: schema, cardinality }
                | ActionReturn::Embedded { schema, cardinality } => match cardinality {
                    Cardinality::One => ResultShape::Record { schema: schema.clone() },
                    Cardinality::Many => ResultShape::Records {
                        schema: schema.clone(),
                        paginated: false,
                    },
                },
                ActionReturn::Scalar { .. } | ActionReturn::UntypedMap => ResultShape::Passthrough,
                ActionReturn::Nothing => ResultShape::Nothing,
            },
        }
    }

    /// Whether an empty result means the requested record does not exist.
    pub fn is_single_record_lookup(&self) -> bool {
        matches!(self.kind, ActionKind::Read { get: true, .. } | ActionKind::Update)
    }

    pub fn pagination(&self) -> Option<&PaginationSupport> {
        match &self.kind {
            ActionKind::Read { pagination, .. } => pagination.as_ref(),
            ActionKind::Create | ActionKind::Update | ActionKind::Destroy | ActionKind::Generic { .. } => None,
        }
    }
}
