//! Response envelope returned to clients.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownField,
    PrimitiveCannotNest,
    ComplexRequiresSelection,
    UnknownUnionMember,
    InvalidArgument,
    UnknownAction,
    NotFound,
    BackendError,
    MalformedRequest,
    DuplicateField,
    LoadDenied,
    SelectionTooDeep,
    /// A defect inside the core; never caused by the client.
    InternalError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownField => "unknown_field",
            Self::PrimitiveCannotNest => "primitive_cannot_nest",
            Self::ComplexRequiresSelection => "complex_requires_selection",
            Self::UnknownUnionMember => "unknown_union_member",
            Self::InvalidArgument => "invalid_argument",
            Self::UnknownAction => "unknown_action",
            Self::NotFound => "not_found",
            Self::BackendError => "backend_error",
            Self::MalformedRequest => "malformed_request",
            Self::DuplicateField => "duplicate_field",
            Self::LoadDenied => "load_denied",
            Self::SelectionTooDeep => "selection_too_deep",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error entry of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub kind: ErrorKind,
    pub message: String,
    /// Client-facing path to the offending selector or input key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

/// Success/error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorObject>>,
}

impl Response {
    pub fn success(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            errors: None,
        }
    }

    pub fn failure(errors: Vec<ErrorObject>) -> Self {
        Self {
            success: false,
            data: None,
            errors: Some(errors),
        }
    }

    /// First error kind, handy for assertions and logging.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.errors.as_ref().and_then(|errors| errors.first()).map(|error| error.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_envelope_serializes_snake_case_kind() {
        let response = Response::failure(vec![ErrorObject {
            kind: ErrorKind::PrimitiveCannotNest,
            message: "field 'title' is primitive".into(),
            path: vec!["title".into()],
        }]);
        let value = serde_json::to_value(&response).expect("serialize response");
        assert_eq!(
            value,
            json!({
                "success": false,
                "errors": [{"kind": "primitive_cannot_nest", "message": "field 'title' is primitive", "path": ["title"]}]
            })
        );
    }
}
