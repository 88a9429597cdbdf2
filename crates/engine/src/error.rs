//! Error taxonomy of the request pipeline.

use std::fmt;

use sift_types::{ErrorKind, ErrorObject};
use thiserror::Error;

/// Client-facing location of a selector or input key inside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path extended by `segment`.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}

impl From<Vec<&str>> for FieldPath {
    fn from(segments: Vec<&str>) -> Self {
        Self(segments.into_iter().map(str::to_string).collect())
    }
}

/// A request rejected before any backend work happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at {path})")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub path: FieldPath,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    pub fn unknown_field(path: FieldPath, name: &str, schema: &str) -> Self {
        Self::new(ErrorKind::UnknownField, path, format!("unknown field '{name}' on '{schema}'"))
    }

    pub fn primitive_cannot_nest(path: FieldPath, name: &str) -> Self {
        Self::new(
            ErrorKind::PrimitiveCannotNest,
            path,
            format!("field '{name}' is primitive and cannot take a nested selection"),
        )
    }

    pub fn complex_requires_selection(path: FieldPath, name: &str) -> Self {
        Self::new(
            ErrorKind::ComplexRequiresSelection,
            path,
            format!("field '{name}' is complex and requires a non-empty field selection"),
        )
    }

    pub fn unknown_union_member(path: FieldPath, member: &str, field: &str) -> Self {
        Self::new(ErrorKind::UnknownUnionMember, path, format!("union '{field}' has no member '{member}'"))
    }

    pub fn invalid_argument(path: FieldPath, argument: &str, reason: impl fmt::Display) -> Self {
        Self::new(ErrorKind::InvalidArgument, path, format!("invalid argument '{argument}': {reason}"))
    }

    pub fn malformed(path: FieldPath, reason: impl fmt::Display) -> Self {
        Self::new(ErrorKind::MalformedRequest, path, format!("malformed request: {reason}"))
    }

    pub fn duplicate_field(path: FieldPath, name: &str) -> Self {
        Self::new(ErrorKind::DuplicateField, path, format!("field '{name}' is selected more than once"))
    }

    pub fn load_denied(path: FieldPath, load_path: &str) -> Self {
        Self::new(ErrorKind::LoadDenied, path, format!("loading '{load_path}' is not allowed for this action"))
    }

    pub fn selection_too_deep(path: FieldPath, max_depth: usize) -> Self {
        Self::new(
            ErrorKind::SelectionTooDeep,
            path,
            format!("field selection is nested deeper than the limit of {max_depth}"),
        )
    }

    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject {
            kind: self.kind,
            message: self.message.clone(),
            path: self.path.segments().to_vec(),
        }
    }
}

/// Any reason a pipeline run terminates without data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("action '{0}' is not exposed")]
    UnknownAction(String),

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("backend error ({code}): {message}")]
    Backend { code: String, message: String, path: Vec<String> },

    /// A defect in the core, never caused by the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(error) => error.kind,
            Self::UnknownAction(_) => ErrorKind::UnknownAction,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Backend { .. } => ErrorKind::BackendError,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    pub fn to_error_object(&self) -> ErrorObject {
        match self {
            Self::Validation(error) => error.to_error_object(),
            Self::UnknownAction(_) | Self::NotFound { .. } | Self::Internal(_) => ErrorObject {
                kind: self.kind(),
                message: self.to_string(),
                path: Vec::new(),
            },
            Self::Backend { message, path, .. } => ErrorObject {
                kind: ErrorKind::BackendError,
                message: message.clone(),
                path: path.clone(),
            },
        }
    }
}
