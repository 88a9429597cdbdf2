//! Action executor seam.
//!
//! The engine never fetches data itself. An [`ActionExecutor`] receives the
//! compiled [`FetchPlan`] and validated input, runs the backend action and
//! hands back a [`RawValue`] keyed by the plan's source names.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sift_types::{ActionSpec, PageRequest, RawValue};
use thiserror::Error;

use crate::plan::FetchPlan;

/// Validated action input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionInput {
    /// Cast input keyed by source argument name.
    pub input: Map<String, Value>,
    /// Page window with defaults applied.
    pub page: Option<PageRequest>,
    pub identity: Option<Value>,
    /// Opaque executor arguments such as filter and sort.
    pub arguments: Map<String, Value>,
}

/// Failure reported by an executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{code}: {message}")]
    Failure { code: String, message: String, path: Vec<String> },
}

impl BackendError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failure {
            code: code.into(),
            message: message.into(),
            path: Vec::new(),
        }
    }
}

/// Runs one action against the backend.
///
/// Implementations are shared across concurrent requests.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &ActionSpec, plan: &FetchPlan, input: &ExecutionInput) -> Result<RawValue, BackendError>;
}

/// Executor that answers every call with the same recorded value.
///
/// Used to replay captured backend results and in tests.
#[derive(Debug, Clone)]
pub struct ReplayExecutor {
    result: Result<RawValue, BackendError>,
}

impl ReplayExecutor {
    pub fn new(result: Result<RawValue, BackendError>) -> Self {
        Self { result }
    }

    pub fn returning(raw: RawValue) -> Self {
        Self::new(Ok(raw))
    }
}

#[async_trait]
impl ActionExecutor for ReplayExecutor {
    async fn execute(&self, action: &ActionSpec, plan: &FetchPlan, _input: &ExecutionInput) -> Result<RawValue, BackendError> {
        tracing::debug!(action = %action.name, select = plan.select.len(), load = plan.load.len(), "replaying recorded result");
        self.result.clone()
    }
}
