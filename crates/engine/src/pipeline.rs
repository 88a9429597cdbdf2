//! Request pipeline.
//!
//! A request moves strictly forward through four stages, each consuming the
//! previous stage's value:
//!
//! 1. [`Pipeline::parse_request`] resolves the action, parses and compiles
//!    the selection and validates input. Nothing reaches the executor unless
//!    this stage succeeds.
//! 2. [`Pipeline::execute_action`] hands the plan to the executor and
//!    normalises "not found" failures.
//! 3. [`Pipeline::process_result`] extracts the raw value through the
//!    template. Failures here are defects, not client errors.
//! 4. [`Pipeline::format_output`] builds the success envelope.

use std::sync::Arc;

use sift_registry::{SchemaProvider, SiftConfig};
use sift_types::{ActionSpec, ClientRequest, ErrorKind, RawValue, Response, ResultShape};
use tracing::{debug, error, info, warn};

use crate::{
    compile::{CompileOptions, CompiledSelection, compile},
    error::{FieldPath, PipelineError, ValidationError},
    executor::{ActionExecutor, BackendError, ExecutionInput},
    extract::{Extracted, extract_raw},
    format::{format_error, format_success},
    input::{validate_input, validate_page},
    selection::parse_selection,
};

/// Per-process pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_selection_depth: usize,
    /// Backend failure codes reported to clients as `not_found`.
    pub not_found_codes: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        SiftConfig::default().into()
    }
}

impl From<&SiftConfig> for PipelineOptions {
    fn from(config: &SiftConfig) -> Self {
        Self {
            max_selection_depth: config.max_selection_depth,
            not_found_codes: config.not_found_codes.clone(),
        }
    }
}

impl From<SiftConfig> for PipelineOptions {
    fn from(config: SiftConfig) -> Self {
        Self::from(&config)
    }
}

/// Output of the parse stage: everything needed to run the action.
#[derive(Debug)]
pub struct ParsedRequest<'p> {
    pub action: &'p ActionSpec,
    pub shape: ResultShape,
    pub compiled: CompiledSelection,
    pub input: ExecutionInput,
}

/// Output of the execute stage.
#[derive(Debug)]
pub struct ExecutedAction<'p> {
    pub parsed: ParsedRequest<'p>,
    pub raw: RawValue,
}

/// Output of the process stage.
#[derive(Debug)]
pub struct ProcessedResult {
    pub extracted: Extracted,
}

/// Validates, executes and shapes client requests.
///
/// A pipeline holds only shared read-only state and may serve any number of
/// concurrent requests.
pub struct Pipeline {
    provider: Arc<dyn SchemaProvider>,
    executor: Arc<dyn ActionExecutor>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn SchemaProvider>, executor: Arc<dyn ActionExecutor>) -> Self {
        Self::with_options(provider, executor, PipelineOptions::default())
    }

    pub fn with_options(provider: Arc<dyn SchemaProvider>, executor: Arc<dyn ActionExecutor>, options: PipelineOptions) -> Self {
        Self {
            provider,
            executor,
            options,
        }
    }

    pub fn provider(&self) -> &dyn SchemaProvider {
        self.provider.as_ref()
    }

    /// Runs the full pipeline and always answers with an envelope.
    pub async fn run(&self, request: &ClientRequest) -> Response {
        info!(action = %request.action, "handling request");
        match self.try_run(request).await {
            Ok(response) => response,
            Err(failure) => self.fail(&request.action, failure),
        }
    }

    /// Parse stage only; the executor is never called.
    pub fn validate(&self, request: &ClientRequest) -> Response {
        match self.parse_request(request) {
            Ok(_) => Response::success(None),
            Err(failure) => self.fail(&request.action, failure),
        }
    }

    async fn try_run(&self, request: &ClientRequest) -> Result<Response, PipelineError> {
        let parsed = self.parse_request(request)?;
        let executed = self.execute_action(parsed).await?;
        let processed = self.process_result(executed)?;
        Ok(self.format_output(processed))
    }

    pub fn parse_request(&self, request: &ClientRequest) -> Result<ParsedRequest<'_>, PipelineError> {
        let Some(action) = self.provider.get_action(&request.action) else {
            return Err(PipelineError::UnknownAction(request.action.clone()));
        };
        let naming = self.provider.naming();
        let selection = parse_selection(&request.fields)?;
        let shape = action.result_shape();

        let compiled = match shape.schema() {
            Some(schema) => {
                let options = CompileOptions {
                    max_depth: self.options.max_selection_depth,
                    denied_loads: action.denied_loads.clone(),
                };
                compile(&selection, schema, self.provider.as_ref(), &options)?
            }
            None => {
                if let Some(first) = selection.first() {
                    return Err(ValidationError::new(
                        ErrorKind::PrimitiveCannotNest,
                        FieldPath::root().child(first.name()),
                        format!("action '{}' does not return fields; the field selection must be empty", action.name),
                    )
                    .into());
                }
                CompiledSelection::default()
            }
        };

        let input = ExecutionInput {
            input: validate_input(action, &request.input, naming)?,
            page: validate_page(action, request.page.as_ref())?,
            identity: request.identity.clone(),
            arguments: request.arguments.clone(),
        };

        debug!(
            action = %action.name,
            select = compiled.plan.select.len(),
            load = compiled.plan.load.len(),
            "request parsed"
        );
        Ok(ParsedRequest {
            action,
            shape,
            compiled,
            input,
        })
    }

    pub async fn execute_action<'p>(&self, parsed: ParsedRequest<'p>) -> Result<ExecutedAction<'p>, PipelineError> {
        let result = self.executor.execute(parsed.action, &parsed.compiled.plan, &parsed.input).await;
        let raw = match result {
            Ok(raw) => raw,
            Err(BackendError::NotFound { message }) => return Err(PipelineError::NotFound { message }),
            Err(BackendError::Failure { code, message, path }) => {
                if self.options.not_found_codes.iter().any(|known| *known == code) {
                    return Err(PipelineError::NotFound { message });
                }
                return Err(PipelineError::Backend { code, message, path });
            }
        };

        if matches!(raw, RawValue::Empty) && parsed.action.is_single_record_lookup() {
            return Err(PipelineError::NotFound {
                message: format!("no {} matched the request", parsed.action.resource),
            });
        }
        debug!(action = %parsed.action.name, raw = raw.kind_label(), "action executed");
        Ok(ExecutedAction { parsed, raw })
    }

    pub fn process_result(&self, executed: ExecutedAction<'_>) -> Result<ProcessedResult, PipelineError> {
        let ExecutedAction { parsed, raw } = executed;
        let extracted =
            extract_raw(&raw, &parsed.shape, &parsed.compiled.template).map_err(|mismatch| PipelineError::Internal(mismatch.to_string()))?;
        if matches!(extracted, Extracted::Nothing) && matches!(parsed.shape, ResultShape::Record { .. }) {
            return Err(PipelineError::Internal(format!("action '{}' returned no record", parsed.action.name)));
        }
        Ok(ProcessedResult { extracted })
    }

    pub fn format_output(&self, processed: ProcessedResult) -> Response {
        format_success(processed.extracted, self.provider.naming())
    }

    fn fail(&self, action: &str, failure: PipelineError) -> Response {
        match &failure {
            PipelineError::Internal(reason) => {
                error!(action = %action, defect = true, reason = %reason, "pipeline defect");
            }
            PipelineError::Validation(validation) => {
                warn!(action = %action, kind = %validation.kind, path = %validation.path, "request rejected");
            }
            PipelineError::UnknownAction(_) => warn!(action = %action, "unknown action"),
            PipelineError::NotFound { .. } => debug!(action = %action, "record not found"),
            PipelineError::Backend { code, .. } => info!(action = %action, code = %code, "backend error"),
        }
        format_error(&failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ReplayExecutor;
    use serde_json::json;
    use sift_registry::{SchemaRegistry, parse_manifest};
    use sift_types::NamingConvention;

    const MANIFEST: &str = r#"
resources:
  Post:
    fields:
      - { name: id, kind: primitive, type: uuid }
      - { name: title, kind: primitive, type: string }
actions:
  - { name: getPost, resource: Post, kind: read, get: true }
  - { name: createPost, resource: Post, kind: create }
  - name: countPosts
    resource: Post
    kind: generic
    returns: { kind: scalar, type: integer }
"#;

    fn pipeline(executor: ReplayExecutor) -> Pipeline {
        let registry = SchemaRegistry::from_manifest(parse_manifest(MANIFEST, false).expect("manifest"), NamingConvention::CamelCase).expect("registry");
        Pipeline::new(Arc::new(registry), Arc::new(executor))
    }

    fn request(value: serde_json::Value) -> ClientRequest {
        serde_json::from_value(value).expect("request")
    }

    #[tokio::test]
    async fn empty_lookup_is_not_found() {
        let pipeline = pipeline(ReplayExecutor::returning(RawValue::Empty));
        let response = pipeline.run(&request(json!({"action": "getPost", "fields": ["id"]}))).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn configured_failure_codes_map_to_not_found() {
        let pipeline = pipeline(ReplayExecutor::new(Err(BackendError::failure("record_not_found", "gone"))));
        let response = pipeline.run(&request(json!({"action": "getPost", "fields": ["id"]}))).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::NotFound));

        let pipeline = self::pipeline(ReplayExecutor::new(Err(BackendError::failure("forbidden", "actor may not read"))));
        let response = pipeline.run(&request(json!({"action": "getPost", "fields": ["id"]}))).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::BackendError));
        assert_eq!(response.errors.as_ref().map(|errors| errors[0].message.as_str()), Some("actor may not read"));
    }

    #[tokio::test]
    async fn scalar_actions_pass_values_through() {
        let pipeline = pipeline(ReplayExecutor::returning(RawValue::Scalar(json!(3))));
        let response = pipeline.run(&request(json!({"action": "countPosts"}))).await;
        assert_eq!(response.data, Some(json!(3)));

        let response = pipeline.run(&request(json!({"action": "countPosts", "fields": ["id"]}))).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::PrimitiveCannotNest));
    }

    #[tokio::test]
    async fn shape_mismatch_is_an_internal_error() {
        let pipeline = pipeline(ReplayExecutor::returning(RawValue::Scalar(json!("oops"))));
        let response = pipeline.run(&request(json!({"action": "createPost", "fields": ["id"]}))).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InternalError));
    }

    #[test]
    fn validate_reports_unknown_actions() {
        let pipeline = pipeline(ReplayExecutor::returning(RawValue::Empty));
        let response = pipeline.validate(&request(json!({"action": "deletePost"})));
        assert_eq!(response.error_kind(), Some(ErrorKind::UnknownAction));
        assert!(pipeline.validate(&request(json!({"action": "getPost", "fields": ["title"]}))).success);
    }
}
