//! # Sift Engine
//!
//! Validates client field selections against resource schemas, compiles them
//! into a fetch plan plus an extraction template, and carves executor results
//! into exactly the requested shape.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use sift_engine::{Pipeline, ReplayExecutor};
//! use sift_registry::{SchemaRegistry, parse_manifest};
//! use sift_types::{ClientRequest, NamingConvention, RawValue, record_from_map};
//!
//! let manifest = parse_manifest(
//!     r#"
//! resources:
//!   Post:
//!     fields:
//!       - { name: id, kind: primitive, type: string }
//!       - { name: title, kind: primitive, type: string }
//! actions:
//!   - { name: getPost, resource: Post, kind: read, get: true }
//! "#,
//!     false,
//! )?;
//! let registry = SchemaRegistry::from_manifest(manifest, NamingConvention::CamelCase)?;
//! let raw = record_from_map(json!({"id": "1", "title": "T", "body": "hidden"}).as_object().cloned().unwrap_or_default());
//! let pipeline = Pipeline::new(Arc::new(registry), Arc::new(ReplayExecutor::returning(RawValue::Record(raw))));
//!
//! let request: ClientRequest = serde_json::from_value(json!({"action": "getPost", "fields": ["id", "title"]}))?;
//! let runtime = tokio::runtime::Builder::new_current_thread().build()?;
//! let response = runtime.block_on(pipeline.run(&request));
//! assert_eq!(response.data, Some(json!({"id": "1", "title": "T"})));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`selection`**: client selector JSON to a [`FieldSelector`] tree
//! - **`classify`** / **`arguments`**: per-field shape and argument validation
//! - **`compile`**: [`FetchPlan`] and [`ExtractionTemplate`] in one traversal
//! - **`extract`** / **`format`**: result projection and response envelopes
//! - **`executor`**: the [`ActionExecutor`] seam
//! - **`pipeline`**: the four-stage request pipeline

pub mod arguments;
pub mod classify;
pub mod compile;
pub mod error;
pub mod executor;
pub mod extract;
pub mod format;
pub mod input;
pub mod pipeline;
pub mod plan;
pub mod selection;
pub mod template;

pub use arguments::{cast_argument, cast_arguments, cast_value};
pub use classify::{Classification, Classified, classify};
pub use compile::{CompileOptions, CompiledSelection, compile, validate_selection};
pub use error::{FieldPath, PipelineError, ValidationError};
pub use executor::{ActionExecutor, BackendError, ExecutionInput, ReplayExecutor};
pub use extract::{Extracted, ShapeMismatch, extract_raw, extract_record};
pub use format::{format_error, format_page, format_success};
pub use pipeline::{Pipeline, PipelineOptions};
pub use plan::{FetchPlan, LoadInstruction};
pub use selection::{FieldSelector, parse_selection};
pub use template::{ExtractionTemplate, Instruction, MemberTemplate, ValueTransform};
