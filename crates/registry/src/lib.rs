//! Schema provider for Sift.
//!
//! This crate loads schema manifests, validates them into an immutable
//! [`SchemaRegistry`] snapshot and exposes it through the [`SchemaProvider`]
//! trait the engine depends on.

pub mod config;
pub mod handle;
pub mod manifest;
pub mod models;
pub mod provider;

pub use config::{SiftConfig, default_config_path};
pub use handle::SchemaHandle;
pub use manifest::{SchemaManifest, load_manifest, parse_manifest, read_document};
pub use models::{RegistryError, SchemaRegistry};
pub use provider::{SchemaProvider, find_field_by_client_name};
