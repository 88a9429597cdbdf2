//! On-disk schema manifests.
//!
//! A manifest declares resources, embedded types and the actions exposed over
//! RPC. JSON and YAML are both accepted; the format is picked from the file
//! extension and defaults to YAML.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sift_types::{ActionSpec, FieldDefinition};

/// Field list of one schema node inside a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestSchema {
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// Parsed manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaManifest {
    /// Resources keyed by name.
    #[serde(default)]
    pub resources: IndexMap<String, ManifestSchema>,
    /// Embedded types keyed by name; they share the resource namespace.
    #[serde(default)]
    pub types: IndexMap<String, ManifestSchema>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

impl SchemaManifest {
    /// Appends another manifest's declarations. Name clashes are reported
    /// later by registry validation.
    pub fn merge(&mut self, other: SchemaManifest) {
        for (name, schema) in other.resources {
            self.resources.entry(name).or_default().fields.extend(schema.fields);
        }
        for (name, schema) in other.types {
            self.types.entry(name).or_default().fields.extend(schema.fields);
        }
        self.actions.extend(other.actions);
    }
}

/// Parses a manifest from text, choosing JSON when `is_json` is true.
pub fn parse_manifest(content: &str, is_json: bool) -> Result<SchemaManifest> {
    if is_json {
        return serde_json::from_str(content).context("manifest is not valid JSON");
    }
    serde_yaml::from_str(content).context("manifest is not valid YAML")
}

/// Loads a manifest file from disk.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<SchemaManifest> {
    read_document(path.as_ref())
}

/// Reads a JSON or YAML document, picking the format from the file extension.
///
/// Errors carry the path.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if is_json_path(path) {
        return serde_json::from_str(&content).with_context(|| format!("failed to parse {} as JSON", path.display()));
    }
    serde_yaml::from_str(&content).with_context(|| format!("failed to parse {} as YAML", path.display()))
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}
