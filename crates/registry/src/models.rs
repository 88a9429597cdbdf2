use std::{collections::HashSet, path::Path};

use anyhow::Result;
use indexmap::IndexMap;
use sift_types::{
    ActionKind, ActionReturn, ActionSpec, FieldDefinition, FieldKind, NamingConvention, ResourceSchema, UnionMemberShape, UnionStorage,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    SchemaProvider,
    manifest::{SchemaManifest, load_manifest},
};

/// Problems detected while building a registry snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("schema '{0}' is declared both as a resource and as an embedded type")]
    DuplicateSchema(String),

    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    #[error("schema '{schema}' exposes client name '{client_name}' for more than one field")]
    DuplicateClientName { schema: String, client_name: String },

    #[error("{owner} references unknown schema '{target}'")]
    DanglingReference { owner: String, target: String },

    #[error("union '{schema}.{field}' declares no members")]
    EmptyUnion { schema: String, field: String },

    #[error("union '{schema}.{field}' keeps its tag inside the payload map, so member '{member}' must be embedded")]
    PrimitiveMemberInTaggedMap { schema: String, field: String, member: String },

    #[error("action '{0}' is declared more than once")]
    DuplicateAction(String),

    #[error("action '{action}' targets '{resource}', which is not a resource")]
    UnknownActionResource { action: String, resource: String },
}

/// Immutable snapshot of every schema and exposed action.
///
/// Built once and shared behind an `Arc`; see [`crate::SchemaHandle`] for
/// swapping snapshots at runtime.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, ResourceSchema>,
    resource_names: HashSet<String>,
    actions: IndexMap<String, ActionSpec>,
    naming: NamingConvention,
}

impl SchemaRegistry {
    /// Builds and validates a registry from a parsed manifest.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] found: duplicate declarations,
    /// client-name collisions under `naming`, dangling schema references or
    /// unions whose storage cannot represent their members.
    pub fn from_manifest(manifest: SchemaManifest, naming: NamingConvention) -> Result<Self, RegistryError> {
        let mut schemas = IndexMap::new();
        let mut resource_names = HashSet::new();

        for (name, schema) in manifest.resources {
            resource_names.insert(name.clone());
            schemas.insert(name.clone(), ResourceSchema { name, fields: schema.fields });
        }
        for (name, schema) in manifest.types {
            if schemas.contains_key(&name) {
                return Err(RegistryError::DuplicateSchema(name));
            }
            schemas.insert(name.clone(), ResourceSchema { name, fields: schema.fields });
        }

        let mut actions = IndexMap::new();
        for action in manifest.actions {
            if actions.contains_key(&action.name) {
                return Err(RegistryError::DuplicateAction(action.name));
            }
            actions.insert(action.name.clone(), action);
        }

        let registry = Self {
            schemas,
            resource_names,
            actions,
            naming,
        };
        registry.validate()?;
        debug!(
            schemas = registry.schemas.len(),
            resources = registry.resource_names.len(),
            actions = registry.actions.len(),
            "schema registry built"
        );
        Ok(registry)
    }

    /// Loads, merges and validates manifest files.
    pub fn from_manifest_files<P: AsRef<Path>>(paths: &[P], naming: NamingConvention) -> Result<Self> {
        let mut merged = SchemaManifest::default();
        for path in paths {
            merged.merge(load_manifest(path)?);
        }
        let registry = Self::from_manifest(merged, naming)?;
        info!(manifests = paths.len(), actions = registry.actions.len(), "schema registry loaded");
        Ok(registry)
    }

    /// Every schema node, resources first, in declaration order.
    pub fn schemas(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.schemas.values()
    }

    /// Exposed actions in declaration order.
    pub fn actions(&self) -> impl Iterator<Item = &ActionSpec> {
        self.actions.values()
    }

    /// True when `name` is a resource rather than an embedded type.
    pub fn is_resource(&self, name: &str) -> bool {
        self.resource_names.contains(name)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        for schema in self.schemas.values() {
            self.validate_schema(schema)?;
        }
        for action in self.actions.values() {
            self.validate_action(action)?;
        }
        Ok(())
    }

    fn validate_schema(&self, schema: &ResourceSchema) -> Result<(), RegistryError> {
        let mut field_names = HashSet::new();
        let mut client_names = HashSet::new();
        for field in &schema.fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(RegistryError::DuplicateField {
                    schema: schema.name.clone(),
                    field: field.name.clone(),
                });
            }
            let client_name = self.naming.client_name(&field.name, field.client_name.as_deref());
            if !client_names.insert(client_name.clone()) {
                return Err(RegistryError::DuplicateClientName {
                    schema: schema.name.clone(),
                    client_name,
                });
            }
            self.validate_field(schema, field)?;
        }
        Ok(())
    }

    fn validate_field(&self, schema: &ResourceSchema, field: &FieldDefinition) -> Result<(), RegistryError> {
        for target in field.kind.referenced_schemas() {
            if !self.schemas.contains_key(target) {
                return Err(RegistryError::DanglingReference {
                    owner: format!("field '{}.{}'", schema.name, field.name),
                    target: target.to_string(),
                });
            }
        }

        let FieldKind::Union(union) = &field.kind else {
            return Ok(());
        };
        if union.members.is_empty() {
            return Err(RegistryError::EmptyUnion {
                schema: schema.name.clone(),
                field: field.name.clone(),
            });
        }
        if let UnionStorage::MapWithTag { .. } = union.storage
            && let Some((member, _)) = union
                .members
                .iter()
                .find(|(_, member)| matches!(member.shape, UnionMemberShape::Primitive { .. }))
        {
            return Err(RegistryError::PrimitiveMemberInTaggedMap {
                schema: schema.name.clone(),
                field: field.name.clone(),
                member: member.clone(),
            });
        }
        Ok(())
    }

    fn validate_action(&self, action: &ActionSpec) -> Result<(), RegistryError> {
        if !self.is_resource(&action.resource) {
            return Err(RegistryError::UnknownActionResource {
                action: action.name.clone(),
                resource: action.resource.clone(),
            });
        }
        let returned_schema = match &action.kind {
            ActionKind::Generic {
                returns: ActionReturn::Resource { resource, .. },
            } => Some(resource),
            ActionKind::Generic {
                returns: ActionReturn::Embedded { schema, .. },
            } => Some(schema),
            ActionKind::Generic { .. } | ActionKind::Read { .. } | ActionKind::Create | ActionKind::Update | ActionKind::Destroy => None,
        };
        if let Some(target) = returned_schema
            && !self.schemas.contains_key(target)
        {
            return Err(RegistryError::DanglingReference {
                owner: format!("action '{}'", action.name),
                target: target.clone(),
            });
        }
        Ok(())
    }
}

impl SchemaProvider for SchemaRegistry {
    fn get_resource(&self, resource: &str) -> Option<&ResourceSchema> {
        self.schemas.get(resource)
    }

    fn get_action(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    fn naming(&self) -> NamingConvention {
        self.naming
    }
}
