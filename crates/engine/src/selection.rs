//! Client field selections.
//!
//! Wire format, one entry per requested field:
//! - `"title"` selects a field by name
//! - `{"author": ["id", "name"]}` selects a field with a nested selection
//! - `{"excerpt": {"args": {"length": 80}}}` passes calculation arguments
//! - `{"self": {"args": {...}, "fields": [...]}}` does both
//!
//! An object entry may name several fields; their order is kept.

use serde_json::{Map, Value};

use crate::error::{FieldPath, ValidationError};

const ARGS_KEY: &str = "args";
const FIELDS_KEY: &str = "fields";

/// One node of a parsed selection tree. Names are client-facing.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSelector {
    Field {
        name: String,
    },
    Nested {
        name: String,
        selection: Vec<FieldSelector>,
    },
    Calculation {
        name: String,
        arguments: Map<String, Value>,
        selection: Option<Vec<FieldSelector>>,
    },
}

impl FieldSelector {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field { name: name.into() }
    }

    pub fn nested(name: impl Into<String>, selection: Vec<FieldSelector>) -> Self {
        Self::Nested {
            name: name.into(),
            selection,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Field { name } | Self::Nested { name, .. } | Self::Calculation { name, .. } => name,
        }
    }

    /// Nested selection, if the selector carries one.
    pub fn selection(&self) -> Option<&[FieldSelector]> {
        match self {
            Self::Field { .. } => None,
            Self::Nested { selection, .. } => Some(selection),
            Self::Calculation { selection, .. } => selection.as_deref(),
        }
    }

    pub fn arguments(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Calculation { arguments, .. } => Some(arguments),
            Self::Field { .. } | Self::Nested { .. } => None,
        }
    }
}

/// Parses a client selection list.
///
/// # Errors
///
/// Returns a `MalformedRequest` validation error locating the first entry
/// that is neither a field name nor a `{name: selection}` object.
pub fn parse_selection(values: &[Value]) -> Result<Vec<FieldSelector>, ValidationError> {
    parse_list(values, &FieldPath::root())
}

fn parse_list(values: &[Value], path: &FieldPath) -> Result<Vec<FieldSelector>, ValidationError> {
    let mut selectors = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        match value {
            Value::String(name) if !name.trim().is_empty() => selectors.push(FieldSelector::field(name.clone())),
            Value::Object(entries) if !entries.is_empty() => {
                for (name, nested) in entries {
                    selectors.push(parse_nested(name, nested, &path.child(name.clone()))?);
                }
            }
            other => {
                let found = match other {
                    Value::String(_) => "an empty field name",
                    Value::Object(_) => "an empty object",
                    Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => describe(other),
                };
                return Err(ValidationError::malformed(
                    path.child(index.to_string()),
                    format!("expected a field name or a {{field: selection}} object, got {found}"),
                ));
            }
        }
    }
    Ok(selectors)
}

fn parse_nested(name: &str, value: &Value, path: &FieldPath) -> Result<FieldSelector, ValidationError> {
    match value {
        Value::Array(items) => Ok(FieldSelector::Nested {
            name: name.to_string(),
            selection: parse_list(items, path)?,
        }),
        Value::Object(entries) => parse_calculation(name, entries, path),
        other => Err(ValidationError::malformed(
            path.clone(),
            format!("selection for '{name}' must be a list or an {{args, fields}} object, got {}", describe(other)),
        )),
    }
}

fn parse_calculation(name: &str, entries: &Map<String, Value>, path: &FieldPath) -> Result<FieldSelector, ValidationError> {
    if let Some(unexpected) = entries.keys().find(|key| key.as_str() != ARGS_KEY && key.as_str() != FIELDS_KEY) {
        return Err(ValidationError::malformed(
            path.clone(),
            format!("unexpected key '{unexpected}' in selection for '{name}'; expected '{ARGS_KEY}' and/or '{FIELDS_KEY}'"),
        ));
    }

    let arguments = match entries.get(ARGS_KEY) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments.clone(),
        Some(other) => {
            return Err(ValidationError::malformed(
                path.child(ARGS_KEY),
                format!("'{ARGS_KEY}' must be an object, got {}", describe(other)),
            ));
        }
    };

    let selection = match entries.get(FIELDS_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(parse_list(items, path)?),
        Some(other) => {
            return Err(ValidationError::malformed(
                path.child(FIELDS_KEY),
                format!("'{FIELDS_KEY}' must be a list, got {}", describe(other)),
            ));
        }
    };

    Ok(FieldSelector::Calculation {
        name: name.to_string(),
        arguments,
        selection,
    })
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
