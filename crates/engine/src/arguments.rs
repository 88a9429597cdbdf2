//! Argument casting shared by calculation arguments and action input.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Number, Value};
use sift_types::{ArgumentDefinition, NamingConvention, PrimitiveType};

use crate::error::{FieldPath, ValidationError};

/// Casts one non-null value to `value_type`.
///
/// Returns a human readable reason on mismatch; callers attach the argument
/// name and path.
pub fn cast_value(value_type: &PrimitiveType, value: &Value, naming: NamingConvention) -> Result<Value, String> {
    match value_type {
        PrimitiveType::String => match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(expected("string", other)),
        },
        PrimitiveType::Integer => match value {
            Value::Number(number) if number.is_i64() || number.is_u64() => Ok(value.clone()),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map(|parsed| Value::Number(parsed.into()))
                .map_err(|_| format!("expected integer, got string '{text}'")),
            other => Err(expected("integer", other)),
        },
        PrimitiveType::Float => {
            let parsed = match value {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => text.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| expected("float", value))
        }
        PrimitiveType::Decimal => match value {
            Value::Number(number) => Ok(Value::String(number.to_string())),
            Value::String(text) if text.trim().parse::<f64>().is_ok_and(f64::is_finite) => Ok(Value::String(text.trim().to_string())),
            other => Err(expected("decimal", other)),
        },
        PrimitiveType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(text) if text == "true" => Ok(Value::Bool(true)),
            Value::String(text) if text == "false" => Ok(Value::Bool(false)),
            other => Err(expected("boolean", other)),
        },
        PrimitiveType::Uuid => match value {
            Value::String(text) if is_canonical_uuid(text) => Ok(Value::String(text.to_ascii_lowercase())),
            other => Err(expected("uuid", other)),
        },
        PrimitiveType::Date => match value {
            Value::String(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .map_err(|error| format!("expected date (YYYY-MM-DD), got '{text}': {error}")),
            other => Err(expected("date", other)),
        },
        PrimitiveType::DateTime => match value {
            Value::String(text) => DateTime::parse_from_rfc3339(text)
                .map(|timestamp| Value::String(timestamp.to_rfc3339()))
                .map_err(|error| format!("expected RFC 3339 datetime, got '{text}': {error}")),
            other => Err(expected("datetime", other)),
        },
        PrimitiveType::Map => match value {
            Value::Object(_) => Ok(value.clone()),
            other => Err(expected("map", other)),
        },
        PrimitiveType::Enum { values } => {
            let Value::String(text) = value else {
                return Err(expected("enum", value));
            };
            values
                .iter()
                .find(|allowed| naming.matches(text, allowed, None))
                .map(|allowed| Value::String(allowed.clone()))
                .ok_or_else(|| format!("'{text}' is not one of {}", values.join(", ")))
        }
    }
}

/// Casts a value against a full argument definition, including list and null handling.
pub fn cast_argument(definition: &ArgumentDefinition, value: &Value, naming: NamingConvention) -> Result<Value, String> {
    if value.is_null() {
        return if definition.allow_nil {
            Ok(Value::Null)
        } else {
            Err("must not be null".to_string())
        };
    }
    if !definition.array {
        return cast_value(&definition.value_type, value, naming);
    }
    let Value::Array(items) = value else {
        return Err(expected(&format!("list of {}", definition.value_type.label()), value));
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if item.is_null() {
                return Err(format!("element {index} must not be null"));
            }
            cast_value(&definition.value_type, item, naming).map_err(|reason| format!("element {index}: {reason}"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Validates a client supplied argument map against `definitions`.
///
/// Keys may use client-facing or source names. The result is keyed by source
/// name in declaration order, with defaults filled in. Errors are reported at
/// `path` extended by the offending client key.
pub fn cast_arguments(
    definitions: &[ArgumentDefinition],
    supplied: &Map<String, Value>,
    naming: NamingConvention,
    path: &FieldPath,
) -> Result<Map<String, Value>, ValidationError> {
    let mut cast_by_source: HashMap<&str, Value> = HashMap::with_capacity(supplied.len());

    for (client_key, value) in supplied {
        let Some(definition) = definitions.iter().find(|definition| naming.matches(client_key, &definition.name, None)) else {
            return Err(ValidationError::invalid_argument(path.child(client_key.clone()), client_key, "unknown argument"));
        };
        if cast_by_source.contains_key(definition.name.as_str()) {
            return Err(ValidationError::invalid_argument(
                path.child(client_key.clone()),
                client_key,
                "supplied more than once",
            ));
        }
        let cast = cast_argument(definition, value, naming)
            .map_err(|reason| ValidationError::invalid_argument(path.child(client_key.clone()), client_key, reason))?;
        cast_by_source.insert(definition.name.as_str(), cast);
    }

    let mut arguments = Map::new();
    for definition in definitions {
        if let Some(value) = cast_by_source.remove(definition.name.as_str()) {
            arguments.insert(definition.name.clone(), value);
        } else if let Some(default) = &definition.default {
            arguments.insert(definition.name.clone(), default.clone());
        } else if definition.required {
            let client_key = naming.apply(&definition.name);
            return Err(ValidationError::invalid_argument(path.child(client_key.clone()), &client_key, "is required"));
        }
    }
    Ok(arguments)
}

fn expected(type_name: &str, actual: &Value) -> String {
    let actual = match actual {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    };
    format!("expected {type_name}, got {actual}")
}

fn is_canonical_uuid(text: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = text.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, length)| part.len() == length && part.chars().all(|character| character.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sift_types::ErrorKind;

    fn definition(name: &str, value_type: PrimitiveType) -> ArgumentDefinition {
        ArgumentDefinition {
            name: name.into(),
            value_type,
            array: false,
            required: false,
            allow_nil: true,
            default: None,
        }
    }

    #[test]
    fn string_arguments_reject_numbers() {
        let reason = cast_value(&PrimitiveType::String, &json!(5), NamingConvention::CamelCase).expect_err("mismatch");
        assert_eq!(reason, "expected string, got number");
    }

    #[test]
    fn scalar_casts_normalise_values() {
        let naming = NamingConvention::CamelCase;
        assert_eq!(cast_value(&PrimitiveType::Integer, &json!("42"), naming), Ok(json!(42)));
        assert_eq!(cast_value(&PrimitiveType::Decimal, &json!(1.5), naming), Ok(json!("1.5")));
        assert_eq!(cast_value(&PrimitiveType::Boolean, &json!("false"), naming), Ok(json!(false)));
        assert_eq!(cast_value(&PrimitiveType::Date, &json!("2024-02-29"), naming), Ok(json!("2024-02-29")));
        assert!(cast_value(&PrimitiveType::Date, &json!("2023-02-29"), naming).is_err());
        assert_eq!(
            cast_value(&PrimitiveType::Uuid, &json!("6F9619FF-8B86-D011-B42D-00C04FC964FF"), naming),
            Ok(json!("6f9619ff-8b86-d011-b42d-00c04fc964ff"))
        );
        assert!(cast_value(&PrimitiveType::Uuid, &json!("not-a-uuid"), naming).is_err());
    }

    #[test]
    fn enum_accepts_client_spelling() {
        let status = PrimitiveType::Enum {
            values: vec!["in_review".into(), "published".into()],
        };
        assert_eq!(cast_value(&status, &json!("inReview"), NamingConvention::CamelCase), Ok(json!("in_review")));
        assert!(cast_value(&status, &json!("archived"), NamingConvention::CamelCase).is_err());
    }

    #[test]
    fn arrays_cast_element_wise() {
        let mut tags = definition("tags", PrimitiveType::Integer);
        tags.array = true;
        assert_eq!(cast_argument(&tags, &json!([1, "2"]), NamingConvention::CamelCase), Ok(json!([1, 2])));
        let reason = cast_argument(&tags, &json!([1, "x"]), NamingConvention::CamelCase).expect_err("bad element");
        assert!(reason.starts_with("element 1:"));
    }

    #[test]
    fn argument_maps_apply_defaults_and_source_names() {
        let mut limit = definition("max_length", PrimitiveType::Integer);
        limit.default = Some(json!(80));
        let mut suffix = definition("suffix", PrimitiveType::String);
        suffix.required = true;
        let definitions = vec![limit, suffix];

        let supplied = json!({"suffix": "..."}).as_object().cloned().unwrap_or_default();
        let arguments = cast_arguments(&definitions, &supplied, NamingConvention::CamelCase, &FieldPath::root()).expect("cast");
        assert_eq!(Value::Object(arguments), json!({"max_length": 80, "suffix": "..."}));

        let supplied = json!({"maxLength": 10}).as_object().cloned().unwrap_or_default();
        let error = cast_arguments(&definitions, &supplied, NamingConvention::CamelCase, &FieldPath::root()).expect_err("missing suffix");
        assert_eq!(error.kind, ErrorKind::InvalidArgument);
        assert_eq!(error.path, FieldPath::from(vec!["suffix"]));
    }

    #[test]
    fn unknown_and_non_nullable_arguments_are_rejected() {
        let mut prefix = definition("prefix", PrimitiveType::String);
        prefix.allow_nil = false;
        let definitions = vec![prefix];
        let path = FieldPath::root().child("self");

        let supplied = json!({"prefix": null}).as_object().cloned().unwrap_or_default();
        let error = cast_arguments(&definitions, &supplied, NamingConvention::CamelCase, &path).expect_err("null");
        assert!(error.message.contains("must not be null"));

        let supplied = json!({"suffix": "x"}).as_object().cloned().unwrap_or_default();
        let error = cast_arguments(&definitions, &supplied, NamingConvention::CamelCase, &path).expect_err("unknown");
        assert_eq!(error.path, FieldPath::from(vec!["self", "suffix"]));
    }
}
