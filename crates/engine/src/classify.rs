//! Field classifier.
//!
//! [`classify`] resolves one selector against one schema node and decides,
//! from the field's kind alone, whether the selector's shape is legal. It does
//! not recurse: nested selections are handed back to the compiler, which
//! classifies them against the target schema on its way down. Every
//! [`FieldKind`] is matched explicitly so a new kind cannot compile without a
//! rule.

use serde_json::{Map, Value};
use sift_registry::{SchemaProvider, find_field_by_client_name};
use sift_types::{CalculationReturn, Cardinality, FieldDefinition, FieldKind, NamingConvention, TransformSpec, UnionMember, UnionMemberShape, UnionSpec};

use crate::{
    arguments::cast_arguments,
    error::{FieldPath, ValidationError},
    selection::FieldSelector,
};

/// A selector that passed shape validation, paired with its field.
#[derive(Debug)]
pub struct Classified<'s, 'q> {
    pub field: &'s FieldDefinition,
    /// Final client-facing key for this field.
    pub output_name: String,
    pub class: Classification<'s, 'q>,
}

#[derive(Debug)]
pub enum Classification<'s, 'q> {
    Primitive {
        cardinality: Cardinality,
        transform: Option<&'s TransformSpec>,
    },
    Relation {
        target: &'s str,
        cardinality: Cardinality,
        selection: &'q [FieldSelector],
    },
    Embedded {
        schema: &'s str,
        cardinality: Cardinality,
        selection: &'q [FieldSelector],
    },
    ScalarCalculation {
        arguments: Map<String, Value>,
        cardinality: Cardinality,
    },
    StructuredCalculation {
        arguments: Map<String, Value>,
        schema: &'s str,
        cardinality: Cardinality,
        selection: &'q [FieldSelector],
    },
    Aggregate {
        cardinality: Cardinality,
    },
    Union {
        spec: &'s UnionSpec,
        members: Vec<MemberSelection<'s, 'q>>,
    },
}

/// One requested member of a union selection.
#[derive(Debug)]
pub struct MemberSelection<'s, 'q> {
    pub name: &'s str,
    pub output_name: String,
    pub member: &'s UnionMember,
    /// Present exactly when the member is embedded.
    pub selection: Option<&'q [FieldSelector]>,
}

impl MemberSelection<'_, '_> {
    pub fn stored_tag(&self) -> &str {
        self.member.stored_tag(self.name)
    }
}

/// Classifies `selector` against `resource`.
///
/// `path` locates the selector itself (its client name is the last segment).
pub fn classify<'s, 'q>(
    selector: &'q FieldSelector,
    resource: &str,
    provider: &'s dyn SchemaProvider,
    path: &FieldPath,
) -> Result<Classified<'s, 'q>, ValidationError> {
    let name = selector.name();
    let Some(field) = find_field_by_client_name(provider, resource, name) else {
        return Err(ValidationError::unknown_field(path.clone(), name, resource));
    };
    let naming = provider.naming();
    let output_name = naming.client_name(&field.name, field.client_name.as_deref());

    let class = match &field.kind {
        FieldKind::Primitive {
            cardinality, transform, ..
        } => {
            reject_arguments(selector, path)?;
            reject_nesting(selector, path)?;
            Classification::Primitive {
                cardinality: *cardinality,
                transform: transform.as_ref(),
            }
        }
        FieldKind::Relation { target, cardinality } => {
            reject_arguments(selector, path)?;
            Classification::Relation {
                target,
                cardinality: *cardinality,
                selection: require_selection(selector, path)?,
            }
        }
        FieldKind::Embedded { schema, cardinality } => {
            reject_arguments(selector, path)?;
            Classification::Embedded {
                schema,
                cardinality: *cardinality,
                selection: require_selection(selector, path)?,
            }
        }
        FieldKind::Calculation(calculation) => {
            let supplied = selector.arguments().cloned().unwrap_or_default();
            let arguments = cast_arguments(&calculation.arguments, &supplied, naming, path)?;
            match &calculation.returns {
                CalculationReturn::Scalar { cardinality, .. } => {
                    reject_nesting(selector, path)?;
                    Classification::ScalarCalculation {
                        arguments,
                        cardinality: *cardinality,
                    }
                }
                CalculationReturn::Structured { schema, cardinality } => Classification::StructuredCalculation {
                    arguments,
                    schema,
                    cardinality: *cardinality,
                    selection: require_selection(selector, path)?,
                },
            }
        }
        FieldKind::Aggregate(aggregate) => {
            reject_arguments(selector, path)?;
            reject_nesting(selector, path)?;
            Classification::Aggregate {
                cardinality: aggregate.cardinality(),
            }
        }
        FieldKind::Union(spec) => {
            reject_arguments(selector, path)?;
            let selection = require_selection(selector, path)?;
            Classification::Union {
                spec,
                members: classify_members(selection, &field.name, spec, naming, path)?,
            }
        }
    };

    Ok(Classified { field, output_name, class })
}

fn classify_members<'s, 'q>(
    selection: &'q [FieldSelector],
    field_name: &str,
    spec: &'s UnionSpec,
    naming: NamingConvention,
    path: &FieldPath,
) -> Result<Vec<MemberSelection<'s, 'q>>, ValidationError> {
    let mut members: Vec<MemberSelection<'s, 'q>> = Vec::with_capacity(selection.len());
    for selector in selection {
        let tag = selector.name();
        let member_path = path.child(tag);
        let Some((name, member)) = spec.members.iter().find(|(name, _)| naming.matches(tag, name, None)) else {
            return Err(ValidationError::unknown_union_member(member_path, tag, field_name));
        };
        if members.iter().any(|existing| existing.name == name.as_str()) {
            return Err(ValidationError::duplicate_field(member_path, tag));
        }
        reject_arguments(selector, &member_path)?;
        let selection = match &member.shape {
            UnionMemberShape::Primitive { .. } => {
                reject_nesting(selector, &member_path)?;
                None
            }
            UnionMemberShape::Embedded { .. } => Some(require_selection(selector, &member_path)?),
        };
        members.push(MemberSelection {
            name,
            output_name: naming.apply(name),
            member,
            selection,
        });
    }
    Ok(members)
}

/// Nested selection of a complex field; absent or empty selections are rejected.
fn require_selection<'q>(selector: &'q FieldSelector, path: &FieldPath) -> Result<&'q [FieldSelector], ValidationError> {
    match selector.selection() {
        Some(selection) if !selection.is_empty() => Ok(selection),
        Some(_) | None => Err(ValidationError::complex_requires_selection(path.clone(), selector.name())),
    }
}

fn reject_nesting(selector: &FieldSelector, path: &FieldPath) -> Result<(), ValidationError> {
    match selector.selection() {
        None => Ok(()),
        Some(_) => Err(ValidationError::primitive_cannot_nest(path.clone(), selector.name())),
    }
}

fn reject_arguments(selector: &FieldSelector, path: &FieldPath) -> Result<(), ValidationError> {
    match selector.arguments() {
        Some(arguments) if !arguments.is_empty() => Err(ValidationError::invalid_argument(
            path.clone(),
            selector.name(),
            "field does not accept arguments",
        )),
        Some(_) | None => Ok(()),
    }
}
