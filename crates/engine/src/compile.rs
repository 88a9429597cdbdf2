//! Extraction template compiler.
//!
//! One depth-first walk turns a selection tree into a [`FetchPlan`] and a
//! parallel [`ExtractionTemplate`]. Each selector is classified against the
//! schema node it appears in, then compiled; nested selections recurse with
//! the target schema resolved by name through the provider.

use indexmap::IndexMap;
use sift_registry::{SchemaProvider, config::DEFAULT_MAX_SELECTION_DEPTH};
use sift_types::{Cardinality, ErrorKind, NamingConvention, TransformSpec, UnionMemberShape, UnionStorage};
use tracing::debug;

use crate::{
    classify::{Classification, Classified, MemberSelection, classify},
    error::{FieldPath, ValidationError},
    plan::{FetchPlan, LoadInstruction},
    selection::FieldSelector,
    template::{ExtractionTemplate, Instruction, MemberTemplate, ValueTransform},
};

/// Limits applied while compiling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Selectors whose path is longer than this are rejected.
    pub max_depth: usize,
    /// Dotted source paths that may not be loaded, together with everything below them.
    pub denied_loads: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_SELECTION_DEPTH,
            denied_loads: Vec::new(),
        }
    }
}

/// Output of a successful compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledSelection {
    pub plan: FetchPlan,
    pub template: ExtractionTemplate,
}

/// Compiles `selection` against the schema named `schema`.
///
/// # Errors
///
/// Returns the first validation error found in selector order; nothing is
/// compiled past it.
pub fn compile(
    selection: &[FieldSelector],
    schema: &str,
    provider: &dyn SchemaProvider,
    options: &CompileOptions,
) -> Result<CompiledSelection, ValidationError> {
    let compiler = Compiler { provider, options };
    let (plan, template) = compiler.compile_node(selection, schema, &FieldPath::root(), &[])?;
    debug_assert!(template.is_covered_by(&plan), "compiled template reads fields missing from the fetch plan");
    debug!(
        schema = %schema,
        select = plan.select.len(),
        load = plan.load.len(),
        outputs = template.len(),
        "compiled field selection"
    );
    Ok(CompiledSelection { plan, template })
}

/// Validates `selection` without keeping the compiled output.
pub fn validate_selection(
    selection: &[FieldSelector],
    schema: &str,
    provider: &dyn SchemaProvider,
    options: &CompileOptions,
) -> Result<(), ValidationError> {
    compile(selection, schema, provider, options).map(|_| ())
}

struct Compiler<'a> {
    provider: &'a dyn SchemaProvider,
    options: &'a CompileOptions,
}

impl Compiler<'_> {
    fn naming(&self) -> NamingConvention {
        self.provider.naming()
    }

    /// `source_path` holds the source names of the loads leading to this node.
    fn compile_node(
        &self,
        selection: &[FieldSelector],
        schema: &str,
        path: &FieldPath,
        source_path: &[&str],
    ) -> Result<(FetchPlan, ExtractionTemplate), ValidationError> {
        if self.provider.get_resource(schema).is_none() {
            return Err(ValidationError::new(
                ErrorKind::InternalError,
                path.clone(),
                format!("schema '{schema}' is not registered"),
            ));
        }

        let mut plan = FetchPlan::default();
        let mut template = ExtractionTemplate::default();
        for selector in selection {
            let field_path = path.child(selector.name());
            if field_path.depth() > self.options.max_depth {
                return Err(ValidationError::selection_too_deep(field_path, self.options.max_depth));
            }
            let classified = classify(selector, schema, self.provider, &field_path)?;
            if template.contains(&classified.output_name) {
                return Err(ValidationError::duplicate_field(field_path, selector.name()));
            }
            let output_name = classified.output_name.clone();
            let instruction = self.compile_field(classified, &mut plan, &field_path, source_path)?;
            template.insert(output_name, instruction);
        }
        Ok((plan, template))
    }

    fn compile_field(
        &self,
        classified: Classified<'_, '_>,
        plan: &mut FetchPlan,
        path: &FieldPath,
        source_path: &[&str],
    ) -> Result<Instruction, ValidationError> {
        let source = classified.field.name.as_str();
        let (instruction, cardinality) = match classified.class {
            Classification::Primitive { cardinality, transform } => {
                plan.select(source);
                (self.primitive_instruction(source, transform), cardinality)
            }
            Classification::Relation {
                target: schema,
                cardinality,
                selection,
            }
            | Classification::Embedded {
                schema,
                cardinality,
                selection,
            } => {
                self.check_load(source, path, source_path)?;
                let nested_source_path = extend(source_path, source);
                let (nested_plan, nested_template) = self.compile_node(selection, schema, path, &nested_source_path)?;
                plan.push_load(LoadInstruction::new(source).with_plan(nested_plan));
                (
                    Instruction::Nested {
                        source: source.to_string(),
                        template: nested_template,
                    },
                    cardinality,
                )
            }
            Classification::ScalarCalculation { arguments, cardinality } => {
                self.check_load(source, path, source_path)?;
                plan.push_load(LoadInstruction::new(source).with_arguments(arguments));
                (Instruction::Extract { source: source.to_string() }, cardinality)
            }
            Classification::StructuredCalculation {
                arguments,
                schema,
                cardinality,
                selection,
            } => {
                self.check_load(source, path, source_path)?;
                let nested_source_path = extend(source_path, source);
                let (nested_plan, nested_template) = self.compile_node(selection, schema, path, &nested_source_path)?;
                plan.push_load(LoadInstruction::new(source).with_arguments(arguments).with_plan(nested_plan));
                (
                    Instruction::CalcResult {
                        source: source.to_string(),
                        template: nested_template,
                    },
                    cardinality,
                )
            }
            Classification::Aggregate { cardinality } => {
                self.check_load(source, path, source_path)?;
                plan.push_load(LoadInstruction::new(source));
                (Instruction::Extract { source: source.to_string() }, cardinality)
            }
            Classification::Union { spec, members } => {
                self.check_load(source, path, source_path)?;
                let nested_source_path = extend(source_path, source);
                let (mut member_plan, member_templates) = self.compile_members(members, path, &nested_source_path)?;
                // The active member is read from the payload itself.
                if let UnionStorage::MapWithTag { tag_field } = &spec.storage {
                    member_plan.select(tag_field.as_str());
                }
                let load = LoadInstruction::new(source);
                plan.push_load(if member_plan.is_empty() { load } else { load.with_plan(member_plan) });
                (
                    Instruction::UnionSelect {
                        source: source.to_string(),
                        storage: spec.storage.clone(),
                        members: member_templates,
                    },
                    spec.cardinality,
                )
            }
        };

        Ok(match cardinality {
            Cardinality::One => instruction,
            Cardinality::Many => Instruction::array(instruction),
        })
    }

    fn compile_members(
        &self,
        members: Vec<MemberSelection<'_, '_>>,
        path: &FieldPath,
        source_path: &[&str],
    ) -> Result<(FetchPlan, IndexMap<String, MemberTemplate>), ValidationError> {
        let mut merged = FetchPlan::default();
        let mut templates = IndexMap::with_capacity(members.len());
        for selected in members {
            let member_path = path.child(selected.output_name.clone());
            let template = match (&selected.member.shape, selected.selection) {
                (UnionMemberShape::Embedded { schema }, Some(selection)) => {
                    let (member_plan, member_template) = self.compile_node(selection, schema, &member_path, source_path)?;
                    merged.merge(member_plan);
                    Some(member_template)
                }
                (UnionMemberShape::Primitive { .. }, _) => None,
                (UnionMemberShape::Embedded { .. }, None) => {
                    return Err(ValidationError::complex_requires_selection(member_path, selected.name));
                }
            };
            templates.insert(
                selected.stored_tag().to_string(),
                MemberTemplate {
                    output_name: selected.output_name,
                    template,
                },
            );
        }
        Ok((merged, templates))
    }

    fn primitive_instruction(&self, source: &str, transform: Option<&TransformSpec>) -> Instruction {
        let Some(transform) = transform else {
            return Instruction::Extract { source: source.to_string() };
        };
        let transform = match transform {
            TransformSpec::Stringify => ValueTransform::Stringify,
            TransformSpec::TupleToObject { fields } => ValueTransform::TupleToObject {
                fields: fields.iter().map(|field| self.naming().apply(field)).collect(),
            },
        };
        Instruction::Transform {
            source: source.to_string(),
            transform,
        }
    }

    fn check_load(&self, source: &str, path: &FieldPath, source_path: &[&str]) -> Result<(), ValidationError> {
        if self.options.denied_loads.is_empty() {
            return Ok(());
        }
        let load_path = extend(source_path, source).join(".");
        let denied = self.options.denied_loads.iter().any(|denied| {
            load_path == *denied || load_path.strip_prefix(denied.as_str()).is_some_and(|rest| rest.starts_with('.'))
        });
        if denied {
            return Err(ValidationError::load_denied(path.clone(), &load_path));
        }
        Ok(())
    }
}

fn extend<'a>(source_path: &[&'a str], source: &'a str) -> Vec<&'a str> {
    let mut extended = source_path.to_vec();
    extended.push(source);
    extended
}
