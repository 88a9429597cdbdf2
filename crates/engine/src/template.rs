//! Extraction templates.
//!
//! Keys are final client-facing names; every instruction reads from a source
//! field of the raw record. Templates are built once per request and only
//! read afterwards.

use indexmap::IndexMap;
use serde::Serialize;
use sift_types::UnionStorage;

use crate::plan::FetchPlan;

/// Ordered output name -> instruction mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtractionTemplate {
    entries: IndexMap<String, Instruction>,
}

impl ExtractionTemplate {
    pub fn insert(&mut self, output_name: impl Into<String>, instruction: Instruction) -> Option<Instruction> {
        self.entries.insert(output_name.into(), instruction)
    }

    pub fn contains(&self, output_name: &str) -> bool {
        self.entries.contains_key(output_name)
    }

    pub fn get(&self, output_name: &str) -> Option<&Instruction> {
        self.entries.get(output_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instruction)> {
        self.entries.iter().map(|(name, instruction)| (name.as_str(), instruction))
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every instruction reads a field that `plan` fetches, recursively.
    pub fn is_covered_by(&self, plan: &FetchPlan) -> bool {
        self.entries.values().all(|instruction| instruction.is_covered_by(plan))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Instruction {
    Extract {
        source: String,
    },
    Nested {
        source: String,
        template: ExtractionTemplate,
    },
    /// Applies the inner instruction to each element of a collection.
    Array {
        inner: Box<Instruction>,
    },
    CalcResult {
        source: String,
        template: ExtractionTemplate,
    },
    UnionSelect {
        source: String,
        storage: UnionStorage,
        /// Requested members keyed by the tag the backend stores.
        members: IndexMap<String, MemberTemplate>,
    },
    Transform {
        source: String,
        transform: ValueTransform,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberTemplate {
    pub output_name: String,
    /// `None` for primitive members, whose payload is emitted as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<ExtractionTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ValueTransform {
    Stringify,
    /// Positional array to object; `fields` are client-facing keys.
    TupleToObject { fields: Vec<String> },
}

impl Instruction {
    pub fn array(inner: Instruction) -> Self {
        Self::Array { inner: Box::new(inner) }
    }

    /// Source field the instruction reads.
    pub fn source(&self) -> &str {
        match self {
            Self::Extract { source }
            | Self::Nested { source, .. }
            | Self::CalcResult { source, .. }
            | Self::UnionSelect { source, .. }
            | Self::Transform { source, .. } => source,
            Self::Array { inner } => inner.source(),
        }
    }

    fn is_covered_by(&self, plan: &FetchPlan) -> bool {
        if !plan.fetches(self.source()) {
            return false;
        }
        let nested_plan = plan.load_for(self.source()).and_then(|load| load.plan.as_ref());
        match self {
            Self::Extract { .. } | Self::Transform { .. } => true,
            Self::Array { inner } => inner.is_covered_by(plan),
            Self::Nested { template, .. } | Self::CalcResult { template, .. } => {
                nested_plan.is_some_and(|nested| template.is_covered_by(nested))
            }
            Self::UnionSelect { storage, members, .. } => {
                let tag_fetched = match storage {
                    UnionStorage::TypeAndValue => true,
                    UnionStorage::MapWithTag { tag_field } => nested_plan.is_some_and(|nested| nested.select.contains(tag_field)),
                };
                tag_fetched
                    && members.values().all(|member| match (&member.template, nested_plan) {
                        (None, _) => true,
                        (Some(template), Some(nested)) => template.is_covered_by(nested),
                        (Some(_), None) => false,
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::LoadInstruction;
    use serde_json::json;

    #[test]
    fn coverage_requires_nested_plans() {
        let mut nested = ExtractionTemplate::default();
        nested.insert("name", Instruction::Extract { source: "name".into() });
        let mut template = ExtractionTemplate::default();
        template.insert(
            "author",
            Instruction::Nested {
                source: "author".into(),
                template: nested,
            },
        );

        let mut plan = FetchPlan::default();
        plan.push_load(LoadInstruction::new("author"));
        assert!(!template.is_covered_by(&plan));

        let mut author_plan = FetchPlan::default();
        author_plan.select("name");
        let mut plan = FetchPlan::default();
        plan.push_load(LoadInstruction::new("author").with_plan(author_plan));
        assert!(template.is_covered_by(&plan));
    }

    #[test]
    fn tagged_map_unions_need_the_tag_in_the_plan() {
        let mut image = ExtractionTemplate::default();
        image.insert("url", Instruction::Extract { source: "url".into() });
        let mut members = IndexMap::new();
        members.insert(
            "image".to_string(),
            MemberTemplate {
                output_name: "image".into(),
                template: Some(image),
            },
        );
        let mut template = ExtractionTemplate::default();
        template.insert(
            "attachments",
            Instruction::UnionSelect {
                source: "attachments".into(),
                storage: UnionStorage::MapWithTag { tag_field: "kind".into() },
                members,
            },
        );

        let mut untagged = FetchPlan::default();
        untagged.select("url");
        let mut plan = FetchPlan::default();
        plan.push_load(LoadInstruction::new("attachments").with_plan(untagged));
        assert!(!template.is_covered_by(&plan));

        let mut tagged = FetchPlan::default();
        tagged.select("url");
        tagged.select("kind");
        let mut plan = FetchPlan::default();
        plan.push_load(LoadInstruction::new("attachments").with_plan(tagged));
        assert!(template.is_covered_by(&plan));
    }

    #[test]
    fn array_instructions_serialize_with_inner_op() {
        let instruction = Instruction::array(Instruction::Transform {
            source: "scores".into(),
            transform: ValueTransform::Stringify,
        });
        assert_eq!(instruction.source(), "scores");
        assert_eq!(
            serde_json::to_value(&instruction).expect("serialize"),
            json!({"op": "array", "inner": {"op": "transform", "source": "scores", "transform": {"kind": "stringify"}}})
        );
    }
}
