//! Fetch plans handed to the action executor.
//!
//! A plan names source fields only. `select` holds stored primitives; every
//! relation, embedded value, calculation, aggregate and union is a
//! [`LoadInstruction`], optionally with its own nested plan.

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchPlan {
    pub select: IndexSet<String>,
    pub load: Vec<LoadInstruction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadInstruction {
    pub field: String,
    /// Cast arguments keyed by source name.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub arguments: Map<String, Value>,
    /// Nested plan for structured loads; scalar loads carry none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<FetchPlan>,
}

impl LoadInstruction {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            arguments: Map::new(),
            plan: None,
        }
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_plan(mut self, plan: FetchPlan) -> Self {
        self.plan = Some(plan);
        self
    }
}

impl FetchPlan {
    pub fn is_empty(&self) -> bool {
        self.select.is_empty() && self.load.is_empty()
    }

    pub fn select(&mut self, field: impl Into<String>) {
        self.select.insert(field.into());
    }

    /// Adds a load, folding it into an existing load of the same field and arguments.
    pub fn push_load(&mut self, instruction: LoadInstruction) {
        let existing = self
            .load
            .iter_mut()
            .find(|load| load.field == instruction.field && load.arguments == instruction.arguments);
        let Some(existing) = existing else {
            self.load.push(instruction);
            return;
        };
        if let Some(incoming) = instruction.plan {
            existing.plan.get_or_insert_with(FetchPlan::default).merge(incoming);
        }
    }

    /// Unions `other` into this plan, keeping first-seen order.
    pub fn merge(&mut self, other: FetchPlan) {
        self.select.extend(other.select);
        for instruction in other.load {
            self.push_load(instruction);
        }
    }

    pub fn load_for(&self, field: &str) -> Option<&LoadInstruction> {
        self.load.iter().find(|load| load.field == field)
    }

    /// Whether `field` is fetched at this level, either selected or loaded.
    pub fn fetches(&self, field: &str) -> bool {
        self.select.contains(field) || self.load_for(field).is_some()
    }
}
