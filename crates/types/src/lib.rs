//! Shared type definitions for Sift.
//!
//! - `schema`: resource schemas and the closed set of field kinds
//! - `action`: actions exposed over RPC and their result shapes
//! - `raw`: values handed back by action executors
//! - `request` / `response`: wire-level request and envelope
//! - `naming`: client naming convention

pub mod action;
pub mod naming;
pub mod raw;
pub mod request;
pub mod response;
pub mod schema;

pub use action::{ActionKind, ActionReturn, ActionSpec, PaginationSupport, ResultShape};
pub use naming::NamingConvention;
pub use raw::{Datum, PageMeta, RawPage, RawRecord, RawValue, record_from_map};
pub use request::{ClientRequest, PageRequest};
pub use response::{ErrorKind, ErrorObject, Response};
pub use schema::{
    AggregateKind, AggregateSpec, ArgumentDefinition, CalculationReturn, CalculationSpec, Cardinality, FieldDefinition, FieldKind,
    PrimitiveType, ResourceSchema, TransformSpec, UnionMember, UnionMemberShape, UnionSpec, UnionStorage,
};
