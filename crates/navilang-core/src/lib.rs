#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for NaviLang.
//!
//! Shared between the compiler front end and the output generators:
//! - `span` - byte-offset source spans
//! - `ast` - the syntax tree (`Program`, `Context`, `Statement`)
//! - `types` - declared types and constraints (`TypeInfo`, `Constraint`)
//!
//! Everything here is plain serde-serializable data with no behavior beyond
//! small accessors; all analysis logic lives in `navilang-compiler`.

pub mod ast;
pub mod span;
pub mod types;


pub use ast::{
    CmpOp, Condition, Context, Modifier, Name, Program, SeqRelation, Statement, StatementKind,
    Value, ValueKind,
};
pub use span::Span;
pub use types::{Constraint, Primitive, TypeInfo};
