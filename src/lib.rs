//! Infer a structural schema from JSON samples, keep it current, and report
//! drift and model changes.
//!
//! Pipeline: `inference` (value → [`ir::TypeNode`]) → `lattice` (join) →
//! `state` / `json_schema` (persistence) → `drift` / `monitor` (compare new
//! samples) → `lower` + `codegen` (Pydantic source) → `diff` (compare model
//! files).
pub mod cli;
pub mod codegen;
pub mod diff;
pub mod drift;
pub mod error;
pub mod inference;
pub mod io;
pub mod ir;
pub mod jq_exec;
pub mod json_schema;
pub mod lattice;
pub mod logging;
pub mod lower;
pub mod monitor;
pub mod state;

pub use error::{Error, Result};
pub use inference::{infer, infer_with, TypeInferer};
pub use ir::TypeNode;
pub use lattice::join;
