//! Query planning.
//!
//! This module provides the logical plan IR and the rule-based optimizer
//! that rewrites it.

pub mod logical;
pub mod optimize;

pub use logical::{PlanError, PlanNode, PlanRef, PlanResult, TableFunctionNode};
pub use optimize::{Optimizer, Rule};
