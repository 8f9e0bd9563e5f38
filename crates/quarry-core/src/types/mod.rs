//! Identifier types for plan trees.

mod id;
mod symbol;

pub use id::PlanNodeId;
pub use symbol::Symbol;
