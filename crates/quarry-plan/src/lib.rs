//! Quarry Plan
//!
//! This crate provides the logical query plan of the Quarry planner: the
//! plan-node family, table-function invocations, validation, printing,
//! JSON encoding and rule-based rewriting.
//!
//! # Overview
//!
//! - **Plan nodes**: [`PlanNode`] is a closed set of node kinds sharing the
//!   [`Node`](plan::logical::Node) contract. Nodes are immutable and children
//!   are shared through [`PlanRef`].
//! - **Table functions**: [`TableFunctionNode`] models the invocation of a
//!   polymorphic table function and derives its output symbols from its
//!   proper outputs and its table arguments.
//! - **Validation**: [`plan::logical::PlanValidator`] checks structure,
//!   copartitioning and symbol dependencies.
//! - **Optimization**: [`Optimizer`] applies [`Rule`]s bottom-up until the
//!   plan stops changing.
//!
//! # Modules
//!
//! - [`plan::logical`] - Plan nodes, visitor, validation and codec
//! - [`plan::optimize`] - Rewrite rules and the optimizer driver
//!
//! # Quick Start
//!
//! ```
//! use quarry_core::{PlanNodeId, Symbol};
//! use quarry_plan::plan::logical::{
//!     validate_plan, Argument, ColumnMapping, DataOrganizationSpecification, PlanNode,
//!     TableArgumentProperties, TableFunctionHandle, TableFunctionNode,
//! };
//!
//! let orders = PlanNode::table_scan(
//!     PlanNodeId::new(0),
//!     "orders",
//!     vec![Symbol::new("custkey"), Symbol::new("total")],
//! );
//! let partitioning = DataOrganizationSpecification::new(vec![Symbol::new("custkey")], None).unwrap();
//!
//! let plan = TableFunctionNode::builder(PlanNodeId::new(1), "sessionize", TableFunctionHandle::new("system"))
//!     .argument("input", Argument::table(vec![]))
//!     .proper_output("session")
//!     .table_argument(
//!         orders.into_ref(),
//!         TableArgumentProperties::set_semantics("input", ColumnMapping::new(), Some(partitioning)),
//!     )
//!     .build_plan()
//!     .unwrap();
//!
//! validate_plan(&plan).unwrap();
//! assert_eq!(plan.output_symbols(), vec![Symbol::new("session"), Symbol::new("custkey")]);
//! println!("{}", plan.display_tree());
//! ```

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod plan;

// Re-export commonly used items at the crate root
pub use plan::{Optimizer, PlanError, PlanNode, PlanRef, PlanResult, Rule, TableFunctionNode};
