//! Logical query plan.
//!
//! This module defines the immutable plan IR that optimizer passes rewrite
//! and execution consumes.
//!
//! # Overview
//!
//! A plan is a tree of [`PlanNode`]s. Children are held through shared
//! [`PlanRef`]s, so rewriting a node builds a new node around the subtrees
//! it keeps and leaves every other tree that references them intact.
//!
//! # Plan Nodes
//!
//! - **Relational**: `TableScan`, `Values`, `Filter`, `Project`, `Limit`
//! - **Table functions**: [`TableFunctionNode`], the invocation of a
//!   polymorphic table function over zero or more table arguments
//!
//! # Example
//!
//! ```
//! use quarry_core::{PlanNodeId, Symbol};
//! use quarry_plan::plan::logical::{validate_plan, Expr, PlanNode};
//!
//! let plan = PlanNode::table_scan(PlanNodeId::new(0), "orders", vec![Symbol::new("total")])
//!     .filter(PlanNodeId::new(1), Expr::symbol("total").gt(Expr::constant(100i64)))
//!     .limit(PlanNodeId::new(2), 10);
//!
//! assert!(validate_plan(&plan).is_ok());
//! assert_eq!(plan.output_symbols(), vec![Symbol::new("total")]);
//! ```

mod argument;
pub mod codec;
mod display;
mod expr;
mod node;
mod organization;
mod relational;
mod table_function;
mod types;
mod validate;
mod visitor;


pub use argument::{Argument, DescriptorArgument, Field, ScalarArgument, TableArgument};
pub use display::{Indent, PlanPrinter};
pub use expr::{ConstantValue, Expr};
pub use node::{DisplayTree, Node, PlanNode, PlanRef};
pub use organization::{DataOrganizationSpecification, OrderingScheme, SortOrder};
pub use relational::{FilterNode, LimitNode, ProjectNode, TableScanNode, ValuesNode};
pub use table_function::{
    ColumnMapping, CopartitioningConstraint, TableArgumentProperties, TableFunctionBuilder,
    TableFunctionHandle, TableFunctionNode,
};
pub use types::{SymbolTypes, TypeProvider};
pub use validate::{
    check_no_cycles, validate_copartitioning, validate_copartitioning_types, validate_plan,
    DependencyChecker, PlanError, PlanResult, PlanValidator, DEFAULT_MAX_DEPTH,
};
pub use visitor::{walk_sources, PlanVisitor};
