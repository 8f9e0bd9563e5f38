//! Quarry Core
//!
//! This crate provides the identifier types that every layer of the Quarry
//! planner shares.
//!
//! # Overview
//!
//! - **Symbols**: [`Symbol`] names a single output column of a plan subtree.
//!   Symbols are compared and ordered by name and carry no type.
//! - **Node identifiers**: [`PlanNodeId`] identifies a node within a plan tree.
//! - **Allocators**: [`SymbolAllocator`] mints fresh, unique symbol names and
//!   [`PlanNodeIdAllocator`] hands out node ids.
//!
//! # Example
//!
//! ```
//! use quarry_core::{PlanNodeIdAllocator, Symbol, SymbolAllocator};
//!
//! let mut symbols = SymbolAllocator::new();
//! let a = symbols.new_symbol("orderkey");
//! let b = symbols.new_symbol("orderkey");
//! assert_eq!(a, Symbol::new("orderkey"));
//! assert_eq!(b, Symbol::new("orderkey_0"));
//!
//! let ids = PlanNodeIdAllocator::new();
//! assert!(ids.next_id() < ids.next_id());
//! ```

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod id_gen;
pub mod types;

pub use id_gen::{PlanNodeIdAllocator, SymbolAllocator};
pub use types::{PlanNodeId, Symbol};
