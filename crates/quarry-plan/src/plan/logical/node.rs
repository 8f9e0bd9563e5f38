//! Logical plan node definitions.
//!
//! This module defines the [`PlanNode`] enum, the closed family of nodes a
//! logical plan is built from, and the [`Node`] contract every variant
//! satisfies.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use quarry_core::{PlanNodeId, Symbol};
use serde::{Deserialize, Serialize};

use super::display::{Indent, PlanPrinter};
use super::expr::Expr;
use super::relational::{FilterNode, LimitNode, ProjectNode, TableScanNode, ValuesNode};
use super::table_function::TableFunctionNode;
use super::validate::PlanResult;
use super::visitor::PlanVisitor;

/// Shared reference to a plan node.
///
/// Plans are immutable, so a subtree can be referenced from several trees
/// at once. Rewrites build new nodes around the subtrees they keep.
pub type PlanRef = Arc<PlanNode>;

/// The contract shared by every plan node.
pub trait Node {
    /// Node id, unique within a plan tree.
    fn id(&self) -> PlanNodeId;

    /// Child nodes in order.
    fn sources(&self) -> &[PlanRef];

    /// Symbols this node produces, in order.
    fn output_symbols(&self) -> Vec<Symbol>;

    /// Short name of the node kind.
    fn node_type(&self) -> &'static str;

    /// Returns a copy of this node over `new_sources`.
    ///
    /// # Errors
    ///
    /// Fails if `new_sources` does not have as many entries as
    /// [`Node::sources`].
    fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self>
    where
        Self: Sized;
}

/// A logical plan node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", rename_all = "camelCase")]
pub enum PlanNode {
    /// Full table scan.
    TableScan(TableScanNode),
    /// Inline rows.
    Values(ValuesNode),
    /// Row filter.
    Filter(FilterNode),
    /// Projection.
    Project(ProjectNode),
    /// Row count limit.
    Limit(LimitNode),
    /// Table function invocation.
    TableFunction(Box<TableFunctionNode>),
}

impl PlanNode {
    // ========== Builder Methods ==========

    /// Creates a table scan.
    #[must_use]
    pub fn table_scan(id: PlanNodeId, table: impl Into<String>, outputs: Vec<Symbol>) -> Self {
        Self::TableScan(TableScanNode::new(id, table, outputs))
    }

    /// Creates an inline values node.
    #[must_use]
    pub fn values(id: PlanNodeId, outputs: Vec<Symbol>, rows: Vec<Vec<Expr>>) -> Self {
        Self::Values(ValuesNode::new(id, outputs, rows))
    }

    /// Creates a values node with no rows.
    #[must_use]
    pub fn empty_values(id: PlanNodeId, outputs: Vec<Symbol>) -> Self {
        Self::Values(ValuesNode::empty(id, outputs))
    }

    /// Filters this plan.
    #[must_use]
    pub fn filter(self, id: PlanNodeId, predicate: Expr) -> Self {
        Self::Filter(FilterNode::new(id, self.into_ref(), predicate))
    }

    /// Projects this plan.
    #[must_use]
    pub fn project(self, id: PlanNodeId, assignments: IndexMap<Symbol, Expr>) -> Self {
        Self::Project(ProjectNode::new(id, self.into_ref(), assignments))
    }

    /// Limits this plan.
    #[must_use]
    pub fn limit(self, id: PlanNodeId, count: u64) -> Self {
        Self::Limit(LimitNode::new(id, self.into_ref(), count))
    }

    /// Wraps this node in a shared reference.
    #[must_use]
    pub fn into_ref(self) -> PlanRef {
        Arc::new(self)
    }

    // ========== Contract ==========

    /// Node id.
    #[must_use]
    pub fn id(&self) -> PlanNodeId {
        self.as_node().id()
    }

    /// Child nodes in order.
    #[must_use]
    pub fn sources(&self) -> &[PlanRef] {
        self.as_node().sources()
    }

    /// Symbols this node produces, in order.
    #[must_use]
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.as_node().output_symbols()
    }

    /// Returns the node type name.
    #[must_use]
    pub fn node_type(&self) -> &'static str {
        self.as_node().node_type()
    }

    /// Returns true if this node has no sources.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.sources().is_empty()
    }

    /// Returns the same kind of node over `new_sources`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::WrongChildCount`](super::PlanError::WrongChildCount)
    /// if the number of sources changes.
    pub fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        Ok(match self {
            Self::TableScan(node) => Self::TableScan(node.replace_children(new_sources)?),
            Self::Values(node) => Self::Values(node.replace_children(new_sources)?),
            Self::Filter(node) => Self::Filter(node.replace_children(new_sources)?),
            Self::Project(node) => Self::Project(node.replace_children(new_sources)?),
            Self::Limit(node) => Self::Limit(node.replace_children(new_sources)?),
            Self::TableFunction(node) => {
                Self::TableFunction(Box::new(node.replace_children(new_sources)?))
            }
        })
    }

    /// Dispatches to the visitor method for this node's kind.
    pub fn accept<C, V: PlanVisitor<C> + ?Sized>(&self, visitor: &mut V, context: C) -> V::Output {
        match self {
            Self::TableScan(node) => node.accept(visitor, context),
            Self::Values(node) => node.accept(visitor, context),
            Self::Filter(node) => node.accept(visitor, context),
            Self::Project(node) => node.accept(visitor, context),
            Self::Limit(node) => node.accept(visitor, context),
            Self::TableFunction(node) => node.accept(visitor, context),
        }
    }

    /// Returns the table function node, if this is one.
    #[must_use]
    pub fn as_table_function(&self) -> Option<&TableFunctionNode> {
        match self {
            Self::TableFunction(node) => Some(&**node),
            _ => None,
        }
    }

    /// Number of nodes in this tree, counting shared subtrees once per use.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.sources().iter().map(|source| source.node_count()).sum::<usize>()
    }

    /// Returns a tree-style display of this plan.
    #[must_use]
    pub fn display_tree(&self) -> DisplayTree<'_> {
        DisplayTree { plan: self }
    }

    fn as_node(&self) -> &dyn Node {
        match self {
            Self::TableScan(node) => node,
            Self::Values(node) => node,
            Self::Filter(node) => node,
            Self::Project(node) => node,
            Self::Limit(node) => node,
            Self::TableFunction(node) => &**node,
        }
    }
}

impl Node for PlanNode {
    fn id(&self) -> PlanNodeId {
        Self::id(self)
    }

    fn sources(&self) -> &[PlanRef] {
        Self::sources(self)
    }

    fn output_symbols(&self) -> Vec<Symbol> {
        Self::output_symbols(self)
    }

    fn node_type(&self) -> &'static str {
        Self::node_type(self)
    }

    fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        Self::replace_children(self, new_sources)
    }
}

impl From<TableFunctionNode> for PlanNode {
    fn from(node: TableFunctionNode) -> Self {
        Self::TableFunction(Box::new(node))
    }
}

/// Helper for tree-style plan display.
pub struct DisplayTree<'a> {
    plan: &'a PlanNode,
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.plan.accept(&mut PlanPrinter::new(f), Indent::root())
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_tree())
    }
}
