//! Plan visitor.
//!
//! Tree-walking algorithms implement [`PlanVisitor`] once and are dispatched
//! to the right method by [`PlanNode::accept`](super::PlanNode::accept).
//! Every `visit_*` method falls back to [`PlanVisitor::visit_plan`], so a
//! visitor only overrides the node kinds it cares about.

use super::node::Node;
use super::relational::{FilterNode, LimitNode, ProjectNode, TableScanNode, ValuesNode};
use super::table_function::TableFunctionNode;

/// A visitor over plan nodes, threading a caller-supplied context `C`.
pub trait PlanVisitor<C> {
    /// The value produced by visiting a node.
    type Output;

    /// Fallback for node kinds without a dedicated override.
    fn visit_plan(&mut self, node: &dyn Node, context: C) -> Self::Output;

    /// Visits a table scan.
    fn visit_table_scan(&mut self, node: &TableScanNode, context: C) -> Self::Output {
        self.visit_plan(node, context)
    }

    /// Visits an inline values node.
    fn visit_values(&mut self, node: &ValuesNode, context: C) -> Self::Output {
        self.visit_plan(node, context)
    }

    /// Visits a filter.
    fn visit_filter(&mut self, node: &FilterNode, context: C) -> Self::Output {
        self.visit_plan(node, context)
    }

    /// Visits a projection.
    fn visit_project(&mut self, node: &ProjectNode, context: C) -> Self::Output {
        self.visit_plan(node, context)
    }

    /// Visits a limit.
    fn visit_limit(&mut self, node: &LimitNode, context: C) -> Self::Output {
        self.visit_plan(node, context)
    }

    /// Visits a table function invocation.
    fn visit_table_function(&mut self, node: &TableFunctionNode, context: C) -> Self::Output {
        self.visit_plan(node, context)
    }
}

/// Visits every source of `node` in order, each with its own copy of
/// `context`, and collects the results.
pub fn walk_sources<C, V>(visitor: &mut V, node: &dyn Node, context: C) -> Vec<V::Output>
where
    C: Clone,
    V: PlanVisitor<C> + ?Sized,
{
    node.sources().iter().map(|source| source.accept(visitor, context.clone())).collect()
}
