//! Query optimization.
//!
//! This module rewrites logical plans into equivalent, cheaper plans.
//!
//! # Optimization Rules
//!
//! - **Remove Redundant Table Function**: a table function that would be
//!   pruned because one of its prune-when-empty inputs is empty becomes an
//!   empty `Values` node
//! - **Merge Limits**: nested limits collapse into one
//!
//! Rules see one node at a time. The [`Optimizer`] walks the plan bottom-up,
//! rebuilding a node through `replace_children` only when one of its
//! sources changed, so subtrees that no rule touches keep their identity.
//! A subtree shared by several parents is rewritten once and stays shared.
//!
//! # Example
//!
//! ```
//! use quarry_core::{PlanNodeId, Symbol};
//! use quarry_plan::plan::logical::PlanNode;
//! use quarry_plan::plan::optimize::Optimizer;
//!
//! let plan = PlanNode::table_scan(PlanNodeId::new(0), "users", vec![Symbol::new("name")])
//!     .limit(PlanNodeId::new(1), 100)
//!     .limit(PlanNodeId::new(2), 10);
//!
//! let optimized = Optimizer::new().optimize(plan.into_ref()).unwrap();
//! assert_eq!(optimized.to_string(), "└── Limit[2]: 10\n    └── TableScan[0]: users [name]\n");
//! ```

mod merge_limits;
mod remove_redundant_table_function;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

pub use merge_limits::MergeLimits;
pub use remove_redundant_table_function::RemoveRedundantTableFunction;

use crate::plan::logical::{PlanNode, PlanRef, PlanResult};

/// A local rewrite of one plan node.
pub trait Rule: fmt::Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the replacement for `node`, or `None` if the rule does not
    /// apply.
    fn apply(&self, node: &PlanNode) -> Option<PlanNode>;
}

/// Query optimizer.
///
/// Applies rewrite rules until the plan stops changing or the iteration
/// limit is reached.
#[derive(Debug, Clone)]
pub struct Optimizer {
    /// Whether to remove table functions pruned by an empty input.
    remove_redundant_table_functions: bool,
    /// Whether to merge nested limits.
    merge_limits: bool,
    /// Additional rules, applied after the built-in ones.
    extra_rules: Vec<Arc<dyn Rule>>,
    /// Maximum optimization iterations.
    max_iterations: usize,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// Creates a new optimizer with all built-in rules enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            remove_redundant_table_functions: true,
            merge_limits: true,
            extra_rules: Vec::new(),
            max_iterations: 10,
        }
    }

    /// Disables redundant table function removal.
    #[must_use]
    pub fn without_redundant_table_function_removal(mut self) -> Self {
        self.remove_redundant_table_functions = false;
        self
    }

    /// Disables limit merging.
    #[must_use]
    pub fn without_limit_merging(mut self) -> Self {
        self.merge_limits = false;
        self
    }

    /// Adds a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.extra_rules.push(rule);
        self
    }

    /// Sets maximum optimization iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// The enabled rules, in application order.
    #[must_use]
    pub fn rules(&self) -> Vec<Arc<dyn Rule>> {
        let mut rules: Vec<Arc<dyn Rule>> = Vec::new();
        if self.remove_redundant_table_functions {
            rules.push(Arc::new(RemoveRedundantTableFunction::new()));
        }
        if self.merge_limits {
            rules.push(Arc::new(MergeLimits::new()));
        }
        rules.extend(self.extra_rules.iter().cloned());
        rules
    }

    /// Optimizes a logical plan.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`](crate::plan::logical::PlanError) if a node
    /// cannot be rebuilt over its rewritten sources.
    pub fn optimize(&self, plan: PlanRef) -> PlanResult<PlanRef> {
        let rules = self.rules();
        let mut current = plan;

        for iteration in 0..self.max_iterations {
            let (optimized, changed) = Self::rewrite(&current, &rules, &mut HashMap::new())?;
            if !changed {
                debug!(iteration, "optimizer reached a fixed point");
                return Ok(current);
            }
            current = optimized;
        }

        debug!(max_iterations = self.max_iterations, "optimizer stopped at iteration limit");
        Ok(current)
    }

    /// Rewrites `node` bottom-up, returning the new node and whether
    /// anything changed. `rewritten` maps input nodes to their results
    /// for this pass.
    fn rewrite(
        node: &PlanRef,
        rules: &[Arc<dyn Rule>],
        rewritten: &mut HashMap<*const PlanNode, (PlanRef, bool)>,
    ) -> PlanResult<(PlanRef, bool)> {
        if let Some((result, changed)) = rewritten.get(&Arc::as_ptr(node)) {
            return Ok((Arc::clone(result), *changed));
        }

        let mut changed = false;
        let mut sources = Vec::with_capacity(node.sources().len());
        for source in node.sources() {
            let (rewritten_source, source_changed) = Self::rewrite(source, rules, rewritten)?;
            changed |= source_changed;
            sources.push(rewritten_source);
        }

        let mut current =
            if changed { Arc::new(node.replace_children(sources)?) } else { Arc::clone(node) };

        for rule in rules {
            if let Some(replacement) = rule.apply(&current) {
                debug!(rule = rule.name(), node = %current.id(), "rule fired");
                current = Arc::new(replacement);
                changed = true;
            } else {
                trace!(rule = rule.name(), node = %current.id(), "rule did not apply");
            }
        }

        rewritten.insert(Arc::as_ptr(node), (Arc::clone(&current), changed));
        Ok((current, changed))
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::{PlanNodeId, Symbol};

    use super::*;

    fn id(n: u64) -> PlanNodeId {
        PlanNodeId::new(n)
    }

    #[test]
    fn optimizer_merges_limits() {
        let plan = PlanNode::table_scan(id(0), "users", vec![Symbol::new("name")])
            .limit(id(1), 5)
            .limit(id(2), 20)
            .limit(id(3), 10);

        let optimized = Optimizer::new().optimize(plan.into_ref()).expect("optimizes");

        let PlanNode::Limit(limit) = &*optimized else {
            panic!("expected a limit, got {optimized}");
        };
        assert_eq!(limit.count(), 5);
        assert_eq!(limit.source().node_type(), "TableScan");
    }

    #[test]
    fn optimizer_disabled_rules() {
        let plan = PlanNode::table_scan(id(0), "users", vec![Symbol::new("name")])
            .limit(id(1), 5)
            .limit(id(2), 10)
            .into_ref();

        let optimizer = Optimizer::new().without_limit_merging().without_redundant_table_function_removal();
        let optimized = optimizer.optimize(Arc::clone(&plan)).expect("optimizes");

        assert!(Arc::ptr_eq(&optimized, &plan));
    }

    #[test]
    fn optimizer_respects_iteration_limit() {
        let plan = PlanNode::table_scan(id(0), "users", vec![Symbol::new("name")])
            .limit(id(1), 5)
            .limit(id(2), 10)
            .into_ref();

        let optimized =
            Optimizer::new().with_max_iterations(0).optimize(Arc::clone(&plan)).expect("optimizes");
        assert!(Arc::ptr_eq(&optimized, &plan));
    }

    #[derive(Debug)]
    struct RenameScan;

    impl Rule for RenameScan {
        fn name(&self) -> &'static str {
            "RenameScan"
        }

        fn apply(&self, node: &PlanNode) -> Option<PlanNode> {
            match node {
                PlanNode::TableScan(scan) if scan.table() == "old" => {
                    Some(PlanNode::table_scan(scan.id(), "new", scan.outputs().to_vec()))
                }
                _ => None,
            }
        }
    }

    #[test]
    fn optimizer_runs_extra_rules() {
        let plan = PlanNode::table_scan(id(0), "old", vec![Symbol::new("a")]).limit(id(1), 1);
        let optimized = Optimizer::new()
            .with_rule(Arc::new(RenameScan))
            .optimize(plan.into_ref())
            .expect("optimizes");
        assert!(optimized.to_string().contains("TableScan[0]: new"));
    }
}
