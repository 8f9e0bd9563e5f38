//! Limit merging.

use super::Rule;
use crate::plan::logical::{LimitNode, PlanNode};

/// Collapses a limit directly over another limit.
///
/// # Example Transformation
///
/// Before:
/// ```text
/// Limit(10)
///   Limit(5)
///     Scan(users)
/// ```
///
/// After:
/// ```text
/// Limit(5)
///   Scan(users)
/// ```
///
/// The merged node keeps the id of the outer limit.
#[derive(Debug, Clone, Default)]
pub struct MergeLimits {}

impl MergeLimits {
    /// Creates a new limit merging rule.
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }
}

impl Rule for MergeLimits {
    fn name(&self) -> &'static str {
        "MergeLimits"
    }

    fn apply(&self, node: &PlanNode) -> Option<PlanNode> {
        let PlanNode::Limit(outer) = node else {
            return None;
        };
        let PlanNode::Limit(inner) = &**outer.source() else {
            return None;
        };
        Some(PlanNode::Limit(LimitNode::new(
            outer.id(),
            inner.source().clone(),
            outer.count().min(inner.count()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quarry_core::{PlanNodeId, Symbol};

    use super::*;

    #[test]
    fn merges_nested_limits() {
        let scan = PlanNode::table_scan(PlanNodeId::new(0), "t", vec![Symbol::new("a")]).into_ref();
        let inner = PlanNode::Limit(LimitNode::new(PlanNodeId::new(1), Arc::clone(&scan), 20));
        let outer = inner.limit(PlanNodeId::new(2), 7);

        let merged = MergeLimits::new().apply(&outer).expect("rule applies");
        let PlanNode::Limit(limit) = merged else {
            panic!("expected a limit");
        };
        assert_eq!(limit.id(), PlanNodeId::new(2));
        assert_eq!(limit.count(), 7);
        assert!(Arc::ptr_eq(limit.source(), &scan));
    }

    #[test]
    fn ignores_single_limit() {
        let plan = PlanNode::table_scan(PlanNodeId::new(0), "t", vec![]).limit(PlanNodeId::new(1), 3);
        assert!(MergeLimits::new().apply(&plan).is_none());
    }
}
