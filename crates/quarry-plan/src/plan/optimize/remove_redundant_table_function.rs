//! Removal of table functions pruned by an empty input.

use tracing::trace;

use super::Rule;
use crate::plan::logical::PlanNode;

/// Replaces a table function with an empty `Values` node when one of its
/// prune-when-empty inputs is known to produce no rows.
///
/// The replacement keeps the id and the output symbols of the table
/// function, so parents bound to those symbols stay valid.
///
/// # Example Transformation
///
/// Before:
/// ```text
/// TableFunction(f) => [out] input(prune)
///   Values(0 rows) [x]
/// ```
///
/// After:
/// ```text
/// Values(0 rows) [out]
/// ```
#[derive(Debug, Clone, Default)]
pub struct RemoveRedundantTableFunction {}

impl RemoveRedundantTableFunction {
    /// Creates a new rule instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }
}

impl Rule for RemoveRedundantTableFunction {
    fn name(&self) -> &'static str {
        "RemoveRedundantTableFunction"
    }

    fn apply(&self, node: &PlanNode) -> Option<PlanNode> {
        let table_function = node.as_table_function()?;
        let (_, pruned_by) = table_function
            .table_inputs()
            .find(|&(source, properties)| properties.is_prune_when_empty() && is_empty_values(source))?;

        trace!(
            node = %table_function.id(),
            argument = pruned_by.argument_name(),
            "table function input is empty"
        );
        Some(PlanNode::empty_values(table_function.id(), table_function.output_symbols()))
    }
}

fn is_empty_values(node: &PlanNode) -> bool {
    matches!(node, PlanNode::Values(values) if values.is_empty())
}
