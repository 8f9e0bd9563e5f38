//! Plan validation.
//!
//! This module provides the planner's error type and the checks that catch
//! malformed plans before they reach execution.
//!
//! # Validation Levels
//!
//! - Construction: node constructors reject missing names and misaligned
//!   sources. These checks always run, including on deserialization.
//! - [`validate_copartitioning`]: copartitioning groups of one table function.
//! - [`validate_copartitioning_types`]: the same, plus partition column types.
//! - [`PlanValidator`]: whole-tree validation with configurable checks.
//! - [`check_no_cycles`]: sanity check on plan depth.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use quarry_core::{PlanNodeId, Symbol};
use thiserror::Error;
use tracing::{debug, trace};

use super::argument::Argument;
use super::node::{Node, PlanNode};
use super::relational::{FilterNode, ProjectNode};
use super::table_function::TableFunctionNode;
use super::types::TypeProvider;
use super::visitor::PlanVisitor;

/// Errors that can occur while building, rewriting or validating a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A node field violates a construction invariant.
    #[error("invalid plan node {node}: {field}: {reason}")]
    InvalidPlan {
        /// The offending node.
        node: PlanNodeId,
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// `replace_children` was given the wrong number of children.
    #[error("wrong number of new children for node {node}: expected {expected}, got {actual}")]
    WrongChildCount {
        /// The node being rewritten.
        node: PlanNodeId,
        /// Current number of sources.
        expected: usize,
        /// Number of replacement sources.
        actual: usize,
    },

    /// Table argument properties are inconsistent.
    #[error("invalid table argument {argument}: {reason}")]
    InvalidTableArgument {
        /// The argument name.
        argument: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A copartitioning group is invalid.
    #[error("invalid copartitioning in node {node}: {reason}")]
    InvalidCopartitioning {
        /// The table function node.
        node: PlanNodeId,
        /// What is wrong with the group.
        reason: String,
    },

    /// Invalid partitioning or ordering specification.
    #[error("invalid specification: {0}")]
    InvalidSpecification(String),

    /// Two nodes in one tree share an id.
    #[error("duplicate plan node id: {0}")]
    DuplicateNodeId(PlanNodeId),

    /// A node uses a symbol that its sources do not produce.
    #[error("node {node} references symbol {symbol} that its source does not produce")]
    MissingSymbol {
        /// The consuming node.
        node: PlanNodeId,
        /// The missing symbol.
        symbol: Symbol,
    },

    /// Cyclic dependency in plan.
    #[error("cyclic dependency detected")]
    CyclicDependency,

    /// Plan (de)serialization failed.
    #[error("plan codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Default maximum plan depth accepted by validation.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Checks the copartitioning groups of a table function.
///
/// Every member of every group must name a table argument of the node, must
/// appear in at most one group, must not use row semantics and must be
/// partitioned. All members of a group must have the same number of
/// partition columns, and a group needs at least two members.
///
/// # Errors
///
/// Returns [`PlanError::InvalidCopartitioning`] describing the first
/// violation found.
pub fn validate_copartitioning(node: &TableFunctionNode) -> PlanResult<()> {
    let invalid = |reason: String| PlanError::InvalidCopartitioning { node: node.id(), reason };

    let mut seen: HashSet<&str> = HashSet::new();
    for group in node.copartitioning_lists() {
        if group.len() < 2 {
            return Err(invalid(format!("group {group} has fewer than two arguments")));
        }

        let mut expected_count: Option<usize> = None;
        for name in group.arguments() {
            let Some((_, properties)) = node.table_argument(name) else {
                return Err(invalid(format!("group {group} names unknown table argument {name}")));
            };
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("table argument {name} is copartitioned more than once")));
            }
            if properties.is_row_semantics() {
                return Err(invalid(format!("table argument {name} has row semantics")));
            }
            let Some(spec) = properties.specification() else {
                return Err(invalid(format!("table argument {name} is not partitioned")));
            };

            let count = spec.partition_by().len();
            match expected_count {
                None => expected_count = Some(count),
                Some(expected) if expected != count => {
                    return Err(invalid(format!(
                        "table argument {name} has {count} partitioning columns, expected {expected}"
                    )));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Checks copartitioning groups, then checks that corresponding partition
/// columns of each group have the same type.
///
/// Columns whose type is unknown to `types` are not compared.
///
/// # Errors
///
/// Returns [`PlanError::InvalidCopartitioning`] on the first violation.
pub fn validate_copartitioning_types(
    node: &TableFunctionNode,
    types: &dyn TypeProvider,
) -> PlanResult<()> {
    validate_copartitioning(node)?;

    for group in node.copartitioning_lists() {
        let columns: Vec<(&str, &[Symbol])> = group
            .arguments()
            .iter()
            .filter_map(|name| {
                let (_, properties) = node.table_argument(name)?;
                Some((name.as_str(), properties.specification()?.partition_by()))
            })
            .collect();
        let Some(((first_name, first_columns), rest)) = columns.split_first() else {
            continue;
        };

        for (name, partition_by) in rest {
            for (left, right) in first_columns.iter().zip(partition_by.iter()) {
                if let (Some(left_type), Some(right_type)) = (types.type_of(left), types.type_of(right)) {
                    if left_type != right_type {
                        return Err(PlanError::InvalidCopartitioning {
                            node: node.id(),
                            reason: format!(
                                "partition column {left} of {first_name} has type {left_type} \
                                 but {right} of {name} has type {right_type}"
                            ),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Whole-plan validator.
///
/// Structural checks always run. The copartitioning, dependency and
/// unique-id checks can be switched off individually. With a
/// [`TypeProvider`] set, copartitioned partition columns are also compared
/// by type.
#[derive(Debug, Clone)]
pub struct PlanValidator {
    check_copartitioning: bool,
    check_dependencies: bool,
    check_unique_ids: bool,
    max_depth: usize,
    types: Option<Arc<dyn TypeProvider>>,
}

impl Default for PlanValidator {
    fn default() -> Self {
        Self {
            check_copartitioning: true,
            check_dependencies: true,
            check_unique_ids: true,
            max_depth: DEFAULT_MAX_DEPTH,
            types: None,
        }
    }
}

impl PlanValidator {
    /// Creates a validator with every check enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables the copartitioning check.
    #[must_use]
    pub const fn without_copartitioning_check(mut self) -> Self {
        self.check_copartitioning = false;
        self
    }

    /// Disables the symbol dependency check.
    #[must_use]
    pub const fn without_dependency_check(mut self) -> Self {
        self.check_dependencies = false;
        self
    }

    /// Disables the unique node id check.
    #[must_use]
    pub const fn without_unique_id_check(mut self) -> Self {
        self.check_unique_ids = false;
        self
    }

    /// Sets the maximum plan depth.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Type-checks copartitioned partition columns against `types`.
    #[must_use]
    pub fn with_types(mut self, types: Arc<dyn TypeProvider>) -> Self {
        self.types = Some(types);
        self
    }

    /// Returns the maximum plan depth.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Validates `plan` and every node below it.
    ///
    /// # Errors
    ///
    /// Returns the first [`PlanError`] found.
    pub fn validate(&self, plan: &PlanNode) -> PlanResult<()> {
        debug!(root = %plan.id(), node_type = plan.node_type(), "validating plan");

        let mut ids = HashSet::new();
        let mut validated = HashMap::new();
        self.validate_node(plan, 0, &mut ids, &mut validated)?;

        if self.check_dependencies {
            plan.accept(&mut DependencyChecker::new(), ())?;
        }
        Ok(())
    }

    fn validate_node(
        &self,
        plan: &PlanNode,
        depth: usize,
        ids: &mut HashSet<PlanNodeId>,
        validated: &mut HashMap<*const PlanNode, usize>,
    ) -> PlanResult<()> {
        if depth > self.max_depth {
            return Err(PlanError::CyclicDependency);
        }
        // A shared subtree that already passed at this depth or deeper
        // passes again. With unique ids enforced a second visit is an error.
        let key: *const PlanNode = plan;
        if !self.check_unique_ids && validated.get(&key).is_some_and(|&seen| seen >= depth) {
            return Ok(());
        }
        if self.check_unique_ids && !ids.insert(plan.id()) {
            return Err(PlanError::DuplicateNodeId(plan.id()));
        }
        trace!(node = %plan.id(), node_type = plan.node_type(), depth, "validating node");

        match plan {
            PlanNode::TableScan(node) => {
                if node.table().is_empty() {
                    return Err(PlanError::InvalidPlan {
                        node: node.id(),
                        field: "table",
                        reason: "table name is empty".to_string(),
                    });
                }
            }
            PlanNode::Values(node) => {
                let width = node.outputs().len();
                if let Some(row) = node.rows().iter().position(|row| row.len() != width) {
                    return Err(PlanError::InvalidPlan {
                        node: node.id(),
                        field: "rows",
                        reason: format!(
                            "row {row} has {} values, expected {width}",
                            node.rows()[row].len()
                        ),
                    });
                }
            }
            PlanNode::TableFunction(node) => {
                validate_table_arguments(node)?;
                if self.check_copartitioning {
                    match &self.types {
                        Some(types) => validate_copartitioning_types(node, &**types)?,
                        None => validate_copartitioning(node)?,
                    }
                }
            }
            PlanNode::Filter(_) | PlanNode::Project(_) | PlanNode::Limit(_) => {}
        }

        for source in plan.sources() {
            self.validate_node(source, depth + 1, ids, validated)?;
        }
        validated.insert(key, depth);
        Ok(())
    }
}

/// Validates a plan with the default [`PlanValidator`].
///
/// # Errors
///
/// Returns the first [`PlanError`] found.
pub fn validate_plan(plan: &PlanNode) -> PlanResult<()> {
    PlanValidator::new().validate(plan)
}

/// Each table argument property must be named once and must describe a
/// table argument of the invocation.
fn validate_table_arguments(node: &TableFunctionNode) -> PlanResult<()> {
    let mut names = HashSet::new();
    for properties in node.table_argument_properties() {
        let name = properties.argument_name();
        if !names.insert(name) {
            return Err(PlanError::InvalidTableArgument {
                argument: name.to_string(),
                reason: "described by more than one table argument property".to_string(),
            });
        }
        match node.arguments().get(name) {
            Some(Argument::Table(_)) => {}
            Some(_) => {
                return Err(PlanError::InvalidTableArgument {
                    argument: name.to_string(),
                    reason: "not a table argument".to_string(),
                });
            }
            None => {
                return Err(PlanError::InvalidTableArgument {
                    argument: name.to_string(),
                    reason: format!("not an argument of {}", node.name()),
                });
            }
        }
    }
    Ok(())
}

/// Checks that every symbol a node consumes is produced by its sources.
///
/// A subtree shared by several parents is checked once.
#[derive(Debug, Default)]
pub struct DependencyChecker {
    checked: HashSet<*const PlanNode>,
}

impl DependencyChecker {
    /// Creates a checker that has seen no nodes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn require(
        node: PlanNodeId,
        available: &[Symbol],
        required: impl IntoIterator<Item = Symbol>,
    ) -> PlanResult<()> {
        match required.into_iter().find(|symbol| !available.contains(symbol)) {
            Some(symbol) => Err(PlanError::MissingSymbol { node, symbol }),
            None => Ok(()),
        }
    }
}

impl PlanVisitor<()> for DependencyChecker {
    type Output = PlanResult<()>;

    fn visit_plan(&mut self, node: &dyn Node, context: ()) -> PlanResult<()> {
        for source in node.sources() {
            if self.checked.insert(Arc::as_ptr(source)) {
                source.accept(self, context)?;
            }
        }
        Ok(())
    }

    fn visit_filter(&mut self, node: &FilterNode, context: ()) -> PlanResult<()> {
        let available = node.source().output_symbols();
        Self::require(node.id(), &available, node.predicate().referenced_symbols())?;
        self.visit_plan(node, context)
    }

    fn visit_project(&mut self, node: &ProjectNode, context: ()) -> PlanResult<()> {
        let available = node.source().output_symbols();
        for expr in node.assignments().values() {
            Self::require(node.id(), &available, expr.referenced_symbols())?;
        }
        self.visit_plan(node, context)
    }

    fn visit_table_function(&mut self, node: &TableFunctionNode, context: ()) -> PlanResult<()> {
        for (source, properties) in node.table_inputs() {
            let available = source.output_symbols();
            Self::require(node.id(), &available, properties.required_symbols())?;
        }
        self.visit_plan(node, context)
    }
}

/// Checks that the plan has no cycles, by bounding its depth.
///
/// # Errors
///
/// Returns [`PlanError::CyclicDependency`] if the plan is deeper than
/// [`DEFAULT_MAX_DEPTH`].
pub fn check_no_cycles(plan: &PlanNode) -> PlanResult<()> {
    fn check_depth(plan: &PlanNode, depth: usize) -> PlanResult<()> {
        if depth > DEFAULT_MAX_DEPTH {
            return Err(PlanError::CyclicDependency);
        }
        for source in plan.sources() {
            check_depth(source, depth + 1)?;
        }
        Ok(())
    }

    check_depth(plan, 0)
}
