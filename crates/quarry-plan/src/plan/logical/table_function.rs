//! Table-function plan node.
//!
//! A [`TableFunctionNode`] invokes a polymorphic table function. The function
//! takes named [`Argument`]s; each table-shaped argument is fed by one source
//! of the node, and the node's `table_argument_properties` describe, position
//! by position, how that source's rows are presented to the function.
//!
//! # Output symbols
//!
//! The node's output is the function's proper outputs followed by one
//! contribution per source, in source order:
//!
//! - a pass-through argument contributes every output symbol of its source;
//! - otherwise, a partitioned argument contributes its partition-by symbols;
//! - otherwise, the argument contributes nothing.
//!
//! Column positions downstream are bound against this order, so it must not
//! change between planning and execution.
//!
//! # Example
//!
//! ```
//! use quarry_core::{PlanNodeId, Symbol};
//! use quarry_plan::plan::logical::{
//!     Argument, ColumnMapping, PlanNode, TableArgumentProperties, TableFunctionHandle,
//!     TableFunctionNode,
//! };
//!
//! let input = PlanNode::table_scan(PlanNodeId::new(0), "orders", vec!["o".into(), "c".into()]);
//! let properties = TableArgumentProperties::row_semantics(
//!     "input",
//!     ColumnMapping::from_iter([("orderkey", Symbol::new("o"))]),
//! )
//! .with_pass_through_columns(true);
//!
//! let node = TableFunctionNode::builder(PlanNodeId::new(1), "exclude", TableFunctionHandle::new("system"))
//!     .argument("input", Argument::table(vec![]))
//!     .proper_output("marker")
//!     .table_argument(input.into_ref(), properties)
//!     .build()
//!     .unwrap();
//!
//! let outputs: Vec<String> = node.output_symbols().iter().map(|s| s.to_string()).collect();
//! assert_eq!(outputs, ["marker", "o", "c"]);
//! ```

use std::fmt;

use indexmap::IndexMap;
use quarry_core::{PlanNodeId, Symbol};
use serde::{Deserialize, Serialize};

use super::argument::Argument;
use super::node::{Node, PlanNode, PlanRef};
use super::organization::DataOrganizationSpecification;
use super::validate::{PlanError, PlanResult};
use super::visitor::PlanVisitor;

/// Multi-valued mapping from a column name visible to the table function to
/// the plan symbols backing it.
///
/// Keys keep their insertion order and so do the symbols under each key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(IndexMap<String, Vec<Symbol>>);

impl ColumnMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `symbol` under `column`, after any symbols already there.
    pub fn put(&mut self, column: impl Into<String>, symbol: Symbol) {
        self.0.entry(column.into()).or_default().push(symbol);
    }

    /// Builder form of [`ColumnMapping::put`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, symbol: Symbol) -> Self {
        self.put(column, symbol);
        self
    }

    /// Symbols mapped under `column`, empty if the column is absent.
    #[must_use]
    pub fn get(&self, column: &str) -> &[Symbol] {
        self.0.get(column).map_or(&[], Vec::as_slice)
    }

    /// Returns true if `column` has at least one symbol.
    #[must_use]
    pub fn contains_column(&self, column: &str) -> bool {
        !self.get(column).is_empty()
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    /// Every `(column, symbol)` entry, grouped by column.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Symbol)> + '_ {
        self.0
            .iter()
            .flat_map(|(column, symbols)| symbols.iter().map(move |symbol| (column.as_str(), symbol)))
    }

    /// Distinct symbols in entry order.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = Vec::new();
        for (_, symbol) in self.entries() {
            if !out.contains(symbol) {
                out.push(symbol.clone());
            }
        }
        out
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<String>> FromIterator<(K, Symbol)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (K, Symbol)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (column, symbol) in iter {
            mapping.put(column, symbol);
        }
        mapping
    }
}

/// Per-argument metadata for one table-shaped argument.
///
/// A row-semantics argument never has a specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTableArgumentProperties")]
pub struct TableArgumentProperties {
    argument_name: String,
    column_mapping: ColumnMapping,
    row_semantics: bool,
    prune_when_empty: bool,
    pass_through_columns: bool,
    specification: Option<DataOrganizationSpecification>,
}

impl TableArgumentProperties {
    /// Creates the properties of one table argument.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidTableArgument`] if the name is empty or if
    /// a row-semantics argument is given a specification.
    pub fn try_new(
        argument_name: impl Into<String>,
        column_mapping: ColumnMapping,
        row_semantics: bool,
        prune_when_empty: bool,
        pass_through_columns: bool,
        specification: Option<DataOrganizationSpecification>,
    ) -> PlanResult<Self> {
        let argument_name = argument_name.into();
        if argument_name.is_empty() {
            return Err(PlanError::InvalidTableArgument {
                argument: argument_name,
                reason: "argument name is empty".to_string(),
            });
        }
        if row_semantics && specification.is_some() {
            return Err(PlanError::InvalidTableArgument {
                argument: argument_name,
                reason: "row semantics argument cannot have a partitioning specification"
                    .to_string(),
            });
        }
        Ok(Self {
            argument_name,
            column_mapping,
            row_semantics,
            prune_when_empty,
            pass_through_columns,
            specification,
        })
    }

    /// Properties of a row-semantics argument.
    ///
    /// # Panics
    ///
    /// Panics if `argument_name` is empty.
    #[must_use]
    pub fn row_semantics(argument_name: impl Into<String>, column_mapping: ColumnMapping) -> Self {
        let argument_name = argument_name.into();
        assert!(!argument_name.is_empty(), "argument name is empty");
        Self {
            argument_name,
            column_mapping,
            row_semantics: true,
            prune_when_empty: false,
            pass_through_columns: false,
            specification: None,
        }
    }

    /// Properties of a set-semantics argument, optionally partitioned.
    ///
    /// # Panics
    ///
    /// Panics if `argument_name` is empty.
    #[must_use]
    pub fn set_semantics(
        argument_name: impl Into<String>,
        column_mapping: ColumnMapping,
        specification: Option<DataOrganizationSpecification>,
    ) -> Self {
        let argument_name = argument_name.into();
        assert!(!argument_name.is_empty(), "argument name is empty");
        Self {
            argument_name,
            column_mapping,
            row_semantics: false,
            prune_when_empty: false,
            pass_through_columns: false,
            specification,
        }
    }

    /// Sets the prune-when-empty flag.
    #[must_use]
    pub fn with_prune_when_empty(mut self, prune_when_empty: bool) -> Self {
        self.prune_when_empty = prune_when_empty;
        self
    }

    /// Sets the pass-through flag.
    #[must_use]
    pub fn with_pass_through_columns(mut self, pass_through_columns: bool) -> Self {
        self.pass_through_columns = pass_through_columns;
        self
    }

    /// Name of the argument these properties describe.
    #[must_use]
    pub fn argument_name(&self) -> &str {
        &self.argument_name
    }

    /// Function-visible column name to symbol mapping.
    #[must_use]
    pub fn column_mapping(&self) -> &ColumnMapping {
        &self.column_mapping
    }

    /// Whether the function processes this input row by row.
    #[must_use]
    pub const fn is_row_semantics(&self) -> bool {
        self.row_semantics
    }

    /// Whether the function result may be pruned when this input is empty.
    #[must_use]
    pub const fn is_prune_when_empty(&self) -> bool {
        self.prune_when_empty
    }

    /// Whether all columns of this input are forwarded to the node output.
    #[must_use]
    pub const fn is_pass_through_columns(&self) -> bool {
        self.pass_through_columns
    }

    /// The partitioning and ordering of this input.
    #[must_use]
    pub fn specification(&self) -> Option<&DataOrganizationSpecification> {
        self.specification.as_ref()
    }

    /// Number of partition-by columns, zero when unpartitioned.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.specification.as_ref().map_or(0, |spec| spec.partition_by().len())
    }

    /// Symbols that the matching source must produce: the column mapping
    /// followed by the specification's symbols, without duplicates.
    #[must_use]
    pub fn required_symbols(&self) -> Vec<Symbol> {
        let mut symbols = self.column_mapping.symbols();
        if let Some(spec) = &self.specification {
            for symbol in spec.symbols() {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
        }
        symbols
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTableArgumentProperties {
    argument_name: String,
    column_mapping: ColumnMapping,
    row_semantics: bool,
    prune_when_empty: bool,
    pass_through_columns: bool,
    #[serde(default)]
    specification: Option<DataOrganizationSpecification>,
}

impl TryFrom<RawTableArgumentProperties> for TableArgumentProperties {
    type Error = PlanError;

    fn try_from(raw: RawTableArgumentProperties) -> PlanResult<Self> {
        Self::try_new(
            raw.argument_name,
            raw.column_mapping,
            raw.row_semantics,
            raw.prune_when_empty,
            raw.pass_through_columns,
            raw.specification,
        )
    }
}

/// A group of table arguments that must be partitioned compatibly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CopartitioningConstraint(Vec<String>);

impl CopartitioningConstraint {
    /// Creates a constraint over the named arguments.
    #[must_use]
    pub fn new<S: Into<String>>(arguments: impl IntoIterator<Item = S>) -> Self {
        Self(arguments.into_iter().map(Into::into).collect())
    }

    /// Argument names in the group.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.0
    }

    /// Returns true if `argument` is a member.
    #[must_use]
    pub fn contains(&self, argument: &str) -> bool {
        self.0.iter().any(|name| name == argument)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CopartitioningConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Opaque execution binding of a table function, supplied by the connector
/// that owns the function.
///
/// The planner compares handles for equality and carries them along; it
/// never looks inside `connector_handle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFunctionHandle {
    catalog: String,
    connector_handle: serde_json::Value,
}

impl TableFunctionHandle {
    /// A handle for `catalog` with an empty connector payload.
    #[must_use]
    pub fn new(catalog: impl Into<String>) -> Self {
        Self { catalog: catalog.into(), connector_handle: serde_json::Value::Null }
    }

    /// A handle for `catalog` carrying the given connector payload.
    #[must_use]
    pub fn with_connector_handle(
        catalog: impl Into<String>,
        connector_handle: serde_json::Value,
    ) -> Self {
        Self { catalog: catalog.into(), connector_handle }
    }

    /// Catalog that owns the function.
    #[must_use]
    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// The connector's payload.
    #[must_use]
    pub fn connector_handle(&self) -> &serde_json::Value {
        &self.connector_handle
    }
}

/// Invocation of a table function.
///
/// `sources` and `table_argument_properties` are aligned by position and
/// always have the same length. The node is immutable; rewrites go through
/// [`TableFunctionNode::replace_children`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTableFunctionNode")]
pub struct TableFunctionNode {
    id: PlanNodeId,
    name: String,
    arguments: IndexMap<String, Argument>,
    proper_outputs: Vec<Symbol>,
    sources: Vec<PlanRef>,
    table_argument_properties: Vec<TableArgumentProperties>,
    copartitioning_lists: Vec<CopartitioningConstraint>,
    handle: TableFunctionHandle,
}

impl TableFunctionNode {
    /// Creates a table-function node.
    ///
    /// Copartitioning groups are not checked here; see
    /// [`validate_copartitioning`](super::validate_copartitioning).
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidPlan`] if the name is empty or if the
    /// number of sources differs from the number of table argument
    /// properties.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        id: PlanNodeId,
        name: impl Into<String>,
        arguments: IndexMap<String, Argument>,
        proper_outputs: Vec<Symbol>,
        sources: Vec<PlanRef>,
        table_argument_properties: Vec<TableArgumentProperties>,
        copartitioning_lists: Vec<CopartitioningConstraint>,
        handle: TableFunctionHandle,
    ) -> PlanResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PlanError::InvalidPlan {
                node: id,
                field: "name",
                reason: "table function name is empty".to_string(),
            });
        }
        if sources.len() != table_argument_properties.len() {
            return Err(PlanError::InvalidPlan {
                node: id,
                field: "sources",
                reason: format!(
                    "{} sources but {} table argument properties",
                    sources.len(),
                    table_argument_properties.len()
                ),
            });
        }
        Ok(Self {
            id,
            name,
            arguments,
            proper_outputs,
            sources,
            table_argument_properties,
            copartitioning_lists,
            handle,
        })
    }

    /// Starts building a node whose sources and properties are added in
    /// pairs.
    #[must_use]
    pub fn builder(
        id: PlanNodeId,
        name: impl Into<String>,
        handle: TableFunctionHandle,
    ) -> TableFunctionBuilder {
        TableFunctionBuilder {
            id,
            name: name.into(),
            arguments: IndexMap::new(),
            proper_outputs: Vec::new(),
            sources: Vec::new(),
            table_argument_properties: Vec::new(),
            copartitioning_lists: Vec::new(),
            handle,
        }
    }

    /// Node id.
    #[must_use]
    pub const fn id(&self) -> PlanNodeId {
        self.id
    }

    /// Function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments by name, in invocation order.
    #[must_use]
    pub fn arguments(&self) -> &IndexMap<String, Argument> {
        &self.arguments
    }

    /// Columns produced by the function itself.
    #[must_use]
    pub fn proper_outputs(&self) -> &[Symbol] {
        &self.proper_outputs
    }

    /// Child plans, one per table argument.
    #[must_use]
    pub fn sources(&self) -> &[PlanRef] {
        &self.sources
    }

    /// Table argument properties, aligned with [`Self::sources`].
    #[must_use]
    pub fn table_argument_properties(&self) -> &[TableArgumentProperties] {
        &self.table_argument_properties
    }

    /// Copartitioning groups.
    #[must_use]
    pub fn copartitioning_lists(&self) -> &[CopartitioningConstraint] {
        &self.copartitioning_lists
    }

    /// The connector-supplied execution binding.
    #[must_use]
    pub fn handle(&self) -> &TableFunctionHandle {
        &self.handle
    }

    /// Position and properties of the table argument called `name`.
    #[must_use]
    pub fn table_argument(&self, name: &str) -> Option<(usize, &TableArgumentProperties)> {
        self.table_argument_properties
            .iter()
            .enumerate()
            .find(|(_, properties)| properties.argument_name() == name)
    }

    /// Iterates `(source, properties)` pairs in position order.
    pub fn table_inputs(
        &self,
    ) -> impl Iterator<Item = (&PlanRef, &TableArgumentProperties)> + '_ {
        self.sources.iter().zip(&self.table_argument_properties)
    }

    /// The symbols this node outputs: proper outputs first, then each
    /// source's contribution in source order.
    #[must_use]
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut symbols = self.proper_outputs.clone();
        for (source, properties) in self.table_inputs() {
            if properties.is_pass_through_columns() {
                symbols.extend(source.output_symbols());
            } else if let Some(spec) = properties.specification() {
                symbols.extend(spec.partition_by().iter().cloned());
            }
        }
        symbols
    }

    /// Returns a copy of this node with `new_sources` in place of its
    /// sources. Every other field is carried over unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::WrongChildCount`] if `new_sources` has a
    /// different length than the current sources.
    pub fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        if new_sources.len() != self.sources.len() {
            return Err(PlanError::WrongChildCount {
                node: self.id,
                expected: self.sources.len(),
                actual: new_sources.len(),
            });
        }
        Ok(Self { sources: new_sources, ..self.clone() })
    }

    /// Dispatches to [`PlanVisitor::visit_table_function`].
    pub fn accept<C, V: PlanVisitor<C> + ?Sized>(&self, visitor: &mut V, context: C) -> V::Output {
        visitor.visit_table_function(self, context)
    }
}

impl Node for TableFunctionNode {
    fn id(&self) -> PlanNodeId {
        self.id
    }

    fn sources(&self) -> &[PlanRef] {
        &self.sources
    }

    fn output_symbols(&self) -> Vec<Symbol> {
        Self::output_symbols(self)
    }

    fn node_type(&self) -> &'static str {
        "TableFunction"
    }

    fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        Self::replace_children(self, new_sources)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTableFunctionNode {
    id: PlanNodeId,
    name: String,
    #[serde(default)]
    arguments: IndexMap<String, Argument>,
    #[serde(default)]
    proper_outputs: Vec<Symbol>,
    #[serde(default)]
    sources: Vec<PlanRef>,
    #[serde(default)]
    table_argument_properties: Vec<TableArgumentProperties>,
    #[serde(default)]
    copartitioning_lists: Vec<CopartitioningConstraint>,
    handle: TableFunctionHandle,
}

impl TryFrom<RawTableFunctionNode> for TableFunctionNode {
    type Error = PlanError;

    fn try_from(raw: RawTableFunctionNode) -> PlanResult<Self> {
        Self::try_new(
            raw.id,
            raw.name,
            raw.arguments,
            raw.proper_outputs,
            raw.sources,
            raw.table_argument_properties,
            raw.copartitioning_lists,
            raw.handle,
        )
    }
}

/// Builder for [`TableFunctionNode`].
#[derive(Debug, Clone)]
pub struct TableFunctionBuilder {
    id: PlanNodeId,
    name: String,
    arguments: IndexMap<String, Argument>,
    proper_outputs: Vec<Symbol>,
    sources: Vec<PlanRef>,
    table_argument_properties: Vec<TableArgumentProperties>,
    copartitioning_lists: Vec<CopartitioningConstraint>,
    handle: TableFunctionHandle,
}

impl TableFunctionBuilder {
    /// Adds a named argument. A later argument with the same name replaces
    /// the earlier one.
    #[must_use]
    pub fn argument(mut self, name: impl Into<String>, argument: Argument) -> Self {
        self.arguments.insert(name.into(), argument);
        self
    }

    /// Appends a proper output.
    #[must_use]
    pub fn proper_output(mut self, symbol: impl Into<Symbol>) -> Self {
        self.proper_outputs.push(symbol.into());
        self
    }

    /// Appends a source together with its table argument properties.
    #[must_use]
    pub fn table_argument(mut self, source: PlanRef, properties: TableArgumentProperties) -> Self {
        self.sources.push(source);
        self.table_argument_properties.push(properties);
        self
    }

    /// Adds a copartitioning group.
    #[must_use]
    pub fn copartition<S: Into<String>>(mut self, arguments: impl IntoIterator<Item = S>) -> Self {
        self.copartitioning_lists.push(CopartitioningConstraint::new(arguments));
        self
    }

    /// Builds the node.
    ///
    /// # Errors
    ///
    /// See [`TableFunctionNode::try_new`].
    pub fn build(self) -> PlanResult<TableFunctionNode> {
        TableFunctionNode::try_new(
            self.id,
            self.name,
            self.arguments,
            self.proper_outputs,
            self.sources,
            self.table_argument_properties,
            self.copartitioning_lists,
            self.handle,
        )
    }

    /// Builds the node wrapped as a [`PlanNode`].
    ///
    /// # Errors
    ///
    /// See [`TableFunctionNode::try_new`].
    pub fn build_plan(self) -> PlanResult<PlanNode> {
        self.build().map(|node| PlanNode::TableFunction(Box::new(node)))
    }
}
