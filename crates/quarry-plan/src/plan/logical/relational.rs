//! Relational plan nodes.
//!
//! This module defines the plan nodes that surround table function
//! invocations: `TableScan`, `Values`, `Filter`, `Project` and `Limit`.

// Allow missing_const_for_fn - const fn with Vec isn't stable
#![allow(clippy::missing_const_for_fn)]

use indexmap::IndexMap;
use quarry_core::{PlanNodeId, Symbol};
use serde::{Deserialize, Serialize};

use super::expr::Expr;
use super::node::{Node, PlanRef};
use super::validate::{PlanError, PlanResult};
use super::visitor::PlanVisitor;

/// Checks that a leaf is given no children.
fn no_children(node: PlanNodeId, new_sources: &[PlanRef]) -> PlanResult<()> {
    if new_sources.is_empty() {
        Ok(())
    } else {
        Err(PlanError::WrongChildCount { node, expected: 0, actual: new_sources.len() })
    }
}

/// Takes the only child out of `new_sources`.
fn single_child(node: PlanNodeId, new_sources: Vec<PlanRef>) -> PlanResult<PlanRef> {
    let actual = new_sources.len();
    let mut sources = new_sources.into_iter();
    match (sources.next(), sources.next()) {
        (Some(source), None) => Ok(source),
        _ => Err(PlanError::WrongChildCount { node, expected: 1, actual }),
    }
}

/// A table scan node.
///
/// Reads every row of a table and exposes its columns as `outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableScanNode {
    id: PlanNodeId,
    table: String,
    outputs: Vec<Symbol>,
}

impl TableScanNode {
    /// Creates a new scan node for the given table.
    #[must_use]
    pub fn new(id: PlanNodeId, table: impl Into<String>, outputs: Vec<Symbol>) -> Self {
        Self { id, table: table.into(), outputs }
    }

    /// Node id.
    #[must_use]
    pub const fn id(&self) -> PlanNodeId {
        self.id
    }

    /// Table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Scanned columns.
    #[must_use]
    pub fn outputs(&self) -> &[Symbol] {
        &self.outputs
    }

    /// A scan has no children, so only an empty list is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::WrongChildCount`] if `new_sources` is not empty.
    pub fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        no_children(self.id, &new_sources)?;
        Ok(self.clone())
    }

    /// Dispatches to [`PlanVisitor::visit_table_scan`].
    pub fn accept<C, V: PlanVisitor<C> + ?Sized>(&self, visitor: &mut V, context: C) -> V::Output {
        visitor.visit_table_scan(self, context)
    }
}

impl Node for TableScanNode {
    fn id(&self) -> PlanNodeId {
        self.id
    }

    fn sources(&self) -> &[PlanRef] {
        &[]
    }

    fn output_symbols(&self) -> Vec<Symbol> {
        self.outputs.clone()
    }

    fn node_type(&self) -> &'static str {
        "TableScan"
    }

    fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        Self::replace_children(self, new_sources)
    }
}

/// Inline rows.
///
/// Each row holds one expression per output symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesNode {
    id: PlanNodeId,
    outputs: Vec<Symbol>,
    #[serde(default)]
    rows: Vec<Vec<Expr>>,
}

impl ValuesNode {
    /// Creates a values node.
    #[must_use]
    pub fn new(id: PlanNodeId, outputs: Vec<Symbol>, rows: Vec<Vec<Expr>>) -> Self {
        Self { id, outputs, rows }
    }

    /// A values node with no rows.
    #[must_use]
    pub fn empty(id: PlanNodeId, outputs: Vec<Symbol>) -> Self {
        Self { id, outputs, rows: Vec::new() }
    }

    /// Node id.
    #[must_use]
    pub const fn id(&self) -> PlanNodeId {
        self.id
    }

    /// Output columns.
    #[must_use]
    pub fn outputs(&self) -> &[Symbol] {
        &self.outputs
    }

    /// The rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Expr>] {
        &self.rows
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values is a leaf, so only an empty list is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::WrongChildCount`] if `new_sources` is not empty.
    pub fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        no_children(self.id, &new_sources)?;
        Ok(self.clone())
    }

    /// Dispatches to [`PlanVisitor::visit_values`].
    pub fn accept<C, V: PlanVisitor<C> + ?Sized>(&self, visitor: &mut V, context: C) -> V::Output {
        visitor.visit_values(self, context)
    }
}

impl Node for ValuesNode {
    fn id(&self) -> PlanNodeId {
        self.id
    }

    fn sources(&self) -> &[PlanRef] {
        &[]
    }

    fn output_symbols(&self) -> Vec<Symbol> {
        self.outputs.clone()
    }

    fn node_type(&self) -> &'static str {
        "Values"
    }

    fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        Self::replace_children(self, new_sources)
    }
}

/// A filter node.
///
/// Keeps the source rows for which the predicate holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterNode {
    id: PlanNodeId,
    source: PlanRef,
    predicate: Expr,
}

impl FilterNode {
    /// Creates a new filter node.
    #[must_use]
    pub fn new(id: PlanNodeId, source: PlanRef, predicate: Expr) -> Self {
        Self { id, source, predicate }
    }

    /// Node id.
    #[must_use]
    pub const fn id(&self) -> PlanNodeId {
        self.id
    }

    /// The input.
    #[must_use]
    pub fn source(&self) -> &PlanRef {
        &self.source
    }

    /// The predicate to filter by.
    #[must_use]
    pub fn predicate(&self) -> &Expr {
        &self.predicate
    }

    /// Returns a filter over a new source.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::WrongChildCount`] unless exactly one source is
    /// given.
    pub fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        let source = single_child(self.id, new_sources)?;
        Ok(Self { id: self.id, source, predicate: self.predicate.clone() })
    }

    /// Dispatches to [`PlanVisitor::visit_filter`].
    pub fn accept<C, V: PlanVisitor<C> + ?Sized>(&self, visitor: &mut V, context: C) -> V::Output {
        visitor.visit_filter(self, context)
    }
}

impl Node for FilterNode {
    fn id(&self) -> PlanNodeId {
        self.id
    }

    fn sources(&self) -> &[PlanRef] {
        std::slice::from_ref(&self.source)
    }

    fn output_symbols(&self) -> Vec<Symbol> {
        self.source().output_symbols()
    }

    fn node_type(&self) -> &'static str {
        "Filter"
    }

    fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        Self::replace_children(self, new_sources)
    }
}

/// A projection node.
///
/// Computes one expression per output symbol, in assignment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectNode {
    id: PlanNodeId,
    source: PlanRef,
    assignments: IndexMap<Symbol, Expr>,
}

impl ProjectNode {
    /// Creates a new projection node.
    #[must_use]
    pub fn new(id: PlanNodeId, source: PlanRef, assignments: IndexMap<Symbol, Expr>) -> Self {
        Self { id, source, assignments }
    }

    /// A projection that forwards `symbols` from the source unchanged.
    #[must_use]
    pub fn identity(id: PlanNodeId, source: PlanRef, symbols: Vec<Symbol>) -> Self {
        let assignments =
            symbols.into_iter().map(|symbol| (symbol.clone(), Expr::Symbol(symbol))).collect();
        Self::new(id, source, assignments)
    }

    /// Node id.
    #[must_use]
    pub const fn id(&self) -> PlanNodeId {
        self.id
    }

    /// The input.
    #[must_use]
    pub fn source(&self) -> &PlanRef {
        &self.source
    }

    /// Output symbol to expression assignments.
    #[must_use]
    pub fn assignments(&self) -> &IndexMap<Symbol, Expr> {
        &self.assignments
    }

    /// Returns true if every assignment forwards a symbol of the same name.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.assignments
            .iter()
            .all(|(symbol, expr)| matches!(expr, Expr::Symbol(source) if source == symbol))
    }

    /// Returns a projection over a new source.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::WrongChildCount`] unless exactly one source is
    /// given.
    pub fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        let source = single_child(self.id, new_sources)?;
        Ok(Self { id: self.id, source, assignments: self.assignments.clone() })
    }

    /// Dispatches to [`PlanVisitor::visit_project`].
    pub fn accept<C, V: PlanVisitor<C> + ?Sized>(&self, visitor: &mut V, context: C) -> V::Output {
        visitor.visit_project(self, context)
    }
}

impl Node for ProjectNode {
    fn id(&self) -> PlanNodeId {
        self.id
    }

    fn sources(&self) -> &[PlanRef] {
        std::slice::from_ref(&self.source)
    }

    fn output_symbols(&self) -> Vec<Symbol> {
        self.assignments.keys().cloned().collect()
    }

    fn node_type(&self) -> &'static str {
        "Project"
    }

    fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        Self::replace_children(self, new_sources)
    }
}

/// A limit node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitNode {
    id: PlanNodeId,
    source: PlanRef,
    count: u64,
}

impl LimitNode {
    /// Creates a new limit node.
    #[must_use]
    pub fn new(id: PlanNodeId, source: PlanRef, count: u64) -> Self {
        Self { id, source, count }
    }

    /// Node id.
    #[must_use]
    pub const fn id(&self) -> PlanNodeId {
        self.id
    }

    /// The input.
    #[must_use]
    pub fn source(&self) -> &PlanRef {
        &self.source
    }

    /// Maximum number of rows.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Returns a limit over a new source.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::WrongChildCount`] unless exactly one source is
    /// given.
    pub fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        let source = single_child(self.id, new_sources)?;
        Ok(Self { id: self.id, source, count: self.count })
    }

    /// Dispatches to [`PlanVisitor::visit_limit`].
    pub fn accept<C, V: PlanVisitor<C> + ?Sized>(&self, visitor: &mut V, context: C) -> V::Output {
        visitor.visit_limit(self, context)
    }
}

impl Node for LimitNode {
    fn id(&self) -> PlanNodeId {
        self.id
    }

    fn sources(&self) -> &[PlanRef] {
        std::slice::from_ref(&self.source)
    }

    fn output_symbols(&self) -> Vec<Symbol> {
        self.source().output_symbols()
    }

    fn node_type(&self) -> &'static str {
        "Limit"
    }

    fn replace_children(&self, new_sources: Vec<PlanRef>) -> PlanResult<Self> {
        Self::replace_children(self, new_sources)
    }
}
