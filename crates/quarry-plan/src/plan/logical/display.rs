//! Tree-style plan printing.
//!
//! [`PlanPrinter`] renders a plan one node per line, children below their
//! parent:
//!
//! ```text
//! └── Limit[3]: 10
//!     └── TableFunction[2]: exclude => [marker] input(row, pass)
//!         └── TableScan[1]: orders [o, c]
//! ```

use std::fmt;

use quarry_core::Symbol;

use super::node::Node;
use super::relational::{FilterNode, LimitNode, ProjectNode, TableScanNode, ValuesNode};
use super::table_function::{TableArgumentProperties, TableFunctionNode};
use super::visitor::PlanVisitor;

/// Line prefix state while printing.
#[derive(Debug, Clone, Default)]
pub struct Indent {
    prefix: String,
    is_last: bool,
}

impl Indent {
    /// Indentation of the root node.
    #[must_use]
    pub fn root() -> Self {
        Self { prefix: String::new(), is_last: true }
    }

    fn child(&self, is_last: bool) -> Self {
        let extension = if self.is_last { "    " } else { "│   " };
        Self { prefix: format!("{}{extension}", self.prefix), is_last }
    }

    fn connector(&self) -> &'static str {
        if self.is_last {
            "└── "
        } else {
            "├── "
        }
    }
}

/// Writes a plan tree to a formatter.
pub struct PlanPrinter<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
}

impl<'a, 'b> PlanPrinter<'a, 'b> {
    /// Creates a printer writing to `f`.
    pub fn new(f: &'a mut fmt::Formatter<'b>) -> Self {
        Self { f }
    }

    fn line(&mut self, indent: &Indent, content: fmt::Arguments<'_>) -> fmt::Result {
        writeln!(self.f, "{}{}{content}", indent.prefix, indent.connector())
    }

    fn sources(&mut self, node: &dyn Node, indent: &Indent) -> fmt::Result {
        let sources = node.sources();
        for (i, source) in sources.iter().enumerate() {
            source.accept(self, indent.child(i == sources.len() - 1))?;
        }
        Ok(())
    }
}

fn symbol_list(symbols: &[Symbol]) -> String {
    let names: Vec<&str> = symbols.iter().map(Symbol::name).collect();
    format!("[{}]", names.join(", "))
}

fn argument_flags(properties: &TableArgumentProperties) -> String {
    let mut flags = Vec::new();
    if properties.is_row_semantics() {
        flags.push("row".to_string());
    }
    if properties.is_prune_when_empty() {
        flags.push("prune".to_string());
    }
    if properties.is_pass_through_columns() {
        flags.push("pass".to_string());
    }
    if let Some(spec) = properties.specification() {
        flags.push(spec.to_string());
    }
    format!("{}({})", properties.argument_name(), flags.join(", "))
}

impl PlanVisitor<Indent> for PlanPrinter<'_, '_> {
    type Output = fmt::Result;

    fn visit_plan(&mut self, node: &dyn Node, indent: Indent) -> fmt::Result {
        self.line(&indent, format_args!("{}[{}]", node.node_type(), node.id()))?;
        self.sources(node, &indent)
    }

    fn visit_table_scan(&mut self, node: &TableScanNode, indent: Indent) -> fmt::Result {
        self.line(
            &indent,
            format_args!("TableScan[{}]: {} {}", node.id(), node.table(), symbol_list(node.outputs())),
        )
    }

    fn visit_values(&mut self, node: &ValuesNode, indent: Indent) -> fmt::Result {
        self.line(
            &indent,
            format_args!(
                "Values[{}]: {} rows {}",
                node.id(),
                node.rows().len(),
                symbol_list(node.outputs())
            ),
        )
    }

    fn visit_filter(&mut self, node: &FilterNode, indent: Indent) -> fmt::Result {
        self.line(&indent, format_args!("Filter[{}]: {}", node.id(), node.predicate()))?;
        self.sources(node, &indent)
    }

    fn visit_project(&mut self, node: &ProjectNode, indent: Indent) -> fmt::Result {
        let assignments: Vec<String> = node
            .assignments()
            .iter()
            .map(|(symbol, expr)| format!("{symbol} := {expr}"))
            .collect();
        self.line(&indent, format_args!("Project[{}]: {}", node.id(), assignments.join(", ")))?;
        self.sources(node, &indent)
    }

    fn visit_limit(&mut self, node: &LimitNode, indent: Indent) -> fmt::Result {
        self.line(&indent, format_args!("Limit[{}]: {}", node.id(), node.count()))?;
        self.sources(node, &indent)
    }

    fn visit_table_function(&mut self, node: &TableFunctionNode, indent: Indent) -> fmt::Result {
        let mut content = format!(
            "TableFunction[{}]: {} => {}",
            node.id(),
            node.name(),
            symbol_list(node.proper_outputs())
        );
        for properties in node.table_argument_properties() {
            content.push(' ');
            content.push_str(&argument_flags(properties));
        }
        for group in node.copartitioning_lists() {
            content.push_str(&format!(" copartition {group}"));
        }
        self.line(&indent, format_args!("{content}"))?;
        self.sources(node, &indent)
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::PlanNodeId;

    use crate::plan::logical::expr::Expr;
    use crate::plan::logical::node::PlanNode;
    use crate::plan::logical::organization::DataOrganizationSpecification;
    use crate::plan::logical::table_function::{
        ColumnMapping, TableArgumentProperties, TableFunctionHandle, TableFunctionNode,
    };
    use quarry_core::Symbol;

    fn id(n: u64) -> PlanNodeId {
        PlanNodeId::new(n)
    }

    #[test]
    fn prints_table_function_tree() {
        let orders = PlanNode::table_scan(id(1), "orders", vec![Symbol::new("o"), Symbol::new("c")]);
        let plan: PlanNode =
            TableFunctionNode::builder(id(2), "exclude", TableFunctionHandle::new("system"))
                .proper_output("marker")
                .table_argument(
                    orders.into_ref(),
                    TableArgumentProperties::row_semantics("input", ColumnMapping::new())
                        .with_pass_through_columns(true),
                )
                .build()
                .expect("valid node")
                .into();
        let plan = plan.limit(id(3), 10);

        let expected = "\
└── Limit[3]: 10
    └── TableFunction[2]: exclude => [marker] input(row, pass)
        └── TableScan[1]: orders [o, c]
";
        assert_eq!(plan.to_string(), expected);
    }

    #[test]
    fn prints_siblings_and_partitioning() {
        let spec = DataOrganizationSpecification::new(vec![Symbol::new("k")], None)
            .expect("valid specification");
        let plan: PlanNode =
            TableFunctionNode::builder(id(3), "f", TableFunctionHandle::new("system"))
                .table_argument(
                    PlanNode::empty_values(id(1), vec![Symbol::new("k")]).into_ref(),
                    TableArgumentProperties::set_semantics("a", ColumnMapping::new(), Some(spec))
                        .with_prune_when_empty(true),
                )
                .table_argument(
                    PlanNode::table_scan(id(0), "t", vec![Symbol::new("x")])
                        .filter(id(2), Expr::symbol("x").gt(Expr::constant(1i64)))
                        .into_ref(),
                    TableArgumentProperties::set_semantics("b", ColumnMapping::new(), None),
                )
                .build()
                .expect("valid node")
                .into();

        let expected = "\
└── TableFunction[3]: f => [] a(prune, PARTITION BY k) b()
    ├── Values[1]: 0 rows [k]
    └── Filter[2]: (x > 1)
        └── TableScan[0]: t [x]
";
        assert_eq!(plan.to_string(), expected);
    }
}
