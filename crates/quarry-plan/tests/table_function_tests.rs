//! End-to-end tests for table-function plan nodes in `quarry-plan`.
//!
//! These tests verify:
//! - Output symbol resolution
//! - Structural substitution and sharing
//! - Visitor dispatch
//! - Copartitioning and dependency validation
//! - JSON round-trips

use std::sync::Arc;

use quarry_core::{PlanNodeIdAllocator, Symbol, SymbolAllocator};
use quarry_plan::plan::logical::codec::{from_json, to_json, to_json_pretty};
use quarry_plan::plan::logical::{
    validate_copartitioning, validate_plan, walk_sources, Argument, ColumnMapping,
    DataOrganizationSpecification, Field, Node, OrderingScheme, PlanError, PlanNode, PlanRef,
    PlanValidator, PlanVisitor, SortOrder, TableArgumentProperties, TableFunctionHandle,
    TableFunctionNode,
};

/// Builds plans with fresh ids and symbols.
struct Fixture {
    ids: PlanNodeIdAllocator,
    symbols: SymbolAllocator,
}

impl Fixture {
    fn new() -> Self {
        Self { ids: PlanNodeIdAllocator::new(), symbols: SymbolAllocator::new() }
    }

    fn symbol(&mut self, hint: &str) -> Symbol {
        self.symbols.new_symbol(hint)
    }

    fn scan(&mut self, table: &str, outputs: &[&Symbol]) -> PlanRef {
        PlanNode::table_scan(self.ids.next_id(), table, outputs.iter().map(|s| (*s).clone()).collect())
            .into_ref()
    }
}

fn partitioned_by(symbols: &[&Symbol]) -> DataOrganizationSpecification {
    DataOrganizationSpecification::new(symbols.iter().map(|s| (*s).clone()).collect(), None)
        .expect("non-empty partitioning")
}

/// `properOutputs = [A, B]`, a pass-through input producing `[X, Y]` and a
/// partitioned input producing `[P, Q]` partitioned by `P`.
struct TwoInputPlan {
    node: TableFunctionNode,
    a: Symbol,
    b: Symbol,
    x: Symbol,
    y: Symbol,
    p: Symbol,
}

fn two_input_plan(fixture: &mut Fixture) -> TwoInputPlan {
    let a = fixture.symbol("a");
    let b = fixture.symbol("b");
    let x = fixture.symbol("x");
    let y = fixture.symbol("y");
    let p = fixture.symbol("p");
    let q = fixture.symbol("q");

    let first = fixture.scan("first", &[&x, &y]);
    let second = fixture.scan("second", &[&p, &q]);

    let node = TableFunctionNode::builder(
        fixture.ids.next_id(),
        "combine",
        TableFunctionHandle::with_connector_handle("system", serde_json::json!({ "version": 2 })),
    )
    .argument("first", Argument::table(vec![Field::new("x", "bigint"), Field::new("y", "varchar")]))
    .argument("second", Argument::table(vec![Field::new("p", "bigint"), Field::new("q", "double")]))
    .argument("threshold", Argument::scalar("bigint", 3i64))
    .proper_output(a.clone())
    .proper_output(b.clone())
    .table_argument(
        first,
        TableArgumentProperties::row_semantics(
            "first",
            ColumnMapping::new().with("x", x.clone()).with("y", y.clone()),
        )
        .with_pass_through_columns(true),
    )
    .table_argument(
        second,
        TableArgumentProperties::set_semantics(
            "second",
            ColumnMapping::new().with("p", p.clone()),
            Some(partitioned_by(&[&p])),
        ),
    )
    .build()
    .expect("valid node");

    TwoInputPlan { node, a, b, x, y, p }
}

// ============================================================================
// Output Symbol Resolution
// ============================================================================

mod outputs {
    use super::*;

    #[test]
    fn concatenation_law() {
        let mut fixture = Fixture::new();
        let plan = two_input_plan(&mut fixture);
        assert_eq!(
            plan.node.output_symbols(),
            vec![plan.a, plan.b, plan.x, plan.y, plan.p]
        );
    }

    #[test]
    fn resolution_is_repeatable() {
        let mut fixture = Fixture::new();
        let plan = two_input_plan(&mut fixture);
        let first = plan.node.output_symbols();
        let second = plan.node.output_symbols();
        assert_eq!(first, second);
    }

    #[test]
    fn no_pass_through_and_no_specification_contributes_nothing() {
        let mut fixture = Fixture::new();
        let out = fixture.symbol("out");
        let x = fixture.symbol("x");
        let source = fixture.scan("t", &[&x]);

        let node = TableFunctionNode::builder(fixture.ids.next_id(), "f", TableFunctionHandle::new("c"))
            .argument("input", Argument::table(vec![]))
            .proper_output(out.clone())
            .table_argument(
                source,
                TableArgumentProperties::set_semantics("input", ColumnMapping::new(), None),
            )
            .build()
            .expect("valid node");

        assert_eq!(node.output_symbols(), vec![out]);
    }

    #[test]
    fn pass_through_recurses_into_nested_table_functions() {
        let mut fixture = Fixture::new();
        let x = fixture.symbol("x");
        let inner_out = fixture.symbol("inner_out");
        let outer_out = fixture.symbol("outer_out");
        let scan = fixture.scan("t", &[&x]);

        let inner = TableFunctionNode::builder(fixture.ids.next_id(), "inner", TableFunctionHandle::new("c"))
            .argument("input", Argument::table(vec![]))
            .proper_output(inner_out.clone())
            .table_argument(
                scan,
                TableArgumentProperties::row_semantics("input", ColumnMapping::new())
                    .with_pass_through_columns(true),
            )
            .build_plan()
            .expect("valid node");

        let outer = TableFunctionNode::builder(fixture.ids.next_id(), "outer", TableFunctionHandle::new("c"))
            .argument("input", Argument::table(vec![]))
            .proper_output(outer_out.clone())
            .table_argument(
                inner.into_ref(),
                TableArgumentProperties::row_semantics("input", ColumnMapping::new())
                    .with_pass_through_columns(true),
            )
            .build()
            .expect("valid node");

        assert_eq!(outer.output_symbols(), vec![outer_out, inner_out, x]);
    }
}

// ============================================================================
// Structural Substitution
// ============================================================================

mod substitution {
    use super::*;

    /// Two partitioned inputs in one copartitioning group, plus a scalar
    /// argument and a connector payload.
    fn copartitioned_pair(fixture: &mut Fixture) -> (TableFunctionNode, Symbol, Symbol) {
        let k1 = fixture.symbol("k1");
        let k2 = fixture.symbol("k2");
        let out = fixture.symbol("out");
        let left = fixture.scan("left", &[&k1]);
        let right = fixture.scan("right", &[&k2]);

        let node = TableFunctionNode::builder(
            fixture.ids.next_id(),
            "zip",
            TableFunctionHandle::with_connector_handle("system", serde_json::json!({ "version": 2 })),
        )
        .argument("left", Argument::table(vec![Field::new("k1", "bigint")]))
        .argument("right", Argument::table(vec![Field::new("k2", "bigint")]))
        .argument("threshold", Argument::scalar("bigint", 3i64))
        .proper_output(out.clone())
        .table_argument(
            left,
            TableArgumentProperties::set_semantics(
                "left",
                ColumnMapping::new().with("k1", k1.clone()),
                Some(partitioned_by(&[&k1])),
            )
            .with_prune_when_empty(true),
        )
        .table_argument(
            right,
            TableArgumentProperties::set_semantics(
                "right",
                ColumnMapping::new().with("k2", k2.clone()),
                Some(partitioned_by(&[&k2])),
            ),
        )
        .copartition(["left", "right"])
        .build()
        .expect("valid node");

        (node, k1, k2)
    }

    #[test]
    fn replace_children_preserves_everything_else() {
        let mut fixture = Fixture::new();
        let (node, k1, k2) = copartitioned_pair(&mut fixture);
        validate_plan(&PlanNode::from(node.clone())).expect("valid copartitioning");
        let v = fixture.symbol("v");
        let replacement = vec![fixture.scan("u1", &[&k1, &v]), fixture.scan("u2", &[&k2])];

        let replaced = node.replace_children(replacement.clone()).expect("same arity");

        assert_eq!(replaced.id(), node.id());
        assert_eq!(replaced.name(), node.name());
        assert_eq!(replaced.arguments(), node.arguments());
        assert_eq!(replaced.proper_outputs(), node.proper_outputs());
        assert_eq!(replaced.table_argument_properties(), node.table_argument_properties());
        assert!(!replaced.copartitioning_lists().is_empty());
        assert_eq!(replaced.copartitioning_lists(), node.copartitioning_lists());
        assert_eq!(replaced.copartitioning_lists()[0].arguments(), ["left", "right"]);
        assert_eq!(replaced.handle(), node.handle());
        assert_eq!(replaced.sources(), replacement.as_slice());
        assert!(replaced.sources().iter().zip(&replacement).all(|(a, b)| Arc::ptr_eq(a, b)));
        validate_plan(&PlanNode::from(replaced)).expect("still valid after substitution");
    }

    #[test]
    fn replace_children_rejects_wrong_arity() {
        let mut fixture = Fixture::new();
        let plan = two_input_plan(&mut fixture);
        let z = fixture.symbol("z");

        let one = vec![fixture.scan("t", &[&z])];
        let three = vec![fixture.scan("t", &[&z]), fixture.scan("t", &[&z]), fixture.scan("t", &[&z])];

        for sources in [one, three] {
            let actual = sources.len();
            match plan.node.replace_children(sources) {
                Err(PlanError::WrongChildCount { expected, actual: got, .. }) => {
                    assert_eq!(expected, 2);
                    assert_eq!(got, actual);
                }
                other => panic!("expected WrongChildCount, got {other:?}"),
            }
        }
    }

    #[test]
    fn original_survives_rewrite() {
        let mut fixture = Fixture::new();
        let plan = two_input_plan(&mut fixture);
        let shared: PlanRef = PlanNode::from(plan.node.clone()).into_ref();
        let m = fixture.symbol("m");
        let n = fixture.symbol("n");

        let rewritten = shared
            .replace_children(vec![fixture.scan("u1", &[&m]), fixture.scan("u2", &[&n])])
            .expect("same arity");

        assert_ne!(rewritten.output_symbols(), shared.output_symbols());
        assert_eq!(shared.output_symbols(), plan.node.output_symbols());
    }
}

// ============================================================================
// Visitor Dispatch
// ============================================================================

mod visitor {
    use super::*;

    /// Collects the names of every table function in a plan.
    struct FunctionNames;

    impl PlanVisitor<()> for FunctionNames {
        type Output = Vec<String>;

        fn visit_plan(&mut self, node: &dyn Node, context: ()) -> Vec<String> {
            walk_sources(self, node, context).into_iter().flatten().collect()
        }

        fn visit_table_function(&mut self, node: &TableFunctionNode, context: ()) -> Vec<String> {
            let mut names = vec![node.name().to_string()];
            names.extend(self.visit_plan(node, context));
            names
        }
    }

    #[test]
    fn table_function_dispatch() {
        let mut fixture = Fixture::new();
        let plan = two_input_plan(&mut fixture);
        let root = PlanNode::from(plan.node).limit(fixture.ids.next_id(), 10);

        assert_eq!(root.accept(&mut FunctionNames, ()), vec!["combine".to_string()]);
    }
}

// ============================================================================
// Validation
// ============================================================================

mod validation {
    use super::*;

    fn copartitioned(fixture: &mut Fixture, left_row_semantics: bool) -> TableFunctionNode {
        let k1 = fixture.symbol("k1");
        let k2 = fixture.symbol("k2");
        let left = fixture.scan("left", &[&k1]);
        let right = fixture.scan("right", &[&k2]);

        let left_properties = if left_row_semantics {
            TableArgumentProperties::row_semantics("left", ColumnMapping::new())
        } else {
            TableArgumentProperties::set_semantics(
                "left",
                ColumnMapping::new(),
                Some(partitioned_by(&[&k1])),
            )
        };

        TableFunctionNode::builder(fixture.ids.next_id(), "zip", TableFunctionHandle::new("c"))
            .argument("left", Argument::table(vec![]))
            .argument("right", Argument::table(vec![]))
            .table_argument(left, left_properties)
            .table_argument(
                right,
                TableArgumentProperties::set_semantics(
                    "right",
                    ColumnMapping::new(),
                    Some(partitioned_by(&[&k2])),
                ),
            )
            .copartition(["left", "right"])
            .build()
            .expect("groups are checked by validation")
    }

    #[test]
    fn valid_plan() {
        let mut fixture = Fixture::new();
        let plan = two_input_plan(&mut fixture);
        validate_plan(&PlanNode::from(plan.node)).expect("valid");
    }

    #[test]
    fn copartitioning_accepts_partitioned_members() {
        let mut fixture = Fixture::new();
        let node = copartitioned(&mut fixture, false);
        validate_copartitioning(&node).expect("valid group");
    }

    #[test]
    fn copartitioning_rejects_row_semantics_member() {
        let mut fixture = Fixture::new();
        let node = copartitioned(&mut fixture, true);
        assert!(matches!(
            validate_copartitioning(&node),
            Err(PlanError::InvalidCopartitioning { .. })
        ));
        assert!(validate_plan(&PlanNode::from(node)).is_err());
    }

    #[test]
    fn dependency_check_uses_required_symbols() {
        let mut fixture = Fixture::new();
        let x = fixture.symbol("x");
        let missing = fixture.symbol("missing");
        let source = fixture.scan("t", &[&x]);

        let node = TableFunctionNode::builder(fixture.ids.next_id(), "f", TableFunctionHandle::new("c"))
            .argument("input", Argument::table(vec![]))
            .table_argument(
                source,
                TableArgumentProperties::set_semantics(
                    "input",
                    ColumnMapping::new().with("x", x.clone()),
                    Some(partitioned_by(&[&missing])),
                ),
            )
            .build_plan()
            .expect("valid node");

        match validate_plan(&node) {
            Err(PlanError::MissingSymbol { symbol, .. }) => assert_eq!(symbol, missing),
            other => panic!("expected MissingSymbol, got {other:?}"),
        }
        PlanValidator::new().without_dependency_check().validate(&node).expect("skipped");
    }

    #[test]
    fn ordering_symbols_are_required() {
        let mut fixture = Fixture::new();
        let k = fixture.symbol("k");
        let ts = fixture.symbol("ts");
        let source = fixture.scan("t", &[&k]);

        let ordering = OrderingScheme::new(vec![(ts.clone(), SortOrder::AscNullsLast)])
            .expect("valid ordering");
        let spec = DataOrganizationSpecification::new(vec![k.clone()], Some(ordering))
            .expect("valid specification");

        let node = TableFunctionNode::builder(fixture.ids.next_id(), "f", TableFunctionHandle::new("c"))
            .argument("input", Argument::table(vec![]))
            .table_argument(
                source,
                TableArgumentProperties::set_semantics("input", ColumnMapping::new(), Some(spec)),
            )
            .build_plan()
            .expect("valid node");

        assert!(matches!(
            validate_plan(&node),
            Err(PlanError::MissingSymbol { symbol, .. }) if symbol == ts
        ));
    }
}

// ============================================================================
// JSON Codec
// ============================================================================

mod codec {
    use super::*;

    #[test]
    fn round_trip() {
        let mut fixture = Fixture::new();
        let plan = two_input_plan(&mut fixture);
        let root = PlanNode::from(plan.node).limit(fixture.ids.next_id(), 100);

        let json = to_json(&root).expect("encodes");
        let decoded = from_json(&json).expect("decodes");
        assert_eq!(decoded, root);
        assert_eq!(decoded.output_symbols(), root.output_symbols());
    }

    #[test]
    fn wire_field_names() {
        let mut fixture = Fixture::new();
        let plan = two_input_plan(&mut fixture);
        let json = to_json_pretty(&PlanNode::from(plan.node)).expect("encodes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["@type"], "tableFunction");
        assert_eq!(value["name"], "combine");
        assert_eq!(value["properOutputs"], serde_json::json!(["a", "b"]));
        assert_eq!(value["arguments"]["threshold"]["@type"], "scalar");
        assert_eq!(value["tableArgumentProperties"][0]["passThroughColumns"], true);
        assert_eq!(value["tableArgumentProperties"][0]["columnMapping"]["x"], serde_json::json!(["x"]));
        assert_eq!(
            value["tableArgumentProperties"][1]["specification"]["partitionBy"],
            serde_json::json!(["p"])
        );
        assert_eq!(value["copartitioningLists"], serde_json::json!([]));
        assert_eq!(value["handle"]["connectorHandle"]["version"], 2);
    }

    #[test]
    fn decoding_rejects_row_semantics_with_specification() {
        let json = serde_json::json!({
            "@type": "tableFunction",
            "id": 1,
            "name": "f",
            "sources": [{ "@type": "tableScan", "id": 0, "table": "t", "outputs": ["k"] }],
            "tableArgumentProperties": [{
                "argumentName": "input",
                "columnMapping": {},
                "rowSemantics": true,
                "pruneWhenEmpty": false,
                "passThroughColumns": false,
                "specification": { "partitionBy": ["k"] }
            }],
            "handle": { "catalog": "c", "connectorHandle": null }
        });
        assert!(matches!(from_json(&json.to_string()), Err(PlanError::Codec(_))));
    }

    #[test]
    fn decoded_tree_is_unshared() {
        let mut fixture = Fixture::new();
        let x = fixture.symbol("x");
        let shared = fixture.scan("t", &[&x]);

        let node = TableFunctionNode::builder(fixture.ids.next_id(), "f", TableFunctionHandle::new("c"))
            .argument("a", Argument::table(vec![]))
            .argument("b", Argument::table(vec![]))
            .table_argument(
                Arc::clone(&shared),
                TableArgumentProperties::row_semantics("a", ColumnMapping::new()),
            )
            .table_argument(
                Arc::clone(&shared),
                TableArgumentProperties::row_semantics("b", ColumnMapping::new()),
            )
            .build_plan()
            .expect("valid node");

        let decoded = from_json(&to_json(&node).expect("encodes")).expect("decodes");
        assert_eq!(decoded, node);
        assert!(!Arc::ptr_eq(&decoded.sources()[0], &decoded.sources()[1]));
    }
}
