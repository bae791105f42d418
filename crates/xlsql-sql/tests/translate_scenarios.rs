//! End-to-end formula → SQL scenarios over the upstream JSON AST shape
//!
//! Run with: cargo test --package xlsql-sql --test translate_scenarios

use serde_json::{json, Value};
use std::collections::BTreeSet;
use xlsql_ast::Ast;
use xlsql_registry::{Arity, FunctionRegistry, FunctionRule, RenderRule};
use xlsql_sql::{translate, try_translate, ColumnMapping, ErrorKind, TranslateError, TranslationResult};

fn mapping(pairs: &[(&str, &str)]) -> ColumnMapping {
    ColumnMapping::new(pairs.iter().copied()).unwrap()
}

fn five_columns() -> ColumnMapping {
    mapping(&[("A", "col1"), ("B", "col2"), ("C", "col3"), ("D", "col4"), ("E", "col5")])
}

fn run(ast: Value, columns: &ColumnMapping) -> TranslationResult {
    let ast = Ast::from_json(ast).unwrap();
    translate(&ast, columns)
}

fn cell(key: &str) -> Value {
    json!({"type": "cell", "refType": "relative", "key": key})
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Every identifier a cell or range in the tree can resolve to
fn referenced(ast: &Ast, columns: &ColumnMapping, out: &mut BTreeSet<String>) {
    match ast {
        Ast::Cell { key, .. } => {
            let cell: xlsql_ast::CellRef = key.parse().unwrap();
            out.insert(columns.resolve(&cell.column).unwrap().to_string());
        }
        Ast::CellRange { left, right } => {
            let (Ast::Cell { key: l, .. }, Ast::Cell { key: r, .. }) = (left.as_ref(), right.as_ref()) else {
                panic!("range endpoints must be cells");
            };
            let l: xlsql_ast::CellRef = l.parse().unwrap();
            let r: xlsql_ast::CellRef = r.parse().unwrap();
            for letters in xlsql_ast::column_span(l.column_index, r.column_index) {
                out.insert(columns.resolve(&letters).unwrap().to_string());
            }
        }
        Ast::BinaryExpression { left, right, .. } => {
            referenced(left, columns, out);
            referenced(right, columns, out);
        }
        Ast::Function { arguments, .. } => {
            for arg in arguments {
                referenced(arg, columns, out);
            }
        }
        _ => {}
    }
}

fn full_formula() -> Value {
    // =SUM(A1:$E$1) + IF(AND(A1 > 5, B1 < 20), TRUE, FALSE) - E1 / 2.1
    json!({
        "type": "binary-expression",
        "operator": "-",
        "left": {
            "type": "binary-expression",
            "operator": "+",
            "left": {
                "type": "function",
                "name": "SUM",
                "arguments": [{
                    "type": "cell-range",
                    "left": cell("A1"),
                    "right": {"type": "cell", "refType": "absolute", "key": "$E$1"}
                }]
            },
            "right": {
                "type": "function",
                "name": "IF",
                "arguments": [
                    {
                        "type": "function",
                        "name": "AND",
                        "arguments": [
                            {"type": "binary-expression", "operator": ">", "left": cell("A1"), "right": {"type": "number", "value": 5}},
                            {"type": "binary-expression", "operator": "<", "left": cell("B1"), "right": {"type": "number", "value": 20}}
                        ]
                    },
                    {"type": "logical", "value": true},
                    {"type": "logical", "value": false}
                ]
            }
        },
        "right": {
            "type": "binary-expression",
            "operator": "/",
            "left": cell("E1"),
            "right": {"type": "number", "value": 2.1}
        }
    })
}

#[test]
fn test_end_to_end_addition() {
    let columns = mapping(&[("A", "col1"), ("B", "col2")]);
    let result = run(
        json!({"type": "binary-expression", "operator": "+", "left": cell("A1"), "right": cell("B1")}),
        &columns,
    );

    assert_eq!(result.sql.as_deref(), Some("(col1 + col2)"));
    assert_eq!(result.columns, set(&["col1", "col2"]));
    assert!(result.error.is_none());
}

#[test]
fn test_nested_if() {
    let columns = mapping(&[("A", "col1")]);
    let result = run(
        json!({
            "type": "function",
            "name": "IF",
            "arguments": [
                {"type": "binary-expression", "operator": ">", "left": cell("A1"), "right": {"type": "number", "value": 18}},
                {"type": "logical", "value": true},
                {"type": "logical", "value": false}
            ]
        }),
        &columns,
    );

    assert_eq!(
        result.sql.as_deref(),
        Some("CASE WHEN (col1 > 18) THEN TRUE ELSE FALSE END")
    );
    assert_eq!(result.columns, set(&["col1"]));
}

#[test]
fn test_sum_over_row_range() {
    let columns = mapping(&[("A", "col1"), ("B", "col2")]);
    let result = run(
        json!({
            "type": "function",
            "name": "SUM",
            "arguments": [{"type": "cell-range", "left": cell("A1"), "right": cell("B1")}]
        }),
        &columns,
    );

    assert_eq!(result.sql.as_deref(), Some("col1 + col2"));
    assert_eq!(result.columns, set(&["col1", "col2"]));
}

#[test]
fn test_full_formula() {
    let result = run(full_formula(), &five_columns());

    assert_eq!(
        result.sql.as_deref(),
        Some("(((col1 + col2 + col3 + col4 + col5) + CASE WHEN (col1 > 5) AND (col2 < 20) THEN TRUE ELSE FALSE END) - (col5 / 2.1))")
    );
    assert_eq!(result.columns, set(&["col1", "col2", "col3", "col4", "col5"]));
}

#[test]
fn test_translation_is_deterministic() {
    let columns = five_columns();
    let first = serde_json::to_string(&run(full_formula(), &columns)).unwrap();
    let second = serde_json::to_string(&run(full_formula(), &columns)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_columns_match_referenced_cells() {
    let columns = five_columns();
    let formulas = [
        full_formula(),
        json!({"type": "function", "name": "MAX", "arguments": [
            {"type": "cell-range", "left": cell("B1"), "right": cell("D1")},
            {"type": "number", "value": 0}
        ]}),
        json!({"type": "binary-expression", "operator": "&", "left": cell("C1"), "right": {"type": "text", "value": "x"}}),
        json!({"type": "number", "value": 3}),
    ];

    for formula in formulas {
        let ast = Ast::from_json(formula).unwrap();
        let mut expected = BTreeSet::new();
        referenced(&ast, &columns, &mut expected);

        let result = translate(&ast, &columns);
        assert_eq!(result.columns, expected, "formula {}", ast);
    }
}

#[test]
fn test_number_literal_round_trip() {
    let result = run(json!({"type": "number", "value": 5}), &ColumnMapping::default());
    let sql = result.sql.unwrap();

    assert_eq!(sql, "5");
    assert_eq!(sql.parse::<f64>().unwrap(), 5.0);
    assert!(result.columns.is_empty());
}

#[test]
fn test_unresolved_cell_fails_fast() {
    let columns = mapping(&[("A", "col1")]);
    let result = run(cell("Z1"), &columns);

    assert_eq!(result.sql, None);
    assert_eq!(result.error.unwrap().kind, ErrorKind::UnresolvedCell);

    let ast = Ast::from_json(cell("Z1")).unwrap();
    let err = try_translate(&ast, &columns, &FunctionRegistry::default()).unwrap_err();
    assert_eq!(
        err,
        TranslateError::UnresolvedCell {
            key: "Z1".to_string(),
            column: "Z".to_string()
        }
    );
}

#[test]
fn test_if_arity_is_enforced() {
    let columns = mapping(&[("A", "col1")]);
    let result = run(
        json!({
            "type": "function",
            "name": "IF",
            "arguments": [
                {"type": "binary-expression", "operator": ">", "left": cell("A1"), "right": {"type": "number", "value": 18}},
                {"type": "logical", "value": true}
            ]
        }),
        &columns,
    );

    assert_eq!(result.sql, None);
    assert_eq!(result.error.unwrap().kind, ErrorKind::MalformedNode);
}

#[test]
fn test_unknown_function() {
    let result = run(
        json!({"type": "function", "name": "VLOOKUP", "arguments": [cell("A1")]}),
        &five_columns(),
    );
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::UnknownFunction);
    assert!(error.message.contains("VLOOKUP"));

    // Names are matched exactly
    let result = run(
        json!({"type": "function", "name": "sum", "arguments": [cell("A1")]}),
        &five_columns(),
    );
    assert_eq!(result.error.unwrap().kind, ErrorKind::UnknownFunction);
}

#[test]
fn test_first_error_wins() {
    // Left operand is visited before the right one
    let result = run(
        json!({
            "type": "binary-expression",
            "operator": "+",
            "left": cell("Z1"),
            "right": {"type": "function", "name": "NOPE", "arguments": []}
        }),
        &five_columns(),
    );
    assert_eq!(result.error.unwrap().kind, ErrorKind::UnresolvedCell);

    let result = run(
        json!({"type": "function", "name": "AND", "arguments": [
            {"type": "function", "name": "NOPE", "arguments": []},
            cell("Z1")
        ]}),
        &five_columns(),
    );
    assert_eq!(result.error.unwrap().kind, ErrorKind::UnknownFunction);
}

#[test]
fn test_unsupported_operator_is_malformed() {
    let result = run(
        json!({"type": "binary-expression", "operator": "%", "left": cell("A1"), "right": cell("B1")}),
        &five_columns(),
    );
    assert_eq!(result.error.unwrap().kind, ErrorKind::MalformedNode);
}

#[test]
fn test_malformed_cell_key() {
    let result = run(cell("1A"), &five_columns());
    assert_eq!(result.error.unwrap().kind, ErrorKind::MalformedNode);
}

#[test]
fn test_range_endpoint_must_be_cell() {
    let result = run(
        json!({"type": "function", "name": "SUM", "arguments": [
            {"type": "cell-range", "left": cell("A1"), "right": {"type": "number", "value": 3}}
        ]}),
        &five_columns(),
    );
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::MalformedNode);
    assert!(error.message.contains("number"));
}

#[test]
fn test_multi_row_ranges_are_unsupported() {
    for (start, end) in [("A1", "A10"), ("A1", "C5")] {
        let result = run(
            json!({"type": "function", "name": "SUM", "arguments": [
                {"type": "cell-range", "left": cell(start), "right": cell(end)}
            ]}),
            &five_columns(),
        );
        assert_eq!(result.error.unwrap().kind, ErrorKind::UnsupportedRangeOrientation);
    }
}

#[test]
fn test_reversed_range_is_normalized() {
    let result = run(
        json!({"type": "function", "name": "SUM", "arguments": [
            {"type": "cell-range", "left": cell("C1"), "right": cell("A1")}
        ]}),
        &five_columns(),
    );
    assert_eq!(result.sql.as_deref(), Some("col1 + col2 + col3"));
}

#[test]
fn test_range_with_gap_in_mapping() {
    let columns = mapping(&[("A", "col1"), ("C", "col3")]);
    let ast = Ast::from_json(json!({"type": "function", "name": "SUM", "arguments": [
        {"type": "cell-range", "left": cell("A1"), "right": cell("C1")}
    ]}))
    .unwrap();

    let err = try_translate(&ast, &columns, &FunctionRegistry::default()).unwrap_err();
    assert_eq!(
        err,
        TranslateError::UnresolvedCell {
            key: "B1".to_string(),
            column: "B".to_string()
        }
    );
}

#[test]
fn test_text_and_case_insensitive_mapping() {
    let columns = mapping(&[("a", "name")]);
    let result = run(
        json!({"type": "binary-expression", "operator": "=", "left": {"type": "cell", "refType": "mixed", "key": "$a1"}, "right": {"type": "text", "value": "O'Brien"}}),
        &columns,
    );
    assert_eq!(result.sql.as_deref(), Some("(name = 'O''Brien')"));
}

#[test]
fn test_registered_function_extends_translator() {
    let mut registry = FunctionRegistry::default();
    registry.register(FunctionRule::new("ROUND", Arity::Between(1, 2), RenderRule::Call("ROUND")));

    let ast = Ast::function("ROUND", vec![Ast::cell("A1"), Ast::number(2.0)]);
    let translation = try_translate(&ast, &five_columns(), &registry).unwrap();
    assert_eq!(translation.sql, "ROUND(col1, 2)");
}

#[test]
fn test_wide_range_over_sparse_mapping_fails_at_first_gap() {
    let columns = mapping(&[("A", "col1"), ("MWLQKWU", "colz")]);
    let ast = Ast::function("SUM", vec![Ast::range(Ast::cell("A1"), Ast::cell("MWLQKWU1"))]);

    let err = try_translate(&ast, &columns, &FunctionRegistry::default()).unwrap_err();
    assert_eq!(
        err,
        TranslateError::UnresolvedCell {
            key: "B1".to_string(),
            column: "B".to_string()
        }
    );
}

#[test]
fn test_min_and_abs_render_sql_functions() {
    let columns = five_columns();

    let result = run(
        json!({"type": "function", "name": "MIN", "arguments": [
            {"type": "cell-range", "left": cell("A1"), "right": cell("C1")},
            {"type": "number", "value": 10}
        ]}),
        &columns,
    );
    assert_eq!(result.sql.as_deref(), Some("LEAST(col1, col2, col3, 10)"));
    assert_eq!(result.columns, set(&["col1", "col2", "col3"]));

    let result = run(
        json!({"type": "function", "name": "ABS", "arguments": [cell("D1")]}),
        &columns,
    );
    assert_eq!(result.sql.as_deref(), Some("ABS(col4)"));

    let result = run(
        json!({"type": "function", "name": "ABS", "arguments": [
            {"type": "function", "name": "SUM", "arguments": [
                {"type": "cell-range", "left": cell("A1"), "right": cell("B1")}
            ]}
        ]}),
        &columns,
    );
    assert_eq!(result.sql.as_deref(), Some("ABS(col1 + col2)"));
}

#[test]
fn test_operator_tokens_render() {
    let columns = five_columns();
    let cases = [
        ("^", "(col1 ^ col2)"),
        ("<=", "(col1 <= col2)"),
        (">=", "(col1 >= col2)"),
        ("<>", "(col1 <> col2)"),
        ("&&", "(col1 AND col2)"),
        ("AND", "(col1 AND col2)"),
        ("or", "(col1 OR col2)"),
        ("&", "(col1 || col2)"),
    ];

    for (operator, expected) in cases {
        let result = run(
            json!({"type": "binary-expression", "operator": operator, "left": cell("A1"), "right": cell("B1")}),
            &columns,
        );
        assert_eq!(result.sql.as_deref(), Some(expected), "operator {operator}");
    }
}

#[test]
fn test_shared_inputs_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<Ast>();
    assert_send_sync::<ColumnMapping>();
    assert_send_sync::<FunctionRegistry>();
    assert_send_sync::<TranslationResult>();
}
