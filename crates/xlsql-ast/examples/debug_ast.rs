use xlsql_ast::Ast;

fn main() {
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| r#"{"type": "function", "name": "SUM", "arguments": [{"type": "cell-range", "left": {"type": "cell", "key": "A1"}, "right": {"type": "cell", "key": "$E$1"}}]}"#.to_string());

    match Ast::from_json_str(&input) {
        Ok(ast) => print_node(&ast, 0),
        Err(e) => println!("Error: {:?}", e),
    }
}

fn print_node(node: &Ast, indent: usize) {
    let indent_str = "  ".repeat(indent);
    println!("{}{} = {}", indent_str, node.type_name(), node);
    match node {
        Ast::BinaryExpression { left, right, .. } | Ast::CellRange { left, right } => {
            print_node(left, indent + 1);
            print_node(right, indent + 1);
        }
        Ast::Function { arguments, .. } => {
            for arg in arguments {
                print_node(arg, indent + 1);
            }
        }
        _ => {}
    }
}
