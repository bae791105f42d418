//! Core AST → SQL translator

use std::collections::BTreeSet;
use tracing::trace;
use xlsql_ast::{column_span, Ast, CellRef};
use xlsql_registry::{FunctionRegistry, RenderRule};

use crate::error::TranslateError;
use crate::mapping::ColumnMapping;

/// Successful translation of a whole expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub sql: String,
    pub columns: BTreeSet<String>,
}

/// How a rendered fragment behaves when embedded in a larger expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape {
    /// Safe to use as an operand as-is
    Atom,
    /// Infix or prefix text without outer parentheses
    Compound,
    /// Row range flattened to its distinct columns, in column order
    Columns(Vec<String>),
}

#[derive(Debug, Clone)]
struct Fragment {
    sql: String,
    columns: BTreeSet<String>,
    shape: Shape,
}

impl Fragment {
    fn literal(sql: String) -> Self {
        Self {
            sql,
            columns: BTreeSet::new(),
            shape: Shape::Atom,
        }
    }

    fn column(identifier: &str) -> Self {
        Self {
            sql: identifier.to_string(),
            columns: BTreeSet::from([identifier.to_string()]),
            shape: Shape::Atom,
        }
    }

    /// Text to embed as an operand of an infix/prefix operator
    fn operand(&self) -> String {
        match self.shape {
            Shape::Compound => format!("({})", self.sql),
            _ => self.sql.clone(),
        }
    }

    /// Collapse a single-column range into a plain column; other ranges
    /// cannot stand where one value is expected.
    fn into_scalar(self, context: &str) -> Result<Fragment, TranslateError> {
        match self.shape {
            Shape::Columns(ref cols) if cols.len() == 1 => Ok(Fragment {
                sql: cols[0].clone(),
                columns: self.columns,
                shape: Shape::Atom,
            }),
            Shape::Columns(_) => Err(TranslateError::MalformedNode(format!(
                "{}: a multi-column range cannot be used as a single value",
                context
            ))),
            _ => Ok(self),
        }
    }
}

/// Orientation of a cell range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeShape {
    /// One row, one or more columns (`A1:E1`)
    Row,
    /// One column, several rows (`A1:A10`)
    Column,
    /// Several rows and columns (`A1:C5`)
    Block,
}

impl RangeShape {
    pub fn of(start: &CellRef, end: &CellRef) -> Self {
        if start.row == end.row {
            RangeShape::Row
        } else if start.column_index == end.column_index {
            RangeShape::Column
        } else {
            RangeShape::Block
        }
    }
}

/// Binary operator tokens understood by the translator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl SqlOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token.trim() {
            "+" => SqlOperator::Add,
            "-" => SqlOperator::Sub,
            "*" => SqlOperator::Mul,
            "/" => SqlOperator::Div,
            "^" => SqlOperator::Pow,
            "&" => SqlOperator::Concat,
            "=" => SqlOperator::Eq,
            "<>" => SqlOperator::Ne,
            "<" => SqlOperator::Lt,
            "<=" => SqlOperator::Le,
            ">" => SqlOperator::Gt,
            ">=" => SqlOperator::Ge,
            "&&" => SqlOperator::And,
            "||" => SqlOperator::Or,
            other if other.eq_ignore_ascii_case("and") => SqlOperator::And,
            other if other.eq_ignore_ascii_case("or") => SqlOperator::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SqlOperator::Add => "+",
            SqlOperator::Sub => "-",
            SqlOperator::Mul => "*",
            SqlOperator::Div => "/",
            SqlOperator::Pow => "^",
            SqlOperator::Concat => "||",
            SqlOperator::Eq => "=",
            SqlOperator::Ne => "<>",
            SqlOperator::Lt => "<",
            SqlOperator::Le => "<=",
            SqlOperator::Gt => ">",
            SqlOperator::Ge => ">=",
            SqlOperator::And => "AND",
            SqlOperator::Or => "OR",
        }
    }
}

/// Translator for formula ASTs → SQL expression fragments
pub struct Translator<'a> {
    registry: &'a FunctionRegistry,
    mapping: &'a ColumnMapping,
}

impl<'a> Translator<'a> {
    pub fn new(registry: &'a FunctionRegistry, mapping: &'a ColumnMapping) -> Self {
        Self { registry, mapping }
    }

    /// Translate a whole expression
    pub fn translate(&self, ast: &Ast) -> Result<Translation, TranslateError> {
        let fragment = self.translate_node(ast)?.into_scalar("expression")?;
        Ok(Translation {
            sql: fragment.sql,
            columns: fragment.columns,
        })
    }

    fn translate_node(&self, ast: &Ast) -> Result<Fragment, TranslateError> {
        match ast {
            Ast::Number { value } => render_number(*value).map(Fragment::literal),
            Ast::Logical { value } => Ok(Fragment::literal(
                if *value { "TRUE" } else { "FALSE" }.to_string(),
            )),
            Ast::Text { value } => Ok(Fragment::literal(render_text(value))),
            Ast::Cell { key, .. } => self.translate_cell(key),
            Ast::CellRange { left, right } => self.translate_range(left, right),
            Ast::BinaryExpression {
                operator,
                left,
                right,
            } => self.translate_binary_op(operator, left, right),
            Ast::Function { name, arguments } => self.translate_function(name, arguments),
        }
    }

    fn translate_cell(&self, key: &str) -> Result<Fragment, TranslateError> {
        let cell: CellRef = key.parse()?;
        let identifier = self.resolve(&cell.column, key)?;
        Ok(Fragment::column(identifier))
    }

    fn resolve(&self, letters: &str, key: &str) -> Result<&'a str, TranslateError> {
        self.mapping
            .resolve(letters)
            .ok_or_else(|| TranslateError::UnresolvedCell {
                key: key.to_string(),
                column: letters.to_string(),
            })
    }

    fn range_endpoint(node: &Ast) -> Result<(CellRef, &str), TranslateError> {
        match node {
            Ast::Cell { key, .. } => Ok((key.parse()?, key.as_str())),
            other => Err(TranslateError::MalformedNode(format!(
                "cell-range endpoint must be a cell, got {}",
                other.type_name()
            ))),
        }
    }

    fn translate_range(&self, left: &Ast, right: &Ast) -> Result<Fragment, TranslateError> {
        let (start, start_key) = Self::range_endpoint(left)?;
        let (end, end_key) = Self::range_endpoint(right)?;

        self.resolve(&start.column, start_key)?;
        self.resolve(&end.column, end_key)?;

        match RangeShape::of(&start, &end) {
            RangeShape::Row => {
                // Stops at the first unmapped letter, so a wide span over a
                // sparse mapping fails without walking the whole span.
                let mut identifiers: Vec<String> = Vec::new();
                let mut columns: BTreeSet<String> = BTreeSet::new();
                for letters in column_span(start.column_index, end.column_index) {
                    let key = format!("{}{}", letters, start.row);
                    let identifier = self.resolve(&letters, &key)?;
                    if columns.insert(identifier.to_string()) {
                        identifiers.push(identifier.to_string());
                    }
                }
                Ok(Fragment {
                    sql: identifiers.join(", "),
                    columns,
                    shape: Shape::Columns(identifiers),
                })
            }
            // A stored computed column only sees its own row
            RangeShape::Column | RangeShape::Block => {
                Err(TranslateError::UnsupportedRangeOrientation {
                    start: start.to_string(),
                    end: end.to_string(),
                })
            }
        }
    }

    fn translate_binary_op(
        &self,
        operator: &str,
        left: &Ast,
        right: &Ast,
    ) -> Result<Fragment, TranslateError> {
        let op = SqlOperator::from_token(operator).ok_or_else(|| {
            TranslateError::MalformedNode(format!("unsupported operator '{}'", operator))
        })?;

        let left = self.translate_node(left)?.into_scalar("left operand")?;
        let right = self.translate_node(right)?.into_scalar("right operand")?;

        let sql = format!("({} {} {})", left.operand(), op.sql(), right.operand());
        let mut columns = left.columns;
        columns.extend(right.columns);

        Ok(Fragment {
            sql,
            columns,
            shape: Shape::Atom,
        })
    }

    fn translate_function(&self, name: &str, arguments: &[Ast]) -> Result<Fragment, TranslateError> {
        let rule = self.registry.resolve_call(name, arguments.len())?;
        trace!(function = name, args = arguments.len(), rule = ?rule.rule, "dispatching function");

        let args = arguments
            .iter()
            .map(|arg| self.translate_node(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let columns: BTreeSet<String> = args
            .iter()
            .flat_map(|arg| arg.columns.iter().cloned())
            .collect();

        let (sql, shape) = match rule.rule {
            RenderRule::FlattenJoin(op) => {
                let terms = flatten(&args, true);
                joined(name, terms, &format!(" {} ", op))?
            }
            RenderRule::KeywordJoin(keyword) => {
                let terms = scalars(name, args)?
                    .iter()
                    .map(Fragment::operand)
                    .collect();
                joined(name, terms, &format!(" {} ", keyword))?
            }
            RenderRule::Average => {
                let terms = flatten(&args, true);
                match terms.len() {
                    0 => return Err(empty_call(name)),
                    1 => (terms[0].clone(), Shape::Atom),
                    n => (format!("({}) / {}.0", terms.join(" + "), n), Shape::Compound),
                }
            }
            RenderRule::Case => {
                let args = scalars(name, args)?;
                match args.as_slice() {
                    [cond, then, otherwise] => (
                        format!(
                            "CASE WHEN {} THEN {} ELSE {} END",
                            cond.sql, then.sql, otherwise.sql
                        ),
                        Shape::Atom,
                    ),
                    _ => {
                        return Err(TranslateError::MalformedNode(format!(
                            "{} requires exactly 3 arguments",
                            name
                        )))
                    }
                }
            }
            RenderRule::Prefix(keyword) => {
                let args = scalars(name, args)?;
                match args.as_slice() {
                    [arg] => (format!("{} {}", keyword, arg.operand()), Shape::Compound),
                    _ => {
                        return Err(TranslateError::MalformedNode(format!(
                            "{} requires exactly 1 argument",
                            name
                        )))
                    }
                }
            }
            RenderRule::Call(function) => {
                let args: Vec<String> = scalars(name, args)?
                    .into_iter()
                    .map(|arg| arg.sql)
                    .collect();
                (format!("{}({})", function, args.join(", ")), Shape::Atom)
            }
            RenderRule::FlattenCall(function) => {
                let terms = flatten(&args, false);
                (format!("{}({})", function, terms.join(", ")), Shape::Atom)
            }
        };

        Ok(Fragment {
            sql,
            columns,
            shape,
        })
    }
}

/// Arguments as individual terms, ranges expanded to their columns
fn flatten(args: &[Fragment], wrap_compound: bool) -> Vec<String> {
    let mut terms = Vec::new();
    for arg in args {
        match &arg.shape {
            Shape::Columns(cols) => terms.extend(cols.iter().cloned()),
            _ if wrap_compound => terms.push(arg.operand()),
            _ => terms.push(arg.sql.clone()),
        }
    }
    terms
}

fn scalars(name: &str, args: Vec<Fragment>) -> Result<Vec<Fragment>, TranslateError> {
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| arg.into_scalar(&format!("{} argument {}", name, i + 1)))
        .collect()
}

fn joined(name: &str, terms: Vec<String>, separator: &str) -> Result<(String, Shape), TranslateError> {
    match terms.len() {
        0 => Err(empty_call(name)),
        1 => Ok((terms.join(separator), Shape::Atom)),
        _ => Ok((terms.join(separator), Shape::Compound)),
    }
}

fn empty_call(name: &str) -> TranslateError {
    TranslateError::MalformedNode(format!("{} has nothing to render", name))
}

/// Canonical decimal text: no exponent, no locale separators, `-0` as `0`.
fn render_number(value: f64) -> Result<String, TranslateError> {
    if !value.is_finite() {
        return Err(TranslateError::MalformedNode(format!(
            "number literal {} is not finite",
            value
        )));
    }
    if value == 0.0 {
        return Ok("0".to_string());
    }
    Ok(value.to_string())
}

fn render_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
