//! AST types for spreadsheet formulas
//!
//! Mirrors the JSON emitted by the upstream formula tree builder: every node
//! carries a `type` tag and the fields of its variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a cell reference was anchored in the formula text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    /// `A1`
    #[default]
    Relative,
    /// `$A$1`
    Absolute,
    /// `$A1` or `A$1`
    Mixed,
}

impl RefType {
    /// Infer the anchoring from the `$` markers of a key.
    pub fn infer(key: &str) -> Self {
        match key.matches('$').count() {
            0 => RefType::Relative,
            1 => RefType::Mixed,
            _ => RefType::Absolute,
        }
    }
}

/// Formula AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Ast {
    BinaryExpression {
        operator: String,
        left: Box<Ast>,
        right: Box<Ast>,
    },
    Function {
        name: String,
        #[serde(default)]
        arguments: Vec<Ast>,
    },
    Cell {
        key: String,
        #[serde(rename = "refType", default)]
        ref_type: RefType,
    },
    CellRange {
        left: Box<Ast>,
        right: Box<Ast>,
    },
    Number {
        value: f64,
    },
    Logical {
        value: bool,
    },
    Text {
        value: String,
    },
}

impl Ast {
    pub fn binary(operator: impl Into<String>, left: Ast, right: Ast) -> Self {
        Ast::BinaryExpression {
            operator: operator.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function(name: impl Into<String>, arguments: Vec<Ast>) -> Self {
        Ast::Function {
            name: name.into(),
            arguments,
        }
    }

    /// Cell reference; the reference type is inferred from `$` markers.
    pub fn cell(key: impl Into<String>) -> Self {
        let key = key.into();
        let ref_type = RefType::infer(&key);
        Ast::Cell { key, ref_type }
    }

    pub fn range(left: Ast, right: Ast) -> Self {
        Ast::CellRange {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn number(value: f64) -> Self {
        Ast::Number { value }
    }

    pub fn logical(value: bool) -> Self {
        Ast::Logical { value }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Ast::Text {
            value: value.into(),
        }
    }

    /// The wire tag of this node (`"binary-expression"`, `"cell"`, ...)
    pub fn type_name(&self) -> &'static str {
        match self {
            Ast::BinaryExpression { .. } => "binary-expression",
            Ast::Function { .. } => "function",
            Ast::Cell { .. } => "cell",
            Ast::CellRange { .. } => "cell-range",
            Ast::Number { .. } => "number",
            Ast::Logical { .. } => "logical",
            Ast::Text { .. } => "text",
        }
    }

    /// Deserialize a node from the upstream JSON representation
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Depth of the tree, a leaf counts as 1
    pub fn depth(&self) -> usize {
        match self {
            Ast::BinaryExpression { left, right, .. } | Ast::CellRange { left, right } => {
                1 + left.depth().max(right.depth())
            }
            Ast::Function { arguments, .. } => {
                1 + arguments.iter().map(Ast::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }
}

/// Renders the node back in formula notation, mostly for diagnostics.
impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ast::BinaryExpression {
                operator,
                left,
                right,
            } => {
                write_operand(f, left)?;
                write!(f, " {} ", operator)?;
                write_operand(f, right)
            }
            Ast::Function { name, arguments } => {
                write!(f, "{}(", name)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Ast::Cell { key, .. } => f.write_str(key),
            Ast::CellRange { left, right } => write!(f, "{}:{}", left, right),
            Ast::Number { value } => write!(f, "{}", value),
            Ast::Logical { value } => f.write_str(if *value { "TRUE" } else { "FALSE" }),
            Ast::Text { value } => write!(f, "\"{}\"", value.replace('"', "\"\"")),
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, node: &Ast) -> fmt::Result {
    if matches!(node, Ast::BinaryExpression { .. }) {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}
