//! xlsql AST - formula tree types and cell reference helpers

pub mod ast;
pub mod cell;

pub use ast::*;
pub use cell::{column_span, column_to_index, index_to_column, CellRef, CellRefError};
