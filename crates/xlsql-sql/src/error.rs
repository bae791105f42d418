//! Translation failures

use serde::Serialize;
use thiserror::Error;
use xlsql_ast::CellRefError;
use xlsql_registry::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("Unresolved cell {key}: column '{column}' has no mapping")]
    UnresolvedCell { key: String, column: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Malformed node: {0}")]
    MalformedNode(String),

    #[error("Unsupported range orientation: {start}:{end}")]
    UnsupportedRangeOrientation { start: String, end: String },
}

/// Error classification reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnresolvedCell,
    UnknownFunction,
    MalformedNode,
    UnsupportedRangeOrientation,
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::UnresolvedCell { .. } => ErrorKind::UnresolvedCell,
            TranslateError::UnknownFunction(_) => ErrorKind::UnknownFunction,
            TranslateError::MalformedNode(_) => ErrorKind::MalformedNode,
            TranslateError::UnsupportedRangeOrientation { .. } => {
                ErrorKind::UnsupportedRangeOrientation
            }
        }
    }
}

impl From<RegistryError> for TranslateError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::FunctionNotFound(name) => TranslateError::UnknownFunction(name),
            arity @ RegistryError::ArityMismatch { .. } => {
                TranslateError::MalformedNode(arity.to_string())
            }
        }
    }
}

impl From<CellRefError> for TranslateError {
    fn from(err: CellRefError) -> Self {
        TranslateError::MalformedNode(err.to_string())
    }
}

/// A node that does not deserialize into the AST shape is malformed.
impl From<serde_json::Error> for TranslateError {
    fn from(err: serde_json::Error) -> Self {
        TranslateError::MalformedNode(err.to_string())
    }
}

/// Serializable error half of a [`crate::TranslationResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TranslateError> for ErrorReport {
    fn from(err: &TranslateError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
