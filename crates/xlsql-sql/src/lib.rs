//! xlsql SQL rendering
//!
//! Turns formula ASTs into SQL expression fragments suitable for
//! `GENERATED ALWAYS AS (<expr>) STORED` column definitions, together with
//! the set of columns each fragment reads.
//! Translation is pure and deterministic; nothing is cached between calls.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::debug;
use xlsql_ast::Ast;
use xlsql_registry::FunctionRegistry;

mod error;
mod mapping;
pub mod plan;
mod translator;

pub use error::{ErrorKind, ErrorReport, TranslateError};
pub use mapping::{ColumnMapping, MappingError};
pub use translator::{RangeShape, SqlOperator, Translation, Translator};

/// Outcome of translating one expression, in the shape handed downstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub columns: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl TranslationResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Result<Translation, TranslateError>> for TranslationResult {
    fn from(result: Result<Translation, TranslateError>) -> Self {
        match result {
            Ok(Translation { sql, columns }) => Self {
                sql: Some(sql),
                columns,
                error: None,
            },
            Err(err) => Self {
                sql: None,
                columns: BTreeSet::new(),
                error: Some(ErrorReport::from(&err)),
            },
        }
    }
}

/// Translate `ast` against `mapping` with the built-in function table
pub fn translate(ast: &Ast, mapping: &ColumnMapping) -> TranslationResult {
    let registry = FunctionRegistry::default();
    try_translate(ast, mapping, &registry).into()
}

/// Translate with a caller-supplied function table, keeping the typed error
pub fn try_translate(
    ast: &Ast,
    mapping: &ColumnMapping,
    registry: &FunctionRegistry,
) -> Result<Translation, TranslateError> {
    let result = Translator::new(registry, mapping).translate(ast);
    match &result {
        Ok(translation) => debug!(
            sql = %translation.sql,
            columns = ?translation.columns,
            depth = ast.depth(),
            "translated formula"
        ),
        Err(err) => debug!(
            kind = ?err.kind(),
            error = %err,
            depth = ast.depth(),
            "formula translation failed"
        ),
    }
    result
}

/// One translation request: the AST and the column table it refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub ast: Ast,
    pub columns: ColumnMapping,
}

impl TranslationRequest {
    /// Parse a request from its JSON text; shape errors count as malformed nodes.
    pub fn from_json_str(source: &str) -> Result<Self, TranslateError> {
        Ok(serde_json::from_str(source)?)
    }

    /// SHA-256 of the canonical JSON form, for correlating requests in logs
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn translate(&self, registry: &FunctionRegistry) -> TranslationResult {
        try_translate(&self.ast, &self.columns, registry).into()
    }
}
