//! Spreadsheet column letters to SQL column identifiers

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;
use xlsql_ast::column_to_index;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Column key '{0}' must consist of letters only")]
    InvalidKey(String),

    #[error("Column key '{0}' is mapped more than once")]
    DuplicateKey(String),

    #[error("Column key '{0}' maps to an empty identifier")]
    EmptyIdentifier(String),
}

/// Immutable lookup table from column letters (`"A"`) to identifiers (`"col1"`).
///
/// Keys are case-insensitive and stored upper-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct ColumnMapping {
    columns: BTreeMap<String, String>,
}

impl ColumnMapping {
    pub fn new<I, K, V>(entries: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut columns = BTreeMap::new();
        for (key, identifier) in entries {
            let key = key.as_ref();
            if column_to_index(key).is_none() {
                return Err(MappingError::InvalidKey(key.to_string()));
            }
            let identifier = identifier.into();
            if identifier.trim().is_empty() {
                return Err(MappingError::EmptyIdentifier(key.to_string()));
            }
            let normalized = key.to_ascii_uppercase();
            if columns.insert(normalized, identifier).is_some() {
                return Err(MappingError::DuplicateKey(key.to_string()));
            }
        }
        Ok(Self { columns })
    }

    /// Identifier mapped to the given column letters, if any
    pub fn resolve(&self, letters: &str) -> Option<&str> {
        self.columns
            .get(&letters.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TryFrom<BTreeMap<String, String>> for ColumnMapping {
    type Error = MappingError;

    fn try_from(columns: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl Serialize for ColumnMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.columns.serialize(serializer)
    }
}
