//! Dependency ordering of computed columns
//!
//! A computed column may read another computed column (its mapping points a
//! column letter at it). Such columns have to be added after the columns they
//! read, so the planner groups them into levels: level 0 reads only plain
//! columns, level n reads at least one column of level n-1.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;
use xlsql_ast::Ast;
use xlsql_registry::FunctionRegistry;

use crate::{try_translate, ColumnMapping, TranslateError, Translation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Computed column {column} failed to translate: {source}")]
    Translation {
        column: String,
        #[source]
        source: TranslateError,
    },

    #[error("Cyclic dependency between computed columns: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedColumn {
    pub name: String,
    pub sql: String,
    /// Computed columns this one reads
    pub depends_on: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub levels: Vec<Vec<PlannedColumn>>,
}

impl Plan {
    /// Column names in creation order
    pub fn order(&self) -> Vec<&str> {
        self.levels
            .iter()
            .flatten()
            .map(|column| column.name.as_str())
            .collect()
    }
}

/// Several computed columns sharing one column table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub columns: ColumnMapping,
    pub computed: BTreeMap<String, Ast>,
}

impl PlanRequest {
    pub fn from_json_str(source: &str) -> Result<Self, TranslateError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Translate every computed column, then order them.
    pub fn plan(&self, registry: &FunctionRegistry) -> Result<Plan, PlanError> {
        let mut translations = BTreeMap::new();
        for (name, ast) in &self.computed {
            let translation = try_translate(ast, &self.columns, registry).map_err(|source| {
                PlanError::Translation {
                    column: name.clone(),
                    source,
                }
            })?;
            translations.insert(name.clone(), translation);
        }
        plan(&translations)
    }
}

/// Order already translated computed columns by their mutual dependencies.
pub fn plan(computed: &BTreeMap<String, Translation>) -> Result<Plan, PlanError> {
    let dependencies: BTreeMap<&str, BTreeSet<String>> = computed
        .iter()
        .map(|(name, translation)| {
            let deps = translation
                .columns
                .iter()
                .filter(|column| computed.contains_key(*column))
                .cloned()
                .collect();
            (name.as_str(), deps)
        })
        .collect();

    let mut placed: BTreeSet<&str> = BTreeSet::new();
    let mut remaining: BTreeSet<&str> = dependencies.keys().copied().collect();
    let mut levels = Vec::new();

    while !remaining.is_empty() {
        let ready: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|name| {
                dependencies[name]
                    .iter()
                    .all(|dep| placed.contains(dep.as_str()))
            })
            .collect();

        if ready.is_empty() {
            let members = remaining
                .iter()
                .filter(|name| on_cycle(name, &dependencies))
                .map(|name| name.to_string())
                .collect();
            return Err(PlanError::Cycle(members));
        }

        let level: Vec<PlannedColumn> = ready
            .iter()
            .map(|name| PlannedColumn {
                name: name.to_string(),
                sql: computed[*name].sql.clone(),
                depends_on: dependencies[name].clone(),
            })
            .collect();

        for name in &ready {
            remaining.remove(name);
        }
        placed.extend(ready);
        levels.push(level);
    }

    debug!(levels = levels.len(), columns = computed.len(), "planned computed columns");
    Ok(Plan { levels })
}

/// Whether `start` can reach itself through its dependencies. Columns that
/// only depend on a cycle are blocked by it but are not part of it.
fn on_cycle(start: &str, dependencies: &BTreeMap<&str, BTreeSet<String>>) -> bool {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut stack: Vec<&str> = dependencies[start].iter().map(String::as_str).collect();

    while let Some(name) = stack.pop() {
        if name == start {
            return true;
        }
        if seen.insert(name) {
            if let Some(deps) = dependencies.get(name) {
                stack.extend(deps.iter().map(String::as_str));
            }
        }
    }
    false
}
