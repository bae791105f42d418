//! Subcommand bodies, kept apart from argument parsing so they can be tested
//! without a process.

use serde::Serialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, Level};
use xlsql_registry::{FunctionRegistry, FunctionRule};
use xlsql_sql::plan::{Plan, PlanError, PlanRequest};
use xlsql_sql::{TranslateError, TranslationRequest, TranslationResult};

use crate::config::ConfigError;
use crate::log_event;

/// A translation or plan was rejected
pub const EXIT_REJECTED: u8 = 1;
/// Input, output, configuration or request shape problems
pub const EXIT_USAGE: u8 = 2;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    Request(TranslateError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Plan(_) => EXIT_REJECTED,
            CliError::Io(_) | CliError::Config(_) | CliError::Json(_) | CliError::Request(_) => {
                EXIT_USAGE
            }
        }
    }
}

/// Exit status after printing a translation result
pub fn translation_exit_code(result: &TranslationResult, fail_on_error: bool) -> u8 {
    if fail_on_error && !result.is_ok() {
        EXIT_REJECTED
    } else {
        0
    }
}

/// Read the whole request from `path`, or from stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Translate one request. A request that is not valid JSON or does not have
/// the `{ast, columns}` shape is a `CliError::Request`; translation errors are
/// reported inside the result.
pub fn translate(source: &str, registry: &FunctionRegistry) -> Result<TranslationResult, CliError> {
    let request = TranslationRequest::from_json_str(source).map_err(CliError::Request)?;

    let fingerprint = request.fingerprint();
    let result = request.translate(registry);
    log_event!(
        level: Level::INFO,
        event: "formula_translated",
        fingerprint: fingerprint,
        ok: result.is_ok()
    );
    Ok(result)
}

pub fn plan(source: &str, registry: &FunctionRegistry) -> Result<Plan, CliError> {
    let request = PlanRequest::from_json_str(source).map_err(CliError::Request)?;
    let plan = request.plan(registry)?;
    info!(
        columns = request.computed.len(),
        levels = plan.levels.len(),
        "computed columns planned"
    );
    Ok(plan)
}

#[derive(Debug, Serialize)]
pub struct FunctionListing<'a> {
    pub version: &'a str,
    pub functions: Vec<&'a FunctionRule>,
}

pub fn functions(registry: &FunctionRegistry) -> FunctionListing<'_> {
    FunctionListing {
        version: registry.version(),
        functions: registry.rules(),
    }
}
