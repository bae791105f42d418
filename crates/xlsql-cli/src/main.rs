//! xlsql command-line host
//!
//! Reads formula translation requests as JSON and prints the SQL
//! expressions (or computed-column plans) as JSON on stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use xlsql_registry::FunctionRegistry;

mod commands;
mod config;
mod logging;

use commands::CliError;
use config::Config;

#[derive(Parser)]
#[command(name = "xlsql")]
#[command(version, about = "Translate spreadsheet formula ASTs into SQL expressions")]
struct Cli {
    /// Configuration file (defaults to ./xlsql.yaml when present)
    #[arg(short, long, env = "XLSQL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate one {"ast", "columns"} request
    Translate {
        /// Request file (reads stdin when omitted)
        input: Option<PathBuf>,
    },

    /// Order a set of computed columns by their dependencies
    Plan {
        /// Request file (reads stdin when omitted)
        input: Option<PathBuf>,
    },

    /// List the supported spreadsheet functions
    Functions,
}

fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match Config::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            let err = CliError::from(err);
            eprintln!("xlsql: {err}");
            return ExitCode::from(err.exit_code());
        }
    };

    config.apply_logging_env();
    logging::init();

    match run(&cli, &config) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("xlsql: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli, config: &Config) -> Result<ExitCode, CliError> {
    let registry = FunctionRegistry::default();
    let pretty = cli.pretty || config.translation.pretty;

    info!(registry_version = registry.version(), "xlsql starting");

    match &cli.command {
        Command::Translate { input } => {
            let source = commands::read_input(input.as_deref())?;
            let result = commands::translate(&source, &registry)?;
            println!("{}", commands::to_json(&result, pretty)?);

            let code = commands::translation_exit_code(&result, config.translation.fail_on_error);
            return Ok(ExitCode::from(code));
        }
        Command::Plan { input } => {
            let source = commands::read_input(input.as_deref())?;
            let plan = commands::plan(&source, &registry)?;
            println!("{}", commands::to_json(&plan, pretty)?);
        }
        Command::Functions => {
            let listing = commands::functions(&registry);
            println!("{}", commands::to_json(&listing, pretty)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
