//! sluice CLI: validate, analyze and run read-only SQL against configured data sources.
//!
//! Data sources come from a `sources.yaml` file; runtime limits (pools, retries, cache,
//! executor) come from an optional config file plus `SLUICE__…` environment overrides.
//!
//! # Commands
//!
//! - `validate`: Check a statement against the security validator.
//! - `analyze`: Show the static plan and optimization hints for a statement.
//! - `run`: Execute a statement through the cached, retrying executor.
//! - `indexes`: Suggest (and optionally create) indexes for a workload file.
//! - `test-connection`: Open a pool for every configured source.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use owo_colors::OwoColorize;
use sluice_common::config::AppConfig;
use sluice_common::telemetry::init_tracing;
use sluice_error::SluiceError;

mod commands;
mod exit_codes;
mod output;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Guarded, cached, retrying SQL execution", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human, json, yaml)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Runtime configuration file (YAML or TOML)
    #[arg(long, global = true, env = "SLUICE_CONFIG", default_value = "sluice.yaml")]
    config: String,

    /// Data source definitions
    #[arg(long, global = true, env = "SLUICE_SOURCES", default_value = "sources.yaml")]
    sources: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a statement against the security validator
    Validate {
        sql: String,
        /// Allow comment markers that appear inside string literals
        #[arg(long, default_value_t = false)]
        loose: bool,
    },
    /// Show the static plan for a statement without executing it
    Analyze {
        sql: String,
        /// Plan for this source's engine
        #[arg(long)]
        source: Option<i64>,
    },
    /// Execute a read-only statement
    Run {
        sql: String,
        #[arg(long)]
        source: i64,
        /// Append LIMIT N unless the statement already has one
        #[arg(long)]
        limit: Option<u64>,
        /// Overall deadline in seconds, retries included
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Suggest indexes for a file of statements (one per line)
    Indexes {
        file: String,
        /// Source whose engine and connection to use
        #[arg(long)]
        source: Option<i64>,
        /// Create the suggested indexes on --source
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// Test connections to every configured source
    TestConnection,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => exit_with(&cli, &e),
    };
    init_tracing(&config.telemetry).ok();

    if let Err(e) = run_cli(&cli, &config).await {
        exit_with(&cli, &e);
    }

    Ok(())
}

fn exit_with(cli: &Cli, e: &anyhow::Error) -> ! {
    let exit_code = exit_codes::for_error(e);
    if cli.output.is_machine_readable() {
        let detail = e
            .downcast_ref::<SluiceError>()
            .and_then(|err| serde_json::to_value(err).ok())
            .unwrap_or_default();
        output::print_error(cli.output, &e.to_string(), exit_code, ErrorDetail { error: detail })
            .ok();
    } else {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(hint) = e.downcast_ref::<SluiceError>().and_then(|err| err.hint.as_ref()) {
            eprintln!("{} {}", "Hint:".yellow(), hint);
        }
    }
    std::process::exit(exit_code);
}

#[derive(serde::Serialize)]
struct ErrorDetail {
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    error: serde_json::Value,
}

async fn run_cli(cli: &Cli, config: &AppConfig) -> Result<(), anyhow::Error> {
    match &cli.command {
        Commands::Validate { sql, loose } => {
            commands::validate(sql, *loose, cli.output, config)?;
        }
        Commands::Analyze { sql, source } => {
            commands::analyze(sql, *source, &cli.sources, cli.output, config)?;
        }
        Commands::Run {
            sql,
            source,
            limit,
            timeout,
        } => {
            let args = commands::RunArgs {
                source_id: *source,
                sql,
                limit: *limit,
                timeout_secs: *timeout,
            };
            commands::run(args, &cli.sources, cli.output, config).await?;
        }
        Commands::Indexes {
            file,
            source,
            apply,
        } => {
            commands::indexes(file, *source, *apply, &cli.sources, cli.output, config).await?;
        }
        Commands::TestConnection => {
            commands::test_connection(&cli.sources, cli.output, config).await?;
        }
    }
    Ok(())
}
