//! `sluice run --source ID <sql>`: execute a read-only statement through the full pipeline.

use super::helpers::{load_sources, resolve_source, RunResult};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use owo_colors::OwoColorize;
use sluice_common::config::AppConfig;
use sluice_runtime::{ExecuteOptions, QueryExecutor};
use sluice_sql::lexical::with_limit;
use std::time::Duration;

pub struct RunArgs<'a> {
    pub source_id: i64,
    pub sql: &'a str,
    pub limit: Option<u64>,
    pub timeout_secs: Option<u64>,
}

pub async fn run(
    args: RunArgs<'_>,
    sources_path: &str,
    format: OutputFormat,
    config: &AppConfig,
) -> Result<()> {
    let source = resolve_source(&load_sources(sources_path)?, args.source_id)?;
    let sql = match args.limit {
        Some(limit) => with_limit(args.sql, limit),
        None => args.sql.to_string(),
    };
    let mut options = ExecuteOptions::default();
    if let Some(secs) = args.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let executor = QueryExecutor::with_pool_manager(config)?;
    let outcome = executor.run(&source, &sql, options).await;
    executor.shutdown().await;
    let outcome = outcome?;

    let elapsed_ms = outcome.elapsed.as_secs_f64() * 1000.0;
    if format.is_machine_readable() {
        return output::print_success(
            format,
            RunResult {
                source_id: args.source_id,
                row_count: outcome.rows.len(),
                cache_hit: outcome.cache_hit,
                attempts: outcome.attempts,
                elapsed_ms,
                rows: outcome.rows.to_vec(),
            },
        );
    }

    println!("{}", output::format_table(&outcome.rows));
    let retried = if outcome.attempts > 1 {
        format!(", {} attempts", outcome.attempts)
    } else {
        String::new()
    };
    println!(
        "{}",
        format!("{:.1} ms{}", elapsed_ms, retried).dimmed()
    );
    Ok(())
}
