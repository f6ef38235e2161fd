//! `sluice indexes <file>`: index suggestions from a workload of statements.
//!
//! Every statement is analyzed (not executed); columns filtered on at least
//! `analyzer.index_usage_threshold` times become suggestions. With `--apply`, each
//! suggestion is created on the given source.

use super::helpers::{load_sources, read_statements, resolve_source, IndexesResult};
use crate::exit_codes::CliError;
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use sluice_common::config::AppConfig;
use sluice_runtime::QueryExecutor;
use std::fs;

pub async fn indexes(
    file: &str,
    source_id: Option<i64>,
    apply: bool,
    sources_path: &str,
    format: OutputFormat,
    config: &AppConfig,
) -> Result<()> {
    if apply && source_id.is_none() {
        return Err(CliError::usage("--apply requires --source").into());
    }

    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read query file '{}'", file))?;
    let statements = read_statements(&content);

    let source = match source_id {
        Some(id) => Some(resolve_source(&load_sources(sources_path)?, id)?),
        None => None,
    };

    let executor = QueryExecutor::with_pool_manager(config)?;
    for sql in &statements {
        executor.analyze_query(sql, source.as_ref());
    }
    let suggestions = executor.suggest_indexes();

    let mut created = Vec::new();
    if let (true, Some(source)) = (apply, source.as_ref()) {
        for suggestion in &suggestions {
            if let Err(e) = executor.create_index(source, suggestion).await {
                executor.shutdown().await;
                return Err(e.into());
            }
            created.push(suggestion.index_name.clone());
        }
    }
    executor.shutdown().await;

    if format.is_machine_readable() {
        return output::print_success(
            format,
            IndexesResult {
                statements_analyzed: statements.len(),
                suggestions,
                created,
            },
        );
    }

    println!(
        "{} {} statements analyzed",
        "[Indexes]".dimmed(),
        statements.len()
    );
    if suggestions.is_empty() {
        println!("No column is filtered on often enough to suggest an index.");
        return Ok(());
    }
    for suggestion in &suggestions {
        let marker = if created.contains(&suggestion.index_name) {
            "✔".green().to_string()
        } else {
            "•".yellow().to_string()
        };
        println!(
            "{} {} ({:?} benefit, {} uses)",
            marker,
            suggestion.create_statement.bold(),
            suggestion.estimated_benefit,
            suggestion.priority
        );
    }
    Ok(())
}
