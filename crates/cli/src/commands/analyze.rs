//! `sluice analyze <sql>`: static plan for a statement, without executing it.

use super::helpers::{load_sources, resolve_source, AnalyzeResult};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use owo_colors::OwoColorize;
use sluice_common::config::AppConfig;
use sluice_sql::{QueryAnalyzer, QueryPlan};

pub fn plan(
    sql: &str,
    source_id: Option<i64>,
    sources_path: &str,
    config: &AppConfig,
) -> Result<QueryPlan> {
    let engine = match source_id {
        Some(id) => Some(resolve_source(&load_sources(sources_path)?, id)?.engine),
        None => None,
    };
    let analyzer = QueryAnalyzer::new(config.analyzer.clone());
    Ok(analyzer.analyze(sql, engine))
}

pub fn analyze(
    sql: &str,
    source_id: Option<i64>,
    sources_path: &str,
    format: OutputFormat,
    config: &AppConfig,
) -> Result<()> {
    let plan = plan(sql, source_id, sources_path, config)?;

    if format.is_machine_readable() {
        return output::print_success(format, AnalyzeResult { plan });
    }

    println!("{} {}", "Query".bold().cyan(), plan.query_id.dimmed());
    println!("  classification: {}", plan.classification);
    println!(
        "  complexity:     {} (score {})",
        plan.complexity, plan.complexity_score
    );
    println!(
        "  tables:         {}",
        if plan.tables.is_empty() {
            "-".to_string()
        } else {
            plan.tables.join(", ")
        }
    );
    for join in &plan.joins {
        println!("  join:           {} {}", join.kind, join.table);
    }
    if !plan.where_columns.is_empty() {
        let columns: Vec<String> = plan
            .where_columns
            .iter()
            .map(|c| format!("{}.{}", c.table, c.column))
            .collect();
        println!("  filters on:     {}", columns.join(", "));
    }
    println!(
        "  estimated:      {} bytes memory, {} bytes network",
        plan.estimated_memory_bytes, plan.estimated_network_bytes
    );

    if !plan.suggestions.is_empty() {
        println!("{}", "Suggestions".bold().yellow());
        for suggestion in &plan.suggestions {
            println!("  {} {}", "•".yellow(), suggestion);
        }
    }
    Ok(())
}
