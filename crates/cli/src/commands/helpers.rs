//! Shared helpers and machine-readable result types for CLI commands.

use crate::exit_codes::CliError;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sluice_common::config::SourcesConfig;
use sluice_common::DataSourceDescriptor;
use sluice_connectors::Row;
use sluice_sql::{IndexSuggestion, QueryPlan};
use std::env;
use std::fs;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// Replace `${VAR}` placeholders with environment values. Unset variables stay as written.
pub fn expand_secrets(content: &str) -> String {
    PLACEHOLDER
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
}

/// Parse a sources file, expanding `${VAR}` placeholders first.
pub fn load_sources(path: &str) -> Result<SourcesConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file '{}'", path))?;
    SourcesConfig::from_yaml_str(&expand_secrets(&raw))
        .with_context(|| format!("Failed to parse sources file '{}'", path))
}

/// Descriptor for source `id`, or a usage error naming the known ids.
pub fn resolve_source(sources: &SourcesConfig, id: i64) -> Result<DataSourceDescriptor> {
    let Some(config) = sources.find(id) else {
        let known: Vec<String> = sources.sources.iter().map(|s| s.id.to_string()).collect();
        return Err(CliError::usage(format!(
            "No data source with id {} (known: {})",
            id,
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        ))
        .into());
    };
    Ok(DataSourceDescriptor::try_from(config)?)
}

/// Statements in a query file: one per line, blank lines and `--` lines skipped, trailing
/// `;` dropped.
pub fn read_statements(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("--"))
        .map(|l| l.trim_end_matches(';').trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

// ===== Result Types =====

#[derive(Serialize)]
pub struct ValidateResult {
    pub valid: bool,
    pub read_only: bool,
    pub classification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offending: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyzeResult {
    pub plan: QueryPlan,
}

#[derive(Serialize)]
pub struct RunResult {
    pub source_id: i64,
    pub row_count: usize,
    pub cache_hit: bool,
    pub attempts: u32,
    pub elapsed_ms: f64,
    pub rows: Vec<Row>,
}

#[derive(Serialize)]
pub struct IndexesResult {
    pub statements_analyzed: usize,
    pub suggestions: Vec<IndexSuggestion>,
    pub created: Vec<String>,
}

#[derive(Serialize)]
pub struct TestConnectionResult {
    pub source_id: i64,
    pub source: String,
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct TestConnectionSummary {
    pub results: Vec<TestConnectionResult>,
}
