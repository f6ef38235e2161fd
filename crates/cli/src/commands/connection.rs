//! `sluice test-connection`: open a pool for every configured source.

use super::helpers::{load_sources, TestConnectionResult, TestConnectionSummary};
use crate::exit_codes::{self, CliError};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use owo_colors::OwoColorize;
use sluice_common::config::AppConfig;
use sluice_common::DataSourceDescriptor;
use sluice_connectors::PoolManager;

pub async fn test_connection(
    sources_path: &str,
    format: OutputFormat,
    config: &AppConfig,
) -> Result<()> {
    if !format.is_machine_readable() {
        println!(
            "{} {} {}",
            "[Sources:".dimmed(),
            sources_path.yellow(),
            "] Testing connections...".bold().cyan()
        );
    }
    let sources = load_sources(sources_path)?;
    let manager = PoolManager::new(config.pool.clone());

    let mut results = Vec::new();
    for source in &sources.sources {
        let outcome = match DataSourceDescriptor::try_from(source) {
            Ok(descriptor) => manager.acquire(&descriptor).await.map(|_| ()),
            Err(e) => Err(e),
        };
        let error = outcome.err().map(|e| e.to_string());

        if !format.is_machine_readable() {
            match &error {
                None => println!("{} source '{}': OK", "✔".green(), source.name),
                Some(e) => println!("{} source '{}': FAILED - {}", "✘".red(), source.name, e),
            }
        }
        results.push(TestConnectionResult {
            source_id: source.id,
            source: source.name.clone(),
            valid: error.is_none(),
            error,
        });
    }
    manager.release_all().await;

    let failed = results.iter().filter(|r| !r.valid).count();
    let total = results.len();
    if format.is_machine_readable() {
        let summary = TestConnectionSummary { results };
        if failed == 0 {
            return output::print_success(format, summary);
        }
        let code = failure_exit_code(failed, total);
        output::print_error(
            format,
            "One or more connection tests failed",
            code,
            summary,
        )?;
        std::process::exit(code);
    }

    if failed == 0 {
        println!("{}", "All connections succeeded.".green().bold());
        Ok(())
    } else {
        Err(CliError::new(
            failure_exit_code(failed, total),
            format!("{} of {} connection tests failed", failed, total),
        )
        .into())
    }
}

/// Partial failure when some sources connected, connection error when none did.
pub fn failure_exit_code(failed: usize, total: usize) -> i32 {
    if failed < total {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::CONNECTION_ERROR
    }
}
