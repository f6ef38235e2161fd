//! `sluice validate <sql>`: run the security validator without touching any source.

use super::helpers::ValidateResult;
use crate::exit_codes;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use owo_colors::OwoColorize;
use sluice_common::config::AppConfig;
use sluice_error::SluiceError;
use sluice_sql::{classify, CommentMode, Rejection, SqlValidator, ValidatorConfig};

/// Validation verdict for `sql`, with the rejection kept for error reporting.
pub fn check(sql: &str, loose: bool, config: &AppConfig) -> (ValidateResult, Result<(), Rejection>) {
    let comment_mode = if loose || config.executor.loose_comments {
        CommentMode::Loose
    } else {
        CommentMode::Strict
    };
    let validator = SqlValidator::new(ValidatorConfig {
        comment_mode,
        ..Default::default()
    });

    let verdict = validator
        .validate(sql)
        .and_then(|_| validator.ensure_read_only(sql));

    let mut result = ValidateResult {
        valid: verdict.is_ok(),
        read_only: validator.is_read_only(sql),
        classification: classify(sql).to_string(),
        code: None,
        rule: None,
        offending: None,
    };
    if let Err(rejection) = &verdict {
        result.code = Some(rejection.code().as_str());
        result.rule = Some(rejection.rule().to_string());
        result.offending = rejection.offending();
    }
    (result, verdict)
}

pub fn validate(sql: &str, loose: bool, format: OutputFormat, config: &AppConfig) -> Result<()> {
    let (result, verdict) = check(sql, loose, config);

    if format.is_machine_readable() {
        output::print_success(format, &result)?;
        if !result.valid {
            std::process::exit(exit_codes::VALIDATION_ERROR);
        }
        return Ok(());
    }

    let Err(rejection) = verdict else {
        println!(
            "{} Statement accepted ({} query)",
            "✔".green(),
            result.classification.cyan()
        );
        return Ok(());
    };

    println!("{} Statement rejected", "✘".red());
    if let Some(rule) = &result.rule {
        println!("  {} {}", "rule:".dimmed(), rule);
    }
    if let Some(offending) = &result.offending {
        println!("  {} {}", "offending:".dimmed(), offending.yellow());
    }
    Err(SluiceError::from(rejection).into())
}
