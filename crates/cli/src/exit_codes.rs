//! Structured exit codes so scripts can tell failure classes apart.

use sluice_error::{ErrorCategory, SluiceError};

/// General error (anything not classified below)
pub const GENERAL_ERROR: i32 = 1;

/// CLI usage error (unknown source id, bad argument)
pub const USAGE_ERROR: i32 = 2;

/// Configuration error (config or sources file, unsupported engine)
pub const CONFIG_ERROR: i32 = 3;

/// Connection error (source unreachable, pool timeout, retries exhausted)
pub const CONNECTION_ERROR: i32 = 4;

/// Validation error (statement rejected before execution)
pub const VALIDATION_ERROR: i32 = 5;

/// Execution error (the database rejected or failed the statement)
pub const EXECUTION_ERROR: i32 = 6;

/// Timeout error (statement timeout or caller deadline)
pub const TIMEOUT_ERROR: i32 = 7;

/// Partial failure (some sources passed, others failed)
pub const PARTIAL_FAILURE: i32 = 8;

pub fn for_category(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::Connection => CONNECTION_ERROR,
        ErrorCategory::Validation => VALIDATION_ERROR,
        ErrorCategory::Configuration => CONFIG_ERROR,
        ErrorCategory::Execution => EXECUTION_ERROR,
        ErrorCategory::Timeout => TIMEOUT_ERROR,
        _ => GENERAL_ERROR,
    }
}

/// Map an error reaching `main` to an exit code.
pub fn for_error(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<SluiceError>() {
        return for_category(err.category());
    }
    if let Some(err) = e.downcast_ref::<CliError>() {
        return err.exit_code;
    }

    // Config loading reports through anyhow contexts
    let s = e.to_string().to_lowercase();
    if s.contains("config") || s.contains("sources file") || s.contains("yaml") {
        return CONFIG_ERROR;
    }
    GENERAL_ERROR
}

/// A command failure that already knows its exit code.
#[derive(Debug)]
pub struct CliError {
    pub exit_code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Bad command-line input that clap cannot catch on its own.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE_ERROR, message)
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_error::ErrorCode;

    #[test]
    fn test_categories_map_to_distinct_codes() {
        let cases = [
            (ErrorCode::ConnectionFailed, CONNECTION_ERROR),
            (ErrorCode::RetriesExhausted, CONNECTION_ERROR),
            (ErrorCode::BlockedKeyword, VALIDATION_ERROR),
            (ErrorCode::UnsupportedEngine, CONFIG_ERROR),
            (ErrorCode::MalformedSql, EXECUTION_ERROR),
            (ErrorCode::DeadlineExceeded, TIMEOUT_ERROR),
            (ErrorCode::Internal, GENERAL_ERROR),
        ];
        for (code, expected) in cases {
            let err = anyhow::Error::new(SluiceError::new(code, "boom"));
            assert_eq!(for_error(&err), expected, "{}", code);
        }
    }

    #[test]
    fn test_usage_and_fallback() {
        let usage = anyhow::Error::new(CliError::usage("no source with id 9"));
        assert_eq!(for_error(&usage), USAGE_ERROR);

        let partial = anyhow::Error::new(CliError::new(PARTIAL_FAILURE, "1 of 2 failed"));
        assert_eq!(for_error(&partial), PARTIAL_FAILURE);

        let config = anyhow::anyhow!("Failed to read sources file 'missing.yaml'");
        assert_eq!(for_error(&config), CONFIG_ERROR);

        assert_eq!(for_error(&anyhow::anyhow!("something else")), GENERAL_ERROR);
    }
}
