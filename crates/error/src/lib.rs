//! # sluice-error
//!
//! Unified error types for the sluice query execution core.
//!
//! Every error carries:
//! - A numeric error code (SLUICE-XXXX) whose range selects the failure class
//! - Structured JSON context
//! - An optional hint and retry-after duration for the caller

mod code;
mod context;
mod convert;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;
pub use convert::find_closest_match;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Retry hint attached to connection and timeout failures when none is given explicitly.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// The unified error type for all sluice operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SluiceError {
    /// Numeric error code (e.g., "SLUICE-2002")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Suggestion for the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// How long the caller should wait before trying again
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "duration_millis"
    )]
    pub retry_after: Option<Duration>,

    /// Underlying failure this error wraps (e.g. the last attempt of a retry loop)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<SluiceError>>,
}

/// Status a request handler should report for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    BadRequest,
    ServiceUnavailable,
    GatewayTimeout,
    Internal,
}

impl ClientStatus {
    pub fn http_status(&self) -> u16 {
        match self {
            ClientStatus::BadRequest => 400,
            ClientStatus::ServiceUnavailable => 503,
            ClientStatus::GatewayTimeout => 504,
            ClientStatus::Internal => 500,
        }
    }
}

impl SluiceError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
            retry_after: None,
            cause: None,
        }
    }

    /// Validation rejection for a named rule and the offending fragment.
    pub fn validation(code: ErrorCode, rule: &str, offending: Option<String>) -> Self {
        let message = match &offending {
            Some(o) => format!("Query rejected by rule '{}': {}", rule, o),
            None => format!("Query rejected by rule '{}'", rule),
        };
        Self::new(code, message).with_context(ErrorContext::Validation {
            rule: rule.to_string(),
            offending,
        })
    }

    /// Deadline elapsed while `stage` was in progress.
    pub fn deadline_exceeded(stage: &str, elapsed: Duration) -> Self {
        Self::new(
            ErrorCode::DeadlineExceeded,
            format!("Deadline exceeded during {} after {:?}", stage, elapsed),
        )
        .with_context(ErrorContext::Timeout {
            stage: stage.to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
        })
        .with_retry_after(DEFAULT_RETRY_AFTER)
        .with_hint("Retry later or raise the query timeout")
    }

    /// Wrap the last failure of a retry loop that ran out of attempts.
    pub fn retries_exhausted(attempts: u32, last: SluiceError) -> Self {
        Self::new(
            ErrorCode::RetriesExhausted,
            format!("Query failed after {} attempts: {}", attempts, last.message),
        )
        .with_context(ErrorContext::Retry {
            attempts,
            last_code: last.code.as_str(),
        })
        .with_retry_after(last.retry_after.unwrap_or(DEFAULT_RETRY_AFTER))
        .with_cause(last)
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a hint for the caller
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_cause(mut self, cause: SluiceError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// The innermost wrapped error, or `self` when nothing is wrapped.
    pub fn root_cause(&self) -> &SluiceError {
        let mut current = self;
        while let Some(cause) = &current.cause {
            current = cause;
        }
        current
    }

    /// Status to report to the caller.
    pub fn client_status(&self) -> ClientStatus {
        match self.category() {
            ErrorCategory::Validation => ClientStatus::BadRequest,
            ErrorCategory::Connection => ClientStatus::ServiceUnavailable,
            ErrorCategory::Timeout => ClientStatus::GatewayTimeout,
            _ => ClientStatus::Internal,
        }
    }

    /// Message safe to show to end users. Driver internals are never included.
    pub fn public_message(&self) -> String {
        match self.client_status() {
            ClientStatus::BadRequest => self.message.clone(),
            ClientStatus::ServiceUnavailable => format!(
                "Data source temporarily unavailable, retry in {}s",
                self.retry_after.unwrap_or(DEFAULT_RETRY_AFTER).as_secs()
            ),
            ClientStatus::GatewayTimeout => format!(
                "Query timed out, retry in {}s",
                self.retry_after.unwrap_or(DEFAULT_RETRY_AFTER).as_secs()
            ),
            ClientStatus::Internal => format!("Internal query failure ({})", self.code),
        }
    }

    /// Serialize to JSON for API responses
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize SluiceError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

impl fmt::Display for SluiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for SluiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias for sluice operations
pub type Result<T> = std::result::Result<T, SluiceError>;

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_u64(d.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
