use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following SLUICE-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Connection errors (retryable by default)
/// - **2000-2999**: Validation errors (never retried)
/// - **3000-3999**: Configuration errors (fatal)
/// - **4000-4999**: Execution errors (driver-level failures)
/// - **5000-5999**: Timeout errors
/// - **9000-9999**: Internal/System errors
///
/// Codes are stable across versions (semver contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Connection Errors (1000-1999) ===
    /// SLUICE-1001: Could not open or reach the data source
    ConnectionFailed = 1001,
    /// SLUICE-1002: Timed out while connecting or waiting for a pooled connection
    ConnectionTimeout = 1002,
    /// SLUICE-1003: Liveness probe on a cached pool failed
    ProbeFailed = 1003,
    /// SLUICE-1004: Retryable failure persisted through every attempt
    RetriesExhausted = 1004,

    // === Validation Errors (2000-2999) ===
    /// SLUICE-2001: Empty SQL statement
    EmptyQuery = 2001,
    /// SLUICE-2002: Blocked keyword present
    BlockedKeyword = 2002,
    /// SLUICE-2003: Blocked function call present
    BlockedFunction = 2003,
    /// SLUICE-2004: Suspicious injection signature present
    SuspiciousPattern = 2004,
    /// SLUICE-2005: Parentheses do not balance
    UnbalancedParentheses = 2005,
    /// SLUICE-2006: Comment sequence present
    DisallowedComment = 2006,
    /// SLUICE-2007: Statement is not read-only
    NotReadOnly = 2007,
    /// SLUICE-2008: Malformed table or column identifier
    InvalidIdentifier = 2008,
    /// SLUICE-2009: Unknown administrative argument (e.g. flush scope)
    InvalidArgument = 2009,

    // === Configuration Errors (3000-3999) ===
    /// SLUICE-3001: Engine kind not supported
    UnsupportedEngine = 3001,
    /// SLUICE-3002: Connection string could not be built or parsed
    InvalidConnectionString = 3002,
    /// SLUICE-3003: Configuration file or values invalid
    InvalidConfig = 3003,
    /// SLUICE-3004: Invalid YAML syntax
    InvalidYaml = 3004,

    // === Execution Errors (4000-4999) ===
    /// SLUICE-4001: Driver rejected or failed the statement
    QueryFailed = 4001,
    /// SLUICE-4002: Database refused the statement for lack of privileges
    PermissionDenied = 4002,
    /// SLUICE-4003: Database reported the SQL as malformed
    MalformedSql = 4003,

    // === Timeout Errors (5000-5999) ===
    /// SLUICE-5001: Statement exceeded the database's execution timeout
    QueryTimeout = 5001,
    /// SLUICE-5002: Caller deadline elapsed
    DeadlineExceeded = 5002,

    // === Internal Errors (9000-9999) ===
    /// SLUICE-9001: Serialization/deserialization failed
    SerializationFailed = 9001,
    /// SLUICE-9002: I/O failure outside of a database connection
    Io = 9002,
    /// SLUICE-9003: Unexpected internal state
    Internal = 9003,

    /// SLUICE-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "SLUICE-2002")
    pub fn as_str(&self) -> String {
        format!("SLUICE-{:04}", self.as_u16())
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Connection,
            2000..=2999 => ErrorCategory::Validation,
            3000..=3999 => ErrorCategory::Configuration,
            4000..=4999 => ErrorCategory::Execution,
            5000..=5999 => ErrorCategory::Timeout,
            _ => ErrorCategory::Internal,
        }
    }

    /// Failure kinds the default retry policy treats as transient.
    pub fn is_retryable_by_default(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConnectionFailed | ErrorCode::ConnectionTimeout | ErrorCode::QueryTimeout
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        // Parse "SLUICE-XXXX" format
        let num: u16 = s
            .strip_prefix("SLUICE-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::ConnectionFailed),
            1002 => Ok(Self::ConnectionTimeout),
            1003 => Ok(Self::ProbeFailed),
            1004 => Ok(Self::RetriesExhausted),
            2001 => Ok(Self::EmptyQuery),
            2002 => Ok(Self::BlockedKeyword),
            2003 => Ok(Self::BlockedFunction),
            2004 => Ok(Self::SuspiciousPattern),
            2005 => Ok(Self::UnbalancedParentheses),
            2006 => Ok(Self::DisallowedComment),
            2007 => Ok(Self::NotReadOnly),
            2008 => Ok(Self::InvalidIdentifier),
            2009 => Ok(Self::InvalidArgument),
            3001 => Ok(Self::UnsupportedEngine),
            3002 => Ok(Self::InvalidConnectionString),
            3003 => Ok(Self::InvalidConfig),
            3004 => Ok(Self::InvalidYaml),
            4001 => Ok(Self::QueryFailed),
            4002 => Ok(Self::PermissionDenied),
            4003 => Ok(Self::MalformedSql),
            5001 => Ok(Self::QueryTimeout),
            5002 => Ok(Self::DeadlineExceeded),
            9001 => Ok(Self::SerializationFailed),
            9002 => Ok(Self::Io),
            9003 => Ok(Self::Internal),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category, one per failure class of the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCategory {
    Connection,
    Validation,
    Configuration,
    Execution,
    Timeout,
    Internal,
}
