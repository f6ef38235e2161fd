use crate::{ErrorCode, SluiceError};
use sqlx::error::DatabaseError;

/// SQLSTATE / vendor codes and message fragments that identify a statement timeout.
const TIMEOUT_CODES: &[&str] = &["57014", "3024", "1317", "HYT00"];
const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out", "interrupted", "canceling statement"];

const PERMISSION_CODES: &[&str] = &["42501", "1142", "1044", "1045", "1227", "28000"];
const PERMISSION_MARKERS: &[&str] = &["permission denied", "access denied", "readonly", "read-only"];

const MALFORMED_CODES: &[&str] = &["42601", "42P01", "42703", "42883", "1064", "1146", "1054"];
const MALFORMED_MARKERS: &[&str] = &["syntax error", "no such table", "no such column"];

impl From<sqlx::Error> for SluiceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => SluiceError::new(
                ErrorCode::ConnectionTimeout,
                "Timed out waiting for a pooled connection",
            ),
            sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                SluiceError::new(ErrorCode::ConnectionFailed, err.to_string())
            }
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                SluiceError::new(ErrorCode::ConnectionTimeout, err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => {
                SluiceError::new(ErrorCode::ConnectionFailed, err.to_string())
            }
            sqlx::Error::Configuration(_) => {
                SluiceError::new(ErrorCode::InvalidConnectionString, err.to_string())
            }
            sqlx::Error::Database(db_err) => classify_database_error(db_err.as_ref()),
            _ => SluiceError::new(ErrorCode::QueryFailed, err.to_string()),
        }
    }
}

fn classify_database_error(db_err: &dyn DatabaseError) -> SluiceError {
    let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
    let message = db_err.message().to_string();
    let lowered = message.to_lowercase();

    let matches = |codes: &[&str], markers: &[&str]| {
        codes.contains(&code.as_str()) || markers.iter().any(|m| lowered.contains(m))
    };

    let error_code = if matches(TIMEOUT_CODES, TIMEOUT_MARKERS) {
        ErrorCode::QueryTimeout
    } else if matches(PERMISSION_CODES, PERMISSION_MARKERS) {
        ErrorCode::PermissionDenied
    } else if matches(MALFORMED_CODES, MALFORMED_MARKERS) {
        ErrorCode::MalformedSql
    } else {
        ErrorCode::QueryFailed
    };

    if code.is_empty() {
        SluiceError::new(error_code, message)
    } else {
        SluiceError::new(error_code, format!("{} (code {})", message, code))
    }
}

impl From<std::io::Error> for SluiceError {
    fn from(err: std::io::Error) -> Self {
        SluiceError::new(ErrorCode::Io, err.to_string())
    }
}

impl From<serde_json::Error> for SluiceError {
    fn from(err: serde_json::Error) -> Self {
        SluiceError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

impl From<serde_yaml::Error> for SluiceError {
    fn from(err: serde_yaml::Error) -> Self {
        SluiceError::new(ErrorCode::InvalidYaml, err.to_string())
    }
}

/// Levenshtein-based suggestion, used for "did you mean" hints.
pub fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(target, option);
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = std::cmp::min(
                std::cmp::min(dp[i - 1][j] + 1, dp[i][j - 1] + 1),
                dp[i - 1][j - 1] + cost,
            );
        }
    }

    dp[a.len()][b.len()]
}
