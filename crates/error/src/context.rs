//! # Error Contexts
//!
//! Structured metadata attached to errors so callers can act on them programmatically.

use serde::{Deserialize, Serialize};

/// Structured context for machine-readable errors.
///
/// Each variant provides specific fields relevant to that error type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for SLUICE-2xxx (validation rejections)
    Validation {
        /// Name of the rule that failed (e.g. "blocked_keyword")
        rule: String,
        /// The offending token, function, pattern or identifier
        offending: Option<String>,
    },

    /// Context for connection errors (SLUICE-1001..1003)
    Connection {
        source_id: i64,
        engine: String,
        host: Option<String>,
        port: Option<u16>,
    },

    /// Context for SLUICE-3001 (UnsupportedEngine)
    Engine {
        requested: String,
        supported: Vec<String>,
    },

    /// Context for SLUICE-1004 (RetriesExhausted)
    Retry {
        attempts: u32,
        last_code: String,
    },

    /// Context for SLUICE-5xxx (timeouts)
    Timeout {
        /// Stage that was running when the deadline fired
        stage: String,
        elapsed_ms: u64,
    },

    /// Context for SLUICE-3003 (config errors)
    Config {
        file_path: Option<String>,
        field: Option<String>,
    },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}
