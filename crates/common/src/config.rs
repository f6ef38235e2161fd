pub use crate::models::{SourceConfig, SourcesConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sluice_error::ErrorCode;
use std::time::Duration;
use validator::{Validate, ValidationError};

// Pool defaults
pub const DEFAULT_MAX_OPEN: u32 = 25;
pub const DEFAULT_MAX_IDLE: u32 = 5;
pub const DEFAULT_MAX_LIFETIME_SECS: u64 = 300;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Retry defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

// Cache defaults
pub const DEFAULT_CACHE_MAX_SIZE_MB: u64 = 256;
pub const DEFAULT_BASE_TTL_SECS: u64 = 300;
pub const DEFAULT_AGGREGATION_TTL_SECS: u64 = 600;
pub const DEFAULT_SIMPLE_TTL_SECS: u64 = 180;
pub const DEFAULT_COMPLEX_TTL_SECS: u64 = 900;
pub const DEFAULT_BUSINESS_HOURS_FACTOR: f64 = 0.8;
pub const DEFAULT_OFF_HOURS_FACTOR: f64 = 1.2;
pub const DEFAULT_BUSINESS_START_HOUR: u32 = 9;
pub const DEFAULT_BUSINESS_END_HOUR: u32 = 18;

// Executor / analyzer defaults
pub const DEFAULT_SLOW_QUERY_MS: u64 = 1000;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 5;
pub const DEFAULT_INDEX_USAGE_THRESHOLD: u64 = 3;
pub const DEFAULT_MAX_HISTORY: usize = 10_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const ENV_PREFIX: &str = "SLUICE";

#[derive(Debug, Deserialize, Serialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub pool: PoolSettings,
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetrySettings,
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheSettings,
    #[serde(default)]
    #[validate(nested)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    #[validate(nested)]
    pub analyzer: AnalyzerSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Limits applied to every connection pool the manager opens.
#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct PoolSettings {
    #[serde(default = "default_max_open")]
    #[validate(range(min = 1))]
    pub max_open: u32,
    /// Connections kept warm; mapped onto the driver's minimum pool size.
    #[serde(default = "default_max_idle")]
    pub max_idle: u32,
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout_secs")]
    #[validate(range(min = 1))]
    pub acquire_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: DEFAULT_MAX_OPEN,
            max_idle: DEFAULT_MAX_IDLE,
            max_lifetime_secs: DEFAULT_MAX_LIFETIME_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolSettings {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn default_max_open() -> u32 {
    DEFAULT_MAX_OPEN
}
fn default_max_idle() -> u32 {
    DEFAULT_MAX_IDLE
}
fn default_max_lifetime_secs() -> u64 {
    DEFAULT_MAX_LIFETIME_SECS
}
fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}
fn default_acquire_timeout_secs() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_SECS
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct RetrySettings {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    #[validate(range(max = 10))]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    #[validate(range(min = 1.0), custom(function = "validate_finite"))]
    pub backoff_factor: f64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// Error codes (e.g. `SLUICE-1001`) eligible for retry.
    #[serde(default = "default_retryable")]
    #[validate(custom(function = "validate_retryable_codes"))]
    pub retryable: Vec<String>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            jitter: true,
            retryable: default_retryable(),
        }
    }
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_initial_delay_ms() -> u64 {
    DEFAULT_INITIAL_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_backoff_factor() -> f64 {
    DEFAULT_BACKOFF_FACTOR
}
fn default_jitter() -> bool {
    true
}
fn default_retryable() -> Vec<String> {
    [
        ErrorCode::ConnectionFailed,
        ErrorCode::ConnectionTimeout,
        ErrorCode::QueryTimeout,
    ]
    .iter()
    .map(|c| c.as_str())
    .collect()
}

/// Rejects NaN and infinities, which `range` accepts.
fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("non_finite"))
    }
}

fn validate_retryable_codes(codes: &[String]) -> Result<(), ValidationError> {
    for code in codes {
        if ErrorCode::try_from(code.clone()).is_err() {
            return Err(ValidationError::new("unknown_error_code"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct CacheSettings {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_max_size_mb")]
    #[validate(range(min = 1))]
    pub max_size_mb: u64,
    #[serde(default)]
    #[validate(nested)]
    pub ttl: TtlSettings,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_mb: DEFAULT_CACHE_MAX_SIZE_MB,
            ttl: TtlSettings::default(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}
fn default_cache_max_size_mb() -> u64 {
    DEFAULT_CACHE_MAX_SIZE_MB
}

/// Inputs of the adaptive TTL computation.
#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
#[validate(schema(function = "validate_business_hours"))]
pub struct TtlSettings {
    #[serde(default = "default_base_secs")]
    pub base_secs: u64,
    #[serde(default = "default_aggregation_secs")]
    pub aggregation_secs: u64,
    #[serde(default = "default_simple_secs")]
    pub simple_secs: u64,
    #[serde(default = "default_complex_secs")]
    pub complex_secs: u64,
    #[serde(default = "default_business_hours_factor")]
    #[validate(range(min = 0.0), custom(function = "validate_finite"))]
    pub business_hours_factor: f64,
    #[serde(default = "default_off_hours_factor")]
    #[validate(range(min = 0.0), custom(function = "validate_finite"))]
    pub off_hours_factor: f64,
    /// First business hour, inclusive.
    #[serde(default = "default_business_start_hour")]
    #[validate(range(max = 23))]
    pub business_start_hour: u32,
    /// First hour after business hours, exclusive.
    #[serde(default = "default_business_end_hour")]
    #[validate(range(max = 24))]
    pub business_end_hour: u32,
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self {
            base_secs: DEFAULT_BASE_TTL_SECS,
            aggregation_secs: DEFAULT_AGGREGATION_TTL_SECS,
            simple_secs: DEFAULT_SIMPLE_TTL_SECS,
            complex_secs: DEFAULT_COMPLEX_TTL_SECS,
            business_hours_factor: DEFAULT_BUSINESS_HOURS_FACTOR,
            off_hours_factor: DEFAULT_OFF_HOURS_FACTOR,
            business_start_hour: DEFAULT_BUSINESS_START_HOUR,
            business_end_hour: DEFAULT_BUSINESS_END_HOUR,
        }
    }
}

fn default_base_secs() -> u64 {
    DEFAULT_BASE_TTL_SECS
}
fn default_aggregation_secs() -> u64 {
    DEFAULT_AGGREGATION_TTL_SECS
}
fn default_simple_secs() -> u64 {
    DEFAULT_SIMPLE_TTL_SECS
}
fn default_complex_secs() -> u64 {
    DEFAULT_COMPLEX_TTL_SECS
}
fn default_business_hours_factor() -> f64 {
    DEFAULT_BUSINESS_HOURS_FACTOR
}
fn default_off_hours_factor() -> f64 {
    DEFAULT_OFF_HOURS_FACTOR
}
fn default_business_start_hour() -> u32 {
    DEFAULT_BUSINESS_START_HOUR
}
fn default_business_end_hour() -> u32 {
    DEFAULT_BUSINESS_END_HOUR
}

fn validate_business_hours(ttl: &TtlSettings) -> Result<(), ValidationError> {
    if ttl.business_start_hour >= ttl.business_end_hour {
        return Err(ValidationError::new("business_hours_empty"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ExecutorSettings {
    /// Executions slower than this count as slow queries.
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
    #[serde(default = "default_batch_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub batch_concurrency: usize,
    /// Deadline applied when the caller does not pass one.
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
    #[serde(default = "default_strict_validation")]
    pub strict_validation: bool,
    /// Allow comment markers that appear inside string literals.
    #[serde(default)]
    pub loose_comments: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            slow_query_ms: DEFAULT_SLOW_QUERY_MS,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            default_timeout_secs: None,
            strict_validation: true,
            loose_comments: false,
        }
    }
}

impl ExecutorSettings {
    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_ms)
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_secs.map(Duration::from_secs)
    }
}

fn default_slow_query_ms() -> u64 {
    DEFAULT_SLOW_QUERY_MS
}
fn default_batch_concurrency() -> usize {
    DEFAULT_BATCH_CONCURRENCY
}
fn default_strict_validation() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct AnalyzerSettings {
    /// Usage count at which a (table, column) pair yields an index suggestion.
    #[serde(default = "default_index_usage_threshold")]
    #[validate(range(min = 1))]
    pub index_usage_threshold: u64,
    #[serde(default = "default_max_history")]
    #[validate(range(min = 1))]
    pub max_history: usize,
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            index_usage_threshold: DEFAULT_INDEX_USAGE_THRESHOLD,
            max_history: DEFAULT_MAX_HISTORY,
            slow_query_ms: DEFAULT_SLOW_QUERY_MS,
        }
    }
}

fn default_index_usage_threshold() -> u64 {
    DEFAULT_INDEX_USAGE_THRESHOLD
}
fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl AppConfig {
    /// Load from an optional file plus `SLUICE__SECTION__KEY` environment overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        // SLUICE__POOL__MAX_OPEN -> pool.max_open
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("retry.retryable")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;

        Ok(app_config)
    }

    /// Validate a config built in code rather than loaded through [`AppConfig::from_file`].
    pub fn check(&self) -> sluice_error::Result<()> {
        self.validate().map_err(|e| {
            sluice_error::SluiceError::new(
                sluice_error::ErrorCode::InvalidConfig,
                format!("Configuration validation failed: {}", e),
            )
            .with_context(sluice_error::ErrorContext::Config {
                file_path: None,
                field: e.errors().keys().next().map(|k| k.to_string()),
            })
        })
    }
}

impl SourcesConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sources file '{}'", path))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse sources file '{}'", path))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let sources: SourcesConfig = serde_yaml::from_str(content)?;

        sources
            .validate()
            .map_err(|e| anyhow::anyhow!("Sources validation failed: {:?}", e))?;

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_app_config_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retryable.len(), 3);
        assert_eq!(config.executor.batch_concurrency, 5);
    }

    #[test]
    fn test_unknown_retryable_code_is_rejected() {
        let retry = RetrySettings {
            retryable: vec!["SLUICE-1001".to_string(), "SLUICE-0042".to_string()],
            ..Default::default()
        };
        assert!(retry.validate().is_err());
    }

    #[test]
    fn test_non_finite_factors_are_rejected() {
        let ttl = TtlSettings {
            off_hours_factor: f64::NAN,
            ..Default::default()
        };
        assert!(ttl.validate().is_err());

        let retry = RetrySettings {
            backoff_factor: f64::INFINITY,
            ..Default::default()
        };
        assert!(retry.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.ttl.business_hours_factor = f64::NAN;
        let err = config.check().unwrap_err();
        assert_eq!(err.code, sluice_error::ErrorCode::InvalidConfig);
        assert!(AppConfig::default().check().is_ok());
    }

    #[test]
    fn test_inverted_business_hours_rejected() {
        let ttl = TtlSettings {
            business_start_hour: 18,
            business_end_hour: 9,
            ..Default::default()
        };
        assert!(ttl.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "pool:\n  max_open: 8\ncache:\n  ttl:\n    base_secs: 120\nexecutor:\n  loose_comments: true"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.pool.max_open, 8);
        assert_eq!(config.pool.max_idle, DEFAULT_MAX_IDLE);
        assert_eq!(config.cache.ttl.base_secs, 120);
        assert_eq!(config.cache.ttl.complex_secs, DEFAULT_COMPLEX_TTL_SECS);
        assert!(config.executor.loose_comments);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::from_file("/nonexistent/sluice.yaml").unwrap();
        assert_eq!(config.pool.max_open, DEFAULT_MAX_OPEN);
    }

    #[test]
    fn test_sources_from_file_rejects_empty_name() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "sources:\n  - id: 1\n    name: \"\"\n    type: sqlite\n    database: /tmp/a.db"
        )
        .unwrap();

        assert!(SourcesConfig::from_file(file.path().to_str().unwrap()).is_err());
    }
}
