//! # Resilient Executor
//!
//! Orchestrates one query:
//!
//! 1. **Cache lookup** keyed by source identity and normalized SQL. A hit returns at once.
//! 2. **Validation**: the security validator (unless skipped) and the read-only check,
//!    which always runs.
//! 3. **Analysis**: an advisory [`QueryPlan`], later enriched with timing.
//! 4. **Execution** through the [`QueryBackend`] under the retry policy and optional
//!    deadline.
//! 5. **Cache store** with a TTL chosen by [`TtlPolicy`], then statistics.
//!
//! Validation and configuration failures never reach the retry loop.

use crate::cache::{AdaptiveCache, CacheKey};
use crate::stats::{ExecutionStats, StatsRecorder};
use crate::ttl::TtlPolicy;
use futures::future::join_all;
use sluice_common::config::{AppConfig, ExecutorSettings};
use sluice_common::scrubber::scrub_for_log;
use sluice_common::{retry_with_policy, DataSourceDescriptor, RetryPolicy};
use sluice_connectors::{PoolManager, QueryBackend, Rows};
use sluice_error::{ErrorCode, Result, SluiceError};
use sluice_sql::lexical::with_limit;
use sluice_sql::security::{validate_column_name, validate_table_name};
use sluice_sql::{
    CommentMode, IdentifierMode, IndexSuggestion, OptimizationStats, QueryAnalyzer, QueryPlan,
    SqlValidator, ValidatorConfig,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Per-call execution options.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Wall-clock bound for the whole call, retries included.
    pub timeout: Option<Duration>,
    /// Skip the security validator. The read-only check still runs.
    pub skip_validation: bool,
    /// Ignore any cached result; the fresh result still refreshes the cache.
    pub bypass_cache: bool,
}

impl ExecuteOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub rows: Rows,
    /// Absent on cache hits.
    pub plan: Option<QueryPlan>,
    pub cache_hit: bool,
    pub elapsed: Duration,
    /// Backend attempts used; zero on cache hits.
    pub attempts: u32,
}

/// What [`QueryExecutor::flush`] clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushScope {
    /// The result cache.
    Query,
    /// The result cache plus analyzer history, usage counters and statistics.
    All,
}

impl FromStr for FlushScope {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "query" => Ok(FlushScope::Query),
            "all" => Ok(FlushScope::All),
            other => Err(SluiceError::new(
                ErrorCode::InvalidArgument,
                format!("Unknown flush scope '{}'", other),
            )
            .with_hint("Use 'query' or 'all'")),
        }
    }
}

pub struct QueryExecutor {
    backend: Arc<dyn QueryBackend>,
    validator: SqlValidator,
    analyzer: QueryAnalyzer,
    cache: AdaptiveCache,
    ttl: TtlPolicy,
    retry: RetryPolicy,
    settings: ExecutorSettings,
    stats: StatsRecorder,
}

impl QueryExecutor {
    pub fn new(config: &AppConfig, backend: Arc<dyn QueryBackend>) -> Result<Self> {
        config.check()?;
        let comment_mode = if config.executor.loose_comments {
            CommentMode::Loose
        } else {
            CommentMode::Strict
        };

        Ok(Self {
            backend,
            validator: SqlValidator::new(ValidatorConfig {
                comment_mode,
                ..Default::default()
            }),
            analyzer: QueryAnalyzer::new(config.analyzer.clone()),
            cache: AdaptiveCache::new(&config.cache),
            ttl: TtlPolicy::new(config.cache.ttl.clone()),
            retry: RetryPolicy::try_from(&config.retry)?,
            settings: config.executor.clone(),
            stats: StatsRecorder::default(),
        })
    }

    /// Executor backed by a [`PoolManager`] built from `config.pool`.
    pub fn with_pool_manager(config: &AppConfig) -> Result<Self> {
        let manager = Arc::new(PoolManager::new(config.pool.clone()));
        Self::new(config, manager)
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn cache(&self) -> &AdaptiveCache {
        &self.cache
    }

    pub fn analyzer(&self) -> &QueryAnalyzer {
        &self.analyzer
    }

    pub fn validator(&self) -> &SqlValidator {
        &self.validator
    }

    fn check(&self, sql: &str, skip_validation: bool) -> Result<()> {
        if !skip_validation && self.settings.strict_validation {
            self.validator.validate(sql)?;
        }
        self.validator.ensure_read_only(sql)?;
        Ok(())
    }

    pub async fn run(
        &self,
        source: &DataSourceDescriptor,
        sql: &str,
        options: ExecuteOptions,
    ) -> Result<QueryOutcome> {
        let started = Instant::now();
        let deadline = options
            .timeout
            .or_else(|| self.settings.default_timeout())
            .map(|t| started + t);
        let key = CacheKey::new(source.id, sql);

        if !options.bypass_cache {
            if let Some(rows) = self.cache.get(&key).await {
                let elapsed = started.elapsed();
                self.stats.record_hit();
                info!(
                    target: "queries",
                    source_id = %source.id,
                    rows = rows.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    cache_hit = true,
                    success = true
                );
                return Ok(QueryOutcome {
                    rows,
                    plan: None,
                    cache_hit: true,
                    elapsed,
                    attempts: 0,
                });
            }
        }
        self.stats.record_miss();

        if let Err(e) = self.check(sql, options.skip_validation) {
            self.stats.record_failure();
            warn!(
                target: "queries",
                source_id = %source.id,
                code = %e.code,
                query = %scrub_for_log(sql),
                "Query rejected: {}",
                e.message
            );
            return Err(e);
        }

        let plan = self.analyzer.analyze(sql, Some(source.engine));

        let result = retry_with_policy(
            "query execution",
            &self.retry,
            deadline,
            |attempt, err, delay| {
                self.stats.record_retry();
                debug!(
                    target: "queries",
                    source_id = %source.id,
                    attempt,
                    code = %err.code,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying query"
                );
            },
            |_| self.backend.fetch_all(source, sql),
        )
        .await;

        let (rows, attempts) = match result {
            Ok(ok) => ok,
            Err(e) => {
                self.stats.record_failure();
                error!(
                    target: "queries",
                    source_id = %source.id,
                    code = %e.code,
                    duration_ms = started.elapsed().as_millis() as u64,
                    query = %scrub_for_log(sql),
                    cache_hit = false,
                    success = false,
                    "{}",
                    e.message
                );
                return Err(e);
            }
        };

        let elapsed = started.elapsed();
        let rows: Rows = Arc::new(rows);
        self.cache
            .set(key, rows.clone(), self.ttl.ttl_for(sql))
            .await;

        let slow = self
            .stats
            .record_success(elapsed, self.settings.slow_query_threshold());
        let plan = self
            .analyzer
            .record_execution(&plan.query_id, elapsed, rows.len() as u64)
            .unwrap_or(plan);

        info!(
            target: "queries",
            source_id = %source.id,
            query_id = %plan.query_id,
            rows = rows.len(),
            attempts,
            duration_ms = elapsed.as_millis() as u64,
            cache_hit = false,
            success = true
        );
        if slow {
            warn!(
                target: "queries",
                query_id = %plan.query_id,
                duration_ms = elapsed.as_millis() as u64,
                query = %scrub_for_log(sql),
                "Slow query"
            );
        }

        Ok(QueryOutcome {
            rows,
            plan: Some(plan),
            cache_hit: false,
            elapsed,
            attempts,
        })
    }

    pub async fn execute_sql(&self, source: &DataSourceDescriptor, sql: &str) -> Result<Rows> {
        self.run(source, sql, ExecuteOptions::default())
            .await
            .map(|outcome| outcome.rows)
    }

    pub async fn execute_sql_with_timeout(
        &self,
        source: &DataSourceDescriptor,
        sql: &str,
        timeout: Duration,
    ) -> Result<Rows> {
        self.run(source, sql, ExecuteOptions::default().with_timeout(timeout))
            .await
            .map(|outcome| outcome.rows)
    }

    /// Append `LIMIT limit` unless the statement already mentions LIMIT, then execute.
    pub async fn execute_sql_with_limit(
        &self,
        source: &DataSourceDescriptor,
        sql: &str,
        limit: u64,
    ) -> Result<Rows> {
        self.execute_sql(source, &with_limit(sql, limit)).await
    }

    /// Execute independent queries against one source, at most `batch_concurrency` at a
    /// time. Results are in input order.
    pub async fn execute_batch(
        &self,
        source: &DataSourceDescriptor,
        queries: &[String],
    ) -> Vec<Result<Rows>> {
        let permits = Semaphore::new(self.settings.batch_concurrency.max(1));
        let tasks = queries.iter().map(|sql| {
            let permits = &permits;
            async move {
                let _permit = permits.acquire().await.map_err(|_| {
                    SluiceError::new(ErrorCode::Internal, "Batch semaphore closed")
                })?;
                self.execute_sql(source, sql).await
            }
        });
        join_all(tasks).await
    }

    pub fn analyze_query(&self, sql: &str, source: Option<&DataSourceDescriptor>) -> QueryPlan {
        self.analyzer.analyze(sql, source.map(|s| s.engine))
    }

    pub fn suggest_indexes(&self) -> Vec<IndexSuggestion> {
        self.analyzer.suggest_indexes()
    }

    /// DDL of every current index suggestion, most used first.
    pub fn suggested_index_ddl(&self) -> Vec<String> {
        self.suggest_indexes()
            .into_iter()
            .map(|s| s.create_statement)
            .collect()
    }

    pub fn slow_queries(&self, threshold: Duration) -> Vec<QueryPlan> {
        self.analyzer.slow_queries(threshold)
    }

    /// Create the suggested index on `source`.
    ///
    /// The DDL is rebuilt for the source's engine from re-validated identifiers and bypasses
    /// the read-only check, which it would fail.
    pub async fn create_index(
        &self,
        source: &DataSourceDescriptor,
        suggestion: &IndexSuggestion,
    ) -> Result<()> {
        validate_table_name(&suggestion.table, IdentifierMode::Strict)?;
        validate_column_name(&suggestion.index_name, IdentifierMode::Strict)?;
        for column in &suggestion.columns {
            validate_column_name(column, IdentifierMode::Strict)?;
        }

        let ddl = source.engine.dialect().create_index_ddl(
            &suggestion.table,
            &suggestion.columns,
            &suggestion.index_name,
        );
        self.backend.execute(source, &ddl).await?;
        self.analyzer.record_index_created();

        info!(
            target: "analyzer",
            source_id = %source.id,
            index = %suggestion.index_name,
            table = %suggestion.table,
            "Created index"
        );
        Ok(())
    }

    /// Clear cached state. `scope` is `"query"` or `"all"`.
    pub async fn flush(&self, scope: &str) -> Result<()> {
        match scope.parse::<FlushScope>()? {
            FlushScope::Query => self.cache.flush().await,
            FlushScope::All => {
                self.cache.flush().await;
                self.analyzer.reset();
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> ExecutionStats {
        self.stats.snapshot()
    }

    pub fn optimization_stats(&self) -> OptimizationStats {
        self.analyzer.stats()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Close every backend connection. Cached results are dropped.
    pub async fn shutdown(&self) {
        self.cache.flush().await;
        self.backend.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_scope_parsing() {
        assert_eq!("query".parse::<FlushScope>().unwrap(), FlushScope::Query);
        assert_eq!(" ALL ".parse::<FlushScope>().unwrap(), FlushScope::All);
        let err = "everything".parse::<FlushScope>().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_options_builders() {
        let options = ExecuteOptions::default()
            .with_timeout(Duration::from_secs(3))
            .skip_validation()
            .bypass_cache();
        assert_eq!(options.timeout, Some(Duration::from_secs(3)));
        assert!(options.skip_validation);
        assert!(options.bypass_cache);
    }
}
