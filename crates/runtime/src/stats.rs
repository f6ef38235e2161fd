use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

/// Snapshot of executor counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    /// Every `run`, including cache hits and rejected statements.
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub successful_executions: u64,
    pub failed_queries: u64,
    pub slow_queries: u64,
    /// Retry sleeps taken, whether or not the query eventually succeeded.
    pub retries: u64,
    /// Streaming mean over successful backend executions.
    pub avg_latency_ms: f64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    inner: Mutex<ExecutionStats>,
}

impl StatsRecorder {
    pub(crate) fn record_hit(&self) {
        let mut stats = self.inner.lock();
        stats.total_queries += 1;
        stats.cache_hits += 1;
    }

    pub(crate) fn record_miss(&self) {
        let mut stats = self.inner.lock();
        stats.total_queries += 1;
        stats.cache_misses += 1;
    }

    pub(crate) fn record_retry(&self) {
        self.inner.lock().retries += 1;
    }

    pub(crate) fn record_failure(&self) {
        self.inner.lock().failed_queries += 1;
    }

    /// Returns whether the execution counted as slow.
    pub(crate) fn record_success(&self, elapsed: Duration, slow_threshold: Duration) -> bool {
        let mut stats = self.inner.lock();
        stats.successful_executions += 1;
        let n = stats.successful_executions as f64;
        let latest = elapsed.as_secs_f64() * 1000.0;
        stats.avg_latency_ms = (stats.avg_latency_ms * (n - 1.0) + latest) / n;

        let slow = elapsed > slow_threshold;
        if slow {
            stats.slow_queries += 1;
        }
        slow
    }

    pub(crate) fn snapshot(&self) -> ExecutionStats {
        self.inner.lock().clone()
    }

    pub(crate) fn reset(&self) {
        *self.inner.lock() = ExecutionStats::default();
    }
}
