use crate::manager::PoolManager;
use crate::rows::Row;
use async_trait::async_trait;
use sluice_common::DataSourceDescriptor;
use sluice_error::{ErrorCategory, Result, SluiceError};

/// Where the executor sends statements. [`PoolManager`] is the production implementation;
/// tests substitute scripted backends.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn fetch_all(&self, source: &DataSourceDescriptor, sql: &str) -> Result<Vec<Row>>;

    /// Run a statement that returns no rows. Returns the affected row count.
    async fn execute(&self, source: &DataSourceDescriptor, sql: &str) -> Result<u64>;

    /// Check that `source` is reachable.
    async fn ping(&self, source: &DataSourceDescriptor) -> Result<()>;

    async fn shutdown(&self);
}

fn with_source(err: SluiceError, source: &DataSourceDescriptor) -> SluiceError {
    if err.category() == ErrorCategory::Connection && err.context.is_none() {
        err.with_context(source.connection_context())
    } else {
        err
    }
}

#[async_trait]
impl QueryBackend for PoolManager {
    async fn fetch_all(&self, source: &DataSourceDescriptor, sql: &str) -> Result<Vec<Row>> {
        let pool = self.acquire(source).await?;
        pool.fetch_rows(sql).await.map_err(|e| with_source(e, source))
    }

    async fn execute(&self, source: &DataSourceDescriptor, sql: &str) -> Result<u64> {
        let pool = self.acquire(source).await?;
        pool.execute(sql).await.map_err(|e| with_source(e, source))
    }

    async fn ping(&self, source: &DataSourceDescriptor) -> Result<()> {
        self.acquire(source).await.map(|_| ())
    }

    async fn shutdown(&self) {
        self.release_all().await;
    }
}
