use crate::rows::{materialize, Row};
use sluice_common::config::PoolSettings;
use sluice_common::{DataSourceDescriptor, EngineKind};
use sluice_error::{ErrorCode, Result, SluiceError};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Connection;
use std::str::FromStr;
use std::time::Duration;

/// Busy timeout for SQLite files shared with other writers.
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A live connection pool for one data source. Cloning shares the pool.
#[derive(Debug, Clone)]
pub enum EnginePool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

macro_rules! pool_options {
    ($options:ty, $settings:expr) => {{
        let max_open = $settings.max_open.max(1);
        <$options>::new()
            .max_connections(max_open)
            .min_connections($settings.max_idle.min(max_open))
            .max_lifetime($settings.max_lifetime())
            .idle_timeout($settings.idle_timeout())
            .acquire_timeout($settings.acquire_timeout())
    }};
}

impl EnginePool {
    /// Open a pool for `descriptor` and establish its first connection.
    pub async fn connect(descriptor: &DataSourceDescriptor, settings: &PoolSettings) -> Result<Self> {
        let url = descriptor.engine.dialect().connection_string(descriptor)?;
        let connect_err = |e: sqlx::Error| connect_error(e, descriptor);

        let pool = match descriptor.engine {
            EngineKind::Postgres => {
                let options = PgConnectOptions::from_str(&url).map_err(connect_err)?;
                let pool = pool_options!(PgPoolOptions, settings)
                    .connect_with(options)
                    .await
                    .map_err(connect_err)?;
                EnginePool::Postgres(pool)
            }
            EngineKind::MySql => {
                let options = MySqlConnectOptions::from_str(&url).map_err(connect_err)?;
                let pool = pool_options!(MySqlPoolOptions, settings)
                    .connect_with(options)
                    .await
                    .map_err(connect_err)?;
                EnginePool::MySql(pool)
            }
            EngineKind::Sqlite => {
                let options = SqliteConnectOptions::from_str(&url)
                    .map_err(connect_err)?
                    .create_if_missing(false)
                    .busy_timeout(SQLITE_BUSY_TIMEOUT);
                let pool = pool_options!(SqlitePoolOptions, settings)
                    .connect_with(options)
                    .await
                    .map_err(connect_err)?;
                EnginePool::Sqlite(pool)
            }
        };
        Ok(pool)
    }

    pub fn engine(&self) -> EngineKind {
        match self {
            EnginePool::Postgres(_) => EngineKind::Postgres,
            EnginePool::MySql(_) => EngineKind::MySql,
            EnginePool::Sqlite(_) => EngineKind::Sqlite,
        }
    }

    /// Liveness probe. Pings an idle connection if one is free; a pool whose connections
    /// are all checked out is busy, not dead, and passes without waiting.
    pub async fn ping(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SluiceError::new(ErrorCode::ProbeFailed, "Pool is closed"));
        }
        let result = match self {
            EnginePool::Postgres(pool) => match pool.try_acquire() {
                Some(mut conn) => conn.ping().await,
                None => Ok(()),
            },
            EnginePool::MySql(pool) => match pool.try_acquire() {
                Some(mut conn) => conn.ping().await,
                None => Ok(()),
            },
            EnginePool::Sqlite(pool) => match pool.try_acquire() {
                Some(mut conn) => conn.ping().await,
                None => Ok(()),
            },
        };
        result.map_err(|e| {
            SluiceError::new(ErrorCode::ProbeFailed, "Liveness probe failed")
                .with_cause(SluiceError::from(e))
        })
    }

    /// Run `sql` and materialize every row.
    ///
    /// Statements go over the simple (text) protocol so values of types without a native
    /// mapping still arrive in readable form.
    pub async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let rows = match self {
            EnginePool::Postgres(pool) => sqlx::raw_sql(sql)
                .fetch_all(pool)
                .await?
                .iter()
                .map(materialize)
                .collect(),
            EnginePool::MySql(pool) => sqlx::raw_sql(sql)
                .fetch_all(pool)
                .await?
                .iter()
                .map(materialize)
                .collect(),
            EnginePool::Sqlite(pool) => sqlx::raw_sql(sql)
                .fetch_all(pool)
                .await?
                .iter()
                .map(materialize)
                .collect(),
        };
        Ok(rows)
    }

    /// Run a statement that returns no rows, e.g. index DDL.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let affected = match self {
            EnginePool::Postgres(pool) => sqlx::raw_sql(sql).execute(pool).await?.rows_affected(),
            EnginePool::MySql(pool) => sqlx::raw_sql(sql).execute(pool).await?.rows_affected(),
            EnginePool::Sqlite(pool) => sqlx::raw_sql(sql).execute(pool).await?.rows_affected(),
        };
        Ok(affected)
    }

    /// Open connections, idle or in use.
    pub fn size(&self) -> u32 {
        match self {
            EnginePool::Postgres(pool) => pool.size(),
            EnginePool::MySql(pool) => pool.size(),
            EnginePool::Sqlite(pool) => pool.size(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            EnginePool::Postgres(pool) => pool.is_closed(),
            EnginePool::MySql(pool) => pool.is_closed(),
            EnginePool::Sqlite(pool) => pool.is_closed(),
        }
    }

    pub async fn close(&self) {
        match self {
            EnginePool::Postgres(pool) => pool.close().await,
            EnginePool::MySql(pool) => pool.close().await,
            EnginePool::Sqlite(pool) => pool.close().await,
        }
    }
}

/// Failures while opening a pool are connection failures unless the driver already
/// classified them more precisely (timeout, bad URL, rejected credentials).
fn connect_error(err: sqlx::Error, descriptor: &DataSourceDescriptor) -> SluiceError {
    let converted = SluiceError::from(err);
    let converted = if converted.code == ErrorCode::QueryFailed {
        SluiceError::new(ErrorCode::ConnectionFailed, converted.message)
    } else {
        converted
    };
    converted.with_context(descriptor.connection_context())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_error::ErrorCategory;

    #[tokio::test]
    async fn test_missing_sqlite_file_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let descriptor = DataSourceDescriptor::new(7, EngineKind::Sqlite, path.to_string_lossy());

        let err = EnginePool::connect(&descriptor, &PoolSettings::default())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Connection);
        assert!(err.context.is_some());
    }

    #[tokio::test]
    async fn test_closed_pool_fails_liveness_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.db");
        std::fs::File::create(&path).unwrap();
        let descriptor = DataSourceDescriptor::new(1, EngineKind::Sqlite, path.to_string_lossy());

        let pool = EnginePool::connect(&descriptor, &PoolSettings::default())
            .await
            .unwrap();
        assert_eq!(pool.engine(), EngineKind::Sqlite);
        pool.ping().await.unwrap();

        pool.close().await;
        assert!(pool.is_closed());
        assert_eq!(pool.ping().await.unwrap_err().code, ErrorCode::ProbeFailed);
    }
}
