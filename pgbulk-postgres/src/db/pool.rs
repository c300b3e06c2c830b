//! Connection context and pool management
//!
//! A [`PgContext`] holds the connection configuration shared by the bulk
//! client and the typed client. The pool behind it is created lazily, so
//! constructing a context performs no I/O; each operation acquires its own
//! connection and returns it to the pool when done, success or failure.
//!
//! Contexts must be created inside a Tokio runtime.

use std::sync::Arc;

use pgbulk_core::DbConfig;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};

use crate::error::{DbError, DbResult};

/// Shared connection configuration and pool.
#[derive(Clone, Debug)]
pub struct PgContext {
    inner: Arc<PgContextInner>,
}

#[derive(Debug)]
struct PgContextInner {
    config: DbConfig,
    pool: PgPool,
}

impl PgContext {
    /// Create a context from a connection string, with default pool settings.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ctx = PgContext::new("postgres://localhost/app")?;
    /// ```
    pub fn new(connection_string: impl Into<String>) -> DbResult<Self> {
        Self::from_config(DbConfig::new(connection_string))
    }

    /// Create a context from `DATABASE_URL` and the `PGBULK_*` variables.
    pub fn from_env() -> DbResult<Self> {
        Self::from_config(DbConfig::from_env()?)
    }

    pub fn from_config(config: DbConfig) -> DbResult<Self> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy(&config.database_url)
            .map_err(|e| {
                pgbulk_core::Error::config(format!("invalid connection string: {}", e))
            })?;

        tracing::debug!(?config, "created lazy connection pool");

        Ok(Self {
            inner: Arc::new(PgContextInner { config, pool }),
        })
    }

    /// Wrap an existing pool.
    pub fn with_pool(config: DbConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(PgContextInner { config, pool }),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.inner.config
    }

    pub fn connection_string(&self) -> &str {
        &self.inner.config.database_url
    }

    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Acquire a dedicated connection for one operation.
    pub async fn acquire(&self) -> DbResult<PoolConnection<Postgres>> {
        self.inner
            .pool
            .acquire()
            .await
            .map_err(DbError::ConnectionFailure)
    }

    /// Round-trip a trivial query to verify the database is reachable.
    pub async fn ping(&self) -> DbResult<()> {
        let (one,): (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(self.pool())
            .await
            .map_err(DbError::ConnectionFailure)?;
        debug_assert_eq!(one, 1);
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.inner.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn construction_does_not_connect() {
        // Nothing listens on port 1; a lazy pool must not care yet.
        let ctx = PgContext::new("postgres://nobody@127.0.0.1:1/none").unwrap();
        assert_eq!(ctx.connection_string(), "postgres://nobody@127.0.0.1:1/none");
        assert_eq!(ctx.pool().size(), 0);
    }

    #[tokio::test]
    async fn malformed_url_is_a_config_error() {
        let err = PgContext::new("definitely not a url").unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(pgbulk_core::Error::Config { .. })
        ));
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let err = PgContext::new("  ").unwrap_err();
        assert!(err.to_string().contains("database_url"));
    }

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p pgbulk-postgres -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_connection() {
        let ctx = PgContext::from_env().expect("DATABASE_URL required");
        ctx.ping().await.expect("ping failed");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_pool_access() {
        let ctx = PgContext::from_env().expect("DATABASE_URL required");

        // Spawn 10 concurrent tasks, twice the default pool size
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let result: (i32,) = sqlx::query_as("SELECT $1::int")
                        .bind(i)
                        .fetch_one(ctx.pool())
                        .await
                        .expect("concurrent query failed");
                    result.0
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.await.expect("task panicked");
            assert_eq!(result, i as i32);
        }
    }
}
