use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use super::{HandleCell, StoreAdapter, StoreKey};
use crate::config::PostgresConfig;
use crate::error::{DbError, DbResult};

// ============================================================================
// Relational Store Adapter (PostgreSQL)
// ============================================================================
//
// The handle is a connection pool. Models issue parameterized queries and
// pick the result shape with the sqlx executor:
// - exactly one row or none -> fetch_optional
// - exactly one row         -> fetch_one (RowNotFound otherwise)
// - zero or more rows       -> fetch_all
//
// ============================================================================

pub struct PostgresAdapter {
    config: PostgresConfig,
    handle: HandleCell<PgPool>,
}

impl PostgresAdapter {
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            config,
            handle: HandleCell::new(),
        }
    }

    /// Adapter around an already-open pool (tests, tooling).
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            config: PostgresConfig::default(),
            handle: HandleCell::with_handle(pool),
        }
    }

    fn connect_options(&self) -> DbResult<PgConnectOptions> {
        let options = match self.config.connection_string.as_deref() {
            Some(url) => url
                .parse::<PgConnectOptions>()
                .map_err(|e| DbError::Config(format!("invalid connection string: {e}")))?,
            None => PgConnectOptions::new()
                .host(&self.config.host)
                .port(self.config.port)
                .database(&self.config.database)
                .username(&self.config.user)
                .password(&self.config.password),
        };

        let ssl_mode = if self.config.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        };
        Ok(options.ssl_mode(ssl_mode))
    }

    async fn open_pool(&self) -> DbResult<PgPool> {
        let options = self.connect_options()?;
        let connection_error = |e: sqlx::Error| {
            tracing::error!(error = %e, "Error connecting to PostgreSQL");
            DbError::Connection {
                store: StoreKey::Postgres,
                message: e.to_string(),
            }
        };

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .idle_timeout(Some(self.config.idle_timeout()))
            .acquire_timeout(self.config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(connection_error)?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(connection_error)?;

        tracing::info!(
            max_connections = self.config.max_connections,
            "✅ PostgreSQL connected successfully"
        );
        Ok(pool)
    }
}

#[async_trait]
impl StoreAdapter for PostgresAdapter {
    type Handle = PgPool;

    fn key(&self) -> StoreKey {
        StoreKey::Postgres
    }

    async fn connect(&self) -> DbResult<PgPool> {
        self.handle.get_or_connect(|| self.open_pool()).await
    }

    async fn disconnect(&self) {
        if let Some(pool) = self.handle.take().await {
            pool.close().await;
            tracing::info!("PostgreSQL disconnected successfully");
        }
    }

    async fn is_connected(&self) -> bool {
        self.handle.is_set().await
    }
}
