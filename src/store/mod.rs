pub mod filter;
pub mod record;
pub mod repository;
pub mod sequence;

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the document store layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Owner of the process-lifetime connection pool. Created once at startup,
/// passed to handlers through router state, closed on shutdown. Cloning is
/// cheap: the inner pool is reference counted.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect using DATABASE_URL and the configured pool settings,
    /// running pending migrations when the environment asks for it.
    /// Connections are established lazily on first use.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(&url)
            .map_err(|_| StoreError::InvalidDatabaseUrl)?;

        if config.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Store migrations up to date");
        }

        info!("Initialized store pool (max_connections={})", config.max_connections);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool (on shutdown)
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed store pool");
    }
}
