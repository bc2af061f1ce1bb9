use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::memory::MemoryStore;
use crate::database::postgres::PgStore;
use crate::database::store::Store;

/// Errors from the store layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    /// A batch guard no longer held when the batch was applied.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Builds the configured store: Postgres when a URL is set, memory otherwise.
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
        match config.url.as_deref() {
            Some(url) => {
                let pool = Self::connect_pool(url, config).await?;
                if config.run_migrations {
                    Self::migrate(&pool).await?;
                }
                Ok(Arc::new(PgStore::new(pool)))
            }
            None => {
                info!("DATABASE_URL not set, using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    pub async fn connect_pool(url: &str, config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool for: {}", parsed.path().trim_start_matches('/'));
        Ok(pool)
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn require_url(config: &DatabaseConfig) -> Result<&str, DatabaseError> {
        config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))
    }
}
