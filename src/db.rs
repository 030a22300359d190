//! SeaORM pool initialization.
//!
//! Postgres in production, in-memory SQLite in tests. Startup retries
//! transient connection failures with exponential backoff; after that the
//! pool manages reconnects itself.

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::AppConfig;

const CONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: sea_orm::DbErr,
    },
    #[error("invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Connect a pool using the limits and timeouts from config.
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "database URL cannot be empty".to_string(),
        }
        .into());
    }

    let mut options = ConnectOptions::new(&cfg.database_url);
    options
        .max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let mut backoff = Duration::from_millis(100);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match Database::connect(options.clone()).await {
            Ok(pool) => {
                tracing::info!(attempt, "connected to database");
                return Ok(pool);
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                tracing::warn!(
                    attempt,
                    error = %e,
                    backoff_ms = backoff.as_millis() as u64,
                    "database connection failed, retrying"
                );
                sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => {
                tracing::error!(attempts = attempt, error = %e, "giving up on database connection");
                return Err(DatabaseError::ConnectionFailed { source: e }.into());
            }
        }
    }
}

/// Verifies the pool can still execute a query.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    let probe = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());
    db.query_one(probe)
        .await
        .context("database health check failed")?;
    Ok(())
}
