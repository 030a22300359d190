//! Shared test utilities: in-memory database setup and app-state builders.

use anyhow::Result;
use integrations::config::AppConfig;
use integrations::server::AppState;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

/// Sets up an in-memory SQLite database with all migrations applied.
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Base test configuration with a fixed crypto key.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        app_origin: Some("https://projects.example.com".to_string()),
        crypto_key: Some(vec![7u8; 32]),
        ..AppConfig::default()
    }
}

/// Builds an [`AppState`] over a fresh in-memory database.
#[allow(dead_code)]
pub async fn test_state(config: AppConfig) -> Result<AppState> {
    let db = setup_test_db().await?;
    Ok(AppState::new(Arc::new(config), db)?)
}
