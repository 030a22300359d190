//! Service entry point.

use std::sync::Arc;

use integrations::config::ConfigLoader;
use integrations::server::{AppState, run_server};
use integrations::sweeper::PendingSweeper;
use integrations::telemetry;
use migration::{Migrator, MigratorTrait};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(ConfigLoader::new().load()?);

    telemetry::init_tracing(&config);
    if let Ok(redacted) = config.redacted_json() {
        tracing::info!(profile = %config.profile, config = %redacted, "configuration loaded");
    }

    let db = integrations::db::init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    let state = AppState::new(config.clone(), db)?;

    let shutdown = CancellationToken::new();
    let sweeper = PendingSweeper::new(config.clone(), state.pending_repo());
    let sweeper_shutdown = shutdown.clone();
    let sweeper_handle = tokio::spawn(async move { sweeper.run(sweeper_shutdown).await });

    let result = run_server(state).await;

    shutdown.cancel();
    let _ = sweeper_handle.await;

    result
}
