//! Background sweep for abandoned pending authorizations.
//!
//! Connect flows that never see their callback leave orphaned rows behind;
//! this task removes expired rows on a fixed interval. Consume already
//! filters expired rows, so the sweep is about storage hygiene, not
//! correctness.

use std::sync::Arc;

use metrics::counter;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::repositories::pending_authorization::PendingAuthorizationRepository;

pub struct PendingSweeper {
    config: Arc<AppConfig>,
    repo: PendingAuthorizationRepository,
}

impl PendingSweeper {
    pub fn new(config: Arc<AppConfig>, repo: PendingAuthorizationRepository) -> Self {
        Self { config, repo }
    }

    /// Run the sweep loop until the shutdown token fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_seconds = self.config.pending_sweep_interval_seconds,
            "starting pending-authorization sweeper"
        );
        let tick_interval = Duration::from_secs(self.config.pending_sweep_interval_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("pending-authorization sweeper shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    if let Err(err) = self.tick().await {
                        error!(error = ?err, "pending-authorization sweep failed");
                    }
                }
            }
        }
    }

    /// Execute one sweep, returning how many rows were removed.
    pub async fn tick(&self) -> Result<u64, sea_orm::DbErr> {
        let removed = self.repo.cleanup_expired().await?;
        if removed > 0 {
            counter!("pending_authorizations_swept_total").increment(removed);
            debug!(removed, "swept expired pending authorizations");
        }
        Ok(removed)
    }
}
