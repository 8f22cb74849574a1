//! Periodic host loop around the orchestrator.

use crate::error::SyncError;
use crate::orchestrator::SyncOrchestrator;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs a sync pass, waits `interval`, and repeats until cancelled.
///
/// Runs never overlap: the wait starts only once the previous pass has
/// returned. A failed pass is logged and notified, then the loop goes on.
pub struct Scheduler {
    orchestrator: SyncOrchestrator,
    interval: Duration,
}

impl Scheduler {
    pub fn new(orchestrator: SyncOrchestrator) -> Self {
        let interval = Duration::from_secs(orchestrator.config().interval_minutes.saturating_mul(60));
        Self {
            orchestrator,
            interval,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Loop until `cancel` fires. Returns the number of passes started.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        info!("Starting sync scheduler every {}s", self.interval.as_secs());
        let mut passes = 0u64;

        loop {
            passes += 1;
            match self.orchestrator.run_once(&cancel).await {
                Ok(summary) => {
                    info!(
                        "Sync pass {} {}: {} inserted, {} updated",
                        summary.run_id, summary.status, summary.inserted, summary.updated
                    );
                }
                Err(SyncError::Cancelled) => break,
                Err(err) => {
                    error!("Sync pass failed: {}", err);
                    self.orchestrator
                        .send_notification(&err.format_detailed())
                        .await;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        info!("Sync scheduler stopped after {} passes", passes);
        passes
    }
}
