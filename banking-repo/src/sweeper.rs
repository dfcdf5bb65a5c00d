use std::sync::Arc;
use std::time::Duration;

use banking_types::{IntentRepository, RepoError};
use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

/// Periodically deletes intents whose deadline passed more than `retention` ago.
///
/// Committed intents stay replayable for the whole retention window.
pub struct IntentSweeper<R: IntentRepository> {
    repo: Arc<R>,
    interval: Duration,
    retention: chrono::Duration,
}

impl<R: IntentRepository> IntentSweeper<R> {
    pub fn new(repo: Arc<R>, interval: Duration, retention: chrono::Duration) -> Self {
        Self {
            repo,
            interval,
            retention,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(self) {
        info!(
            "Starting intent sweeper (every {:?}, retention {}s)",
            self.interval,
            self.retention.num_seconds()
        );
        loop {
            if let Err(e) = self.sweep_once().await {
                error!("Failed to purge expired intents: {}", e);
            }
            sleep(self.interval).await;
        }
    }

    pub async fn sweep_once(&self) -> Result<u64, RepoError> {
        let cutoff = Utc::now() - self.retention;
        let purged = self.repo.purge_expired(cutoff).await?;
        if purged > 0 {
            info!("Purged {} expired intents", purged);
        } else {
            debug!("No expired intents to purge");
        }
        Ok(purged)
    }
}
