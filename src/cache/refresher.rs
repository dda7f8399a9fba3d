//! Background refresh of the recent-blocks snapshot.
//!
//! # Responsibilities
//! - Poll the daemon for recent headers at a fixed interval
//! - Publish each result as a new snapshot
//! - Keep the previous snapshot when a cycle fails

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::cache::snapshot::RecentBlocks;
use crate::config::{CacheConfig, RetryConfig};
use crate::daemon::{DaemonClient, DaemonResult};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::resilience::retry_with_backoff;

/// Periodically refreshes a [`RecentBlocks`] from the daemon.
pub struct CacheRefresher {
    client: DaemonClient,
    blocks: Arc<RecentBlocks>,
    interval: Duration,
    retries: RetryConfig,
}

impl CacheRefresher {
    pub fn new(
        client: DaemonClient,
        blocks: Arc<RecentBlocks>,
        config: &CacheConfig,
        retries: RetryConfig,
    ) -> Self {
        Self {
            client,
            blocks,
            interval: Duration::from_secs(config.refresh_interval_secs),
            retries,
        }
    }

    /// Run one refresh cycle. Returns the number of headers published.
    ///
    /// On failure the current snapshot is left untouched.
    pub async fn refresh_once(&self) -> DaemonResult<usize> {
        let headers = retry_with_backoff(&self.retries, "get_recent_blocks", || {
            self.client.get_recent_blocks()
        })
        .await?;

        let snapshot = self.blocks.publish(headers);
        metrics::record_cache_refresh(true, snapshot.highest());
        Ok(snapshot.len())
    }

    /// Refresh until shutdown. Cycles never overlap; a failed cycle waits for
    /// the next interval like a successful one.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Recent-block refresher starting"
        );

        loop {
            match self.refresh_once().await {
                Ok(count) => {
                    tracing::debug!(count, highest = ?self.blocks.load().highest(), "Recent blocks refreshed");
                }
                Err(e) => {
                    metrics::record_cache_refresh(false, None);
                    tracing::error!(
                        error = %e,
                        cached = self.blocks.load().len(),
                        "Recent-block refresh failed, keeping previous snapshot"
                    );
                }
            }

            tokio::select! {
                _ = time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Recent-block refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
