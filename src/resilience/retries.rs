//! Retry logic for background daemon calls.
//!
//! # Design Decisions
//! - Only the cache refresher retries; request handlers fail fast
//! - Delays double from `base_delay_ms` up to `max_delay_ms`, plus up to 10% jitter
//! - Logical "not found" is a success and never retried

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::daemon::DaemonResult;

/// Number of attempts allowed by `config` (at least one).
pub fn max_attempts(config: &RetryConfig) -> u32 {
    if config.enabled {
        config.max_attempts.max(1)
    } else {
        1
    }
}

/// Pause after the `failed`-th failed attempt (1-based).
pub fn backoff_delay(config: &RetryConfig, failed: u32) -> Duration {
    let doublings = failed.saturating_sub(1).min(63);
    let capped = config
        .base_delay_ms
        .saturating_mul(1u64 << doublings)
        .min(config.max_delay_ms);

    let jitter = match capped / 10 {
        0 => 0,
        range => rand::thread_rng().gen_range(0..range),
    };
    Duration::from_millis(capped + jitter)
}

/// Run `op` until it succeeds or the attempt budget is spent.
///
/// Returns the last error when every attempt failed.
pub async fn retry_with_backoff<T, F, Fut>(config: &RetryConfig, label: &str, mut op: F) -> DaemonResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DaemonResult<T>>,
{
    let max_attempts = max_attempts(config);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let delay = backoff_delay(config, attempt);
                tracing::info!(
                    operation = label,
                    attempt,
                    delay = ?delay,
                    error = %e,
                    "Retrying daemon call"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
