//! Expiration Sweep Task
//!
//! Background task that periodically removes expired cache entries, so entries
//! nobody reads again don't linger until the next read.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::service::CacheService;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// Runs as a single loop, so a sweep never overlaps the previous one; a tick
/// missed because a sweep ran long is delayed rather than bunched up.
///
/// # Arguments
/// * `cache` - Handle to the cache to sweep
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task. Abort it at shutdown; the task never
/// ends on its own.
///
/// # Example
/// ```ignore
/// let cache = CacheService::new(Config::from_env());
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(900));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(cache: CacheService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting expiration sweep task with interval of {} seconds",
            interval.as_secs()
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.sweep_expired().await;

            if removed > 0 {
                info!(
                    "Cache sweep: removed {} expired entries, {} remain",
                    removed,
                    cache.len().await
                );
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}
