//! Periodic sweep of expired model cache entries.
//!
//! Expired entries are already invisible to readers; the sweep only returns
//! their memory, mostly for detail records of models nobody asks about again.

use std::time::Duration;

use crate::cache::ModelCache;

/// Starts the cache purge worker. Runs until the task is cancelled.
pub async fn start_cache_purge_worker(cache: ModelCache, interval: Duration) {
    tracing::info!(
        purge_interval_secs = interval.as_secs(),
        "Starting cache purge worker"
    );

    loop {
        tokio::time::sleep(interval).await;

        let removed = cache.purge_expired();
        if removed > 0 {
            tracing::debug!(removed, "Purged expired cache entries");
        }
    }
}
