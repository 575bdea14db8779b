//! Idle Cleanup Task
//!
//! Expired entries are already invisible to reads; this task reclaims their
//! memory for keys nobody asks about again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedStore;

/// Spawns a task that sweeps `store` every `cleanup_interval_secs` seconds.
///
/// The returned handle is aborted on shutdown.
pub fn spawn_cleanup_task(store: SharedStore, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting idle cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut store = store.write().await;
                store.cleanup_expired()
            };

            if removed > 0 {
                info!(removed, "Idle cleanup: removed expired entries");
            } else {
                debug!("Idle cleanup: no expired entries found");
            }
        }
    })
}
