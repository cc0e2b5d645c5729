use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use super::store::ContextStore;

/// Periodic housekeeping: release lock entries of quiet sessions and, when a
/// `ttl` is configured, purge sessions idle for longer than it.
pub fn spawn_idle_sweeper(
    store: Arc<ContextStore>,
    ttl: Option<Duration>,
    every: Duration,
) -> JoinHandle<()> {
    info!("Starting session sweeper: ttl={:?}, interval={:?}", ttl, every);

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Some(ttl) = ttl {
                match store.purge_idle(ttl).await {
                    Ok(0) => debug!("Idle sweep: nothing to purge"),
                    Ok(count) => info!("Idle sweep purged {} sessions", count),
                    Err(e) => error!("Idle sweep failed: {}", e),
                }
            }

            let released = store.release_idle_locks();
            if released > 0 {
                debug!("Sweep released {} session locks", released);
            }
        }
    })
}
