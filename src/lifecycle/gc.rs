//! Periodic cache GC.
//!
//! Long-lived routers park exiting matches in their cache. Expiry is also
//! checked after every commit, but an idle router never commits, so this
//! task sweeps on a timer until shutdown.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::navigation::Router;

pub fn spawn_gc(router: Router, every: Duration, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick fires immediately
        ticker.tick().await;
        info!(interval_secs = every.as_secs(), "cache gc started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = router.clear_expired_cache();
                    debug!(evicted, "cache gc sweep");
                }
                _ = shutdown.recv() => {
                    info!("cache gc stopped");
                    break;
                }
            }
        }
    })
}
