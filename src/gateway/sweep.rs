use super::Gateway;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use warden_moderation::Reconciler;

impl Gateway {
    /// Background task: run an expiry sweep every `interval_secs`.
    ///
    /// The first sweep runs immediately. A sweep that outlasts the interval
    /// delays the next tick instead of bunching ticks up.
    pub(super) async fn sweep_loop(reconciler: Arc<Reconciler>, interval_secs: u64) {
        info!("expiry sweep every {interval_secs}s");
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let report = reconciler.run_expiry_sweep(Utc::now()).await;
            if report.skipped {
                debug!("sweep: previous sweep still running");
                continue;
            }
            let pending = reconciler.pending_restores();
            if !pending.is_empty() {
                debug!("sweep: still waiting to reopen {}", pending.join(", "));
            }
        }
    }
}
