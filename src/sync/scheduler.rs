//! Background sync triggers: a one-shot warm sync shortly after startup and
//! a periodic timer that re-reads the configured interval every cycle, so
//! settings edits take effect without a restart. Both funnel into the same
//! guarded [`SyncReconciler::run`]; the third trigger is the manual HTTP
//! endpoint in `api.rs`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::sync::{SyncOutcome, SyncReconciler, SyncTrigger};

/// Spawn the warm-start sync and the periodic ticker as one background task.
pub fn spawn(reconciler: Arc<SyncReconciler>, warm_delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(warm_delay).await;
        log_outcome(SyncTrigger::Startup, reconciler.run(SyncTrigger::Startup).await);

        let mut minutes = reconciler.settings().sync_interval_minutes.max(1);
        let mut ticker = new_ticker(minutes);
        loop {
            ticker.tick().await;
            log_outcome(
                SyncTrigger::Scheduled,
                reconciler.run(SyncTrigger::Scheduled).await,
            );

            // Re-arm when the configured interval changed, so settings
            // edits take effect without a restart.
            let configured = reconciler.settings().sync_interval_minutes.max(1);
            if configured != minutes {
                minutes = configured;
                ticker = new_ticker(minutes);
            }
        }
    })
}

fn new_ticker(minutes: u64) -> Interval {
    let mut ticker = interval(Duration::from_secs(minutes * 60));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval's first tick completes immediately; push it out so the
    // first scheduled run lands one full period after arming.
    ticker.reset();
    ticker
}

/// Failures degrade to "stale data persists, next cycle may retry"; nothing
/// here surfaces to a user.
fn log_outcome(trigger: SyncTrigger, result: anyhow::Result<SyncOutcome>) {
    match result {
        Ok(SyncOutcome::Completed(summary)) => {
            tracing::debug!(%trigger, updated = summary.updated, "sync tick completed");
        }
        Ok(outcome) => {
            tracing::debug!(%trigger, ?outcome, "sync tick skipped");
        }
        Err(e) => {
            tracing::warn!(%trigger, error = ?e, "sync tick failed");
        }
    }
}
