//! # Sync Reconciler
//! Guarded, rate-limited refresh of the tracked ad collection: one batched
//! platform fetch, per-ad rescoring, prediction reconciliation, and a batch
//! write-back. All triggers (interval timer, warm start, manual HTTP)
//! funnel into [`SyncReconciler::run`]; overlap is excluded by an atomic
//! compare-and-swap lock released on every exit path.

pub mod scheduler;
pub mod settings;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::ads::TrackedAd;
use crate::platform::{AdPlatform, PlatformAd, PlatformCredentials};
use crate::prediction::{Prediction, PredictionAdjuster};
use crate::scoring;
use crate::storage::{KvStore, KvStoreExt, KEY_ADS};
use crate::sync::settings::{SyncCache, SyncSettings};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_runs_total", "Completed sync runs.");
        describe_counter!(
            "sync_skipped_total",
            "Sync attempts skipped by guard checks (disabled/recent/busy/unconfigured)."
        );
        describe_counter!("sync_errors_total", "Sync runs aborted by an error.");
        describe_counter!("sync_ads_updated_total", "Ads refreshed across all runs.");
        describe_gauge!("sync_last_run_ts", "Unix ts of the last completed sync.");
        describe_histogram!("sync_fetch_ms", "Platform list-ads fetch time in milliseconds.");
    });
}

/// Which entry point started the run; carried in the completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Scheduled,
    Startup,
    Manual,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncTrigger::Scheduled => "scheduled",
            SyncTrigger::Startup => "startup",
            SyncTrigger::Manual => "manual",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub updated: usize,
    pub predictions_updated: usize,
    pub trigger: SyncTrigger,
}

/// Fire-and-forget completion broadcast; consumers refresh their view, no
/// acknowledgement expected.
pub type SyncCompleted = SyncSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncSummary),
    /// Auto-sync disabled in settings.
    SkippedDisabled,
    /// Last run was less than the minimum gap ago.
    SkippedRecent,
    /// Another run currently holds the lock.
    SkippedBusy,
    /// Account id or access token missing; expected steady state before
    /// setup, not an error.
    NotConfigured,
}

/// RAII run lock: checked-and-set atomically, released on drop so errors
/// cannot leave the flag held.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SyncReconciler {
    store: Arc<dyn KvStore>,
    platform: Arc<dyn AdPlatform>,
    adjuster: Arc<dyn PredictionAdjuster>,
    credentials: Option<PlatformCredentials>,
    running: AtomicBool,
    events: broadcast::Sender<SyncCompleted>,
}

impl SyncReconciler {
    pub fn new(
        store: Arc<dyn KvStore>,
        platform: Arc<dyn AdPlatform>,
        adjuster: Arc<dyn PredictionAdjuster>,
        credentials: Option<PlatformCredentials>,
    ) -> Self {
        ensure_metrics_described();
        let (events, _) = broadcast::channel(16);
        Self {
            store,
            platform,
            adjuster,
            credentials,
            running: AtomicBool::new(false),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncCompleted> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> SyncSettings {
        SyncSettings::load(self.store.as_ref())
    }

    pub fn cache(&self) -> SyncCache {
        SyncCache::load(self.store.as_ref())
    }

    /// Cheap rate-limit pre-filter, usable before even attempting the lock.
    pub fn should_skip(&self) -> bool {
        let settings = self.settings();
        self.within_min_gap(&settings)
    }

    fn within_min_gap(&self, settings: &SyncSettings) -> bool {
        let cache = self.cache();
        match cache.last_synced_at {
            Some(last) => {
                Utc::now() - last < Duration::minutes(settings.min_sync_interval_minutes as i64)
            }
            None => false,
        }
    }

    /// One guarded sync attempt. Guard-check → lock → fetch → reconcile →
    /// predict → persist → notify. Skips are outcomes, not errors; a fetch
    /// or persistence failure propagates after the lock is released.
    pub async fn run(&self, trigger: SyncTrigger) -> Result<SyncOutcome> {
        let settings = self.settings();
        if !settings.auto_sync_enabled {
            counter!("sync_skipped_total").increment(1);
            tracing::debug!(%trigger, "sync disabled in settings");
            return Ok(SyncOutcome::SkippedDisabled);
        }
        if self.within_min_gap(&settings) {
            counter!("sync_skipped_total").increment(1);
            tracing::debug!(
                %trigger,
                min_gap_minutes = settings.min_sync_interval_minutes,
                "sync skipped, last run too recent"
            );
            return Ok(SyncOutcome::SkippedRecent);
        }

        let Some(_guard) = RunGuard::acquire(&self.running) else {
            counter!("sync_skipped_total").increment(1);
            tracing::debug!(%trigger, "sync already in flight");
            return Ok(SyncOutcome::SkippedBusy);
        };

        let Some(creds) = self.credentials.clone() else {
            counter!("sync_skipped_total").increment(1);
            tracing::debug!(%trigger, "platform credentials not configured");
            return Ok(SyncOutcome::NotConfigured);
        };

        // Lock is held from here; the RAII guard releases it on any exit.
        match self.execute(&creds, trigger).await {
            Ok(summary) => {
                counter!("sync_runs_total").increment(1);
                counter!("sync_ads_updated_total").increment(summary.updated as u64);
                gauge!("sync_last_run_ts").set(Utc::now().timestamp() as f64);
                tracing::info!(
                    %trigger,
                    updated = summary.updated,
                    predictions = summary.predictions_updated,
                    "sync completed"
                );
                let _ = self.events.send(summary.clone());
                Ok(SyncOutcome::Completed(summary))
            }
            Err(e) => {
                counter!("sync_errors_total").increment(1);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        creds: &PlatformCredentials,
        trigger: SyncTrigger,
    ) -> Result<SyncSummary> {
        let t0 = Instant::now();
        let platform_ads = self
            .platform
            .list_ads(creds)
            .await
            .context("listing ads from platform")?;
        histogram!("sync_fetch_ms").record(t0.elapsed().as_secs_f64() * 1000.0);

        let by_external_id: HashMap<&str, &PlatformAd> = platform_ads
            .iter()
            .map(|ad| (ad.id.as_str(), ad))
            .collect();

        let mut ads: Vec<TrackedAd> = self
            .store
            .get_json(KEY_ADS)
            .context("loading tracked ads")?
            .unwrap_or_default();

        let now = Utc::now();
        let mut updated = 0usize;
        let mut predictions_updated = 0usize;

        for ad in ads.iter_mut() {
            // Ads without a platform link, or absent from this fetch, stay
            // untouched: not zeroed, not deleted.
            let Some(external_id) = ad.external_id.as_deref() else {
                continue;
            };
            let Some(remote) = by_external_id.get(external_id) else {
                continue;
            };
            let Some(metrics) = remote.insights.clone() else {
                continue;
            };

            let scored = scoring::score(&metrics);
            ad.insights = Some(metrics.clone());
            updated += 1;

            if let Some(score) = scored.score {
                ad.success_score = Some(score);
                ad.score_reasoning = Some(scored.reasoning);
                ad.status = remote.status;
                ad.last_synced_at = Some(now);

                // Reconcile an earlier prediction against the observed
                // score; the scoring engine itself never touches it.
                if let Some(predicted) = ad.predicted_score {
                    let base = Prediction {
                        predicted_score: predicted,
                        prediction_details: ad
                            .prediction_details
                            .clone()
                            .unwrap_or(serde_json::Value::Null),
                        risk_assessment: ad.risk_assessment.clone(),
                        generated_at: ad.prediction_generated_at.unwrap_or(ad.created_at),
                    };
                    let adjusted = self.adjuster.adjust(&base, &metrics, Some(score));
                    ad.predicted_score = Some(adjusted.predicted_score);
                    ad.prediction_details = Some(adjusted.prediction_details);
                    ad.risk_assessment = adjusted.risk_assessment;
                    ad.prediction_generated_at = Some(adjusted.generated_at);
                    predictions_updated += 1;
                }
            }
        }

        // Single batch write-back, then the cache; a crash between the two
        // leaves the cache stale, which the next run tolerates.
        self.store
            .set_json(KEY_ADS, &ads)
            .context("persisting tracked ads")?;
        SyncCache {
            last_synced_at: Some(now),
            ads_updated: updated,
        }
        .save(self.store.as_ref())
        .context("persisting sync cache")?;

        Ok(SyncSummary {
            updated,
            predictions_updated,
            trigger,
        })
    }
}
