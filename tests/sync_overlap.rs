// tests/sync_overlap.rs
//
// Only one sync run at a time: a trigger arriving while a fetch is in
// flight returns immediately without a second fetch, and an aborted run
// releases the lock for the next attempt.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use athena_ad_analyzer::platform::{AdPlatform, PlatformAd, PlatformCredentials};
use athena_ad_analyzer::prediction::BlendAdjuster;
use athena_ad_analyzer::storage::MemoryStore;
use athena_ad_analyzer::sync::{SyncOutcome, SyncReconciler, SyncTrigger};

fn creds() -> PlatformCredentials {
    PlatformCredentials {
        account_id: "123".into(),
        access_token: "token".into(),
    }
}

struct SlowPlatform {
    calls: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl AdPlatform for SlowPlatform {
    async fn list_ads(&self, _creds: &PlatformCredentials) -> Result<Vec<PlatformAd>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn concurrent_trigger_returns_busy_without_fetch() {
    let platform = Arc::new(SlowPlatform {
        calls: AtomicUsize::new(0),
        delay: Duration::from_millis(300),
    });
    let rec = Arc::new(SyncReconciler::new(
        Arc::new(MemoryStore::new()),
        platform.clone(),
        Arc::new(BlendAdjuster::default()),
        Some(creds()),
    ));

    let first = {
        let rec = rec.clone();
        tokio::spawn(async move { rec.run(SyncTrigger::Scheduled).await })
    };

    // Let the first run reach its fetch before racing it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = rec.run(SyncTrigger::Manual).await.unwrap();
    assert_eq!(second, SyncOutcome::SkippedBusy);

    let first = first.await.unwrap().unwrap();
    assert!(matches!(first, SyncOutcome::Completed(_)));
    assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
}

/// Fails on the first call, succeeds afterwards.
struct FlakyPlatform {
    calls: AtomicUsize,
}

#[async_trait]
impl AdPlatform for FlakyPlatform {
    async fn list_ads(&self, _creds: &PlatformCredentials) -> Result<Vec<PlatformAd>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            bail!("transient platform outage");
        }
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn failed_run_releases_lock_and_next_attempt_succeeds() {
    let platform = Arc::new(FlakyPlatform {
        calls: AtomicUsize::new(0),
    });
    let rec = SyncReconciler::new(
        Arc::new(MemoryStore::new()),
        platform.clone(),
        Arc::new(BlendAdjuster::default()),
        Some(creds()),
    );

    let first = rec.run(SyncTrigger::Scheduled).await;
    assert!(first.is_err());
    // Nothing persisted, so the rate-limit guard does not block the retry.
    assert!(rec.cache().last_synced_at.is_none());

    let second = rec.run(SyncTrigger::Scheduled).await.unwrap();
    assert!(matches!(second, SyncOutcome::Completed(_)));
    assert_eq!(platform.calls.load(Ordering::SeqCst), 2);
}
