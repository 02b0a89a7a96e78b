//! Persisted sync configuration and run cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{KvStore, KvStoreExt, KEY_SYNC_CACHE, KEY_SYNC_SETTINGS};

/// User-editable sync behavior, persisted under a fixed key. Missing or
/// malformed stored values fall back to defaults rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    pub auto_sync_enabled: bool,
    pub sync_interval_minutes: u64,
    /// Minimum gap between runs; rate-limits redundant triggers.
    pub min_sync_interval_minutes: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_sync_enabled: true,
            sync_interval_minutes: 15,
            min_sync_interval_minutes: 5,
        }
    }
}

impl SyncSettings {
    pub fn load(store: &dyn KvStore) -> Self {
        store
            .get_json(KEY_SYNC_SETTINGS)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.set_json(KEY_SYNC_SETTINGS, self)
    }
}

/// Durable record of the most recent successful run. Read at the start of
/// every attempt for the rate-limit guard, overwritten at the end of every
/// successful run, never torn down.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncCache {
    pub last_synced_at: Option<DateTime<Utc>>,
    pub ads_updated: usize,
}

impl SyncCache {
    pub fn load(store: &dyn KvStore) -> Self {
        store
            .get_json(KEY_SYNC_CACHE)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.set_json(KEY_SYNC_CACHE, self)
    }
}
