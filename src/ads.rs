//! ads.rs — Persisted record for one creative under observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::insights::MetricsSnapshot;

/// Lifecycle tag mirroring the platform's ad state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    Active,
    Paused,
    Archived,
    Deleted,
    #[default]
    Unknown,
}

impl AdStatus {
    /// Map the platform's `effective_status` string; anything unrecognized
    /// (IN_PROCESS, WITH_ISSUES, ...) collapses to `Unknown`.
    pub fn from_platform(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => AdStatus::Active,
            "PAUSED" | "CAMPAIGN_PAUSED" | "ADSET_PAUSED" => AdStatus::Paused,
            "ARCHIVED" => AdStatus::Archived,
            "DELETED" => AdStatus::Deleted,
            _ => AdStatus::Unknown,
        }
    }
}

/// One tracked creative. Mutated only by the sync reconciler (metrics,
/// score, status, timestamps) or by explicit user edits elsewhere; deleted
/// by removal from the collection, with no tombstones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedAd {
    /// Stable local identifier, generated once at import.
    pub id: Uuid,
    pub name: String,
    /// Links this record to a live platform ad; absent until associated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Last-known metrics, replaced wholesale on sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<MetricsSnapshot>,
    /// 0–100; `None` until the ad has been scored at least once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_reasoning: Option<Vec<String>>,
    /// Written only by the prediction step; the scoring engine never
    /// overwrites it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_score: Option<u8>,
    /// Opaque payloads produced by the prediction collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: AdStatus,
    pub created_at: DateTime<Utc>,
}

impl TrackedAd {
    /// New untracked creative: no metrics, no score, not yet linked.
    pub fn new(name: impl Into<String>, external_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            external_id,
            insights: None,
            success_score: None,
            score_reasoning: None,
            predicted_score: None,
            prediction_details: None,
            risk_assessment: None,
            prediction_generated_at: None,
            last_synced_at: None,
            status: AdStatus::Unknown,
            created_at: Utc::now(),
        }
    }
}
