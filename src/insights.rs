//! insights.rs — Raw metrics for one ad over a reporting window.
//!
//! A `MetricsSnapshot` is an immutable value fetched from the ad platform
//! and replaced wholesale on each sync, never merged field-by-field. Fields
//! the platform omits deserialize as zero, so downstream scoring can treat
//! the record as well-typed sparse input.

use serde::{Deserialize, Serialize};

/// Counts and spend for one ad, as reported by the platform.
///
/// Action counts are decimals because the Graph API reports some conversion
/// types fractionally (attributed partial conversions).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsSnapshot {
    pub impressions: u64,
    pub reach: u64,
    pub clicks: u64,
    pub unique_clicks: u64,
    /// Amount spent in the account currency.
    pub spend: f64,
    /// Objective-dependent primary result count (the platform's "results").
    pub results: f64,
    pub leads: f64,
    pub purchases: f64,
    pub messages_started: f64,
    pub link_clicks: f64,
    pub page_engagement: f64,
    pub video_views: f64,
    pub video_thruplays: f64,
}

impl MetricsSnapshot {
    /// Click-through rate as a percentage; `None` with zero impressions.
    pub fn ctr(&self) -> Option<f64> {
        if self.impressions == 0 {
            return None;
        }
        Some(self.clicks as f64 / self.impressions as f64 * 100.0)
    }

    /// First positive result-type count in spend-efficiency priority order:
    /// results, then leads, then messages started.
    pub fn result_count(&self) -> f64 {
        [self.results, self.leads, self.messages_started]
            .into_iter()
            .find(|v| *v > 0.0)
            .unwrap_or(0.0)
    }

    /// Spend divided by the result count; `None` when there are no results.
    pub fn cost_per_result(&self) -> Option<f64> {
        let count = self.result_count();
        if count > 0.0 {
            Some(self.spend / count)
        } else {
            None
        }
    }

    /// Page engagements per impression, as a percentage.
    pub fn engagement_rate(&self) -> Option<f64> {
        if self.impressions == 0 {
            return None;
        }
        Some(self.page_engagement / self.impressions as f64 * 100.0)
    }

    /// Share of video views that played through, 0..1.
    pub fn video_retention(&self) -> Option<f64> {
        if self.video_views <= 0.0 {
            return None;
        }
        Some(self.video_thruplays / self.video_views)
    }
}
