//! prediction.rs — Prediction collaborator.
//!
//! The reconciler treats prediction as an opaque external step: generate a
//! base prediction for a new creative, then reconcile it against observed
//! metrics after each sync. The default adjuster below keeps the stored
//! prediction honest by blending it toward the observed score as delivery
//! volume accrues; swap the trait impl to plug in anything smarter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ads::TrackedAd;
use crate::insights::MetricsSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// 0–100, same scale as the success score.
    pub predicted_score: u8,
    /// Opaque explanation payload, passed through to storage untouched.
    pub prediction_details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<String>,
    pub generated_at: DateTime<Utc>,
}

pub trait PredictionAdjuster: Send + Sync {
    /// Base prediction for a creative with no delivery yet.
    fn generate(&self, ad: &TrackedAd) -> Prediction;

    /// Reconcile an earlier prediction against newly observed metrics.
    /// `actual` is the freshly computed success score, when one exists.
    fn adjust(
        &self,
        base: &Prediction,
        metrics: &MetricsSnapshot,
        actual: Option<u8>,
    ) -> Prediction;
}

/// Impression-weighted blend: with little delivery the prediction stands;
/// past ~10k impressions the observed score dominates.
pub struct BlendAdjuster {
    saturation_impressions: f64,
}

impl Default for BlendAdjuster {
    fn default() -> Self {
        Self {
            saturation_impressions: 10_000.0,
        }
    }
}

impl BlendAdjuster {
    fn observation_weight(&self, impressions: u64) -> f64 {
        (impressions as f64 / self.saturation_impressions).min(1.0)
    }
}

impl PredictionAdjuster for BlendAdjuster {
    fn generate(&self, ad: &TrackedAd) -> Prediction {
        // No signal yet: start from the middle of the scale.
        Prediction {
            predicted_score: 50,
            prediction_details: json!({"method": "baseline", "adName": ad.name}),
            risk_assessment: None,
            generated_at: Utc::now(),
        }
    }

    fn adjust(
        &self,
        base: &Prediction,
        metrics: &MetricsSnapshot,
        actual: Option<u8>,
    ) -> Prediction {
        let Some(actual) = actual else {
            // Nothing observed to reconcile against; prediction stands.
            return base.clone();
        };

        let w = self.observation_weight(metrics.impressions);
        let blended =
            (f64::from(base.predicted_score) * (1.0 - w) + f64::from(actual) * w).round() as u8;

        let gap = i16::from(actual) - i16::from(base.predicted_score);
        let risk = if gap <= -20 {
            Some("underperforming prediction".to_string())
        } else if gap >= 20 {
            Some("outperforming prediction".to_string())
        } else {
            base.risk_assessment.clone()
        };

        Prediction {
            predicted_score: blended,
            prediction_details: json!({
                "method": "impression-weighted blend",
                "previous": base.predicted_score,
                "observed": actual,
                "observationWeight": w,
            }),
            risk_assessment: risk,
            generated_at: Utc::now(),
        }
    }
}
