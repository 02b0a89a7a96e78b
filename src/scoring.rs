//! # Scoring Engine
//! Pure, testable logic that maps a `MetricsSnapshot` → success score.
//! No I/O, suitable for unit tests and offline evaluation.
//!
//! Policy: four independent factors (CTR, results, spend efficiency,
//! engagement) each add points to a running total; a score is only emitted
//! if at least one factor fired. An ad with zero impressions has no score,
//! not a zero score.

use crate::insights::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Maximum points per factor.
const CTR_MAX: f64 = 35.0;
const RESULTS_MAX: f64 = 35.0;
const ENGAGEMENT_MAX: f64 = 10.0;

/// Spend-without-results penalty. Observed heuristic, not a law: spend above
/// the threshold with zero results subtracts a flat amount, clamped at 0.
const NO_RESULT_SPEND_THRESHOLD: f64 = 100.0;
const NO_RESULT_PENALTY: f64 = 10.0;

/// Cost-per-result bands, best band first: (upper bound, points awarded).
const COST_BANDS: [(f64, f64); 4] = [(50.0, 20.0), (100.0, 15.0), (200.0, 10.0), (500.0, 5.0)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 0–100, `None` when no factor contributed.
    pub score: Option<u8>,
    /// Tier label first, then per-factor reasoning lines in factor order.
    pub reasoning: Vec<String>,
}

/// Score a metrics snapshot. Never panics; absent fields are zeros that
/// simply fail to contribute.
pub fn score(m: &MetricsSnapshot) -> ScoreResult {
    let mut total = 0.0f64;
    let mut any_factor = false;
    let mut reasoning = Vec::new();

    // 1) Click-through rate (0–35)
    if let Some(ctr) = m.ctr() {
        if ctr > 0.0 {
            total += (ctr * 10.0).min(CTR_MAX);
            any_factor = true;
            if ctr >= 3.0 {
                reasoning.push(format!("Excellent CTR ({ctr:.2}%)"));
            } else if ctr >= 1.5 {
                reasoning.push(format!("Good CTR ({ctr:.2}%)"));
            }
        }
    }

    // 2) Results (0–35): first positive branch wins, never summed
    if m.results > 0.0 && m.impressions > 0 {
        total += (m.results / m.impressions as f64 * 1000.0).min(RESULTS_MAX);
        any_factor = true;
        reasoning.push(format!("{} results", trim_count(m.results)));
    } else if m.messages_started > 0.0 {
        total += (m.messages_started * 4.0).min(RESULTS_MAX);
        any_factor = true;
        reasoning.push(format!(
            "{} conversations started",
            trim_count(m.messages_started)
        ));
    } else if m.leads > 0.0 {
        total += (m.leads * 5.0).min(RESULTS_MAX);
        any_factor = true;
        reasoning.push(format!("{} leads", trim_count(m.leads)));
    }

    // 3) Spend efficiency (0–20), or a penalty for spend with nothing to show
    if m.spend > 0.0 {
        if let Some(cost) = m.cost_per_result() {
            any_factor = true;
            if let Some(&(_, points)) = COST_BANDS.iter().find(|(bound, _)| cost < *bound) {
                total += points;
                reasoning.push(format!("\u{20B1}{cost:.2}/result"));
            }
        } else if m.spend > NO_RESULT_SPEND_THRESHOLD {
            total = (total - NO_RESULT_PENALTY).max(0.0);
            any_factor = true;
            reasoning.push(format!("\u{20B1}{:.2} spent, no results yet", m.spend));
        }
    }

    // 4) Engagement (0–10): 2 points per percentage point of engagement rate
    if let Some(rate) = m.engagement_rate() {
        if rate > 0.0 {
            total += (rate * 2.0).min(ENGAGEMENT_MAX);
            any_factor = true;
        }
    }

    if !any_factor {
        return ScoreResult {
            score: None,
            reasoning,
        };
    }

    let score = total.min(100.0).round() as u8;
    reasoning.insert(0, tier_label(score).to_string());
    ScoreResult {
        score: Some(score),
        reasoning,
    }
}

/// Qualitative tier prepended to the reasoning list.
pub fn tier_label(score: u8) -> &'static str {
    match score {
        80..=u8::MAX => "Top Performer",
        60..=79 => "Above Average",
        40..=59 => "Average",
        _ => "Below Average",
    }
}

/// Render action counts without a trailing ".0" for whole numbers.
fn trim_count(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as u64)
    } else {
        format!("{v:.1}")
    }
}
