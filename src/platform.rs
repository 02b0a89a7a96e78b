//! platform.rs — Ad platform collaborator (Facebook Marketing Graph API).
//!
//! One batched list-ads-with-insights call per sync run; the wire shape is
//! validated and folded into `MetricsSnapshot` here so nothing downstream
//! touches raw Graph JSON. The Graph API reports numbers as strings and can
//! return an `{error: {...}}` payload on HTTP 200, so both are handled at
//! this boundary.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ads::AdStatus;
use crate::insights::MetricsSnapshot;

#[derive(Debug, Clone)]
pub struct PlatformCredentials {
    pub account_id: String,
    pub access_token: String,
}

/// One ad as returned by the platform list endpoint.
#[derive(Debug, Clone)]
pub struct PlatformAd {
    pub id: String,
    pub name: Option<String>,
    pub status: AdStatus,
    /// Absent when the ad has no delivery in the reporting window.
    pub insights: Option<MetricsSnapshot>,
}

#[async_trait]
pub trait AdPlatform: Send + Sync {
    async fn list_ads(&self, creds: &PlatformCredentials) -> Result<Vec<PlatformAd>>;
}

const DEFAULT_GRAPH_BASE: &str = "https://graph.facebook.com";
const DEFAULT_GRAPH_VERSION: &str = "v19.0";

const LIST_FIELDS: &str = "name,effective_status,insights{impressions,reach,clicks,unique_clicks,spend,results,actions}";

pub struct GraphApiClient {
    http: reqwest::Client,
    base_url: String,
    version: String,
}

impl GraphApiClient {
    pub fn new(http: reqwest::Client, version: Option<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_GRAPH_BASE.to_string(),
            version: version.unwrap_or_else(|| DEFAULT_GRAPH_VERSION.to_string()),
        }
    }

    /// Point the client at a different host (local stub server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AdPlatform for GraphApiClient {
    async fn list_ads(&self, creds: &PlatformCredentials) -> Result<Vec<PlatformAd>> {
        let url = format!(
            "{}/{}/act_{}/ads",
            self.base_url, self.version, creds.account_id
        );
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("fields", LIST_FIELDS),
                ("limit", "200"),
                ("access_token", creds.access_token.as_str()),
            ])
            .send()
            .await
            .context("fetching ad list from Graph API")?;

        let status = resp.status();
        let body = resp.text().await.context("reading Graph API response body")?;
        parse_list_response(&body)
            .with_context(|| format!("Graph API list response (http status {status})"))
    }
}

/// Parse a list-ads response body, surfacing platform-level error payloads
/// as errors even when the transport succeeded.
pub fn parse_list_response(body: &str) -> Result<Vec<PlatformAd>> {
    let parsed: GraphListResponse =
        serde_json::from_str(body).context("parsing Graph API JSON")?;

    if let Some(err) = parsed.error {
        bail!(
            "platform error {}: {}",
            err.code.unwrap_or_default(),
            err.message
        );
    }
    let Some(data) = parsed.data else {
        bail!("platform response had neither data nor error");
    };

    Ok(data
        .into_iter()
        .map(|ad| PlatformAd {
            status: ad
                .effective_status
                .as_deref()
                .map(AdStatus::from_platform)
                .unwrap_or_default(),
            insights: ad
                .insights
                .and_then(|env| env.data.into_iter().next())
                .map(fold_insights),
            id: ad.id,
            name: ad.name,
        })
        .collect())
}

// --- Graph API wire shapes (numbers arrive as strings) ---

#[derive(Debug, Deserialize)]
struct GraphListResponse {
    data: Option<Vec<GraphAd>>,
    error: Option<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
    code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GraphAd {
    id: String,
    name: Option<String>,
    effective_status: Option<String>,
    insights: Option<GraphInsightsEnvelope>,
}

#[derive(Debug, Deserialize)]
struct GraphInsightsEnvelope {
    #[serde(default)]
    data: Vec<GraphInsights>,
}

#[derive(Debug, Deserialize, Default)]
struct GraphInsights {
    impressions: Option<String>,
    reach: Option<String>,
    clicks: Option<String>,
    unique_clicks: Option<String>,
    spend: Option<String>,
    results: Option<String>,
    #[serde(default)]
    actions: Option<Vec<GraphAction>>,
}

#[derive(Debug, Deserialize)]
struct GraphAction {
    action_type: String,
    value: String,
}

fn parse_u64(v: &Option<String>) -> u64 {
    v.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn parse_f64(v: &Option<String>) -> f64 {
    v.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0.0)
}

/// Fold one insights row into the typed snapshot. Unrecognized action types
/// are dropped; malformed values count as zero.
fn fold_insights(raw: GraphInsights) -> MetricsSnapshot {
    let mut m = MetricsSnapshot {
        impressions: parse_u64(&raw.impressions),
        reach: parse_u64(&raw.reach),
        clicks: parse_u64(&raw.clicks),
        unique_clicks: parse_u64(&raw.unique_clicks),
        spend: parse_f64(&raw.spend),
        results: parse_f64(&raw.results),
        ..Default::default()
    };

    for action in raw.actions.unwrap_or_default() {
        let value: f64 = action.value.parse().unwrap_or(0.0);
        match action.action_type.as_str() {
            "lead" => m.leads += value,
            "purchase" | "omni_purchase" => m.purchases += value,
            "onsite_conversion.messaging_conversation_started_7d" => {
                m.messages_started += value
            }
            "link_click" => m.link_clicks += value,
            "page_engagement" => m.page_engagement += value,
            "video_view" => m.video_views += value,
            "video_thruplay_watched_actions" => m.video_thruplays += value,
            _ => {}
        }
    }
    m
}
