use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::ads::TrackedAd;
use crate::prediction::PredictionAdjuster;
use crate::storage::{KvStore, KvStoreExt, KEY_ADS};
use crate::sync::settings::{SyncCache, SyncSettings};
use crate::sync::{SyncOutcome, SyncReconciler, SyncTrigger};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub reconciler: Arc<SyncReconciler>,
    pub adjuster: Arc<dyn PredictionAdjuster>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/ads", get(list_ads).post(import_ad))
        .route("/api/ads/{id}", delete(remove_ad))
        .route("/api/sync", post(trigger_sync))
        .route("/api/sync/status", get(sync_status))
        .route("/api/sync/settings", get(get_settings).put(put_settings))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!(error = ?e, "api storage failure");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
}

fn load_ads(store: &dyn KvStore) -> Result<Vec<TrackedAd>, ApiError> {
    store
        .get_json(KEY_ADS)
        .map(Option::unwrap_or_default)
        .map_err(internal)
}

async fn list_ads(State(state): State<AppState>) -> Result<Json<Vec<TrackedAd>>, ApiError> {
    load_ads(state.store.as_ref()).map(Json)
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportAdReq {
    name: String,
    #[serde(default)]
    external_id: Option<String>,
}

/// Import a creative into the tracked collection. No metrics yet; a base
/// prediction is generated so the sync loop has something to reconcile.
async fn import_ad(
    State(state): State<AppState>,
    Json(body): Json<ImportAdReq>,
) -> Result<(StatusCode, Json<TrackedAd>), ApiError> {
    let mut ad = TrackedAd::new(body.name, body.external_id);
    let prediction = state.adjuster.generate(&ad);
    ad.predicted_score = Some(prediction.predicted_score);
    ad.prediction_details = Some(prediction.prediction_details);
    ad.risk_assessment = prediction.risk_assessment;
    ad.prediction_generated_at = Some(prediction.generated_at);

    let mut ads = load_ads(state.store.as_ref())?;
    ads.push(ad.clone());
    state
        .store
        .set_json(KEY_ADS, &ads)
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(ad)))
}

/// Explicit user deletion removes the record entirely; no tombstones.
async fn remove_ad(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut ads = load_ads(state.store.as_ref())?;
    let before = ads.len();
    ads.retain(|ad| ad.id != id);
    if ads.len() == before {
        return Err((StatusCode::NOT_FOUND, format!("no tracked ad {id}")));
    }
    state
        .store
        .set_json(KEY_ADS, &ads)
        .map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerResp {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    predictions_updated: Option<usize>,
}

impl TriggerResp {
    fn skipped(outcome: &'static str) -> Self {
        Self {
            outcome,
            updated: None,
            predictions_updated: None,
        }
    }
}

/// Manual trigger. The cheap rate-limit pre-filter runs before the lock is
/// even attempted; a failed run is reported as an outcome, not an HTTP
/// error: stale data persists and the next cycle retries.
async fn trigger_sync(State(state): State<AppState>) -> Json<TriggerResp> {
    if state.reconciler.should_skip() {
        return Json(TriggerResp::skipped("skipped_recent"));
    }
    match state.reconciler.run(SyncTrigger::Manual).await {
        Ok(SyncOutcome::Completed(summary)) => Json(TriggerResp {
            outcome: "completed",
            updated: Some(summary.updated),
            predictions_updated: Some(summary.predictions_updated),
        }),
        Ok(SyncOutcome::SkippedDisabled) => Json(TriggerResp::skipped("skipped_disabled")),
        Ok(SyncOutcome::SkippedRecent) => Json(TriggerResp::skipped("skipped_recent")),
        Ok(SyncOutcome::SkippedBusy) => Json(TriggerResp::skipped("skipped_busy")),
        Ok(SyncOutcome::NotConfigured) => Json(TriggerResp::skipped("not_configured")),
        Err(e) => {
            tracing::warn!(error = ?e, "manual sync failed");
            Json(TriggerResp::skipped("failed"))
        }
    }
}

async fn sync_status(State(state): State<AppState>) -> Json<SyncCache> {
    Json(state.reconciler.cache())
}

async fn get_settings(State(state): State<AppState>) -> Json<SyncSettings> {
    Json(state.reconciler.settings())
}

async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<SyncSettings>,
) -> Result<Json<SyncSettings>, ApiError> {
    settings.save(state.store.as_ref()).map_err(internal)?;
    Ok(Json(settings))
}
