// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /api/ads + GET /api/ads (import round trip)
// - DELETE /api/ads/{id}
// - GET/PUT /api/sync/settings
// - POST /api/sync + GET /api/sync/status

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use athena_ad_analyzer::ads::AdStatus;
use athena_ad_analyzer::api::{create_router, AppState};
use athena_ad_analyzer::insights::MetricsSnapshot;
use athena_ad_analyzer::platform::{AdPlatform, PlatformAd, PlatformCredentials};
use athena_ad_analyzer::prediction::BlendAdjuster;
use athena_ad_analyzer::storage::MemoryStore;
use athena_ad_analyzer::sync::SyncReconciler;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct FixedPlatform {
    ads: Vec<PlatformAd>,
}

#[async_trait]
impl AdPlatform for FixedPlatform {
    async fn list_ads(&self, _creds: &PlatformCredentials) -> Result<Vec<PlatformAd>> {
        Ok(self.ads.clone())
    }
}

/// Build the same Router the binary uses, backed by in-memory collaborators.
fn test_router(platform_ads: Vec<PlatformAd>) -> Router {
    let store = Arc::new(MemoryStore::new());
    let adjuster = Arc::new(BlendAdjuster::default());
    let reconciler = Arc::new(SyncReconciler::new(
        store.clone(),
        Arc::new(FixedPlatform { ads: platform_ads }),
        adjuster.clone(),
        Some(PlatformCredentials {
            account_id: "123".into(),
            access_token: "token".into(),
        }),
    ));
    create_router(AppState {
        store,
        reconciler,
        adjuster,
    })
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(Vec::new());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    assert_eq!(&bytes[..], &b"ok"[..]);
}

#[tokio::test]
async fn api_import_then_list_round_trips() {
    let app = test_router(Vec::new());

    let payload = json!({ "name": "Spring promo", "externalId": "23850001" });
    let req = Request::builder()
        .method("POST")
        .uri("/api/ads")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /api/ads");
    let resp = app.clone().oneshot(req).await.expect("oneshot import");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = read_json(resp).await;
    assert_eq!(created["name"], json!("Spring promo"));
    // Imported ads carry a base prediction but no observed score yet.
    assert!(created["predictedScore"].is_number());
    assert!(created.get("successScore").is_none());

    let req = Request::builder()
        .method("GET")
        .uri("/api/ads")
        .body(Body::empty())
        .expect("build GET /api/ads");
    let resp = app.oneshot(req).await.expect("oneshot list");
    assert_eq!(resp.status(), StatusCode::OK);
    let list = read_json(resp).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["externalId"], json!("23850001"));
}

#[tokio::test]
async fn api_delete_unknown_ad_is_404() {
    let app = test_router(Vec::new());
    let req = Request::builder()
        .method("DELETE")
        .uri("/api/ads/00000000-0000-0000-0000-000000000000")
        .body(Body::empty())
        .expect("build DELETE");
    let resp = app.oneshot(req).await.expect("oneshot delete");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_settings_put_then_get() {
    let app = test_router(Vec::new());

    let payload = json!({
        "autoSyncEnabled": false,
        "syncIntervalMinutes": 30,
        "minSyncIntervalMinutes": 10
    });
    let req = Request::builder()
        .method("PUT")
        .uri("/api/sync/settings")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build PUT settings");
    let resp = app.clone().oneshot(req).await.expect("oneshot put");
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .method("GET")
        .uri("/api/sync/settings")
        .body(Body::empty())
        .expect("build GET settings");
    let resp = app.oneshot(req).await.expect("oneshot get");
    let v = read_json(resp).await;
    assert_eq!(v["autoSyncEnabled"], json!(false));
    assert_eq!(v["syncIntervalMinutes"], json!(30));
}

#[tokio::test]
async fn api_manual_sync_updates_status() {
    // One platform ad; import a tracked ad linked to it, then sync.
    let metrics = MetricsSnapshot {
        impressions: 1000,
        clicks: 25,
        spend: 200.0,
        leads: 4.0,
        ..Default::default()
    };
    let app = test_router(vec![PlatformAd {
        id: "23850001".into(),
        name: Some("Spring promo".into()),
        status: AdStatus::Active,
        insights: Some(metrics),
    }]);

    let payload = json!({ "name": "Spring promo", "externalId": "23850001" });
    let req = Request::builder()
        .method("POST")
        .uri("/api/ads")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /api/ads");
    app.clone().oneshot(req).await.expect("oneshot import");

    let req = Request::builder()
        .method("POST")
        .uri("/api/sync")
        .body(Body::empty())
        .expect("build POST /api/sync");
    let resp = app.clone().oneshot(req).await.expect("oneshot sync");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["outcome"], json!("completed"));
    assert_eq!(v["updated"], json!(1));

    let req = Request::builder()
        .method("GET")
        .uri("/api/sync/status")
        .body(Body::empty())
        .expect("build GET status");
    let resp = app.clone().oneshot(req).await.expect("oneshot status");
    let v = read_json(resp).await;
    assert_eq!(v["adsUpdated"], json!(1));
    assert!(v["lastSyncedAt"].is_string());

    // Immediately after a run the pre-filter reports "too recent".
    let req = Request::builder()
        .method("POST")
        .uri("/api/sync")
        .body(Body::empty())
        .expect("build second POST /api/sync");
    let resp = app.oneshot(req).await.expect("oneshot second sync");
    let v = read_json(resp).await;
    assert_eq!(v["outcome"], json!("skipped_recent"));

    // The scored ad is visible through the list endpoint.
    // (list after sync exercised in sync_reconcile tests at store level)
}
