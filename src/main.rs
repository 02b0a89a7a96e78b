//! Athena Ad Analyzer — Binary Entrypoint
//! Boots the Axum HTTP server and the background sync schedulers, wiring
//! the store, platform client, and reconciler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use athena_ad_analyzer::api::{create_router, AppState};
use athena_ad_analyzer::config::{platform_credentials_from_env, AppConfig};
use athena_ad_analyzer::metrics::Metrics;
use athena_ad_analyzer::platform::GraphApiClient;
use athena_ad_analyzer::prediction::BlendAdjuster;
use athena_ad_analyzer::storage::JsonFileStore;
use athena_ad_analyzer::sync::{scheduler, SyncReconciler};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("athena_ad_analyzer=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env();
    let metrics = Metrics::init();

    let store = Arc::new(JsonFileStore::new(config.state_dir.clone()));
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("building http client")?;
    let platform = Arc::new(GraphApiClient::new(http, config.graph_api_version.clone()));
    let adjuster = Arc::new(BlendAdjuster::default());

    let credentials = platform_credentials_from_env();
    if credentials.is_none() {
        // Expected steady state before setup; syncs no-op until both
        // FB_AD_ACCOUNT_ID and FB_ACCESS_TOKEN are present.
        tracing::info!("platform credentials not configured, sync will idle");
    }

    let reconciler = Arc::new(SyncReconciler::new(
        store.clone(),
        platform,
        adjuster.clone(),
        credentials,
    ));

    let _scheduler = scheduler::spawn(
        reconciler.clone(),
        Duration::from_secs(config.warm_sync_delay_secs),
    );

    let state = AppState {
        store,
        reconciler,
        adjuster,
    };
    let router = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, router).await.context("serving")?;
    Ok(())
}
