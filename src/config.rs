//! config.rs — Deployment configuration from the environment.
//!
//! User-editable sync behavior lives in the key-value store (see
//! `sync::settings`); everything tied to the process (bind address, state
//! directory, Graph credentials) comes from env vars, loaded via `.env`
//! in local runs.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::platform::PlatformCredentials;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub state_dir: PathBuf,
    /// Graph API version segment, e.g. "v19.0".
    pub graph_api_version: Option<String>,
    pub http_timeout_secs: u64,
    pub warm_sync_delay_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("ATHENA_BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| ([0, 0, 0, 0], 8000).into()),
            state_dir: std::env::var("ATHENA_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("state")),
            graph_api_version: std::env::var("FB_GRAPH_API_VERSION").ok(),
            http_timeout_secs: std::env::var("ATHENA_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            warm_sync_delay_secs: std::env::var("ATHENA_WARM_SYNC_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}

/// Both pieces present or nothing: a half-configured account is treated the
/// same as an unconfigured one.
pub fn platform_credentials_from_env() -> Option<PlatformCredentials> {
    let account_id = std::env::var("FB_AD_ACCOUNT_ID").ok().filter(|s| !s.is_empty())?;
    let access_token = std::env::var("FB_ACCESS_TOKEN").ok().filter(|s| !s.is_empty())?;
    Some(PlatformCredentials {
        account_id,
        access_token,
    })
}
