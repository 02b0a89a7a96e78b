// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ads;
pub mod api;
pub mod config;
pub mod insights;
pub mod metrics;
pub mod platform;
pub mod prediction;
pub mod scoring;
pub mod storage;
pub mod sync;

// ---- Re-exports for stable public API ----
pub use crate::ads::{AdStatus, TrackedAd};
pub use crate::api::{create_router, AppState};
pub use crate::insights::MetricsSnapshot;
pub use crate::scoring::{score, ScoreResult};
pub use crate::sync::{SyncOutcome, SyncReconciler, SyncSummary, SyncTrigger};
