//! inotify-relay server library logic.

pub mod api;
pub mod config;
pub mod scheduler;
pub mod status;

use std::sync::{Arc, RwLock};

use axum::{http::StatusCode, routing::get, Extension, Json, Router};
use relay_db::DbPool;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use status::CycleStatus;

/// Application state shared by the request handlers and the poll task.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (checkpoint state and outbox).
    pub pool: DbPool,
    /// Latest cycle status, written by the poll task.
    ///
    /// `std::sync::RwLock` because no lock is held across an `.await`.
    pub status: Arc<RwLock<CycleStatus>>,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            status: Arc::new(RwLock::new(CycleStatus::default())),
        }
    }
}

/// Health check handler.
///
/// Reports `503` once the poll task has stopped, so a supervisor can
/// restart the process.
async fn health(Extension(state): Extension<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let stopped = state
        .status
        .read()
        .map(|status| status.poller_stopped())
        .unwrap_or(true);
    let (code, status) = if stopped {
        (StatusCode::SERVICE_UNAVAILABLE, "poller_stopped")
    } else {
        (StatusCode::OK, "ok")
    };
    (
        code,
        Json(json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Builds the application router with all routes.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(api::get_status_handler))
        .route("/api/records", get(api::get_records_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
