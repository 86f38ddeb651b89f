//! Router assembly and shared handler state. Handlers translate between the
//! wire and the sync engine; none of them re-implement engine logic.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, post};
use sync_engine::SyncEngine;
use tower_http::timeout::TimeoutLayer;

use crate::ratelimit::RateLimiter;

mod sessions;
mod sync;
mod validate;

/// Ceiling on `init` and other small JSON bodies; chunk uploads get the
/// configured chunk ceiling instead.
const SMALL_BODY_BYTES: usize = 256 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: SyncEngine,
    pub limits: Arc<Limits>,
}

pub struct Limits {
    pub append_per_user: RateLimiter,
    pub validate_per_ip: RateLimiter,
    pub max_chunk_bytes: usize,
    pub small_body_bytes: usize,
}

impl AppState {
    pub fn new(engine: SyncEngine, append_rpm_per_user: u32, validate_rpm_per_ip: u32) -> Self {
        let max_chunk_bytes = engine.config().max_chunk_bytes;

        Self {
            engine,
            limits: Arc::new(Limits {
                append_per_user: RateLimiter::per_minute(append_rpm_per_user),
                validate_per_ip: RateLimiter::per_minute(validate_rpm_per_ip),
                max_chunk_bytes,
                small_body_bytes: SMALL_BODY_BYTES,
            }),
        }
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/auth/validate", get(validate::validate))
        .route("/api/v1/sync/init", post(sync::init))
        .route("/api/v1/sync/chunk", post(sync::append_chunk))
        .route("/api/v1/sessions/{id}/sync/file", get(sessions::read_file))
        .route("/api/v1/sessions/{id}/sync/files", get(sessions::list_files))
        .route("/api/v1/sessions/{id}", delete(sessions::delete_session))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok\n"
}
