//! API-key validation ping, called by daemons at startup. Budgeted per
//! client IP, and the budget is charged before the key lookup so the
//! endpoint cannot be used to hammer the database.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use http::HeaderMap;

use crate::api::AppState;
use crate::auth::api_key_from_headers;
use crate::error::ApiError;

#[derive(serde::Serialize)]
pub(super) struct ValidateResponse {
    user_id: i64,
    key_name: String,
}

pub(super) async fn validate(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<ValidateResponse>, ApiError> {
    if !state
        .limits
        .validate_per_ip
        .try_acquire(&format!("ip:{}", peer.ip()))
    {
        return Err(ApiError::RateLimited);
    }

    let caller = api_key_from_headers(&state, &headers).await?;

    Ok(Json(ValidateResponse {
        user_id: caller.user_id,
        key_name: caller.key_name,
    }))
}
