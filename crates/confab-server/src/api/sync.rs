//! Daemon-facing push endpoints: `init` and `append_chunk`.

use std::collections::BTreeMap;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use http::HeaderMap;
use meta_store::FileType;
use sync_engine::{AppendRequest, InitRequest};
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::ApiKeyCaller;
use crate::body::read_json;
use crate::error::ApiError;

#[derive(serde::Serialize)]
pub(super) struct InitResponse {
    session_id: Uuid,
    files: BTreeMap<String, FileState>,
}

#[derive(serde::Serialize)]
pub(super) struct FileState {
    file_type: FileType,
    last_synced_line: u64,
}

pub(super) async fn init(
    State(state): State<AppState>,
    caller: ApiKeyCaller,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<InitResponse>, ApiError> {
    let request: InitRequest = read_json(&headers, body, state.limits.small_body_bytes).await?;

    let outcome = state.engine.init(&caller.principal(), request).await?;

    let files = outcome
        .files
        .into_iter()
        .map(|file| {
            (
                file.file_name,
                FileState {
                    file_type: file.file_type,
                    last_synced_line: file.last_synced_line as u64,
                },
            )
        })
        .collect();

    Ok(Json(InitResponse {
        session_id: outcome.session.id,
        files,
    }))
}

#[derive(serde::Deserialize)]
pub(super) struct AppendChunkBody {
    session_id: Uuid,
    file_name: String,
    file_type: FileType,
    first_line: u64,
    lines: Vec<String>,
}

#[derive(serde::Serialize)]
pub(super) struct AppendChunkResponse {
    last_synced_line: u64,
}

pub(super) async fn append_chunk(
    State(state): State<AppState>,
    caller: ApiKeyCaller,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<AppendChunkResponse>, ApiError> {
    if !state
        .limits
        .append_per_user
        .try_acquire(&format!("user:{}", caller.user_id))
    {
        return Err(ApiError::RateLimited);
    }

    let request: AppendChunkBody = read_json(&headers, body, state.limits.max_chunk_bytes).await?;

    let response = state
        .engine
        .append_chunk(
            &caller.principal(),
            AppendRequest {
                session_id: request.session_id,
                file_name: request.file_name,
                file_type: request.file_type,
                first_line: request.first_line,
                lines: request.lines,
            },
        )
        .await?;

    Ok(Json(AppendChunkResponse {
        last_synced_line: response.last_synced_line,
    }))
}
