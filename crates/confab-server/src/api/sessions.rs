//! Reader-facing endpoints: streaming file reads, watermark listings, and
//! session deletion.

use std::collections::BTreeMap;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures::TryStreamExt;
use http::{HeaderMap, StatusCode, header};
use meta_store::FileType;
use sync_engine::{Principal, ReadRequest};
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::{WebCaller, caller_from_headers};
use crate::error::ApiError;

#[derive(serde::Deserialize)]
pub(super) struct ReadFileQuery {
    file_name: String,
    #[serde(default)]
    line_offset: u64,
    /// Public share token, for unauthenticated readers.
    token: Option<String>,
}

pub(super) async fn read_file(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<ReadFileQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let principal = reader_principal(&state, &headers, query.token).await?;

    let read = state
        .engine
        .read_file(
            &principal,
            ReadRequest {
                session_id,
                file_name: query.file_name,
                line_offset: query.line_offset,
            },
        )
        .await?;

    let body = Body::from_stream(read.stream.map_err(std::io::Error::other));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header("x-last-synced-line", read.last_synced_line)
        .body(body)
        .expect("static response parts are valid");

    Ok(response)
}

/// Reader auth is three-way: bearer key, session cookie, or a bare share
/// token in the query string.
async fn reader_principal(
    state: &AppState,
    headers: &HeaderMap,
    token: Option<String>,
) -> Result<Principal, ApiError> {
    match caller_from_headers(state, headers).await {
        Ok(principal) => Ok(principal),
        Err(ApiError::Unauthenticated) => match token {
            Some(token) => Ok(Principal::ShareToken { token }),
            None => Err(ApiError::Unauthenticated),
        },
        Err(other) => Err(other),
    }
}

#[derive(serde::Serialize)]
pub(super) struct FileEntry {
    file_type: FileType,
    last_synced_line: u64,
}

pub(super) async fn list_files(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<ListFilesQuery>,
    headers: HeaderMap,
) -> Result<Json<BTreeMap<String, FileEntry>>, ApiError> {
    let principal = reader_principal(&state, &headers, query.token).await?;

    let files = state.engine.list_files(&principal, session_id).await?;

    let map = files
        .into_iter()
        .map(|file| {
            (
                file.file_name,
                FileEntry {
                    file_type: file.file_type,
                    last_synced_line: file.last_synced_line as u64,
                },
            )
        })
        .collect();

    Ok(Json(map))
}

#[derive(serde::Deserialize)]
pub(super) struct ListFilesQuery {
    token: Option<String>,
}

pub(super) async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    WebCaller(principal): WebCaller,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_session(&principal, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
