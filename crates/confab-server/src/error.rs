//! Maps engine and surface failures onto the stable wire codes.

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] sync_engine::Error),
    #[error("no valid credential presented")]
    Unauthenticated,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("request body exceeds {max_bytes} bytes")]
    PayloadTooLarge { max_bytes: usize },
    #[error("unsupported content encoding {0:?}")]
    UnsupportedEncoding(String),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_last_synced_line: Option<u64>,
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::Engine(engine) => engine.code(),
            Self::Unauthenticated => "unauthenticated",
            Self::RateLimited => "rate_limited",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::UnsupportedEncoding(_) | Self::MalformedBody(_) => "invalid_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedEncoding(_) | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Engine(engine) => match engine {
                sync_engine::Error::Unauthenticated => StatusCode::UNAUTHORIZED,
                // 404 for both denial and unknown id, so existence never leaks
                sync_engine::Error::Forbidden => StatusCode::NOT_FOUND,
                sync_engine::Error::UnknownFile { .. } => StatusCode::NOT_FOUND,
                sync_engine::Error::GapDetected { .. }
                | sync_engine::Error::FileTypeMismatch { .. } => StatusCode::CONFLICT,
                sync_engine::Error::InvalidFileName(_)
                | sync_engine::Error::InvalidExternalId(_)
                | sync_engine::Error::InvalidFirstLine
                | sync_engine::Error::EmptyLines => StatusCode::BAD_REQUEST,
                sync_engine::Error::LineTooLong { .. }
                | sync_engine::Error::ChunkTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                sync_engine::Error::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
                sync_engine::Error::CorruptedState(_) | sync_engine::Error::StrayObject { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                sync_engine::Error::Storage(_) | sync_engine::Error::Database(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Engine(engine) = &self {
            if engine.is_server_fault() {
                tracing::error!(
                    message = "request failed with a server fault",
                    code = engine.code(),
                    error.display = %engine,
                    error.debug = ?engine,
                    alert = true,
                );
            }
        }

        let body = ErrorBody {
            error: self.code(),
            current_last_synced_line: match &self {
                Self::Engine(engine) => engine.current_last_synced_line(),
                _ => None,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_detected_maps_to_conflict_with_watermark() {
        let err = ApiError::from(sync_engine::Error::GapDetected {
            current_last_synced_line: 7,
        });

        assert_eq!(err.code(), "gap_detected");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn forbidden_and_unknown_look_identical() {
        let err = ApiError::from(sync_engine::Error::Forbidden);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "forbidden");
    }

    #[test]
    fn backend_outages_are_retryable_503s() {
        let err = ApiError::from(sync_engine::Error::Storage(blob_store::Error::NotFound {
            key: "1/x/chunks/t.jsonl/chunk_0000001_0000002.jsonl".to_owned(),
        }));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "storage_unavailable");
    }
}
