//! Request-body decoding: byte caps first, then optional zstd, then JSON.
//! The decompressed size is capped with the same ceiling as the raw body, so
//! a small compressed payload cannot balloon past the configured limit.

use http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub async fn read_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: axum::body::Body,
    max_bytes: usize,
) -> Result<T, ApiError> {
    let raw = axum::body::to_bytes(body, max_bytes)
        .await
        .map_err(|_| ApiError::PayloadTooLarge { max_bytes })?;

    let decoded = match content_encoding(headers) {
        None => raw,
        Some("zstd") => {
            use std::io::Read;

            let decoder = zstd::stream::read::Decoder::new(raw.as_ref())
                .map_err(|error| ApiError::MalformedBody(error.to_string()))?;

            // read one byte past the cap so overflow is detectable without
            // ever materializing an unbounded buffer
            let mut decompressed = Vec::new();
            decoder
                .take(max_bytes as u64 + 1)
                .read_to_end(&mut decompressed)
                .map_err(|error| ApiError::MalformedBody(error.to_string()))?;

            if decompressed.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge { max_bytes });
            }

            decompressed.into()
        }
        Some(other) => return Err(ApiError::UnsupportedEncoding(other.to_owned())),
    };

    serde_json::from_slice(&decoded).map_err(|error| ApiError::MalformedBody(error.to_string()))
}

fn content_encoding(headers: &HeaderMap) -> Option<&str> {
    let value = headers
        .get(http::header::CONTENT_ENCODING)?
        .to_str()
        .ok()?
        .trim();

    match value {
        "" | "identity" => None,
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_headers() -> HeaderMap {
        HeaderMap::new()
    }

    fn zstd_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_ENCODING,
            http::HeaderValue::from_static("zstd"),
        );
        headers
    }

    #[tokio::test]
    async fn plain_json_decodes() {
        let body = axum::body::Body::from(r#"{"a": 1}"#);
        let value: serde_json::Value = read_json(&plain_headers(), body, 1024).await.unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn zstd_json_decodes() {
        let compressed = zstd::bulk::compress(br#"{"a": 1}"#, 0).unwrap();
        let body = axum::body::Body::from(compressed);
        let value: serde_json::Value = read_json(&zstd_headers(), body, 1024).await.unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn oversized_raw_body_is_rejected() {
        let body = axum::body::Body::from(vec![b' '; 64]);
        let err = read_json::<serde_json::Value>(&plain_headers(), body, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { max_bytes: 16 }));
    }

    #[tokio::test]
    async fn zstd_bomb_is_rejected_by_decompressed_size() {
        // 1 MiB of zeros compresses to almost nothing
        let compressed = zstd::bulk::compress(&vec![0_u8; 1024 * 1024], 0).unwrap();
        assert!(compressed.len() < 4096);

        let body = axum::body::Body::from(compressed);
        let err = read_json::<serde_json::Value>(&zstd_headers(), body, 4096)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn unknown_encoding_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_ENCODING,
            http::HeaderValue::from_static("br"),
        );

        let body = axum::body::Body::from("{}");
        let err = read_json::<serde_json::Value>(&headers, body, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedEncoding(_)));
    }
}
