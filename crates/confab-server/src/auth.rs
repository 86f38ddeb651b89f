//! Credential handling: API-key tokens, browser-session cookies, and the
//! extractors that turn either into an engine [`Principal`].
//!
//! Tokens are never stored or logged; only their SHA-256 hex digest touches
//! the database.

use axum::extract::FromRequestParts;
use base64::Engine as _;
use http::HeaderMap;
use http::request::Parts;
use sha2::{Digest, Sha256};
use sync_engine::Principal;

use crate::api::AppState;
use crate::error::ApiError;

/// Prefix on every issued API-key token, so leaked secrets are greppable.
pub const TOKEN_PREFIX: &str = "cfb_";

const SESSION_COOKIE: &str = "confab_session";

/// Mints a fresh API-key token: prefix plus 256 bits of randomness.
pub fn generate_token() -> String {
    let mut secret = [0_u8; 32];
    rand::Rng::fill(&mut rand::rng(), &mut secret);

    let mut token = String::with_capacity(TOKEN_PREFIX.len() + 43);
    token.push_str(TOKEN_PREFIX);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode_string(secret, &mut token);
    token
}

/// The only form a credential takes at rest.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(http::header::COOKIE)?.to_str().ok()?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then_some(value)
    })
}

/// A caller authenticated by API key; required on the daemon-facing
/// endpoints.
#[derive(Debug, Clone)]
pub struct ApiKeyCaller {
    pub user_id: i64,
    pub key_name: String,
}

impl ApiKeyCaller {
    pub fn principal(&self) -> Principal {
        Principal::ApiKey {
            user_id: self.user_id,
        }
    }
}

pub(crate) async fn api_key_from_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<ApiKeyCaller, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;

    if !token.starts_with(TOKEN_PREFIX) {
        return Err(ApiError::Unauthenticated);
    }

    let key = state
        .engine
        .db()
        .lookup_api_key(&hash_token(token))
        .await
        .map_err(sync_engine::Error::from)?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(ApiKeyCaller {
        user_id: key.user_id,
        key_name: key.name,
    })
}

pub(crate) async fn web_session_from_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, ApiError> {
    let cookie = session_cookie(headers).ok_or(ApiError::Unauthenticated)?;

    let (user_id, email) = state
        .engine
        .db()
        .lookup_web_session(&hash_token(cookie))
        .await
        .map_err(sync_engine::Error::from)?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Principal::WebSession { user_id, email })
}

/// Bearer key if present, otherwise the session cookie.
pub(crate) async fn caller_from_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, ApiError> {
    if bearer_token(headers).is_some() {
        return Ok(api_key_from_headers(state, headers).await?.principal());
    }

    web_session_from_headers(state, headers).await
}

impl FromRequestParts<AppState> for ApiKeyCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        api_key_from_headers(state, &parts.headers).await
    }
}

/// Owner-grade caller for the destructive endpoints: cookies only, API keys
/// never delete.
#[derive(Debug, Clone)]
pub struct WebCaller(pub Principal);

impl FromRequestParts<AppState> for WebCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        web_session_from_headers(state, &parts.headers).await.map(Self)
    }
}
