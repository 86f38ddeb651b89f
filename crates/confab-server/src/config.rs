//! Environment-driven configuration. Everything the core consumes comes in
//! through here exactly once, at startup, with precise errors for anything
//! malformed.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("'${0}' is not set")]
    Missing(&'static str),
    #[error("'${var}' has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub bucket: String,
    /// Custom S3 endpoint for MinIO/R2 style stores.
    pub s3_endpoint: Option<String>,
    pub s3_region: Option<String>,
    pub max_chunk_bytes: usize,
    pub max_line_bytes: usize,
    pub max_sessions_per_user: i64,
    pub max_user_bytes: u64,
    pub analytics_workers: usize,
    pub analytics_claim_stale_secs: f64,
    pub request_timeout: Duration,
    /// `append_chunk` budget, requests per minute per user.
    pub append_rpm_per_user: u32,
    /// Auth-validation budget, requests per minute per client IP.
    pub validate_rpm_per_ip: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parsed("PORT", 8080)?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 16)?,
            bucket: required("CONFAB_BUCKET")?,
            s3_endpoint: optional("S3_ENDPOINT"),
            s3_region: optional("S3_REGION"),
            max_chunk_bytes: parsed("MAX_CHUNK_BYTES", 8 * 1024 * 1024)?,
            max_line_bytes: parsed("MAX_LINE_BYTES", 1024 * 1024)?,
            max_sessions_per_user: parsed("MAX_SESSIONS_PER_USER", 10_000)?,
            max_user_bytes: parsed("MAX_USER_BYTES", 10 * 1024 * 1024 * 1024)?,
            analytics_workers: parsed("ANALYTICS_WORKERS", 2)?,
            analytics_claim_stale_secs: parsed("ANALYTICS_CLAIM_STALE_SECS", 600.0)?,
            request_timeout: Duration::from_secs(parsed("REQUEST_TIMEOUT_SECS", 60)?),
            append_rpm_per_user: parsed("APPEND_RPM_PER_USER", 120)?,
            validate_rpm_per_ip: parsed("VALIDATE_RPM_PER_IP", 30)?,
        })
    }

    pub fn engine_config(&self) -> sync_engine::EngineConfig {
        sync_engine::EngineConfig {
            max_chunk_bytes: self.max_chunk_bytes,
            max_line_bytes: self.max_line_bytes,
            max_sessions_per_user: self.max_sessions_per_user,
            max_user_bytes: self.max_user_bytes,
        }
    }

    pub fn analytics_config(&self) -> analytics_worker::AnalyticsConfig {
        analytics_worker::AnalyticsConfig {
            workers: self.analytics_workers,
            claim_stale_secs: self.analytics_claim_stale_secs,
            ..analytics_worker::AnalyticsConfig::default()
        }
    }
}

fn optional(var: &'static str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::Missing(var))
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
