//! Relational metadata store over Postgres.
//!
//! Owns the authoritative `last_synced_line` watermarks, session ownership,
//! API keys, shares and derived analytics. Everything here is a query; the
//! ordering discipline (which rows to lock, when to commit relative to
//! object-store writes) belongs to the sync engine.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

mod error;
pub use error::Error;

mod rows;
pub use rows::{
    AnalyticsClaim, AnalyticsRow, ApiKeyRow, FileType, ParseFileTypeError, SessionMetrics,
    SessionRow, ShareRow, SyncFileRow, UserRow,
};

pub mod analytics;
pub mod api_keys;
pub mod sessions;
pub mod shares;
pub mod sync_files;
pub mod users;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Re-exported so callers can hold transactions without naming sqlx.
pub type Transaction = sqlx::Transaction<'static, sqlx::Postgres>;
pub type PgConnection = sqlx::PgConnection;

const SCHEMA: &str = include_str!("../schema.sql");

#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connects a bounded pool. `max_connections` caps concurrent writers;
    /// the watermark protocol relies on row locks, not on pool size.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    #[inline]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies `schema.sql`. Every statement is idempotent, so this runs on
    /// each startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<Transaction> {
        Ok(self.pool.begin().await?)
    }
}
