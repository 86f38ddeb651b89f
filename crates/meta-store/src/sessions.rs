//! Session rows: one per `(owner_user_id, external_id)` pair.

use uuid::Uuid;

use crate::rows::SessionRow;
use crate::{Database, PgConnection, Result};

/// Metadata captured at `init` time. `cwd` and `git_info` are "late": every
/// re-init overwrites them on the existing row.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub external_id: &'a str,
    pub transcript_path: &'a str,
    pub cwd: &'a str,
    pub git_info: Option<&'a serde_json::Value>,
    pub hostname: Option<&'a str>,
}

impl Database {
    /// Inserts or refreshes the session row for `(owner, external_id)`.
    ///
    /// The upsert is atomic against a concurrent init of the same pair: both
    /// callers land on the same row and get the same UUID back. `external_id`
    /// and the owner never change; `first_seen` is set once.
    pub async fn upsert_session(&self, owner: i64, new: NewSession<'_>) -> Result<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (owner_user_id, external_id, transcript_path, cwd, git_info, hostname)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (owner_user_id, external_id) DO UPDATE SET
                transcript_path = excluded.transcript_path,
                cwd = excluded.cwd,
                git_info = excluded.git_info,
                hostname = COALESCE(excluded.hostname, sessions.hostname)
            RETURNING id, owner_user_id, external_id, transcript_path, cwd, git_info, hostname, first_seen
            "#,
        )
        .bind(owner)
        .bind(new.external_id)
        .bind(new.transcript_path)
        .bind(new.cwd)
        .bind(new.git_info)
        .bind(new.hostname)
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, owner_user_id, external_id, transcript_path, cwd, git_info, hostname, first_seen
             FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn get_session_by_external(
        &self,
        owner: i64,
        external_id: &str,
    ) -> Result<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, owner_user_id, external_id, transcript_path, cwd, git_info, hostname, first_seen
             FROM sessions WHERE owner_user_id = $1 AND external_id = $2",
        )
        .bind(owner)
        .bind(external_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn session_count(&self, owner: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE owner_user_id = $1")
            .bind(owner)
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }

}

/// Total stored bytes across the session's files, read inside the deletion
/// transaction so the owner's quota counter can be reclaimed atomically.
pub async fn sum_session_bytes(conn: &mut PgConnection, session_id: Uuid) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(bytes_used), 0)::BIGINT FROM sync_files WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_one(conn)
    .await?;

    Ok(total)
}

/// Deletes the session row; `sync_files`, `shares` and analytics rows go
/// with it via `ON DELETE CASCADE`. Returns false if the row was already
/// gone.
pub async fn delete_session(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
