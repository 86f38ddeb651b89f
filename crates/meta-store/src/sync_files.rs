//! Watermark rows, one per `(session, file_name)`.
//!
//! `append_chunk` serializes on the row lock taken by [`lock_sync_file`]:
//! the caller opens a transaction, ensures the row exists, locks it, writes
//! the chunk object while still holding the lock, then advances the
//! watermark and commits. Functions here take a bare connection so they can
//! run inside that transaction.

use uuid::Uuid;

use crate::rows::{FileType, SyncFileRow};
use crate::{Database, PgConnection, Result};

/// Creates the watermark row at zero if this is the first append for the
/// file. `file_type` is established here and never updated afterwards.
pub async fn ensure_sync_file(
    conn: &mut PgConnection,
    session_id: Uuid,
    file_name: &str,
    file_type: FileType,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO sync_files (session_id, file_name, file_type)
         VALUES ($1, $2, $3)
         ON CONFLICT (session_id, file_name) DO NOTHING",
    )
    .bind(session_id)
    .bind(file_name)
    .bind(file_type)
    .execute(conn)
    .await?;

    Ok(())
}

/// Takes the row-level lock that serializes concurrent appends to one file.
/// The row must exist (see [`ensure_sync_file`]).
pub async fn lock_sync_file(
    conn: &mut PgConnection,
    session_id: Uuid,
    file_name: &str,
) -> Result<SyncFileRow> {
    let row = sqlx::query_as::<_, SyncFileRow>(
        "SELECT session_id, file_name, file_type, last_synced_line, bytes_used, updated_at
         FROM sync_files
         WHERE session_id = $1 AND file_name = $2
         FOR UPDATE",
    )
    .bind(session_id)
    .bind(file_name)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Advances the watermark and the per-file byte counter. `GREATEST` keeps
/// the column monotonic even if a caller ever raced the lock discipline.
pub async fn set_watermark(
    conn: &mut PgConnection,
    session_id: Uuid,
    file_name: &str,
    last_synced_line: i64,
    added_bytes: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE sync_files
         SET last_synced_line = GREATEST(last_synced_line, $3),
             bytes_used = bytes_used + $4,
             updated_at = now()
         WHERE session_id = $1 AND file_name = $2",
    )
    .bind(session_id)
    .bind(file_name)
    .bind(last_synced_line)
    .bind(added_bytes)
    .execute(conn)
    .await?;

    Ok(())
}

impl Database {
    /// Watermark map for one session, ordered by file name (the shape `init`
    /// returns).
    pub async fn list_sync_files(&self, session_id: Uuid) -> Result<Vec<SyncFileRow>> {
        let rows = sqlx::query_as::<_, SyncFileRow>(
            "SELECT session_id, file_name, file_type, last_synced_line, bytes_used, updated_at
             FROM sync_files WHERE session_id = $1 ORDER BY file_name",
        )
        .bind(session_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn get_sync_file(
        &self,
        session_id: Uuid,
        file_name: &str,
    ) -> Result<Option<SyncFileRow>> {
        let row = sqlx::query_as::<_, SyncFileRow>(
            "SELECT session_id, file_name, file_type, last_synced_line, bytes_used, updated_at
             FROM sync_files WHERE session_id = $1 AND file_name = $2",
        )
        .bind(session_id)
        .bind(file_name)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }
}
