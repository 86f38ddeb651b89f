//! Users are created by the external auth collaborators; the core reads
//! them and maintains the per-user byte counter backing the upload quota.

use crate::rows::UserRow;
use crate::{Database, PgConnection, Result};

impl Database {
    pub async fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, bytes_used FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    /// Test/bootstrap helper; production rows come from the auth service.
    pub async fn create_user(&self, email: &str) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email) VALUES ($1)
             ON CONFLICT (email) DO UPDATE SET email = excluded.email
             RETURNING id",
        )
        .bind(email)
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }
}

/// Current quota counter, read inside the caller's transaction.
pub async fn get_user_bytes(conn: &mut PgConnection, user_id: i64) -> Result<i64> {
    let bytes: i64 = sqlx::query_scalar("SELECT bytes_used FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(conn)
        .await?;

    Ok(bytes)
}

/// Adjusts the quota counter; negative deltas reclaim space on delete. Runs
/// inside the caller's transaction.
pub async fn add_user_bytes(conn: &mut PgConnection, user_id: i64, delta: i64) -> Result<()> {
    sqlx::query("UPDATE users SET bytes_used = GREATEST(0, bytes_used + $2) WHERE id = $1")
        .bind(user_id)
        .bind(delta)
        .execute(conn)
        .await?;

    Ok(())
}
