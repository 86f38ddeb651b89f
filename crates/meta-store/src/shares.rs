//! Share grants: public URL tokens and per-email invitations. The access
//! resolver consumes these; creation is driven by the external dashboard.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::rows::ShareRow;
use crate::{Database, Error, Result};

impl Database {
    /// Resolves a share token to its row, ignoring expired grants.
    pub async fn lookup_share_by_token(&self, token: &str) -> Result<Option<ShareRow>> {
        let row = sqlx::query_as::<_, ShareRow>(
            "SELECT id, session_id, token, recipient_email, expires_at
             FROM shares
             WHERE token = $1 AND (expires_at IS NULL OR expires_at > now())",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    /// Whether `email` holds an (unexpired) invitation to the session.
    pub async fn share_exists_for_email(&self, session_id: Uuid, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM shares
                 WHERE session_id = $1
                   AND recipient_email = $2
                   AND (expires_at IS NULL OR expires_at > now())
             )",
        )
        .bind(session_id)
        .bind(email)
        .fetch_one(self.pool())
        .await?;

        Ok(exists)
    }

    pub async fn create_share(
        &self,
        session_id: Uuid,
        token: Option<&str>,
        recipient_email: Option<&str>,
        expires_at: Option<OffsetDateTime>,
    ) -> Result<i64> {
        debug_assert!(token.is_some() || recipient_email.is_some());

        let result = sqlx::query_scalar::<_, i64>(
            "INSERT INTO shares (session_id, token, recipient_email, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(session_id)
        .bind(token)
        .bind(recipient_email)
        .bind(expires_at)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(id) => Ok(id),
            Err(error) => {
                let error = Error::from(error);
                if error.is_unique_violation("shares_token_key") {
                    Err(Error::DuplicateShareToken)
                } else {
                    Err(error)
                }
            }
        }
    }

    pub async fn delete_share(&self, share_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shares WHERE id = $1")
            .bind(share_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
