//! API keys: `(user_id, name)` unique per user, stored only as the SHA-256
//! hex of the issued token. Lookup happens on every sync request.

use crate::rows::ApiKeyRow;
use crate::{Database, Error, Result};

impl Database {
    /// Resolves a token hash to its key row. Revoked keys do not resolve.
    pub async fn lookup_api_key(&self, token_hash: &str) -> Result<Option<ApiKeyRow>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT id, user_id, name, revoked
             FROM api_keys
             WHERE token_hash = $1 AND NOT revoked",
        )
        .bind(token_hash)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn create_api_key(&self, user_id: i64, name: &str, token_hash: &str) -> Result<i64> {
        let result = sqlx::query_scalar::<_, i64>(
            "INSERT INTO api_keys (user_id, name, token_hash)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(id) => Ok(id),
            Err(error) => {
                let error = Error::from(error);
                if error.is_unique_violation("api_keys_user_id_name_key") {
                    Err(Error::DuplicateKeyName {
                        name: name.to_owned(),
                    })
                } else {
                    Err(error)
                }
            }
        }
    }

    /// Resolves a browser session token hash to `(user_id, email)`. Rows are
    /// written by the external auth service; expiry is enforced here.
    pub async fn lookup_web_session(&self, token_hash: &str) -> Result<Option<(i64, String)>> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT u.id, u.email
             FROM web_sessions w
             JOIN users u ON u.id = w.user_id
             WHERE w.token_hash = $1 AND w.expires_at > now()",
        )
        .bind(token_hash)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn revoke_api_key(&self, user_id: i64, name: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE api_keys SET revoked = TRUE WHERE user_id = $1 AND name = $2 AND NOT revoked",
        )
        .bind(user_id)
        .bind(name)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
