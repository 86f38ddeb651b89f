//! Claim queue for the background analytics workers.
//!
//! A session is a candidate when its highest watermark has moved past the
//! line count analytics were last computed at. Claims go through
//! `FOR UPDATE SKIP LOCKED` so workers never contend, and a `claimed_at`
//! staleness window reclaims sessions from workers that died mid-run.
//! Nothing here ever blocks an upload.

use uuid::Uuid;

use crate::rows::{AnalyticsClaim, AnalyticsRow, SessionMetrics};
use crate::{Database, Result};

impl Database {
    pub async fn get_analytics(&self, session_id: Uuid) -> Result<Option<AnalyticsRow>> {
        let row = sqlx::query_as::<_, AnalyticsRow>(
            "SELECT session_id, status, computed_line_count, attempts, last_error,
                    line_count, message_count, tool_use_count, tool_counts,
                    input_tokens, output_tokens, duration_seconds, model, computed_at
             FROM session_analytics WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    /// Creates missing `session_analytics` rows so new sessions become
    /// claimable. Run by each worker ahead of [`claim_next`]; racing inserts
    /// are absorbed by `ON CONFLICT DO NOTHING`.
    pub async fn seed_analytics_rows(&self) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO session_analytics (session_id)
             SELECT s.id
             FROM sessions s
             LEFT JOIN session_analytics a ON a.session_id = s.id
             WHERE a.session_id IS NULL
             ON CONFLICT (session_id) DO NOTHING",
        )
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Atomically claims one stale session, marking it `computing`. Returns
    /// `None` when no work is due.
    pub async fn claim_next_analytics(
        &self,
        claim_stale_secs: f64,
    ) -> Result<Option<AnalyticsClaim>> {
        let claim = sqlx::query_as::<_, AnalyticsClaim>(
            r#"
            UPDATE session_analytics AS a
            SET status = 'computing', claimed_at = now()
            FROM (
                SELECT sa.session_id
                FROM session_analytics sa
                WHERE (
                    SELECT COALESCE(MAX(f.last_synced_line), 0)
                    FROM sync_files f
                    WHERE f.session_id = sa.session_id
                ) > sa.computed_line_count
                  AND (
                    sa.status = 'idle'
                    OR (sa.status = 'computing'
                        AND sa.claimed_at < now() - make_interval(secs => $1))
                    OR (sa.status = 'failed'
                        AND COALESCE(sa.next_attempt_at, now()) <= now())
                  )
                ORDER BY sa.claimed_at ASC NULLS FIRST
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            ) AS picked
            WHERE a.session_id = picked.session_id
            RETURNING a.session_id, a.computed_line_count, a.attempts
            "#,
        )
        .bind(claim_stale_secs)
        .fetch_optional(self.pool())
        .await?;

        Ok(claim)
    }

    /// Writes back a successful recomputation and releases the claim. A
    /// concurrent upload may already have advanced the watermark past
    /// `computed_line_count`; the row is then simply stale and the next
    /// claim pass picks the session up again.
    pub async fn complete_analytics(
        &self,
        session_id: Uuid,
        computed_line_count: i64,
        metrics: &SessionMetrics,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE session_analytics SET
                status = 'idle',
                computed_line_count = $2,
                claimed_at = NULL,
                attempts = 0,
                next_attempt_at = NULL,
                last_error = NULL,
                line_count = $3,
                message_count = $4,
                tool_use_count = $5,
                tool_counts = $6,
                input_tokens = $7,
                output_tokens = $8,
                duration_seconds = $9,
                model = $10,
                computed_at = now()
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(computed_line_count)
        .bind(metrics.line_count)
        .bind(metrics.message_count)
        .bind(metrics.tool_use_count)
        .bind(&metrics.tool_counts)
        .bind(metrics.input_tokens)
        .bind(metrics.output_tokens)
        .bind(metrics.duration_seconds)
        .bind(metrics.model.as_deref())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Records a failed attempt with backoff, leaving the previous
    /// successful metrics untouched.
    pub async fn fail_analytics(
        &self,
        session_id: Uuid,
        error: &str,
        backoff_secs: f64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE session_analytics SET
                 status = 'failed',
                 claimed_at = NULL,
                 attempts = attempts + 1,
                 next_attempt_at = now() + make_interval(secs => $3),
                 last_error = $2
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(error)
        .bind(backoff_secs)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
