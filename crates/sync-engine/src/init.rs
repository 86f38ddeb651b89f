//! The `init` operation: find-or-create the session for an external id and
//! report every file watermark so the daemon knows where to resume.

use meta_store::{SessionRow, SyncFileRow, sessions::NewSession};

use crate::engine::SyncEngine;
use crate::error::{Error, QuotaKind, Result};
use crate::principal::Principal;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct InitRequest {
    pub external_id: String,
    pub transcript_path: String,
    pub cwd: String,
    pub git_info: Option<serde_json::Value>,
    pub hostname: Option<String>,
}

#[derive(Debug)]
pub struct InitOutcome {
    pub session: SessionRow,
    pub files: Vec<SyncFileRow>,
}

impl SyncEngine {
    /// Idempotent per `(caller, external_id)`: the first call creates the
    /// session, every later call returns the same UUID and refreshes the
    /// late metadata (`cwd`, `git_info`).
    pub async fn init(&self, principal: &Principal, request: InitRequest) -> Result<InitOutcome> {
        let user_id = principal.user_id().ok_or(Error::Forbidden)?;

        chunk_codec::validate_segment(&request.external_id).map_err(Error::InvalidExternalId)?;

        let existing = self
            .db()
            .get_session_by_external(user_id, &request.external_id)
            .await?;

        // quota applies to genuinely new sessions only
        if existing.is_none() {
            let count = self.db().session_count(user_id).await?;
            if count >= self.config().max_sessions_per_user {
                return Err(Error::QuotaExceeded(QuotaKind::Sessions));
            }
        }

        let session = self
            .db()
            .upsert_session(
                user_id,
                NewSession {
                    external_id: &request.external_id,
                    transcript_path: &request.transcript_path,
                    cwd: &request.cwd,
                    git_info: request.git_info.as_ref(),
                    hostname: request.hostname.as_deref(),
                },
            )
            .await?;

        let files = self.db().list_sync_files(session.id).await?;

        Ok(InitOutcome { session, files })
    }
}
