//! The `delete_session` operation.
//!
//! Metadata goes first, inside one transaction, so no caller can ever see a
//! session whose rows are gone but whose watermark claims otherwise. The
//! object prefix is then deleted best-effort with bounded retries; orphaned
//! objects are tolerable, orphaned metadata is not.

use meta_store::{sessions, users};
use uuid::Uuid;

use crate::access::Need;
use crate::engine::SyncEngine;
use crate::error::Result;
use crate::principal::Principal;
use crate::retry;

const PREFIX_DELETE_ATTEMPTS: u32 = 3;
const PREFIX_DELETE_BASE_MS: u64 = 250;
const PREFIX_DELETE_CAP_MS: u64 = 5_000;

impl SyncEngine {
    pub async fn delete_session(&self, principal: &Principal, session_id: Uuid) -> Result<()> {
        let session = self.resolve(principal, session_id, Need::Delete).await?;

        let mut tx = self.db().begin().await?;

        let reclaimed = sessions::sum_session_bytes(&mut *tx, session.id).await?;
        sessions::delete_session(&mut *tx, session.id).await?;
        users::add_user_bytes(&mut *tx, session.owner_user_id, -reclaimed).await?;

        tx.commit().await.map_err(meta_store::Error::from)?;

        let prefix = chunk_codec::session_prefix(session.owner_user_id, &session.external_id);

        for attempt in 0..PREFIX_DELETE_ATTEMPTS {
            match self.blobs().delete_prefix(&prefix).await {
                Ok(deleted) => {
                    tracing::info!(
                        message = "session deleted",
                        session_id = %session.id,
                        objects_deleted = deleted,
                    );
                    return Ok(());
                }
                Err(error) if attempt + 1 < PREFIX_DELETE_ATTEMPTS => {
                    tracing::warn!(
                        message = "prefix delete failed, retrying",
                        %prefix,
                        attempt,
                        error.display = %error,
                    );
                    tokio::time::sleep(retry::jittered_delay(
                        attempt,
                        PREFIX_DELETE_BASE_MS,
                        PREFIX_DELETE_CAP_MS,
                    ))
                    .await;
                }
                Err(error) => {
                    // metadata is already gone; a background reaper can
                    // reclaim whatever this leaves behind
                    tracing::error!(
                        message = "abandoning prefix delete, objects orphaned",
                        %prefix,
                        error.display = %error,
                        alert = true,
                    );
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}
