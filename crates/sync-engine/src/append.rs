//! The `append_chunk` operation.
//!
//! The ordering contract is decided by [`plan_append`], a pure function of
//! the locked watermark and the claimed range. The surrounding transaction
//! holds the `sync_files` row lock across the object write so concurrent
//! appends to one file serialize; the object goes to the store *before* the
//! watermark moves, which is what makes a crash in between recoverable.

use chunk_codec::{ChunkKey, ChunkRange};
use meta_store::{FileType, sync_files, users};
use uuid::Uuid;

use crate::engine::SyncEngine;
use crate::error::{Error, QuotaKind, Result};
use crate::principal::Principal;

#[derive(Debug, Clone)]
pub struct AppendRequest {
    pub session_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    /// 1-based line number the client claims for `lines[0]`.
    pub first_line: u64,
    /// Newline-free lines; the engine appends the terminators.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct AppendResponse {
    pub last_synced_line: u64,
}

/// What an append should do, given the locked watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPlan {
    /// Entire range is already persisted; idempotent no-op.
    AlreadyPersisted,
    /// Accepting the chunk would leave lines `current+1 .. first-1` missing.
    Gap,
    /// Store the chunk, discarding the first `skip` lines already covered.
    Write { skip: usize },
}

/// Evaluates the ordering/deduplication contract. `current` is the watermark
/// read under the row lock; `first_line >= 1` and `line_count >= 1` are
/// validated by the caller.
pub fn plan_append(current: u64, first_line: u64, line_count: usize) -> AppendPlan {
    let claimed_last = first_line.saturating_add(line_count as u64 - 1);

    if claimed_last <= current {
        return AppendPlan::AlreadyPersisted;
    }

    if first_line > current + 1 {
        return AppendPlan::Gap;
    }

    AppendPlan::Write {
        skip: (current + 1 - first_line) as usize,
    }
}

impl SyncEngine {
    /// Appends one chunk of new lines to a sync file. See the module docs
    /// for the locking discipline.
    pub async fn append_chunk(
        &self,
        principal: &Principal,
        request: AppendRequest,
    ) -> Result<AppendResponse> {
        chunk_codec::validate_segment(&request.file_name).map_err(Error::InvalidFileName)?;

        if request.first_line == 0 {
            return Err(Error::InvalidFirstLine);
        }
        if request.lines.is_empty() {
            return Err(Error::EmptyLines);
        }

        let mut body_bytes = 0_usize;
        for (offset, line) in request.lines.iter().enumerate() {
            if line.len() > self.config().max_line_bytes {
                return Err(Error::LineTooLong {
                    line_number: request.first_line + offset as u64,
                    max_bytes: self.config().max_line_bytes,
                });
            }
            body_bytes += line.len() + 1;
        }
        if body_bytes > self.config().max_chunk_bytes {
            return Err(Error::ChunkTooLarge {
                bytes: body_bytes,
                max_bytes: self.config().max_chunk_bytes,
            });
        }

        let session = self.resolve_write(principal, request.session_id).await?;
        let claimed_last = request.first_line.saturating_add(request.lines.len() as u64 - 1);

        let mut tx = self.db().begin().await?;

        sync_files::ensure_sync_file(
            &mut *tx,
            session.id,
            &request.file_name,
            request.file_type,
        )
        .await?;

        let file = sync_files::lock_sync_file(&mut *tx, session.id, &request.file_name).await?;

        if file.file_type != request.file_type {
            return Err(Error::FileTypeMismatch {
                established: file.file_type,
                requested: request.file_type,
            });
        }

        let current = file.last_synced_line as u64;

        let skip = match plan_append(current, request.first_line, request.lines.len()) {
            AppendPlan::AlreadyPersisted => {
                // dropping the transaction rolls back any row ensure_sync_file inserted
                return Ok(AppendResponse {
                    last_synced_line: current,
                });
            }
            AppendPlan::Gap => {
                return Err(Error::GapDetected {
                    current_last_synced_line: current,
                });
            }
            AppendPlan::Write { skip } => skip,
        };

        let body = chunk_codec::encode_lines(&request.lines[skip..]);
        let body_len = body.len() as i64;

        let stored = users::get_user_bytes(&mut *tx, session.owner_user_id).await?;
        if stored as u64 + body.len() as u64 > self.config().max_user_bytes {
            return Err(Error::QuotaExceeded(QuotaKind::Bytes));
        }

        let range = ChunkRange::new(current + 1, claimed_last)
            .expect("plan_append only writes non-empty ranges");
        let key = ChunkKey::new(
            session.owner_user_id,
            &session.external_id,
            &request.file_name,
            range,
        );

        // the object must be durable before the watermark moves
        self.blobs().put(key.as_str(), body).await?;

        sync_files::set_watermark(
            &mut *tx,
            session.id,
            &request.file_name,
            claimed_last as i64,
            body_len,
        )
        .await?;
        users::add_user_bytes(&mut *tx, session.owner_user_id, body_len).await?;

        tx.commit().await.map_err(meta_store::Error::from)?;

        Ok(AppendResponse {
            last_synced_line: claimed_last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_append_writes_everything() {
        assert_eq!(plan_append(0, 1, 3), AppendPlan::Write { skip: 0 });
    }

    #[test]
    fn continuation_writes_everything() {
        assert_eq!(plan_append(3, 4, 1), AppendPlan::Write { skip: 0 });
    }

    #[test]
    fn full_replay_is_a_no_op() {
        assert_eq!(plan_append(3, 1, 3), AppendPlan::AlreadyPersisted);
        assert_eq!(plan_append(3, 2, 2), AppendPlan::AlreadyPersisted);
        assert_eq!(plan_append(5, 3, 1), AppendPlan::AlreadyPersisted);
    }

    #[test]
    fn jump_past_the_watermark_is_a_gap() {
        assert_eq!(plan_append(3, 5, 1), AppendPlan::Gap);
        assert_eq!(plan_append(0, 2, 10), AppendPlan::Gap);
    }

    #[test]
    fn overlap_trims_to_the_watermark() {
        // watermark 3, resend of [2..4]: only line 4 is new
        assert_eq!(plan_append(3, 2, 3), AppendPlan::Write { skip: 2 });
        // watermark 3, resend of [1..5]
        assert_eq!(plan_append(3, 1, 5), AppendPlan::Write { skip: 3 });
    }

    #[test]
    fn exact_boundary_cases() {
        // claimed_last == current + 1, first == current + 1
        assert_eq!(plan_append(3, 4, 1), AppendPlan::Write { skip: 0 });
        // claimed_last == current exactly
        assert_eq!(plan_append(4, 4, 1), AppendPlan::AlreadyPersisted);
    }
}
