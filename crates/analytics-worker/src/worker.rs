//! One unit of analytics work: stream the claimed session's transcript and
//! write the recomputed metrics back.

use bytes::{Buf, BytesMut};
use futures::TryStreamExt;
use meta_store::{AnalyticsClaim, FileType, SessionMetrics};
use sync_engine::{Principal, ReadRequest, SyncEngine};

use crate::metrics::MetricsFolder;

#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    #[error(transparent)]
    Engine(#[from] sync_engine::Error),
    #[error(transparent)]
    Database(#[from] meta_store::Error),
    #[error("session processing timed out")]
    Timeout,
}

/// Outcome of a successful pass over one claim.
#[derive(Debug)]
pub(crate) struct Computed {
    /// Highest watermark across the session's files at processing time;
    /// recorded so the session only becomes claimable again after new lines
    /// arrive.
    pub computed_line_count: i64,
    pub metrics: SessionMetrics,
}

/// Recomputes metrics for a claimed session. Returns `None` when the session
/// vanished underneath the claim (deleted mid-run); the analytics row is
/// already gone with it.
pub(crate) async fn process_claim(
    engine: &SyncEngine,
    claim: &AnalyticsClaim,
) -> Result<Option<Computed>, WorkError> {
    let Some(session) = engine.db().get_session(claim.session_id).await? else {
        return Ok(None);
    };

    let files = engine.db().list_sync_files(session.id).await?;

    let computed_line_count = files
        .iter()
        .map(|file| file.last_synced_line)
        .max()
        .unwrap_or(0);

    let transcript = files
        .iter()
        .find(|file| file.file_type == FileType::Transcript);

    let mut folder = MetricsFolder::new();

    if let Some(transcript) = transcript {
        let owner = Principal::ApiKey {
            user_id: session.owner_user_id,
        };

        let read = engine
            .read_file(
                &owner,
                ReadRequest {
                    session_id: session.id,
                    file_name: transcript.file_name.clone(),
                    line_offset: 0,
                },
            )
            .await?;

        let mut stream = read.stream;
        let mut buffer = BytesMut::new();

        // chunk bodies arrive in arbitrary frames; reassemble lines across
        // frame boundaries before folding
        while let Some(frame) = stream.try_next().await? {
            buffer.extend_from_slice(&frame);

            while let Some(at) = memchr::memchr(b'\n', &buffer) {
                let line = buffer.split_to(at + 1);
                folder.push_line(&line[..line.len() - 1]);
            }
        }

        if !buffer.is_empty() {
            folder.push_line(buffer.chunk());
        }
    }

    Ok(Some(Computed {
        computed_line_count,
        metrics: folder.finish(),
    }))
}
