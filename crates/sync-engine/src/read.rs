//! The `read_file` operation: list the stored chunks, validate that they
//! reproduce the watermark as a contiguous cover, then stream the bodies in
//! order. At most one chunk body is in flight at a time; the file is never
//! buffered whole.

use std::sync::Arc;

use bytes::Bytes;
use chunk_codec::ChunkKey;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::access::Need;
use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::principal::Principal;

#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub session_id: Uuid,
    pub file_name: String,
    /// Number of leading lines the caller already has; output starts at
    /// absolute line `line_offset + 1`.
    pub line_offset: u64,
}

/// A validated, ready-to-stream read.
pub struct FileRead {
    /// Watermark at read time; the stream ends exactly at this line.
    pub last_synced_line: u64,
    pub stream: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for FileRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRead")
            .field("last_synced_line", &self.last_synced_line)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Watermark map for any session the caller can read; the reader-facing
    /// sibling of the map `init` returns to writers.
    pub async fn list_files(
        &self,
        principal: &Principal,
        session_id: Uuid,
    ) -> Result<Vec<meta_store::SyncFileRow>> {
        let session = self.resolve(principal, session_id, Need::Read).await?;
        Ok(self.db().list_sync_files(session.id).await?)
    }

    pub async fn read_file(&self, principal: &Principal, request: ReadRequest) -> Result<FileRead> {
        chunk_codec::validate_segment(&request.file_name).map_err(Error::InvalidFileName)?;

        let session = self
            .resolve(principal, request.session_id, Need::Read)
            .await?;

        let file = self
            .db()
            .get_sync_file(session.id, &request.file_name)
            .await?
            .ok_or_else(|| Error::UnknownFile {
                file_name: request.file_name.clone(),
            })?;

        let last_synced_line = file.last_synced_line as u64;

        if last_synced_line == 0 || request.line_offset >= last_synced_line {
            return Ok(FileRead {
                last_synced_line,
                stream: futures::stream::empty().boxed(),
            });
        }

        let prefix = chunk_codec::file_prefix(
            session.owner_user_id,
            &session.external_id,
            &request.file_name,
        );

        let mut keys = Vec::new();
        for key in self.blobs().list_prefix(&prefix).await? {
            match ChunkKey::parse(key.clone()) {
                Ok(chunk) => keys.push(chunk),
                Err(error) => {
                    tracing::error!(
                        message = "non-chunk object under a chunk prefix",
                        %key,
                        error.display = %error,
                        alert = true,
                    );
                    return Err(Error::StrayObject { key });
                }
            }
        }

        let ranges: Vec<_> = keys.iter().map(|key| key.range()).collect();
        let plan = chunk_codec::plan_read(&ranges, last_synced_line, request.line_offset)?;

        let blobs = Arc::clone(self.blobs());
        let parts: Vec<(String, u64)> = plan
            .into_segments()
            .into_iter()
            .map(|segment| {
                (
                    keys[segment.index].as_str().to_owned(),
                    segment.skip_lines,
                )
            })
            .collect();

        let stream = futures::stream::iter(parts)
            .then(move |(key, skip)| {
                let blobs = Arc::clone(&blobs);
                async move {
                    let body = blobs.get(&key).await?;
                    Ok::<_, Error>(skip_leading_lines(body, skip).map_err(Error::from))
                }
            })
            .try_flatten()
            .try_filter(|bytes| futures::future::ready(!bytes.is_empty()))
            .boxed();

        Ok(FileRead {
            last_synced_line,
            stream,
        })
    }
}

/// Drops the first `skip` lines of a streamed chunk body without collecting
/// it. Line counting rides on the `\n` terminators, which every stored line
/// carries.
fn skip_leading_lines(
    stream: blob_store::ByteStream,
    skip: u64,
) -> impl futures::Stream<Item = blob_store::Result<Bytes>> {
    stream.scan(skip, |remaining, item| {
        let out = match item {
            Err(error) => Some(Err(error)),
            Ok(bytes) if *remaining == 0 => Some(Ok(bytes)),
            Ok(bytes) => {
                let newlines = memchr::memchr_iter(b'\n', &bytes).count() as u64;
                if newlines <= *remaining {
                    *remaining -= newlines;
                    Some(Ok(Bytes::new()))
                } else {
                    let rest = chunk_codec::skip_lines(bytes, *remaining);
                    *remaining = 0;
                    Some(Ok(rest))
                }
            }
        };

        futures::future::ready(out)
    })
}
