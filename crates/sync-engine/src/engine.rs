use std::sync::Arc;

use blob_store::BlobStore;
use meta_store::Database;

/// Ceilings and quotas the engine enforces. The HTTP surface applies the
/// byte caps a second time on the raw (pre-parse) body.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_chunk_bytes: usize,
    pub max_line_bytes: usize,
    pub max_sessions_per_user: i64,
    pub max_user_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: 8 * 1024 * 1024,
            max_line_bytes: 1024 * 1024,
            max_sessions_per_user: 10_000,
            max_user_bytes: 10 * 1024 * 1024 * 1024,
        }
    }
}

/// The incremental sync core. Cheap to clone; all state lives in the two
/// stores.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    db: Database,
    blobs: Arc<dyn BlobStore>,
    config: EngineConfig,
}

impl SyncEngine {
    pub fn new(db: Database, blobs: Arc<dyn BlobStore>, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Inner { db, blobs, config }),
        }
    }

    #[inline]
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    #[inline]
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.inner.blobs
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
