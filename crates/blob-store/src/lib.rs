//! Thin gateway over an S3-compatible object store.
//!
//! Uploads immutable objects, lists keys under a prefix, streams object
//! bodies and deletes whole prefixes. No business logic lives here; callers
//! own key layout and ordering.

use bytes::Bytes;
use futures::stream::BoxStream;

mod error;
pub use error::Error;

mod memory;
pub use memory::MemoryStore;

mod s3;
pub use s3::{S3Config, S3Store};

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// A streamed object body.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Object store operations the sync core needs. One implementation talks to
/// S3; [`MemoryStore`] backs tests.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Writes `body` at `key`, replacing any existing object. Returns once
    /// the store acknowledges durability.
    async fn put(&self, key: &str, body: Bytes) -> Result<()>;

    /// Streams the body of the object at `key`.
    async fn get(&self, key: &str) -> Result<ByteStream>;

    /// Returns every key under `prefix`, in lexical order.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Deletes every object under `prefix`, returning how many went away.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}
