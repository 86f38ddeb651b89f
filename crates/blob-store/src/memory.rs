use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::{ByteStream, Error, Result};

/// In-memory [`BlobStore`](crate::BlobStore) over a sorted map, so prefix
/// listings come back in the same lexical order S3 would return. Used by
/// engine tests and local development.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    /// Snapshot of every stored key, for assertions.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }
}

#[async_trait::async_trait]
impl crate::BlobStore for MemoryStore {
    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        self.objects.lock().insert(key.to_owned(), body);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        let body = self.objects.lock().get(key).cloned();

        match body {
            Some(body) => Ok(Box::pin(futures::stream::once(async move { Ok(body) }))),
            None => Err(Error::NotFound {
                key: key.to_owned(),
            }),
        }
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.lock();

        Ok(objects
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut objects = self.objects.lock();
        let before = objects.len();
        objects.retain(|key, _| !key.starts_with(prefix));

        Ok((before - objects.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::BlobStore;

    #[tokio::test]
    async fn put_get_round_trip() {
        let store = MemoryStore::new();
        store.put("a/b", Bytes::from_static(b"hi\n")).await.unwrap();

        let body: Vec<Bytes> = store.get("a/b").await.unwrap().try_collect().await.unwrap();
        assert_eq!(body.concat(), b"hi\n");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = match store.get("nope").await {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_is_scoped_and_ordered() {
        let store = MemoryStore::new();
        for key in ["s/1/b", "s/1/a", "s/2/a", "t/1/a"] {
            store.put(key, Bytes::new()).await.unwrap();
        }

        assert_eq!(store.list_prefix("s/1/").await.unwrap(), ["s/1/a", "s/1/b"]);
        assert_eq!(store.list_prefix("s/").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_prefix_reports_count() {
        let store = MemoryStore::new();
        for key in ["s/1/a", "s/1/b", "s/2/a"] {
            store.put(key, Bytes::new()).await.unwrap();
        }

        assert_eq!(store.delete_prefix("s/1/").await.unwrap(), 2);
        assert_eq!(store.keys(), ["s/2/a"]);
    }
}
