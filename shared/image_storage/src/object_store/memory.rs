//! In-memory object store for tests

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};

use super::{ObjectStore, ObjectSummary, StorageError, StorageResult};

/// Stored object with its metadata
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object content
    pub body: Bytes,
    /// Content type recorded at write time
    pub content_type: String,
    /// Write timestamp
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Faults {
    get: HashSet<String>,
    put: HashSet<String>,
    sign: HashSet<String>,
    list_after: Option<usize>,
}

/// Object store kept in a `BTreeMap`, with failure injection
pub struct InMemoryObjectStore {
    bucket_name: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    faults: Mutex<Faults>,
    signing_delay: Mutex<Option<Duration>>,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    sign_calls: AtomicUsize,
}

impl InMemoryObjectStore {
    /// Creates an empty store for `bucket_name`
    #[must_use]
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            objects: Mutex::new(BTreeMap::new()),
            faults: Mutex::new(Faults::default()),
            signing_delay: Mutex::new(None),
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    /// Seeds an object with an explicit creation time
    pub fn insert(
        &self,
        key: impl Into<String>,
        body: impl Into<Bytes>,
        content_type: &str,
        created_at: DateTime<Utc>,
    ) {
        self.lock_objects().insert(
            key.into(),
            StoredObject {
                body: body.into(),
                content_type: content_type.to_string(),
                created_at,
            },
        );
    }

    /// Returns a copy of a stored object
    #[must_use]
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.lock_objects().get(key).cloned()
    }

    /// Returns every stored key, in order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock_objects().keys().cloned().collect()
    }

    /// Makes `get` fail for `key`
    pub fn fail_get(&self, key: impl Into<String>) {
        self.lock_faults().get.insert(key.into());
    }

    /// Makes `put` fail for `key`
    pub fn fail_put(&self, key: impl Into<String>) {
        self.lock_faults().put.insert(key.into());
    }

    /// Makes `signed_url` fail for `key`
    pub fn fail_signing(&self, key: impl Into<String>) {
        self.lock_faults().sign.insert(key.into());
    }

    /// Makes `list` yield an error after `count` entries
    pub fn fail_list_after(&self, count: usize) {
        self.lock_faults().list_after = Some(count);
    }

    /// Delays every `signed_url` call, to widen race windows in tests
    pub fn set_signing_delay(&self, delay: Duration) {
        *self
            .signing_delay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(delay);
    }

    /// Number of `get` calls so far
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `put` calls so far
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of `signed_url` calls so far
    #[must_use]
    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if self.lock_faults().get.contains(key) {
            return Err(StorageError::BackendUnavailable(format!(
                "injected get failure for {key}"
            )));
        }

        self.lock_objects()
            .get(key)
            .map(|object| object.body.clone())
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        if self.lock_faults().put.contains(key) {
            return Err(StorageError::BackendUnavailable(format!(
                "injected put failure for {key}"
            )));
        }

        self.insert(key, body, content_type, Utc::now());
        Ok(())
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StorageResult<ObjectSummary>> {
        let mut entries: Vec<StorageResult<ObjectSummary>> = self
            .lock_objects()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| {
                Ok(ObjectSummary {
                    key: key.clone(),
                    created_at: object.created_at,
                })
            })
            .collect();

        if let Some(count) = self.lock_faults().list_after {
            entries.truncate(count);
            entries.push(Err(StorageError::BackendUnavailable(
                "injected list failure".to_string(),
            )));
        }

        stream::iter(entries).boxed()
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let generation = self.sign_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = *self
            .signing_delay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.lock_faults().sign.contains(key) {
            return Err(StorageError::Signing {
                key: key.to_string(),
                reason: "injected signing failure".to_string(),
            });
        }

        Ok(format!(
            "memory://{}/{key}?expires_in={}&sig={generation}",
            self.bucket_name,
            ttl.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryObjectStore::new("bucket");
        store
            .put("img/after/a.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(store.get("img/after/a.jpg").await.unwrap(), &b"jpeg"[..]);
        assert_eq!(
            store.object("img/after/a.jpg").unwrap().content_type,
            "image/jpeg"
        );
        assert!(matches!(
            store.get("img/after/missing.jpg").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let store = InMemoryObjectStore::new("bucket");
        let now = Utc::now();
        store.insert("img/after/a.jpg", Bytes::new(), "image/jpeg", now);
        store.insert("img/before/a.jpg", Bytes::new(), "image/jpeg", now);

        let listed: Vec<ObjectSummary> = store.list("img/after/").try_collect().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "img/after/a.jpg");
    }

    #[tokio::test]
    async fn test_list_failure_injection() {
        let store = InMemoryObjectStore::new("bucket");
        let now = Utc::now();
        store.insert("img/after/a.jpg", Bytes::new(), "image/jpeg", now);
        store.insert("img/after/b.jpg", Bytes::new(), "image/jpeg", now);
        store.fail_list_after(1);

        let results: Vec<_> = store.list("img/after/").collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn test_signed_urls_are_distinct_per_call() {
        let store = InMemoryObjectStore::new("bucket");
        let first = store
            .signed_url("img/after/a.jpg", Duration::from_secs(3600))
            .await
            .unwrap();
        let second = store
            .signed_url("img/after/a.jpg", Duration::from_secs(3600))
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(store.sign_calls(), 2);
    }
}
