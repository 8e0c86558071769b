//! Object store abstraction
//!
//! The pipeline and the gallery only need four capabilities from the blob store:
//! read, write, list by prefix and sign a time-limited download URL. They depend on
//! [`ObjectStore`] so tests can substitute [`InMemoryObjectStore`] for S3.

mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod s3;

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

pub use error::{StorageError, StorageResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryObjectStore, StoredObject};
pub use s3::S3ObjectStore;

/// Listing entry for a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key
    pub key: String,
    /// When the object was written
    pub created_at: DateTime<Utc>,
}

/// Narrow interface over a durable key-value blob store
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store reads from and writes to
    fn bucket(&self) -> &str;

    /// Reads a whole object
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key does not exist and
    /// `StorageError::BackendUnavailable` for any other backend failure.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Writes a whole object, replacing any previous version atomically
    ///
    /// # Errors
    ///
    /// Returns `StorageError::BackendUnavailable` if the write fails.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()>;

    /// Streams every object whose key starts with `prefix`
    ///
    /// The stream yields an error and ends if the backend fails mid-enumeration.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StorageResult<ObjectSummary>>;

    /// Produces a URL granting read access to `key` for `ttl`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Signing` if the URL cannot be produced.
    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String>;
}
