//! Storage services for the image gallery
//!
//! This crate provides the storage functionality shared between the backend and the
//! resize worker: object key layout rules, the object store abstraction with its S3
//! implementation, and the SQS queue carrying upload notifications.

#![deny(clippy::all, clippy::pedantic, clippy::nursery, missing_docs)]

pub mod keys;
pub mod object_store;
pub mod queue;

pub use keys::{extract_uploader_tag, KeyClass, KeyError, KeyLayout, UNKNOWN_UPLOADER};
pub use object_store::{ObjectStore, ObjectSummary, S3ObjectStore, StorageError, StorageResult};
pub use queue::{QueueConfig, QueueMessage, UploadEvent, UploadEventQueue, UploadMessage};

#[cfg(any(test, feature = "test-utils"))]
pub use object_store::{InMemoryObjectStore, StoredObject};
