//! Error types for object store operations

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::{
    get_object::GetObjectError, list_objects_v2::ListObjectsV2Error, put_object::PutObjectError,
};
use thiserror::Error;

/// Result type for object store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during object store operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested object does not exist
    #[error("object not found: {key}")]
    NotFound {
        /// Key that was requested
        key: String,
    },

    /// Any failure talking to the storage backend
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A signed URL could not be produced
    #[error("failed to sign URL for {key}: {reason}")]
    Signing {
        /// Key the URL was requested for
        key: String,
        /// Backend-provided reason
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether the error is worth surfacing to infrastructure retry policies
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

impl From<SdkError<GetObjectError>> for StorageError {
    fn from(error: SdkError<GetObjectError>) -> Self {
        Self::BackendUnavailable(format!("get object: {}", DisplayErrorContext(&error)))
    }
}

impl From<SdkError<PutObjectError>> for StorageError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        Self::BackendUnavailable(format!("put object: {}", DisplayErrorContext(&error)))
    }
}

impl From<SdkError<ListObjectsV2Error>> for StorageError {
    fn from(error: SdkError<ListObjectsV2Error>) -> Self {
        Self::BackendUnavailable(format!("list objects: {}", DisplayErrorContext(&error)))
    }
}
