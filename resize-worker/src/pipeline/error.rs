use image_storage::{KeyError, StorageError};
use thiserror::Error;

use crate::transform::TransformError;

/// Errors that abort a single pipeline invocation
///
/// Each variant names the stage that failed. Nothing is written to the output
/// prefix when any of them is returned.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input key could not be mapped to an output key
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Reading the upload failed
    #[error("failed to download {key}: {source}")]
    Download {
        /// Input key
        key: String,
        /// Storage failure
        #[source]
        source: StorageError,
    },

    /// The upload could not be turned into a thumbnail
    #[error("failed to transform {key}: {source}")]
    Transform {
        /// Input key
        key: String,
        /// Transform failure
        #[source]
        source: TransformError,
    },

    /// Writing the thumbnail failed
    #[error("failed to upload {key}: {source}")]
    Upload {
        /// Output key
        key: String,
        /// Storage failure
        #[source]
        source: StorageError,
    },
}

impl PipelineError {
    /// Name of the stage that failed, used as a log field and metric label
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "validate",
            Self::Download { .. } => "download",
            Self::Transform { .. } => "transform",
            Self::Upload { .. } => "upload",
        }
    }

    /// Whether running the same event again could succeed
    ///
    /// Backend outages and aborted transform tasks are retryable. A missing or
    /// undecodable upload will fail the same way on every delivery.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidKey(_) => false,
            Self::Download { source, .. } | Self::Upload { source, .. } => source.is_transient(),
            Self::Transform { source, .. } => matches!(source, TransformError::Worker(_)),
        }
    }
}
