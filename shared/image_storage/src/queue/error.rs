use aws_sdk_sqs::error::SdkError;
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;
use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
use thiserror::Error;

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Error types for queue operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// Error receiving messages from SQS
    #[error("Failed to receive messages from SQS")]
    ReceiveMessage(#[from] SdkError<ReceiveMessageError>),

    /// Error deleting message from SQS
    #[error("Failed to delete message from SQS")]
    DeleteMessage(#[from] SdkError<DeleteMessageError>),

    /// Message body is not a JSON document we understand
    #[error("Failed to deserialize message: {0}")]
    DeserializationError(#[from] serde_json::Error),

    /// Message parsed but carries invalid data
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

impl QueueError {
    /// Checks if this error represents an upstream (5xx) error
    #[must_use]
    pub fn is_upstream_error(&self) -> bool {
        match self {
            Self::ReceiveMessage(sdk_err) => Self::check_sdk_error_status(sdk_err),
            Self::DeleteMessage(sdk_err) => Self::check_sdk_error_status(sdk_err),
            Self::DeserializationError(_) | Self::InvalidMessage(_) => false,
        }
    }

    fn check_sdk_error_status<E>(sdk_err: &SdkError<E>) -> bool {
        if let SdkError::ServiceError(err) = sdk_err {
            return err.raw().status().as_u16() >= 500;
        }
        false
    }
}
