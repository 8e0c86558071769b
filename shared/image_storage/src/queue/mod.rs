//! Upload notification queue
//!
//! The bucket publishes S3 event notifications to an SQS queue. This module polls
//! that queue, turns each message into the upload events it carries, and deletes
//! messages once the caller is done with them. Delivery is at-least-once.

/// Error types for queue operations
pub mod error;
/// Event and message types
pub mod types;
/// SQS client for upload notifications
pub mod upload_queue;

pub use error::{QueueError, QueueResult};
pub use types::{parse_upload_events, QueueConfig, QueueMessage, UploadEvent, UploadMessage};
pub use upload_queue::UploadEventQueue;
