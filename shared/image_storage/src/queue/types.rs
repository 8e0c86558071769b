use serde::{Deserialize, Serialize};

use super::error::{QueueError, QueueResult};

/// Upload-completed notification for a single object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadEvent {
    /// Bucket the object was written to
    pub bucket: String,
    /// Decoded object key
    pub object_key: String,
}

impl UploadEvent {
    /// Creates a new upload event
    #[must_use]
    pub fn new(bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object_key: object_key.into(),
        }
    }
}

/// Wrapper for queue messages with metadata
#[derive(Debug, Clone)]
pub struct QueueMessage<T> {
    /// The message body
    pub body: T,
    /// Receipt handle for acknowledging the message
    pub receipt_handle: String,
    /// Message ID
    pub message_id: String,
}

/// One SQS message and the upload events it carries (possibly none)
pub type UploadMessage = QueueMessage<Vec<UploadEvent>>;

/// Configuration for queue operations
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue URL
    pub queue_url: String,
    /// Default maximum number of messages to retrieve
    pub default_max_messages: i32,
    /// Default visibility timeout for messages (in seconds)
    pub default_visibility_timeout: i32,
    /// Default wait time for long polling
    pub default_wait_time_seconds: i32,
}

/// S3 event notification body, or the test event S3 sends when the
/// notification is first configured
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum S3Notification {
    Records {
        #[serde(rename = "Records")]
        records: Vec<S3EventRecord>,
    },
    Test {
        #[serde(rename = "Event")]
        #[allow(dead_code)]
        event: String,
    },
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    event_name: String,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Extracts the object-created events from an S3 notification body
///
/// Object keys arrive form-urlencoded (`+` for spaces) and are decoded here.
/// Test events and non-creation events yield no upload events.
///
/// # Errors
///
/// Returns `QueueError::DeserializationError` if the body is not an S3
/// notification and `QueueError::InvalidMessage` if a key does not decode to UTF-8.
pub fn parse_upload_events(body: &str) -> QueueResult<Vec<UploadEvent>> {
    let records = match serde_json::from_str::<S3Notification>(body)? {
        S3Notification::Records { records } => records,
        S3Notification::Test { .. } => return Ok(Vec::new()),
    };

    records
        .into_iter()
        .filter(|record| record.event_name.starts_with("ObjectCreated:"))
        .map(|record| {
            let object_key = decode_object_key(&record.s3.object.key)?;
            Ok(UploadEvent {
                bucket: record.s3.bucket.name,
                object_key,
            })
        })
        .collect()
}

fn decode_object_key(raw: &str) -> QueueResult<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| QueueError::InvalidMessage(format!("object key {raw:?} is not UTF-8: {e}")))
}
