use std::sync::Arc;

use aws_sdk_sqs::Client as SqsClient;

use super::error::QueueResult;
use super::types::{parse_upload_events, QueueConfig, UploadMessage};

/// SQS queue receiving the bucket's upload notifications
pub struct UploadEventQueue {
    sqs_client: Arc<SqsClient>,
    config: QueueConfig,
}

impl UploadEventQueue {
    /// Creates a new upload event queue
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    /// * `config` - Queue configuration including URL and default parameters
    #[must_use]
    pub const fn new(sqs_client: Arc<SqsClient>, config: QueueConfig) -> Self {
        Self { sqs_client, config }
    }

    /// Queue URL this instance polls
    #[must_use]
    pub fn queue_url(&self) -> &str {
        &self.config.queue_url
    }

    /// Polls messages from the queue
    ///
    /// Messages whose body is not an S3 notification are logged and skipped; they
    /// become visible again after the visibility timeout and end up in the queue's
    /// dead-letter queue if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the poll operation fails
    pub async fn poll_messages(&self) -> QueueResult<Vec<UploadMessage>> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(self.config.default_max_messages)
            .visibility_timeout(self.config.default_visibility_timeout)
            .wait_time_seconds(self.config.default_wait_time_seconds)
            .send()
            .await?;

        let messages = result
            .messages()
            .iter()
            .filter_map(|msg| {
                let body = msg.body()?;
                let receipt_handle = msg.receipt_handle()?.to_string();
                let message_id = msg.message_id()?.to_string();

                match parse_upload_events(body) {
                    Ok(events) => Some(UploadMessage {
                        body: events,
                        receipt_handle,
                        message_id,
                    }),
                    Err(e) => {
                        tracing::error!(message_id, "Failed to parse upload notification: {}", e);
                        None
                    }
                }
            })
            .collect();

        Ok(messages)
    }

    /// Acknowledges receipt of a message by deleting it from the queue
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the acknowledgment fails
    pub async fn ack_message(&self, receipt_handle: &str) -> QueueResult<()> {
        self.sqs_client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }
}
