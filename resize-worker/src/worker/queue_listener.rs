use std::sync::Arc;
use std::time::Duration;

use image_storage::{UploadEventQueue, UploadMessage};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Delay before polling again after a failed receive
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Long-polls the upload queue and feeds messages to the processors
pub struct QueueListener {
    queue: Arc<UploadEventQueue>,
    message_tx: flume::Sender<UploadMessage>,
    shutdown_token: CancellationToken,
}

impl QueueListener {
    /// Creates a new listener
    #[must_use]
    pub const fn new(
        queue: Arc<UploadEventQueue>,
        message_tx: flume::Sender<UploadMessage>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            queue,
            message_tx,
            shutdown_token,
        }
    }

    /// Polls until shutdown or until every processor has gone away
    ///
    /// # Errors
    ///
    /// Returns an error if the message channel closes while the listener is running
    pub async fn run(self) -> anyhow::Result<()> {
        info!(queue_url = %self.queue.queue_url(), "Queue listener started");

        loop {
            let messages = tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Queue listener shutting down");
                    return Ok(());
                }
                result = self.queue.poll_messages() => result,
            };

            match messages {
                Ok(messages) => {
                    debug!(count = messages.len(), "Received messages");
                    for message in messages {
                        self.forward(message).await?;
                    }
                }
                Err(e) => {
                    error!(error = %e, upstream = e.is_upstream_error(), "Failed to poll messages");
                    tokio::select! {
                        () = self.shutdown_token.cancelled() => return Ok(()),
                        () = sleep(POLL_ERROR_BACKOFF) => {}
                    }
                }
            }
        }
    }

    async fn forward(&self, message: UploadMessage) -> anyhow::Result<()> {
        tokio::select! {
            // Unsent messages reappear after their visibility timeout
            () = self.shutdown_token.cancelled() => Ok(()),
            result = self.message_tx.send_async(message) => {
                result.map_err(|_| anyhow::anyhow!("Message channel closed"))
            }
        }
    }
}
