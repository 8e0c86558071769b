use std::sync::Arc;
use std::time::Duration;

use image_storage::{UploadEventQueue, UploadMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::pipeline::{Pipeline, PipelineOutcome};

/// What to do with a queue message once its events have been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    /// Delete the message: every event is finished, or failed in a way a retry cannot fix
    Ack,
    /// Leave the message for redelivery after its visibility timeout
    Retry,
}

/// Runs the pipeline for each message it receives from the listener
pub struct EventProcessor {
    worker_id: usize,
    pipeline: Arc<Pipeline>,
    event_timeout: Duration,
}

impl EventProcessor {
    /// Creates a new processor
    #[must_use]
    pub const fn new(worker_id: usize, pipeline: Arc<Pipeline>, event_timeout: Duration) -> Self {
        Self {
            worker_id,
            pipeline,
            event_timeout,
        }
    }

    /// Runs the processor loop, acknowledging messages on `queue`
    pub async fn run(
        &self,
        receiver: flume::Receiver<UploadMessage>,
        queue: Arc<UploadEventQueue>,
        shutdown_token: CancellationToken,
    ) {
        info!("Event processor {} started", self.worker_id);

        loop {
            tokio::select! {
                () = shutdown_token.cancelled() => {
                    info!("Event processor {} received shutdown signal", self.worker_id);
                    break;
                }
                result = receiver.recv_async() => {
                    match result {
                        Ok(message) => {
                            if self.process_message(&message, &shutdown_token).await
                                == MessageDisposition::Ack
                            {
                                if let Err(e) = queue.ack_message(&message.receipt_handle).await {
                                    error!(message_id = %message.message_id, error = %e, "Failed to ack message");
                                }
                            }
                        }
                        Err(flume::RecvError::Disconnected) => {
                            info!("Message channel closed for processor {}", self.worker_id);
                            break;
                        }
                    }
                }
            }
        }

        info!("Event processor {} stopped", self.worker_id);
    }

    /// Handles every event in `message` under the per-message deadline
    ///
    /// Events are handled in order. A retryable failure does not stop the
    /// remaining events; re-running the finished ones on redelivery only
    /// overwrites their thumbnails.
    #[instrument(skip_all, fields(worker_id = self.worker_id, message_id = %message.message_id))]
    pub async fn process_message(
        &self,
        message: &UploadMessage,
        shutdown_token: &CancellationToken,
    ) -> MessageDisposition {
        if message.body.is_empty() {
            debug!("Message carries no upload events");
            return MessageDisposition::Ack;
        }

        let handling = async {
            let mut disposition = MessageDisposition::Ack;

            for event in &message.body {
                match self.pipeline.handle(event).await {
                    Ok(PipelineOutcome::Done { .. } | PipelineOutcome::Skipped(_)) => {}
                    Err(e) if e.is_retryable() => {
                        warn!(key = %event.object_key, stage = e.stage(), error = %e, "Event failed, will retry");
                        disposition = MessageDisposition::Retry;
                    }
                    Err(e) => {
                        error!(key = %event.object_key, stage = e.stage(), error = %e, "Event failed permanently");
                    }
                }
            }

            disposition
        };

        tokio::select! {
            biased;
            () = shutdown_token.cancelled() => {
                info!("Shutdown while processing, leaving message for redelivery");
                MessageDisposition::Retry
            }
            result = tokio::time::timeout(self.event_timeout, handling) => {
                result.unwrap_or_else(|_| {
                    warn!(timeout = ?self.event_timeout, "Message deadline exceeded");
                    MessageDisposition::Retry
                })
            }
        }
    }
}
