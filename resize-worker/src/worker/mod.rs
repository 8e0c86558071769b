/// Runs the pipeline for queued messages
pub mod event_processor;
/// Feeds queue messages to the processors
pub mod queue_listener;

use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use aws_sdk_sqs::Client as SqsClient;
use image_storage::{S3ObjectStore, UploadEventQueue, UploadMessage};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::pipeline::Pipeline;
use crate::transform::Transformer;
use crate::types::environment::Environment;

use self::event_processor::EventProcessor;
use self::queue_listener::QueueListener;

/// Resize worker that manages queue polling and event processing
pub struct ResizeWorker {
    env: Environment,
    queue: Arc<UploadEventQueue>,
    pipeline: Arc<Pipeline>,
    shutdown_token: CancellationToken,
}

impl ResizeWorker {
    /// Creates a new resize worker from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the key layout or transform settings are invalid
    pub async fn new(env: Environment) -> anyhow::Result<Self> {
        let layout = env.key_layout()?;
        let transformer = Transformer::new(env.transform_settings())?;

        let s3_client = Arc::new(S3Client::from_conf(env.s3_client_config().await));
        let store = Arc::new(S3ObjectStore::new(s3_client, env.s3_bucket()));

        let sqs_client = Arc::new(SqsClient::from_conf(env.sqs_client_config().await));
        let queue = Arc::new(UploadEventQueue::new(sqs_client, env.upload_queue_config()));

        info!(
            bucket = %env.s3_bucket(),
            input_prefix = %layout.input_prefix(),
            output_prefix = %layout.output_prefix(),
            settings = ?transformer.settings(),
            "Resize worker configured"
        );

        Ok(Self {
            env,
            queue,
            pipeline: Arc::new(Pipeline::new(store, layout, transformer)),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Returns a clone of the shutdown token for external control
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Starts the worker and runs until shutdown
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; listener failures are logged and end the run
    pub async fn start(self) -> anyhow::Result<()> {
        info!(
            "Starting resize worker with {} processors",
            self.env.num_workers()
        );

        let (message_tx, message_rx) = self.create_message_channel();
        let processor_handles = self.spawn_processors(&message_rx);
        drop(message_rx);

        self.run_queue_listener(message_tx).await;
        self.shutdown_and_cleanup(processor_handles).await;

        Ok(())
    }

    /// Creates and logs the message channel
    fn create_message_channel(
        &self,
    ) -> (flume::Sender<UploadMessage>, flume::Receiver<UploadMessage>) {
        let (message_tx, message_rx) =
            flume::bounded::<UploadMessage>(self.env.channel_capacity());
        info!(
            "Created flume channel with capacity: {}",
            self.env.channel_capacity()
        );
        (message_tx, message_rx)
    }

    /// Runs the queue listener and handles results
    async fn run_queue_listener(&self, message_tx: flume::Sender<UploadMessage>) {
        let listener_result = QueueListener::new(
            Arc::clone(&self.queue),
            message_tx,
            self.shutdown_token.clone(),
        )
        .run()
        .await;

        if let Err(e) = listener_result {
            error!("Queue listener error: {}", e);
        }
    }

    /// Shuts down and cleans up all worker components
    async fn shutdown_and_cleanup(&self, processor_handles: Vec<JoinHandle<()>>) {
        self.shutdown_token.cancel();
        info!("Resize worker shutdown initiated");

        for handle in processor_handles {
            if let Err(e) = handle.await {
                error!("Processor task error: {}", e);
            }
        }
        info!("All resize worker components stopped");
    }

    /// Spawns event processor tasks
    fn spawn_processors(&self, receiver: &flume::Receiver<UploadMessage>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        for i in 0..self.env.num_workers() {
            let processor = EventProcessor::new(i, Arc::clone(&self.pipeline), self.env.event_timeout());
            let rx = receiver.clone();
            let queue = Arc::clone(&self.queue);
            let shutdown_token = self.shutdown_token.clone();

            let handle = tokio::spawn(async move {
                processor.run(rx, queue, shutdown_token).await;
            });

            handles.push(handle);
        }

        handles
    }
}
