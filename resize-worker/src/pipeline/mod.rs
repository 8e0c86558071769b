//! Pipeline orchestration for a single upload event
//!
//! `Received -> Validated -> Downloaded -> Transformed -> Uploaded -> Done`, with
//! `Skipped` when the event is not ours to process and an error when any stage
//! fails. The upload is the only write, so a failed or cancelled invocation
//! leaves the output prefix untouched.

mod error;

use std::sync::Arc;
use std::time::{Duration, Instant};

use image_storage::{KeyClass, KeyLayout, ObjectStore, UploadEvent};
use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};

pub use error::PipelineError;

use crate::transform::{TransformError, Transformer, OUTPUT_CONTENT_TYPE};

/// Why an event was not processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Key is outside the input prefix, including the worker's own output
    OutsideInputPrefix,
    /// Key is not a supported image
    UnsupportedFormat,
    /// Event was emitted by a bucket this worker does not serve
    ForeignBucket,
}

impl SkipReason {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutsideInputPrefix => "outside_input_prefix",
            Self::UnsupportedFormat => "unsupported_format",
            Self::ForeignBucket => "foreign_bucket",
        }
    }
}

/// Wall-clock time spent in each stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Reading the upload
    pub download: Duration,
    /// Decoding, cropping, resizing and encoding
    pub transform: Duration,
    /// Writing the thumbnail
    pub upload: Duration,
    /// Whole invocation
    pub total: Duration,
}

/// Terminal state of a successful invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Event deliberately ignored, nothing written
    Skipped(SkipReason),
    /// Thumbnail written
    Done {
        /// Key the thumbnail was written to
        output_key: String,
        /// Stage durations
        timings: StageTimings,
    },
}

impl PipelineOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Skipped(_) => "skipped",
            Self::Done { .. } => "done",
        }
    }
}

/// Reads an upload, transforms it and writes the thumbnail under the output prefix
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    layout: KeyLayout,
    transformer: Transformer,
}

impl Pipeline {
    /// Creates a new pipeline
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, layout: KeyLayout, transformer: Transformer) -> Self {
        Self {
            store,
            layout,
            transformer,
        }
    }

    /// Processes one upload event
    ///
    /// Re-delivery of the same event overwrites the same output key.
    ///
    /// # Errors
    ///
    /// Returns a `PipelineError` naming the stage that failed
    #[instrument(skip(self, event), fields(key = %event.object_key))]
    pub async fn handle(&self, event: &UploadEvent) -> Result<PipelineOutcome, PipelineError> {
        let result = self.run(event).await;

        match &result {
            Ok(outcome) => {
                counter!("resize_pipeline.events", "outcome" => outcome.label()).increment(1);
            }
            Err(e) => {
                counter!("resize_pipeline.events", "outcome" => "failed", "stage" => e.stage())
                    .increment(1);
            }
        }

        result
    }

    async fn run(&self, event: &UploadEvent) -> Result<PipelineOutcome, PipelineError> {
        let started = Instant::now();

        if event.bucket != self.store.bucket() {
            warn!(
                bucket = %event.bucket,
                expected = %self.store.bucket(),
                "Ignoring event from another bucket"
            );
            return Ok(PipelineOutcome::Skipped(SkipReason::ForeignBucket));
        }

        let reason = match self.layout.classify(&event.object_key) {
            KeyClass::Process => None,
            KeyClass::OutsideInputPrefix => Some(SkipReason::OutsideInputPrefix),
            KeyClass::UnsupportedFormat => Some(SkipReason::UnsupportedFormat),
        };
        if let Some(reason) = reason {
            debug!(reason = reason.as_str(), "Skipping event");
            return Ok(PipelineOutcome::Skipped(reason));
        }

        let input_key = event.object_key.as_str();
        let output_key = self.layout.derive_output_key(input_key)?;

        let stage = Instant::now();
        let raw = self
            .store
            .get(input_key)
            .await
            .map_err(|source| PipelineError::Download {
                key: input_key.to_string(),
                source,
            })?;
        let download = record_stage("download", stage);
        debug!(bytes = raw.len(), "Downloaded upload");

        let stage = Instant::now();
        let transformer = self.transformer;
        let thumbnail = tokio::task::spawn_blocking(move || transformer.transform(&raw))
            .await
            .unwrap_or_else(|e| Err(TransformError::Worker(e.to_string())))
            .map_err(|source| PipelineError::Transform {
                key: input_key.to_string(),
                source,
            })?;
        let transform = record_stage("transform", stage);

        let stage = Instant::now();
        self.store
            .put(&output_key, thumbnail, OUTPUT_CONTENT_TYPE)
            .await
            .map_err(|source| PipelineError::Upload {
                key: output_key.clone(),
                source,
            })?;
        let upload = record_stage("upload", stage);

        let timings = StageTimings {
            download,
            transform,
            upload,
            total: record_stage("total", started),
        };

        info!(
            output_key = %output_key,
            download = ?timings.download,
            transform = ?timings.transform,
            upload = ?timings.upload,
            total = ?timings.total,
            "Thumbnail written"
        );

        Ok(PipelineOutcome::Done {
            output_key,
            timings,
        })
    }
}

fn record_stage(stage: &'static str, started: Instant) -> Duration {
    let elapsed = started.elapsed();
    histogram!("resize_pipeline.stage_seconds", "stage" => stage).record(elapsed.as_secs_f64());
    elapsed
}
