//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use image_storage::keys::{DEFAULT_INPUT_PREFIX, DEFAULT_OUTPUT_PREFIX};
use image_storage::{KeyError, KeyLayout, QueueConfig};

use crate::transform::TransformSettings;

/// Extra visibility beyond the event deadline, covering time spent queued in the channel
const VISIBILITY_MARGIN_SECS: u32 = 60;

/// SQS upper bound on a message's visibility timeout
const MAX_VISIBILITY_TIMEOUT_SECS: u32 = 43_200;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the S3 bucket name for the environment
    ///
    /// # Panics
    ///
    /// Panics if the `S3_BUCKET_NAME` environment variable is not set in production/staging
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME environment variable is not set")
            }
            Self::Development => {
                env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "image-gallery".to_string())
            }
        }
    }

    /// Returns the key layout, honouring `INPUT_PREFIX` and `OUTPUT_PREFIX`
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the configured prefixes are empty or overlap
    pub fn key_layout(&self) -> Result<KeyLayout, KeyError> {
        KeyLayout::new(
            env::var("INPUT_PREFIX").unwrap_or_else(|_| DEFAULT_INPUT_PREFIX.to_string()),
            env::var("OUTPUT_PREFIX").unwrap_or_else(|_| DEFAULT_OUTPUT_PREFIX.to_string()),
        )
    }

    /// Returns the upload notification queue configuration
    ///
    /// # Panics
    ///
    /// Panics if the `UPLOAD_QUEUE_URL` environment variable is not set in production/staging
    #[must_use]
    pub fn upload_queue_config(&self) -> QueueConfig {
        let queue_url = match self {
            Self::Production | Self::Staging => {
                env::var("UPLOAD_QUEUE_URL").expect("UPLOAD_QUEUE_URL environment variable is not set")
            }
            Self::Development => env::var("UPLOAD_QUEUE_URL").unwrap_or_else(|_| {
                "http://localhost:4566/000000000000/image-uploads".to_string()
            }),
        };

        QueueConfig {
            queue_url,
            default_max_messages: 10,
            default_visibility_timeout: self.visibility_timeout_secs(),
            default_wait_time_seconds: 20,
        }
    }

    /// Returns the default number of workers for this environment
    #[must_use]
    pub const fn default_num_workers(&self) -> usize {
        match self {
            Self::Production => 8,
            Self::Staging => 4,
            Self::Development => 2,
        }
    }

    /// Number of event processors, overridable with `NUM_WORKERS`
    #[must_use]
    pub fn num_workers(&self) -> usize {
        env::var("NUM_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or_else(|| self.default_num_workers())
    }

    /// Returns the channel capacity (2 * `num_workers`)
    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.num_workers() * 2
    }

    /// Deadline for handling every event in one queue message
    ///
    /// Values that leave no room for the visibility margin under the SQS limit
    /// fall back to the default.
    #[must_use]
    pub fn event_timeout(&self) -> Duration {
        let secs = env::var("EVENT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| {
                *secs > 0 && *secs <= u64::from(MAX_VISIBILITY_TIMEOUT_SECS - VISIBILITY_MARGIN_SECS)
            })
            .unwrap_or(60);
        Duration::from_secs(secs)
    }

    /// Visibility timeout for received messages, always longer than the event
    /// deadline so a message is not redelivered while it is still being handled
    #[must_use]
    pub fn visibility_timeout_secs(&self) -> i32 {
        let deadline = u32::try_from(self.event_timeout().as_secs())
            .unwrap_or(MAX_VISIBILITY_TIMEOUT_SECS - VISIBILITY_MARGIN_SECS);
        let secs = (deadline + VISIBILITY_MARGIN_SECS).min(MAX_VISIBILITY_TIMEOUT_SECS);
        i32::try_from(secs).unwrap_or(i32::MAX)
    }

    /// Target size and JPEG quality, overridable with `TARGET_WIDTH`,
    /// `TARGET_HEIGHT` and `JPEG_QUALITY`
    ///
    /// Values are validated when the transformer is built.
    #[must_use]
    pub fn transform_settings(&self) -> TransformSettings {
        let defaults = TransformSettings::default();

        TransformSettings {
            width: parse_var("TARGET_WIDTH").unwrap_or(defaults.width),
            height: parse_var("TARGET_HEIGHT").unwrap_or(defaults.height),
            quality: parse_var("JPEG_QUALITY").unwrap_or(defaults.quality),
        }
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            Self::Production | Self::Staging => None,
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);

        // LocalStack does not support virtual-hosted bucket addressing
        if matches!(self, Self::Development) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// AWS SQS service configuration
    pub async fn sqs_client_config(&self) -> aws_sdk_sqs::Config {
        let aws_config = self.aws_config().await;
        aws_sdk_sqs::config::Builder::from(&aws_config).build()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
