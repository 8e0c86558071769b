//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use image_storage::keys::{DEFAULT_INPUT_PREFIX, DEFAULT_OUTPUT_PREFIX};
use image_storage::{KeyError, KeyLayout};

use crate::signed_url_cache::SignedUrlConfig;

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

    /// Signed URL lifetimes, overridable with `SIGNED_URL_VALIDITY_SECS` and
    /// `SIGNED_URL_CACHE_TTL_SECS`
    ///
    /// The pair is validated when the cache is built.
    #[must_use]
    pub fn signed_url_config(&self) -> SignedUrlConfig {
        let defaults = SignedUrlConfig::default();

        SignedUrlConfig {
            validity: secs_var("SIGNED_URL_VALIDITY_SECS").unwrap_or(defaults.validity),
            cache_ttl: secs_var("SIGNED_URL_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
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
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }
}

fn secs_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|val| val.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
