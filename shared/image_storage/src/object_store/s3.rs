//! S3-backed object store

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::{
    error::{DisplayErrorContext, SdkError},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client as S3Client,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use super::{ObjectStore, ObjectSummary, StorageError, StorageResult};

/// Object store client for one S3 bucket
pub struct S3ObjectStore {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3ObjectStore {
    /// Creates a new S3 object store
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client (retries and timeouts live here)
    /// * `bucket_name` - Bucket holding both raw uploads and processed images
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> StorageResult<(Vec<ObjectSummary>, Option<String>)> {
        let output = self
            .s3_client
            .list_objects_v2()
            .bucket(&self.bucket_name)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await?;

        let page = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                let created_at = object
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
                    .unwrap_or_default();
                Some(ObjectSummary { key, created_at })
            })
            .collect::<Vec<_>>();

        debug!(
            bucket = %self.bucket_name,
            prefix = %prefix,
            count = page.len(),
            "Listed object page"
        );

        Ok((
            page,
            output.next_continuation_token().map(ToString::to_string),
        ))
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let result = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_no_such_key() => {
                return Err(StorageError::NotFound {
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let body = output.body.collect().await.map_err(|e| {
            StorageError::BackendUnavailable(format!("read body of {key}: {e}"))
        })?;

        Ok(body.into_bytes())
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await?;

        Ok(())
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StorageResult<ObjectSummary>> {
        // `None` state ends the stream, `Some(token)` fetches the next page
        stream::try_unfold(Some(None), move |state: Option<Option<String>>| async move {
            let Some(token) = state else {
                return Ok::<_, StorageError>(None);
            };

            let (page, next_token) = self.list_page(prefix, token).await?;
            let entries = stream::iter(page.into_iter().map(Ok::<_, StorageError>));

            Ok(Some((entries, next_token.map(Some))))
        })
        .try_flatten()
        .boxed()
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let presigning_config =
            PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Signing {
                key: key.to_string(),
                reason: format!("invalid presigning config: {e}"),
            })?;

        let presigned = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::Signing {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(presigned.uri().to_string())
    }
}
