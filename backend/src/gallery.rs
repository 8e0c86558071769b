//! Gallery listing
//!
//! Enumerates processed images under the output prefix and pairs each with a
//! cached signed URL and the uploader tag embedded in its filename.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use image_storage::{extract_uploader_tag, KeyLayout, ObjectStore, StorageError};
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::signed_url_cache::SignedUrlCache;

/// One processed image as shown to viewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct GalleryEntry {
    /// Filename under the output prefix
    pub filename: String,
    /// Time-limited download URL
    pub url: String,
    /// Uploader tag taken from the filename, or `Unknown`
    pub uploader: String,
    /// When the processed image was written; orders the listing
    #[serde(skip)]
    #[schemars(skip)]
    pub created_at: DateTime<Utc>,
}

/// Errors that abort a listing
#[derive(Error, Debug)]
pub enum GalleryError {
    /// The object store failed while enumerating the output prefix
    #[error("failed to enumerate processed images after {listed} entries: {source}")]
    Enumeration {
        /// Entries collected before the failure
        listed: usize,
        /// Storage failure
        #[source]
        source: StorageError,
    },
}

/// Builds the gallery from the object store and the signed URL cache
pub struct GalleryLister {
    store: Arc<dyn ObjectStore>,
    layout: KeyLayout,
    cache: Arc<SignedUrlCache>,
}

impl GalleryLister {
    /// Creates a new lister
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, layout: KeyLayout, cache: Arc<SignedUrlCache>) -> Self {
        Self {
            store,
            layout,
            cache,
        }
    }

    /// Lists every processed image, oldest first
    ///
    /// Images whose URL cannot be signed are left out and logged. Entries with
    /// the same creation time keep their enumeration order.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::Enumeration` if the store fails mid-listing
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        let mut objects = self.store.list(self.layout.output_prefix());
        let mut entries = Vec::new();
        let mut omitted = 0_usize;

        while let Some(object) = objects.next().await {
            let object = match object {
                Ok(object) => object,
                Err(source) => {
                    error!(listed = entries.len(), error = %source, "Listing aborted");
                    return Err(GalleryError::Enumeration {
                        listed: entries.len(),
                        source,
                    });
                }
            };

            let Some(filename) = self.layout.filename_of_output(&object.key) else {
                continue;
            };

            match self.cache.get(&object.key).await {
                Ok(url) => entries.push(GalleryEntry {
                    filename: filename.to_string(),
                    url,
                    uploader: extract_uploader_tag(filename).to_string(),
                    created_at: object.created_at,
                }),
                Err(e) => {
                    omitted += 1;
                    warn!(key = %object.key, error = %e, "Omitting image without a signed URL");
                }
            }
        }

        entries.sort_by_key(|entry| entry.created_at);
        info!(count = entries.len(), omitted, "Listed gallery");

        Ok(entries)
    }
}
