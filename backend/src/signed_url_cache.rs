//! Cache of time-limited download URLs
//!
//! Each URL is signed for [`SignedUrlConfig::validity`] but only served from the
//! cache for [`SignedUrlConfig::cache_ttl`], so a viewer never receives a URL
//! that is about to expire. Regeneration is single-flight per key: while one
//! caller signs a fresh URL, concurrent callers get the previous URL if it is
//! still valid, or wait for the new one otherwise.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use image_storage::{ObjectStore, StorageError, StorageResult};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Lifetimes of signed URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedUrlConfig {
    /// How long a signed URL grants access
    pub validity: Duration,
    /// How long a signed URL is served from the cache; shorter than `validity`
    pub cache_ttl: Duration,
}

impl Default for SignedUrlConfig {
    fn default() -> Self {
        Self {
            validity: Duration::from_secs(60 * 60),
            cache_ttl: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    url: String,
    /// Served from the cache until this instant
    expires_at: Instant,
    /// The URL stops working at this instant
    valid_until: Instant,
}

/// Object key to signed URL cache, safe to share between request handlers
pub struct SignedUrlCache {
    store: Arc<dyn ObjectStore>,
    config: SignedUrlConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SignedUrlCache {
    /// Creates an empty cache
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Config` if `cache_ttl` is zero or not strictly
    /// shorter than `validity`
    pub fn new(store: Arc<dyn ObjectStore>, config: SignedUrlConfig) -> StorageResult<Self> {
        if config.cache_ttl.is_zero() || config.cache_ttl >= config.validity {
            return Err(StorageError::Config(format!(
                "signed URL cache TTL ({:?}) must be non-zero and shorter than the URL validity ({:?})",
                config.cache_ttl, config.validity
            )));
        }

        Ok(Self {
            store,
            config,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        })
    }

    /// Returns a signed URL for `key`, signing a new one if the cached entry has
    /// passed its TTL
    ///
    /// If signing fails while the previous URL is still valid, that URL is
    /// returned instead. Failures are not cached; the next call signs again.
    ///
    /// # Errors
    ///
    /// Returns the store's `StorageError::Signing` if no valid URL is cached and
    /// a new one cannot be produced
    pub async fn get(&self, key: &str) -> StorageResult<String> {
        let stale = {
            let entries = self.entries.read().await;
            let now = Instant::now();
            match entries.get(key) {
                Some(entry) if now < entry.expires_at => return Ok(entry.url.clone()),
                Some(entry) if now < entry.valid_until => Some(entry.url.clone()),
                _ => None,
            }
        };

        let lock = self.inflight_lock(key);
        let guard = match (Arc::clone(&lock).try_lock_owned(), stale) {
            (Ok(guard), _) => guard,
            (Err(_), Some(url)) => {
                debug!(key, "Serving stale URL while another request re-signs");
                return Ok(url);
            }
            (Err(_), None) => Arc::clone(&lock).lock_owned().await,
        };

        let result = match self.refresh(key).await {
            Ok(url) => Ok(url),
            Err(e) => match self.still_valid(key).await {
                Some(url) => {
                    warn!(key, error = %e, "Re-signing failed, serving previous URL");
                    Ok(url)
                }
                None => Err(e),
            },
        };

        drop(guard);
        self.release_inflight(key, &lock);

        result
    }

    /// Signs a new URL unless a caller that held the lock before us already did
    async fn refresh(&self, key: &str) -> StorageResult<String> {
        if let Some(entry) = self.entries.read().await.get(key) {
            if Instant::now() < entry.expires_at {
                return Ok(entry.url.clone());
            }
        }

        let signed_at = Instant::now();
        let url = self.store.signed_url(key, self.config.validity).await?;
        debug!(key, "Signed new URL");

        self.entries.write().await.insert(
            key.to_string(),
            CacheEntry {
                url: url.clone(),
                expires_at: signed_at + self.config.cache_ttl,
                valid_until: signed_at + self.config.validity,
            },
        );

        Ok(url)
    }

    async fn still_valid(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| Instant::now() < entry.valid_until)
            .map(|entry| entry.url.clone())
    }

    fn inflight_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(inflight.entry(key.to_string()).or_default())
    }

    /// Drops the per-key lock once no other caller is holding or waiting on it
    fn release_inflight(&self, key: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by the caller
        if Arc::strong_count(lock) <= 2 {
            inflight.remove(key);
        }
    }
}
