use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use backend::{
    gallery::GalleryLister,
    server,
    signed_url_cache::{SignedUrlCache, SignedUrlConfig},
    types::Environment,
};
use chrono::{DateTime, Utc};
use image_storage::{InMemoryObjectStore, KeyLayout, ObjectStore};
use tower::ServiceExt;

pub const TEST_BUCKET: &str = "image-gallery-test";

/// Initialize tracing for tests
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

/// Backend wired to an in-memory bucket
pub struct TestContext {
    pub store: Arc<InMemoryObjectStore>,
    pub cache: Arc<SignedUrlCache>,
    pub gallery: Arc<GalleryLister>,
    pub router: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_environment(Environment::Development)
    }

    pub fn with_environment(environment: Environment) -> Self {
        setup_test_env();

        let store = Arc::new(InMemoryObjectStore::new(TEST_BUCKET));
        let dyn_store: Arc<dyn ObjectStore> = store.clone();

        let cache = Arc::new(
            SignedUrlCache::new(Arc::clone(&dyn_store), SignedUrlConfig::default())
                .expect("Invalid cache config"),
        );
        let gallery = Arc::new(GalleryLister::new(
            dyn_store,
            KeyLayout::default(),
            Arc::clone(&cache),
        ));
        let router = server::router(environment, Arc::clone(&gallery));

        Self {
            store,
            cache,
            gallery,
            router,
        }
    }

    /// Seeds a processed image under the output prefix
    pub fn add_processed(&self, filename: &str, created_at: DateTime<Utc>) {
        self.store.insert(
            format!("img/after/{filename}"),
            b"jpeg".to_vec(),
            "image/jpeg",
            created_at,
        );
    }

    /// Sends a GET request through the router
    pub async fn send_get_request(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}
