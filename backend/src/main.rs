use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use backend::{
    gallery::GalleryLister, server, signed_url_cache::SignedUrlCache, types::Environment,
};
use image_storage::{ObjectStore, S3ObjectStore};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // Use JSON format for staging/production, regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::new(s3_client, environment.s3_bucket()));

    let cache = Arc::new(SignedUrlCache::new(
        Arc::clone(&store),
        environment.signed_url_config(),
    )?);
    let gallery = Arc::new(GalleryLister::new(store, environment.key_layout()?, cache));

    server::start(environment, gallery).await
}
