use std::sync::Arc;

use axum::{Extension, Json};
use tracing::instrument;

use crate::{
    gallery::{GalleryEntry, GalleryLister},
    types::AppError,
};

/// Lists processed images, oldest first
///
/// Each entry carries a time-limited download URL. Images whose URL could not
/// be signed are omitted.
#[instrument(skip(gallery))]
pub async fn list_images(
    Extension(gallery): Extension<Arc<GalleryLister>>,
) -> Result<Json<Vec<GalleryEntry>>, AppError> {
    let entries = gallery.list().await?;
    Ok(Json(entries))
}
