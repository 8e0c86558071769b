use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_storage::{InMemoryObjectStore, KeyLayout, UploadEvent, UploadMessage};
use resize_worker::pipeline::Pipeline;
use resize_worker::transform::{TransformSettings, Transformer};
use resize_worker::worker::event_processor::EventProcessor;

pub const TEST_BUCKET: &str = "image-gallery-test";

/// Encodes a gradient test image in `format`
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x * y) % 239) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .expect("Failed to encode test image");
    buf.into_inner()
}

/// Small JPEG whose frame header claims `width`x`height`
pub fn jpeg_declaring(width: u16, height: u16) -> Vec<u8> {
    let mut jpeg = encoded_image(16, 16, ImageFormat::Jpeg);
    let sof = jpeg
        .windows(2)
        .position(|marker| marker == [0xFF, 0xC0])
        .expect("No SOF0 marker in test JPEG");
    jpeg[sof + 5..sof + 7].copy_from_slice(&height.to_be_bytes());
    jpeg[sof + 7..sof + 9].copy_from_slice(&width.to_be_bytes());
    jpeg
}

/// Decodes a JPEG and returns its dimensions
pub fn jpeg_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .expect("Output is not a JPEG");
    (img.width(), img.height())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("resize_worker=debug")
        .with_test_writer()
        .try_init();
}

/// Pipeline over an in-memory bucket with the default layout and settings
pub struct TestContext {
    pub store: Arc<InMemoryObjectStore>,
    pub pipeline: Arc<Pipeline>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(TransformSettings::default())
    }

    pub fn with_settings(settings: TransformSettings) -> Self {
        init_tracing();

        let store = Arc::new(InMemoryObjectStore::new(TEST_BUCKET));
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            KeyLayout::default(),
            Transformer::new(settings).expect("Invalid test settings"),
        ));

        Self { store, pipeline }
    }

    /// Seeds an upload under `key`
    pub fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) {
        self.store.insert(key, body, content_type, Utc::now());
    }

    pub fn event(&self, key: &str) -> UploadEvent {
        UploadEvent::new(TEST_BUCKET, key)
    }

    pub fn message(&self, keys: &[&str]) -> UploadMessage {
        UploadMessage {
            body: keys.iter().map(|key| self.event(key)).collect(),
            receipt_handle: "receipt-handle".to_string(),
            message_id: "message-id".to_string(),
        }
    }

    pub fn processor(&self, event_timeout: Duration) -> EventProcessor {
        EventProcessor::new(0, Arc::clone(&self.pipeline), event_timeout)
    }
}
