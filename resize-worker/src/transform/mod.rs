//! Thumbnail transform
//!
//! Decodes an upload, applies its EXIF orientation, center-crops it to the target
//! aspect ratio, resizes it to exactly the target size and re-encodes it as JPEG.
//! The result depends only on the input bytes and the settings.

mod error;
pub mod geometry;

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};

pub use error::{TransformError, TransformResult};
pub use geometry::{fill_crop, CropRect};

/// Content type of every transformed image
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Largest source image accepted, in pixels
pub const MAX_PIXELS: u64 = 100_000_000;

/// Largest accepted target width or height
pub const MAX_DIMENSION: u32 = 4096;

/// Target size and encoder quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSettings {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            quality: 85,
        }
    }
}

impl TransformSettings {
    /// Checks dimensions and quality are in range
    ///
    /// # Errors
    ///
    /// Returns `TransformError::InvalidSettings` describing the first bad value
    pub fn validate(&self) -> TransformResult<()> {
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value == 0 || value > MAX_DIMENSION {
                return Err(TransformError::InvalidSettings(format!(
                    "{name} must be between 1 and {MAX_DIMENSION}, got {value}"
                )));
            }
        }
        if !(1..=100).contains(&self.quality) {
            return Err(TransformError::InvalidSettings(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Turns raw uploads into fixed-size JPEG thumbnails
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    settings: TransformSettings,
}

impl Transformer {
    /// Creates a transformer after validating `settings`
    ///
    /// # Errors
    ///
    /// Returns `TransformError::InvalidSettings` if the settings are out of range
    pub fn new(settings: TransformSettings) -> TransformResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Settings this transformer applies
    #[must_use]
    pub const fn settings(&self) -> TransformSettings {
        self.settings
    }

    /// Produces the thumbnail for `raw`
    ///
    /// CPU-bound; call it from a blocking context.
    ///
    /// # Errors
    ///
    /// Returns `Decode` for unsupported or corrupt input, `ResolutionTooLarge`
    /// when the source exceeds [`MAX_PIXELS`] and `Encode` if JPEG encoding fails
    pub fn transform(&self, raw: &[u8]) -> TransformResult<Bytes> {
        let TransformSettings {
            width,
            height,
            quality,
        } = self.settings;

        let img = decode_oriented(raw)?;
        let crop = fill_crop(img.width(), img.height(), width, height);
        let thumbnail = img
            .crop_imm(crop.x, crop.y, crop.width, crop.height)
            .resize_exact(width, height, FilterType::Lanczos3);

        encode_jpeg(&thumbnail, quality).map(Bytes::from)
    }
}

fn decode_oriented(raw: &[u8]) -> TransformResult<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(format!("failed to guess format: {e}")))?;

    if reader.format().is_none() {
        return Err(TransformError::Decode("unrecognized image format".to_string()));
    }

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| TransformError::Decode(e.to_string()))?;

    let (width, height) = decoder.dimensions();
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(TransformError::ResolutionTooLarge { width, height });
    }

    // Missing or unreadable EXIF leaves the pixels as stored
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut img =
        DynamicImage::from_decoder(decoder).map_err(|e| TransformError::Decode(e.to_string()))?;
    img.apply_orientation(orientation);

    Ok(img)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> TransformResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| TransformError::Encode(e.to_string()))?;

    Ok(buf.into_inner())
}
