use thiserror::Error;

/// Result type alias for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors raised while turning an upload into a thumbnail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Input is not an image in a supported format, or is corrupt
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Source image exceeds the pixel limit
    #[error("source resolution {width}x{height} exceeds the pixel limit")]
    ResolutionTooLarge {
        /// Source width in pixels
        width: u32,
        /// Source height in pixels
        height: u32,
    },

    /// JPEG encoding failed
    #[error("failed to encode JPEG: {0}")]
    Encode(String),

    /// Target dimensions or quality out of range
    #[error("invalid transform settings: {0}")]
    InvalidSettings(String),

    /// The blocking task running the transform panicked or was cancelled
    #[error("transform task failed: {0}")]
    Worker(String),
}
