//! Object key layout
//!
//! Raw uploads live under the input prefix and processed images under the output
//! prefix. Both share the same tail, named `<uploader>_<original filename>`.

use thiserror::Error;

/// Default prefix for raw uploads
pub const DEFAULT_INPUT_PREFIX: &str = "img/before/";

/// Default prefix for processed images
pub const DEFAULT_OUTPUT_PREFIX: &str = "img/after/";

/// Uploader tag used when a filename carries no separator
pub const UNKNOWN_UPLOADER: &str = "Unknown";

/// Separates the uploader tag from the original filename
pub const UPLOADER_SEPARATOR: char = '_';

/// Extensions accepted by the resize pipeline (compared lowercase)
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Errors raised when a key does not have the expected shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key is missing a required prefix or has an empty tail
    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey {
        /// The offending key
        key: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

/// Classification of an object key with respect to the resize pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Raw upload with a supported image extension
    Process,
    /// Key is not under the input prefix (includes our own output objects)
    OutsideInputPrefix,
    /// Key is under the input prefix but is not a supported image
    UnsupportedFormat,
}

/// Prefix layout of the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    input_prefix: String,
    output_prefix: String,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            input_prefix: DEFAULT_INPUT_PREFIX.to_string(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

impl KeyLayout {
    /// Creates a layout from explicit prefixes
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidKey` if a prefix is empty or if one prefix
    /// contains the other, which would make output objects re-trigger the pipeline.
    pub fn new(
        input_prefix: impl Into<String>,
        output_prefix: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let input_prefix = input_prefix.into();
        let output_prefix = output_prefix.into();

        if input_prefix.is_empty() {
            return Err(KeyError::InvalidKey {
                key: input_prefix,
                reason: "input prefix must not be empty",
            });
        }
        if output_prefix.is_empty() {
            return Err(KeyError::InvalidKey {
                key: output_prefix,
                reason: "output prefix must not be empty",
            });
        }
        if input_prefix.starts_with(&output_prefix) || output_prefix.starts_with(&input_prefix) {
            return Err(KeyError::InvalidKey {
                key: output_prefix,
                reason: "input and output prefixes must not overlap",
            });
        }

        Ok(Self {
            input_prefix,
            output_prefix,
        })
    }

    /// Prefix of raw uploads
    #[must_use]
    pub fn input_prefix(&self) -> &str {
        &self.input_prefix
    }

    /// Prefix of processed images
    #[must_use]
    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    /// Decides whether an object key should go through the resize pipeline
    #[must_use]
    pub fn classify(&self, key: &str) -> KeyClass {
        if !key.starts_with(&self.input_prefix) {
            return KeyClass::OutsideInputPrefix;
        }

        match extension(key) {
            Some(ext) if is_allowed_extension(ext) => KeyClass::Process,
            _ => KeyClass::UnsupportedFormat,
        }
    }

    /// Maps `img/before/<tail>` to `img/after/<tail>`
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidKey` if the key is not under the input prefix
    /// or has nothing after it.
    pub fn derive_output_key(&self, input_key: &str) -> Result<String, KeyError> {
        let tail = input_key
            .strip_prefix(&self.input_prefix)
            .ok_or_else(|| KeyError::InvalidKey {
                key: input_key.to_string(),
                reason: "missing input prefix",
            })?;

        if tail.is_empty() {
            return Err(KeyError::InvalidKey {
                key: input_key.to_string(),
                reason: "empty filename",
            });
        }

        Ok(format!("{}{tail}", self.output_prefix))
    }

    /// Returns the filename of a processed object, `None` if the key is outside
    /// the output prefix or is the prefix itself
    #[must_use]
    pub fn filename_of_output<'a>(&self, output_key: &'a str) -> Option<&'a str> {
        output_key
            .strip_prefix(&self.output_prefix)
            .filter(|filename| !filename.is_empty())
    }
}

/// Returns the uploader tag embedded in a filename, or [`UNKNOWN_UPLOADER`]
#[must_use]
pub fn extract_uploader_tag(filename: &str) -> &str {
    filename
        .split_once(UPLOADER_SEPARATOR)
        .map_or(UNKNOWN_UPLOADER, |(uploader, _)| uploader)
}

/// Extension of the last path segment, without the dot
fn extension(key: &str) -> Option<&str> {
    let segment = key.rsplit('/').next().unwrap_or(key);
    segment.rsplit_once('.').map(|(_, ext)| ext)
}

fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
}
