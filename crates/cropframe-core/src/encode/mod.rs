//! Encoding the crop result and writing it to a destination.
//!
//! The pipeline treats encoding as an opaque final step: pick an encoder by
//! [`OutputFormat`], turn the pixel buffer into bytes, and hand them to the
//! [`OutputSink`] capability. [`FsSink`] writes destinations as filesystem
//! paths.

mod jpeg;
mod png;

pub use jpeg::encode_jpeg;
pub use png::encode_png;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::DecodedImage;

/// Errors that can occur while encoding or writing a result.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The encoder itself failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// The destination could not be written
    #[error("Failed to write destination {destination}: {reason}")]
    WriteFailed {
        destination: String,
        reason: String,
    },
}

/// Container format for encoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

/// Encode a pixel buffer in the requested format.
///
/// `quality` applies to lossy formats and is ignored for PNG.
pub fn encode_image(
    image: &DecodedImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(&image.pixels, image.width, image.height, quality),
        OutputFormat::Png => encode_png(&image.pixels, image.width, image.height),
    }
}

/// Writes encoded bytes to a destination identifier.
pub trait OutputSink: Send + Sync {
    fn write(&self, destination: &str, bytes: &[u8]) -> Result<(), EncodeError>;
}

/// Treats destination identifiers as filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn write(&self, destination: &str, bytes: &[u8]) -> Result<(), EncodeError> {
        std::fs::write(destination, bytes).map_err(|e| EncodeError::WriteFailed {
            destination: destination.to_string(),
            reason: e.to_string(),
        })
    }
}
