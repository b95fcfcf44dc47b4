//! Core types for the decode pipeline.

use thiserror::Error;

/// Error types for decode operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The data is not a recognized image format.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image data is corrupted or incomplete.
    #[error("Corrupted or incomplete image data: {0}")]
    CorruptedData(String),

    /// A decode allocation exceeded the memory budget. Recoverable: the
    /// caller escalates the sample size and retries.
    #[error("Out of memory during decoding")]
    OutOfMemory,

    /// The source identifier could not be opened.
    #[error("I/O error: {0}")]
    Io(String),

    /// The requested decode region lies outside the image.
    #[error("Decode region outside the image bounds")]
    RegionOutOfBounds,

    /// Out-of-memory recovery ran out of sample sizes. Terminal.
    #[error("Sample size escalation exhausted at {0}")]
    SampleSizeExhausted(u32),
}

/// Hard ceiling for decode and transform allocations.
///
/// The pipeline recovers from exceeding the budget by decoding at a larger
/// sample size, so the budget is what turns "arbitrarily large source image"
/// into "bounded peak memory". The default is unlimited; hosts with a real
/// ceiling construct one at startup and pass it by reference through the
/// pipeline. Checks are against the output buffer an operation is about to
/// allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryBudget {
    max_bytes: Option<usize>,
}

impl MemoryBudget {
    /// No ceiling; every allocation passes.
    pub fn unlimited() -> Self {
        Self { max_bytes: None }
    }

    /// Cap pixel-buffer allocations at `max_bytes`.
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes: Some(max_bytes),
        }
    }

    /// Check an RGB8 allocation of `width * height` pixels.
    pub fn check(&self, width: u32, height: u32) -> Result<(), DecodeError> {
        if let Some(max) = self.max_bytes {
            let bytes = width as usize * height as usize * 3;
            if bytes > max {
                return Err(DecodeError::OutOfMemory);
            }
        }
        Ok(())
    }
}

/// A decoded image with RGB pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    /// Length should be width * height * 3.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Create a new DecodedImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width * height * 3) as usize,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a DecodedImage from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert to an image::RgbImage for further processing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Get the size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// Row-by-row copy of a sub-rectangle. The rectangle must lie inside
    /// the image.
    pub fn sub_image(&self, region: crate::geometry::rect::ImageRect) -> DecodedImage {
        let out_width = region.width();
        let out_height = region.height();
        let mut pixels = Vec::with_capacity((out_width * out_height * 3) as usize);
        for y in 0..out_height {
            let src_y = region.top + y;
            let start = ((src_y * self.width + region.left) * 3) as usize;
            let end = start + (out_width * 3) as usize;
            pixels.extend_from_slice(&self.pixels[start..end]);
        }
        DecodedImage::new(out_width, out_height, pixels)
    }
}

/// A decoded buffer together with the sample size that produced it.
///
/// Any image-space coordinate (crop points, region rectangles) must be
/// divided by `sample_size` before being applied to `image`.
#[derive(Debug, Clone)]
pub struct SampledImage {
    pub image: DecodedImage,
    pub sample_size: u32,
}

/// The initial whole-image load: the sampled buffer, the sample size it
/// was decoded at, and the rotation baked into the source metadata.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: DecodedImage,
    pub sample_size: u32,
    /// Rotation (degrees, clockwise) recorded by the source's EXIF
    /// orientation tag.
    pub degrees_rotated: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_image_creation() {
        let pixels = vec![0u8; 100 * 50 * 3];
        let img = DecodedImage::new(100, 50, pixels);

        assert_eq!(img.width, 100);
        assert_eq!(img.height, 50);
        assert_eq!(img.pixel_count(), 5000);
        assert_eq!(img.byte_size(), 15000);
        assert!(!img.is_empty());
    }

    #[test]
    fn test_decoded_image_empty() {
        let img = DecodedImage::new(0, 0, vec![]);
        assert!(img.is_empty());
    }

    #[test]
    fn test_sub_image_copies_rows() {
        use crate::geometry::rect::ImageRect;

        // 4x4 image whose red channel encodes the pixel index
        let pixels: Vec<u8> = (0..16).flat_map(|i| [i as u8, 0, 0]).collect();
        let img = DecodedImage::new(4, 4, pixels);
        let sub = img.sub_image(ImageRect::new(1, 1, 3, 3));
        assert_eq!((sub.width, sub.height), (2, 2));
        // Source pixel (1, 1) has index 5
        assert_eq!(sub.pixels[0], 5);
        // Source pixel (2, 2) has index 10
        assert_eq!(sub.pixels[(1 * 2 + 1) * 3], 10);
    }

    #[test]
    fn test_rgb_image_round_trip() {
        let img = DecodedImage::new(4, 2, (0..24).collect());
        let rgb = img.to_rgb_image().expect("valid buffer");
        let back = DecodedImage::from_rgb_image(rgb);
        assert_eq!(back, img);
    }

    #[test]
    fn test_unlimited_budget_allows_everything() {
        let budget = MemoryBudget::unlimited();
        assert!(budget.check(100_000, 100_000).is_ok());
    }

    #[test]
    fn test_budget_rejects_oversized_allocation() {
        // 64x64x3 = 12288 bytes
        let budget = MemoryBudget::with_max_bytes(12_288);
        assert!(budget.check(64, 64).is_ok());
        assert!(matches!(budget.check(65, 64), Err(DecodeError::OutOfMemory)));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::SampleSizeExhausted(1024);
        assert_eq!(err.to_string(), "Sample size escalation exhausted at 1024");

        let err = DecodeError::InvalidFormat;
        assert_eq!(err.to_string(), "Invalid or unsupported image format");
    }
}
