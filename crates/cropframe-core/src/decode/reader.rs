//! Decode capabilities and the built-in byte-stream reader.
//!
//! The pipeline never talks to an image codec directly; it goes through the
//! [`SourceOpener`] / [`ImageReader`] capability pair so hosts can supply
//! their own decoding (a browser, a test double, a thumbnail cache).
//! [`BytesReader`] is the built-in implementation over the `image` crate,
//! and [`FsSource`] opens identifiers as filesystem paths.

use std::io::Cursor;

use exif::{In, Reader as ExifReader, Tag};
use image::ImageReader as FormatReader;

use super::types::{DecodeError, DecodedImage, MemoryBudget};
use crate::geometry::rect::ImageRect;

/// A positioned, re-readable image source.
///
/// `sample_size` is an integer power-of-two downscale factor; a decode at
/// sample size `n` returns a buffer whose dimensions are the source's
/// divided by `n`. Implementations signal a blown memory ceiling with
/// [`DecodeError::OutOfMemory`]; the sampled-decode loops recover from it.
pub trait ImageReader {
    /// The source dimensions without decoding pixel data.
    fn decode_bounds(&mut self) -> Result<(u32, u32), DecodeError>;

    /// Decode the whole image at the given sample size.
    fn decode_whole(&mut self, sample_size: u32) -> Result<DecodedImage, DecodeError>;

    /// Decode only `region` (source pixels) at the given sample size.
    fn decode_region(
        &mut self,
        region: ImageRect,
        sample_size: u32,
    ) -> Result<DecodedImage, DecodeError>;

    /// Rotation (clockwise degrees) baked into the source metadata.
    fn orientation_degrees(&mut self) -> i32 {
        0
    }
}

/// Opens a byte stream by identifier.
pub trait SourceOpener: Send + Sync {
    fn open(&self, id: &str) -> Result<Box<dyn ImageReader>, DecodeError>;
}

/// Built-in reader over an in-memory encoded image (JPEG or PNG).
pub struct BytesReader {
    bytes: Vec<u8>,
    budget: MemoryBudget,
}

impl BytesReader {
    pub fn new(bytes: Vec<u8>, budget: MemoryBudget) -> Self {
        Self { bytes, budget }
    }

    fn decode_full(&self) -> Result<DecodedImage, DecodeError> {
        let reader = FormatReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Io(e.to_string()))?;
        let img = reader
            .decode()
            .map_err(|e| DecodeError::CorruptedData(e.to_string()))?;
        Ok(DecodedImage::from_rgb_image(img.into_rgb8()))
    }
}

impl ImageReader for BytesReader {
    fn decode_bounds(&mut self) -> Result<(u32, u32), DecodeError> {
        let reader = FormatReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Io(e.to_string()))?;
        reader
            .into_dimensions()
            .map_err(|e| DecodeError::CorruptedData(e.to_string()))
    }

    fn decode_whole(&mut self, sample_size: u32) -> Result<DecodedImage, DecodeError> {
        let sample_size = sample_size.max(1);
        let (width, height) = self.decode_bounds()?;
        let out_width = (width / sample_size).max(1);
        let out_height = (height / sample_size).max(1);
        self.budget.check(out_width, out_height)?;

        let full = self.decode_full()?;
        Ok(subsample(&full, sample_size))
    }

    fn decode_region(
        &mut self,
        region: ImageRect,
        sample_size: u32,
    ) -> Result<DecodedImage, DecodeError> {
        let sample_size = sample_size.max(1);
        let (width, height) = self.decode_bounds()?;
        if region.is_empty() || region.right > width || region.bottom > height {
            return Err(DecodeError::RegionOutOfBounds);
        }
        let out_width = (region.width() / sample_size).max(1);
        let out_height = (region.height() / sample_size).max(1);
        self.budget.check(out_width, out_height)?;

        let full = self.decode_full()?;
        let cropped = full.sub_image(region);
        Ok(subsample(&cropped, sample_size))
    }

    fn orientation_degrees(&mut self) -> i32 {
        let mut cursor = Cursor::new(&self.bytes);
        match ExifReader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif
                .get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
                .map(|value| match value {
                    3 => 180,
                    6 => 90,
                    8 => 270,
                    _ => 0,
                })
                .unwrap_or(0),
            Err(_) => 0,
        }
    }
}

/// Opens identifiers as filesystem paths.
pub struct FsSource {
    budget: MemoryBudget,
}

impl FsSource {
    pub fn new(budget: MemoryBudget) -> Self {
        Self { budget }
    }
}

impl SourceOpener for FsSource {
    fn open(&self, id: &str) -> Result<Box<dyn ImageReader>, DecodeError> {
        let bytes = std::fs::read(id).map_err(|e| DecodeError::Io(e.to_string()))?;
        Ok(Box::new(BytesReader::new(bytes, self.budget)))
    }
}

/// Nearest row/column subsampling by an integer factor.
fn subsample(image: &DecodedImage, sample_size: u32) -> DecodedImage {
    if sample_size <= 1 {
        return image.clone();
    }
    let out_width = (image.width / sample_size).max(1);
    let out_height = (image.height / sample_size).max(1);
    let mut pixels = Vec::with_capacity((out_width * out_height * 3) as usize);
    for y in 0..out_height {
        let src_y = (y * sample_size).min(image.height - 1);
        for x in 0..out_width {
            let src_x = (x * sample_size).min(image.width - 1);
            let idx = ((src_y * image.width + src_x) * 3) as usize;
            pixels.extend_from_slice(&image.pixels[idx..idx + 3]);
        }
    }
    DecodedImage::new(out_width, out_height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    /// Encode a gradient test image as PNG bytes.
    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 7])
        });
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_bounds() {
        let mut reader = BytesReader::new(png_bytes(64, 48), MemoryBudget::unlimited());
        assert_eq!(reader.decode_bounds().unwrap(), (64, 48));
    }

    #[test]
    fn test_decode_whole_full_resolution() {
        let mut reader = BytesReader::new(png_bytes(16, 16), MemoryBudget::unlimited());
        let img = reader.decode_whole(1).unwrap();
        assert_eq!((img.width, img.height), (16, 16));
        // PNG decode is lossless, so pixel (3, 5) carries its coordinates
        let idx = ((5 * 16 + 3) * 3) as usize;
        assert_eq!(&img.pixels[idx..idx + 3], &[3, 5, 7]);
    }

    #[test]
    fn test_decode_whole_sampled() {
        let mut reader = BytesReader::new(png_bytes(16, 16), MemoryBudget::unlimited());
        let img = reader.decode_whole(4).unwrap();
        assert_eq!((img.width, img.height), (4, 4));
        // Nearest subsampling: output (1, 1) comes from source (4, 4)
        let idx = ((16 / 4 + 1) * 3) as usize;
        assert_eq!(&img.pixels[idx..idx + 3], &[4, 4, 7]);
    }

    #[test]
    fn test_decode_region() {
        let mut reader = BytesReader::new(png_bytes(16, 16), MemoryBudget::unlimited());
        let img = reader
            .decode_region(ImageRect::new(2, 3, 10, 11), 1)
            .unwrap();
        assert_eq!((img.width, img.height), (8, 8));
        assert_eq!(&img.pixels[0..3], &[2, 3, 7]);
    }

    #[test]
    fn test_decode_region_out_of_bounds() {
        let mut reader = BytesReader::new(png_bytes(16, 16), MemoryBudget::unlimited());
        let result = reader.decode_region(ImageRect::new(8, 8, 24, 24), 1);
        assert!(matches!(result, Err(DecodeError::RegionOutOfBounds)));
    }

    #[test]
    fn test_budget_produces_out_of_memory() {
        // 16x16x3 = 768 bytes; cap below that
        let mut reader = BytesReader::new(png_bytes(16, 16), MemoryBudget::with_max_bytes(500));
        assert!(matches!(
            reader.decode_whole(1),
            Err(DecodeError::OutOfMemory)
        ));
        // Sample size 2 shrinks the allocation under the cap
        assert!(reader.decode_whole(2).is_ok());
    }

    #[test]
    fn test_garbage_bytes_are_invalid() {
        let mut reader = BytesReader::new(vec![0u8; 64], MemoryBudget::unlimited());
        assert!(reader.decode_bounds().is_err());
    }

    #[test]
    fn test_png_has_no_orientation() {
        let mut reader = BytesReader::new(png_bytes(8, 8), MemoryBudget::unlimited());
        assert_eq!(reader.orientation_degrees(), 0);
    }

    #[test]
    fn test_fs_source_missing_file() {
        let source = FsSource::new(MemoryBudget::unlimited());
        assert!(matches!(
            source.open("/nonexistent/image.jpg"),
            Err(DecodeError::Io(_))
        ));
    }

    #[test]
    fn test_subsample_minimum_dimension() {
        let img = DecodedImage::new(3, 3, vec![1u8; 27]);
        let out = subsample(&img, 8);
        assert_eq!((out.width, out.height), (1, 1));
    }
}
