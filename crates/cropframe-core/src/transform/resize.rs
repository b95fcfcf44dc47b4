//! Output resizing for the crop pipeline.

use serde::{Deserialize, Serialize};

use crate::decode::DecodedImage;

/// How a requested output size is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeMode {
    /// Deliver the crop at whatever resolution the decode produced.
    #[default]
    None,
    /// Use the requested size only to pick the decode sample size; do not
    /// resize the decoded result.
    Sampling,
    /// Downscale (never upscale) so the result fits inside the requested
    /// size, preserving aspect ratio.
    ResizeInside,
    /// Scale so the result fits the requested size, preserving aspect
    /// ratio; upscales smaller results too.
    ResizeFit,
    /// Scale to exactly the requested size, ignoring aspect ratio.
    ResizeExact,
}

impl SizeMode {
    /// Whether this mode performs a resize step at all.
    pub fn resizes(self) -> bool {
        matches!(
            self,
            SizeMode::ResizeInside | SizeMode::ResizeFit | SizeMode::ResizeExact
        )
    }
}

/// Resize a cropped result per the requested mode.
///
/// Degenerate requests (zero target, non-resizing mode) return the input
/// unchanged; a failed resize never loses the crop.
pub fn resize_output(
    image: DecodedImage,
    req_width: u32,
    req_height: u32,
    mode: SizeMode,
) -> DecodedImage {
    if req_width == 0 || req_height == 0 || !mode.resizes() {
        return image;
    }

    let (target_width, target_height) = if mode == SizeMode::ResizeExact {
        (req_width, req_height)
    } else {
        let scale = (image.width as f32 / req_width as f32)
            .max(image.height as f32 / req_height as f32);
        if scale > 1.0 || mode == SizeMode::ResizeFit {
            (
                ((image.width as f32 / scale) as u32).max(1),
                ((image.height as f32 / scale) as u32).max(1),
            )
        } else {
            return image;
        }
    };

    if target_width == image.width && target_height == image.height {
        return image;
    }
    let Some(rgb) = image.to_rgb_image() else {
        return image;
    };
    let resized = image::imageops::resize(
        &rgb,
        target_width,
        target_height,
        image::imageops::FilterType::Triangle,
    );
    DecodedImage::from_rgb_image(resized)
}
