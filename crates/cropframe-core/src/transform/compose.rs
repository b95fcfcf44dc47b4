//! Compositing: the rotate/flip/scale transform and the residual crop.
//!
//! The composite path mirrors how the selection reaches pixels: derive the
//! axis-aligned crop rectangle from the selection corners, copy it out,
//! apply one affine stage (rotate about the center, then flip/scale), and,
//! when the rotation is not a multiple of 90 degrees, trim the over-selected
//! coarse result down to the exact rotated selection with a trigonometric
//! residual crop. Representing non-rectangular intermediate selections is
//! avoided entirely.

use crate::decode::{DecodeError, DecodedImage, MemoryBudget};
use crate::geometry::rect::{
    points_bottom, points_left, points_right, points_top, ImageRect,
};

/// Axis-aligned hull of the selection corners, clamped to the image.
///
/// With a locked square ratio the longer side is shrunk to match, anchored
/// at the top-left, so a selection distorted by rounding still crops square.
pub fn rect_from_points(
    points: &[f32; 8],
    image_width: u32,
    image_height: u32,
    fix_aspect: bool,
    aspect_x: f32,
    aspect_y: f32,
) -> ImageRect {
    let left = points_left(points).max(0.0).round() as u32;
    let top = points_top(points).max(0.0).round() as u32;
    let right = (points_right(points).round() as i64).clamp(0, image_width as i64) as u32;
    let bottom = (points_bottom(points).round() as i64).clamp(0, image_height as i64) as u32;
    let mut rect = ImageRect::new(left.min(right), top.min(bottom), right, bottom);
    if fix_aspect {
        fix_rect_for_aspect(&mut rect, aspect_x, aspect_y);
    }
    rect
}

/// Shrink the longer side of a square-locked rectangle to match the
/// shorter, anchored at the top-left. Non-square locks are handled by the
/// geometry before the points reach the pipeline.
fn fix_rect_for_aspect(rect: &mut ImageRect, aspect_x: f32, aspect_y: f32) {
    if aspect_x == aspect_y && rect.width() != rect.height() {
        if rect.height() > rect.width() {
            rect.bottom -= rect.height() - rect.width();
        } else {
            rect.right -= rect.width() - rect.height();
        }
    }
}

/// Bounding-box dimensions of an image rotated by `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: i32) -> (u32, u32) {
    match degrees.rem_euclid(360) {
        0 | 180 => (width, height),
        90 | 270 => (height, width),
        normalized => {
            let rad = (normalized as f64).to_radians();
            let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
            let w = width as f64;
            let h = height as f64;
            let new_w = (w * cos + h * sin).round() as u32;
            let new_h = (w * sin + h * cos).round() as u32;
            (new_w.max(1), new_h.max(1))
        }
    }
}

/// Rotate clockwise by `degrees` about the image center, expanding the
/// canvas to hold the result. Right angles take the exact paths; arbitrary
/// angles resample bilinearly.
pub fn rotate(
    image: &DecodedImage,
    degrees: i32,
    budget: &MemoryBudget,
) -> Result<DecodedImage, DecodeError> {
    let normalized = degrees.rem_euclid(360);
    if normalized == 0 {
        return Ok(image.clone());
    }
    let (dst_w, dst_h) = rotated_bounds(image.width, image.height, normalized);
    budget.check(dst_w, dst_h)?;

    let rgb = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedData("pixel buffer mismatch".to_string()))?;
    match normalized {
        90 => return Ok(DecodedImage::from_rgb_image(image::imageops::rotate90(&rgb))),
        180 => return Ok(DecodedImage::from_rgb_image(image::imageops::rotate180(&rgb))),
        270 => return Ok(DecodedImage::from_rgb_image(image::imageops::rotate270(&rgb))),
        _ => {}
    }

    // Inverse mapping: for each destination pixel find the source position
    // under the opposite rotation and sample bilinearly.
    let rad = (normalized as f64).to_radians();
    let (sin, cos) = rad.sin_cos();
    let src_cx = image.width as f64 / 2.0;
    let src_cy = image.height as f64 / 2.0;
    let dst_cx = dst_w as f64 / 2.0;
    let dst_cy = dst_h as f64 / 2.0;

    let mut output = vec![0u8; (dst_w * dst_h * 3) as usize];
    for dst_y in 0..dst_h {
        for dst_x in 0..dst_w {
            let dx = dst_x as f64 - dst_cx;
            let dy = dst_y as f64 - dst_cy;
            // Clockwise screen rotation inverts to this source position
            let src_x = dx * cos + dy * sin + src_cx;
            let src_y = -dx * sin + dy * cos + src_cy;

            let dst_idx = ((dst_y * dst_w + dst_x) * 3) as usize;
            let pixel = sample_bilinear(image, src_x, src_y);
            output[dst_idx] = pixel[0];
            output[dst_idx + 1] = pixel[1];
            output[dst_idx + 2] = pixel[2];
        }
    }
    Ok(DecodedImage::new(dst_w, dst_h, output))
}

/// Sample a pixel with bilinear interpolation; out-of-bounds reads black.
fn sample_bilinear(image: &DecodedImage, x: f64, y: f64) -> [u8; 3] {
    let (w, h) = (image.width as i64, image.height as i64);
    if x < 0.0 || x >= (w - 1) as f64 || y < 0.0 || y >= (h - 1) as f64 {
        return [0, 0, 0];
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let pixel_at = |px: usize, py: usize| -> [f64; 3] {
        let idx = (py * image.width as usize + px) * 3;
        [
            image.pixels[idx] as f64,
            image.pixels[idx + 1] as f64,
            image.pixels[idx + 2] as f64,
        ]
    };

    let p00 = pixel_at(x0, y0);
    let p10 = pixel_at(x0 + 1, y0);
    let p01 = pixel_at(x0, y0 + 1);
    let p11 = pixel_at(x0 + 1, y0 + 1);

    let mut result = [0u8; 3];
    for i in 0..3 {
        let value = p00[i] * (1.0 - fx) * (1.0 - fy)
            + p10[i] * fx * (1.0 - fy)
            + p01[i] * (1.0 - fx) * fy
            + p11[i] * fx * fy;
        result[i] = value.clamp(0.0, 255.0).round() as u8;
    }
    result
}

/// Mirror horizontally and/or vertically.
pub fn flip(
    image: DecodedImage,
    horizontally: bool,
    vertically: bool,
) -> Result<DecodedImage, DecodeError> {
    if !horizontally && !vertically {
        return Ok(image);
    }
    let mut rgb = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedData("pixel buffer mismatch".to_string()))?;
    if horizontally {
        image::imageops::flip_horizontal_in_place(&mut rgb);
    }
    if vertically {
        image::imageops::flip_vertical_in_place(&mut rgb);
    }
    Ok(DecodedImage::from_rgb_image(rgb))
}

/// Rotate, then mirror.
pub fn rotate_and_flip(
    image: DecodedImage,
    degrees: i32,
    flip_horizontally: bool,
    flip_vertically: bool,
    budget: &MemoryBudget,
) -> Result<DecodedImage, DecodeError> {
    let rotated = if degrees.rem_euclid(360) != 0 {
        rotate(&image, degrees, budget)?
    } else {
        image
    };
    flip(rotated, flip_horizontally, flip_vertically)
}

/// Bilinear downscale to exact dimensions. The caller has already cleared
/// the allocation with the budget.
fn downscale_to(
    image: DecodedImage,
    width: u32,
    height: u32,
) -> Result<DecodedImage, DecodeError> {
    if width == image.width && height == image.height {
        return Ok(image);
    }
    let rgb = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedData("pixel buffer mismatch".to_string()))?;
    let resized = image::imageops::resize(&rgb, width, height, image::imageops::FilterType::Triangle);
    Ok(DecodedImage::from_rgb_image(resized))
}

/// Crop the selection out of an in-memory image and apply the transform.
///
/// `points` are the selection corners in the same pixel space as `image`.
/// `scale` (<= 1) shrinks the output; the OOM-retry wrapper in the pipeline
/// lowers it when the budget rejects a full-size composite.
#[allow(clippy::too_many_arguments)]
pub fn crop_with_transform(
    image: &DecodedImage,
    points: &[f32; 8],
    degrees: i32,
    fix_aspect: bool,
    aspect_x: f32,
    aspect_y: f32,
    scale: f32,
    flip_horizontally: bool,
    flip_vertically: bool,
    budget: &MemoryBudget,
) -> Result<DecodedImage, DecodeError> {
    let rect = rect_from_points(
        points,
        image.width,
        image.height,
        fix_aspect,
        aspect_x,
        aspect_y,
    );
    if rect.is_empty() {
        return Err(DecodeError::RegionOutOfBounds);
    }

    // The scale is applied before rotation so that a lowered scale shrinks
    // every allocation the budget sees; the OOM-retry loop relies on this
    // to converge.
    let scaled_width = ((rect.width() as f32 * scale) as u32).max(1);
    let scaled_height = ((rect.height() as f32 * scale) as u32).max(1);
    budget.check(scaled_width, scaled_height)?;

    let mut working = image.sub_image(rect);
    if scale < 1.0 {
        working = downscale_to(working, scaled_width, scaled_height)?;
    }
    working = rotate_and_flip(working, degrees, flip_horizontally, flip_vertically, budget)?;

    if degrees.rem_euclid(90) != 0 {
        // Residual-crop coordinates live in the (possibly scaled) crop
        // space, so both the points and the hull follow the scale.
        let mut scaled_points = *points;
        for value in &mut scaled_points {
            *value *= scale;
        }
        let scaled_rect = ImageRect::new(
            (rect.left as f32 * scale) as u32,
            (rect.top as f32 * scale) as u32,
            (rect.right as f32 * scale) as u32,
            (rect.bottom as f32 * scale) as u32,
        );
        working = crop_for_rotated_image(
            &working,
            &scaled_points,
            scaled_rect,
            degrees,
            fix_aspect,
            aspect_x,
            aspect_y,
        );
    }
    Ok(working)
}

/// Residual crop after a non-right-angle rotation.
///
/// The coarse matrix crop over-selects (it crops the axis-aligned hull and
/// rotates it). This finds the selection corner sitting on the hull's
/// relevant vertical edge and projects its distance to the hull edges
/// through the rotation angle, yielding the exact selection window inside
/// the rotated canvas.
pub fn crop_for_rotated_image(
    image: &DecodedImage,
    points: &[f32; 8],
    rect: ImageRect,
    degrees: i32,
    fix_aspect: bool,
    aspect_x: f32,
    aspect_y: f32,
) -> DecodedImage {
    let degrees = degrees.rem_euclid(360);
    if degrees % 90 == 0 {
        return image.clone();
    }
    let rads = (degrees as f64).to_radians();
    let compare_to = if degrees < 90 || (degrees > 180 && degrees < 270) {
        rect.left
    } else {
        rect.right
    } as f32;

    let mut adj_left = 0u32;
    let mut adj_top = 0u32;
    let mut width = 0u32;
    let mut height = 0u32;
    for i in (0..8).step_by(2) {
        if points[i] >= compare_to - 1.0 && points[i] <= compare_to + 1.0 {
            let corner_y = points[i + 1] as f64;
            adj_left = (rads.sin() * (rect.bottom as f64 - corner_y)).abs() as u32;
            adj_top = (rads.cos() * (corner_y - rect.top as f64)).abs() as u32;
            width = ((corner_y - rect.top as f64) / rads.sin()).abs() as u32;
            height = ((rect.bottom as f64 - corner_y) / rads.cos()).abs() as u32;
            break;
        }
    }
    if width == 0 || height == 0 {
        return image.clone();
    }

    let mut residual = ImageRect::new(adj_left, adj_top, adj_left + width, adj_top + height);
    if fix_aspect {
        fix_rect_for_aspect(&mut residual, aspect_x, aspect_y);
    }
    // Keep the window inside the rotated canvas
    residual.right = residual.right.min(image.width);
    residual.bottom = residual.bottom.min(image.height);
    residual.left = residual.left.min(residual.right);
    residual.top = residual.top.min(residual.bottom);
    if residual.is_empty() {
        return image.clone();
    }
    image.sub_image(residual)
}
