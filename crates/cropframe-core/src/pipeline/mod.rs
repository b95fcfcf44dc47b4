//! The crop pipeline: from an immutable request snapshot to a result.
//!
//! A [`CropRequest`] captures everything the worker needs at submission
//! time (source, selection corners in original-image pixels, transform
//! flags, output request), so the pipeline never reads live geometry and a
//! drag during an in-flight crop cannot tear the snapshot.
//!
//! Two source paths exist. A streamable source tries a direct region decode
//! first and falls back to a whole-image decode plus software crop; both
//! recover from out-of-memory by escalating sample sizes, and the whole
//! operation retries under a doubling `sample multiplier` (cap 16). An
//! already-decoded in-memory source can only retry the composite itself at
//! successively smaller scales (cap 8).

pub mod task;

use thiserror::Error;

use crate::decode::{
    decode_region_sampled, decode_whole_sampled, DecodeError, DecodedImage, MemoryBudget,
    SampledImage, SourceOpener,
};
use crate::encode::{encode_image, EncodeError, OutputFormat, OutputSink};
use crate::sample;
use crate::transform::compose::{
    crop_for_rotated_image, crop_with_transform, rect_from_points, rotate_and_flip,
};
use crate::transform::resize::{resize_output, SizeMode};

/// Cap for the whole-operation retry multiplier on the stream path.
pub const MAX_SAMPLE_MULTIPLIER: u32 = 16;

/// Cap for the composite-scale retry on the in-memory path.
pub const MAX_TRANSFORM_SCALE: u32 = 8;

/// Terminal pipeline failures.
#[derive(Debug, Error)]
pub enum CropError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The stream path ran out of sample-multiplier doublings.
    #[error("Out-of-memory recovery exhausted the sample multiplier at {0}")]
    SampleMultiplierExhausted(u32),

    /// The in-memory path ran out of composite-scale halvings.
    #[error("Out-of-memory recovery exhausted the transform scale at {0}")]
    TransformScaleExhausted(u32),
}

/// Where the pixels come from.
#[derive(Debug, Clone)]
pub enum CropSource {
    /// An already-decoded buffer; no re-decode is possible.
    Memory(DecodedImage),
    /// An identifier the [`SourceOpener`] can open repeatedly.
    Stream(String),
}

/// Destination and encoder settings for a saved result.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub destination: String,
    pub format: OutputFormat,
    pub quality: u8,
}

/// Immutable snapshot handed to the crop worker.
#[derive(Debug, Clone)]
pub struct CropRequest {
    pub source: CropSource,
    /// Selection corners in original-image pixels (TL, TR, BR, BL).
    pub points: [f32; 8],
    pub degrees_rotated: i32,
    /// Original (un-sampled) source dimensions.
    pub org_width: u32,
    pub org_height: u32,
    pub fixed_aspect: bool,
    pub aspect_x: f32,
    pub aspect_y: f32,
    /// Requested output size; 0 means "as cropped".
    pub req_width: u32,
    pub req_height: u32,
    pub flip_horizontally: bool,
    pub flip_vertically: bool,
    pub size_mode: SizeMode,
    pub output: Option<OutputSpec>,
}

/// A finished crop: either a buffer or a written destination, plus the
/// sample size the pixels were decoded at.
#[derive(Debug, Clone)]
pub struct CropOutput {
    pub image: Option<DecodedImage>,
    pub destination: Option<String>,
    pub sample_size: u32,
}

/// Run a crop request to completion.
pub fn execute(
    request: &CropRequest,
    opener: &dyn SourceOpener,
    budget: &MemoryBudget,
    sink: &dyn OutputSink,
) -> Result<CropOutput, CropError> {
    let sampled = match &request.source {
        CropSource::Stream(id) => crop_from_stream(id, request, opener, budget)?,
        CropSource::Memory(image) => crop_in_memory(image, request, budget)?,
    };

    let resized = resize_output(
        sampled.image,
        request.req_width,
        request.req_height,
        request.size_mode,
    );

    match &request.output {
        Some(spec) => {
            let bytes = encode_image(&resized, spec.format, spec.quality)?;
            sink.write(&spec.destination, &bytes)?;
            Ok(CropOutput {
                image: None,
                destination: Some(spec.destination.clone()),
                sample_size: sampled.sample_size,
            })
        }
        None => Ok(CropOutput {
            image: Some(resized),
            destination: None,
            sample_size: sampled.sample_size,
        }),
    }
}

/// Crop from a streamable source, doubling the sample multiplier while the
/// attempt blows the memory budget.
pub fn crop_from_stream(
    id: &str,
    request: &CropRequest,
    opener: &dyn SourceOpener,
    budget: &MemoryBudget,
) -> Result<SampledImage, CropError> {
    let mut multiplier = 1;
    loop {
        match crop_stream_once(id, request, opener, budget, multiplier) {
            Ok(sampled) => return Ok(sampled),
            Err(DecodeError::OutOfMemory) => {
                multiplier *= 2;
                if multiplier > MAX_SAMPLE_MULTIPLIER {
                    return Err(CropError::SampleMultiplierExhausted(multiplier));
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// One attempt at the stream path: region decode first, whole-image
/// fallback second. An `OutOfMemory` escaping here (from the transform or
/// the fallback decode) bumps the caller's multiplier.
fn crop_stream_once(
    id: &str,
    request: &CropRequest,
    opener: &dyn SourceOpener,
    budget: &MemoryBudget,
    multiplier: u32,
) -> Result<SampledImage, DecodeError> {
    let rect = rect_from_points(
        &request.points,
        request.org_width,
        request.org_height,
        request.fixed_aspect,
        request.aspect_x,
        request.aspect_y,
    );
    if rect.is_empty() {
        return Err(DecodeError::RegionOutOfBounds);
    }
    let req_width = if request.req_width > 0 {
        request.req_width
    } else {
        rect.width()
    };
    let req_height = if request.req_height > 0 {
        request.req_height
    } else {
        rect.height()
    };

    // Strategy 1: decode only the selection. Any failure here (including
    // sample-size exhaustion) falls through to the whole-image strategy.
    let region_attempt = opener
        .open(id)
        .and_then(|mut reader| {
            decode_region_sampled(&mut *reader, rect, req_width, req_height, multiplier)
        });
    if let Ok(sampled) = region_attempt {
        let sample_size = sampled.sample_size;
        let mut image = rotate_and_flip(
            sampled.image,
            request.degrees_rotated,
            request.flip_horizontally,
            request.flip_vertically,
            budget,
        )?;
        if request.degrees_rotated.rem_euclid(90) != 0 {
            let scaled_points = scale_points(&request.points, sample_size);
            image = crop_for_rotated_image(
                &image,
                &scaled_points,
                rect.scaled_down(sample_size),
                request.degrees_rotated,
                request.fixed_aspect,
                request.aspect_x,
                request.aspect_y,
            );
        }
        return Ok(SampledImage { image, sample_size });
    }

    // Strategy 2: decode the whole image downsampled, crop in software.
    let sample_size =
        multiplier * sample::for_requested(rect.width(), rect.height(), req_width, req_height);
    let mut reader = opener.open(id)?;
    let whole = decode_whole_sampled(&mut *reader, sample_size)?;
    let scaled_points = scale_points(&request.points, whole.sample_size);
    let image = crop_with_transform(
        &whole.image,
        &scaled_points,
        request.degrees_rotated,
        request.fixed_aspect,
        request.aspect_x,
        request.aspect_y,
        1.0,
        request.flip_horizontally,
        request.flip_vertically,
        budget,
    )?;
    Ok(SampledImage {
        image,
        sample_size: whole.sample_size,
    })
}

/// Crop an in-memory buffer, halving the composite scale while the
/// transform blows the memory budget.
pub fn crop_in_memory(
    image: &DecodedImage,
    request: &CropRequest,
    budget: &MemoryBudget,
) -> Result<SampledImage, CropError> {
    let mut scale = 1u32;
    loop {
        match crop_with_transform(
            image,
            &request.points,
            request.degrees_rotated,
            request.fixed_aspect,
            request.aspect_x,
            request.aspect_y,
            1.0 / scale as f32,
            request.flip_horizontally,
            request.flip_vertically,
            budget,
        ) {
            Ok(result) => {
                return Ok(SampledImage {
                    image: result,
                    sample_size: scale,
                })
            }
            Err(DecodeError::OutOfMemory) => {
                scale *= 2;
                if scale > MAX_TRANSFORM_SCALE {
                    return Err(CropError::TransformScaleExhausted(scale));
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Divide selection corners by a sample size.
fn scale_points(points: &[f32; 8], sample_size: u32) -> [f32; 8] {
    let mut scaled = *points;
    if sample_size > 1 {
        for value in &mut scaled {
            *value /= sample_size as f32;
        }
    }
    scaled
}
