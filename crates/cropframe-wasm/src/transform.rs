//! WASM bindings for pixel operations on in-memory images.
//!
//! The browser host decodes images itself (canvas, `createImageBitmap`), so
//! the bindings only cover the in-memory pipeline path: crop the current
//! selection out of a buffer, resize a buffer, and encode a result.

use cropframe_core::decode::{DecodeError, ImageReader};
use cropframe_core::encode::{encode_image, EncodeError, OutputFormat, OutputSink};
use cropframe_core::pipeline::execute;
use cropframe_core::transform::resize_output;
use cropframe_core::{CropSource, MemoryBudget, SizeMode, SourceOpener};
use wasm_bindgen::prelude::*;

use crate::session::CropSession;
use crate::types::JsDecodedImage;

fn js_error(message: impl ToString) -> JsValue {
    JsValue::from_str(&message.to_string())
}

/// No streamable sources exist in the browser host.
struct NoSource;

impl SourceOpener for NoSource {
    fn open(&self, id: &str) -> Result<Box<dyn ImageReader>, DecodeError> {
        Err(DecodeError::Io(format!("no stream source for {id}")))
    }
}

/// Saving goes through the returned bytes, never a sink.
struct NoSink;

impl OutputSink for NoSink {
    fn write(&self, destination: &str, _bytes: &[u8]) -> Result<(), EncodeError> {
        Err(EncodeError::WriteFailed {
            destination: destination.to_string(),
            reason: "no sink in the browser host".to_string(),
        })
    }
}

/// Crop the session's current selection out of an in-memory image.
///
/// `image` must be the same buffer the session was sized with
/// (`set_image`). The crop applies the session's rotation and flips and
/// honors its output-size options.
#[wasm_bindgen]
pub fn crop_image(
    image: &JsDecodedImage,
    session: &CropSession,
) -> Result<JsDecodedImage, JsValue> {
    let request = session
        .view()
        .crop_request(CropSource::Memory(image.to_decoded()), None)
        .ok_or_else(|| js_error("no image set on the session"))?;
    let output = execute(&request, &NoSource, &MemoryBudget::unlimited(), &NoSink)
        .map_err(js_error)?;
    output
        .image
        .map(JsDecodedImage::from_decoded)
        .ok_or_else(|| js_error("crop produced no buffer"))
}

/// Resize an image with the given mode.
///
/// Modes: 0 = none, 1 = sampling only, 2 = fit inside (downscale only),
/// 3 = fit (always scale), 4 = exact.
#[wasm_bindgen]
pub fn resize_image(
    image: &JsDecodedImage,
    width: u32,
    height: u32,
    mode: u8,
) -> JsDecodedImage {
    let mode = match mode {
        1 => SizeMode::Sampling,
        2 => SizeMode::ResizeInside,
        3 => SizeMode::ResizeFit,
        4 => SizeMode::ResizeExact,
        _ => SizeMode::None,
    };
    let resized = resize_output(image.to_decoded(), width, height, mode);
    JsDecodedImage::from_decoded(resized)
}

/// Encode an image to JPEG (`"jpeg"`) or PNG (`"png"`) bytes.
#[wasm_bindgen]
pub fn encode_result(
    image: &JsDecodedImage,
    format: &str,
    quality: u8,
) -> Result<Vec<u8>, JsValue> {
    let format = match format {
        "png" => OutputFormat::Png,
        _ => OutputFormat::Jpeg,
    };
    encode_image(&image.to_decoded(), format, quality).map_err(js_error)
}
