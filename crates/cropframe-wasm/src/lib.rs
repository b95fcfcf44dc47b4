//! Cropframe WASM - WebAssembly bindings for the Cropframe crop engine
//!
//! This crate exposes the cropframe-core functionality to
//! JavaScript/TypeScript applications: an interactive crop session driven
//! by pointer events, and the in-memory crop/resize/encode pipeline.
//!
//! # Module Structure
//!
//! - `session` - the interactive crop session (geometry, gestures)
//! - `types` - WASM-compatible wrapper types for image data
//! - `transform` - crop, resize and encode operations on buffers
//!
//! # Usage
//!
//! ```typescript
//! import init, { CropSession, crop_image } from '@cropframe/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const session = new CropSession(undefined);
//! session.set_view_size(800, 600);
//! session.set_image(image.width, image.height, 1, 0);
//! // ...drive press/drag/release from pointer events...
//! const cropped = crop_image(image, session);
//! ```

use wasm_bindgen::prelude::*;

mod session;
mod transform;
mod types;

// Re-export public types
pub use session::CropSession;
pub use transform::{crop_image, encode_result, resize_image};
pub use types::JsDecodedImage;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    // Future: set up a panic hook for better error messages in the browser
    // console when the console_error_panic_hook feature is added
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
