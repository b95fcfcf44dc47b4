//! The interactive crop session exposed to JavaScript.
//!
//! A `CropSession` wraps the core `CropView`: the host feeds it the view
//! size, the loaded image's dimensions, and pointer events, and reads back
//! the window rectangle and the crop geometry. All methods are synchronous;
//! drive them from the UI thread (or a single worker) only.

use cropframe_core::{CropOptions, CropView, ImageRect};
use wasm_bindgen::prelude::*;

fn js_error(message: impl ToString) -> JsValue {
    JsValue::from_str(&message.to_string())
}

/// Interactive crop-window state for one image.
///
/// # Example (TypeScript)
///
/// ```typescript
/// const session = new CropSession({ fixed_aspect_ratio: true,
///                                   aspect_ratio_x: 16, aspect_ratio_y: 9 });
/// session.set_view_size(canvas.width, canvas.height);
/// session.set_image(bitmap.width, bitmap.height, 1, 0);
///
/// canvas.onpointerdown = (e) => session.press(e.offsetX, e.offsetY);
/// canvas.onpointermove = (e) => { if (session.drag(e.offsetX, e.offsetY)) redraw(); };
/// canvas.onpointerup = () => session.release();
/// ```
#[wasm_bindgen]
pub struct CropSession {
    view: CropView,
}

#[wasm_bindgen]
impl CropSession {
    /// Create a session from a configuration object (all fields optional;
    /// pass `undefined` for the defaults). Invalid configurations throw.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<CropSession, JsValue> {
        let options: CropOptions = if options.is_undefined() || options.is_null() {
            CropOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(js_error)?
        };
        let view = CropView::new(options).map_err(js_error)?;
        Ok(CropSession { view })
    }

    /// Size of the hosting view in CSS/view pixels.
    pub fn set_view_size(&mut self, width: f32, height: f32) {
        self.view.set_view_size(width, height);
    }

    /// Adopt a loaded image: sampled buffer dimensions, the sample size it
    /// was decoded at, and the rotation baked into its metadata.
    pub fn set_image(&mut self, width: u32, height: u32, sample_size: u32, degrees_rotated: i32) {
        self.view.set_image(width, height, sample_size, degrees_rotated);
    }

    /// Begin a gesture. Returns the engaged handle name (for cursor
    /// feedback) or `undefined` when the press hits nothing.
    pub fn press(&mut self, x: f32, y: f32) -> Result<JsValue, JsValue> {
        match self.view.press(x, y) {
            Some(handle) => serde_wasm_bindgen::to_value(&handle).map_err(js_error),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Move the active gesture's pointer. Returns whether the window
    /// changed (i.e. a gesture is active).
    pub fn drag(&mut self, x: f32, y: f32) -> bool {
        self.view.drag_to(x, y)
    }

    /// End the gesture. Returns whether one was active.
    pub fn release(&mut self) -> bool {
        self.view.release()
    }

    /// The crop window in view coordinates, as `{left, top, right, bottom}`.
    pub fn window_rect(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.view.window_rect()).map_err(js_error)
    }

    /// The image footprint corners in view coordinates (8 floats).
    pub fn footprint(&self) -> Vec<f32> {
        self.view.footprint().to_vec()
    }

    /// Selection corners in original-image pixels (8 floats).
    pub fn crop_points(&self) -> Vec<f32> {
        self.view.crop_points().to_vec()
    }

    /// Axis-aligned selection in original-image pixels, or `undefined`
    /// before an image is set.
    pub fn crop_rect(&self) -> Result<JsValue, JsValue> {
        match self.view.crop_rect() {
            Some(rect) => serde_wasm_bindgen::to_value(&rect).map_err(js_error),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Place the window from a rectangle in original-image pixels.
    pub fn set_crop_rect(&mut self, left: u32, top: u32, right: u32, bottom: u32) {
        self.view
            .set_crop_rect(Some(ImageRect::new(left, top, right, bottom)));
    }

    /// Re-derive the window from the initial placement rules.
    pub fn reset_crop_rect(&mut self) {
        self.view.reset_crop_rect();
    }

    /// Change the aspect lock. Throws on a non-positive ratio.
    pub fn set_aspect(&mut self, fixed: bool, aspect_x: f32, aspect_y: f32) -> Result<(), JsValue> {
        self.view.set_aspect(fixed, aspect_x, aspect_y).map_err(js_error)
    }

    pub fn set_rotation_degrees(&mut self, degrees: i32) {
        self.view.set_rotation_degrees(degrees);
    }

    pub fn rotate_by(&mut self, degrees: i32) {
        self.view.rotate_by(degrees);
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.view.rotation_degrees()
    }

    pub fn set_flipped_horizontally(&mut self, flipped: bool) {
        self.view.set_flipped_horizontally(flipped);
    }

    pub fn set_flipped_vertically(&mut self, flipped: bool) {
        self.view.set_flipped_vertically(flipped);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.view.set_zoom(zoom);
    }

    pub fn sample_size(&self) -> u32 {
        self.view.sample_size()
    }
}

impl CropSession {
    /// Internal access for the pixel operations in [`crate::transform`].
    pub(crate) fn view(&self) -> &CropView {
        &self.view
    }
}
