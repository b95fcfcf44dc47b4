//! The view-side orchestrator.
//!
//! `CropView` owns everything that happens on the interaction thread: the
//! display matrix (how the sampled image maps into the view), the crop
//! window and its limits, and the gesture lifecycle. It produces immutable
//! [`CropRequest`] snapshots for the worker and never shares live state
//! with it.
//!
//! # Display matrix
//!
//! The matrix is rebuilt from scratch on every change, in a fixed order:
//! center the image in the view, rotate about the footprint center, scale
//! to fit (FIT_CENTER), apply the flip/zoom scale, then pan by the zoom
//! offsets so the crop window stays covered. A 100-unit probe square mapped
//! through the matrix yields the view scale factors that convert the
//! result-space size limits into view pixels.

use crate::geometry::bounds::calculate_bounds;
use crate::geometry::drag::DragHandler;
use crate::geometry::hit::Handle;
use crate::geometry::matrix::Matrix;
use crate::geometry::rect::{
    points_center_x, points_center_y, points_left, points_right, points_top, points_width,
    points_height, points_bottom, ImageRect, RectF,
};
use crate::geometry::window::CropWindow;
use crate::options::{ConfigError, CropOptions};
use crate::pipeline::{CropRequest, CropSource, OutputSpec};
use crate::transform::compose::rect_from_points;
use crate::transform::resize::SizeMode;

/// The loaded (sampled) image the view is displaying.
#[derive(Debug, Clone, Copy)]
struct ImageState {
    /// Sampled buffer dimensions.
    width: u32,
    height: u32,
    /// Sample size the buffer was decoded at; original dimensions are the
    /// sampled ones multiplied by this.
    sample_size: u32,
}

/// Everything a crop completion reports about the geometry it used.
#[derive(Debug, Clone)]
pub struct CropCompletion {
    /// Selection corners in original-image pixels.
    pub crop_points: [f32; 8],
    /// Axis-aligned selection in original-image pixels.
    pub crop_rect: ImageRect,
    /// The full original image extent.
    pub whole_image_rect: ImageRect,
    pub rotation_degrees: i32,
    /// Sample size the result pixels were decoded at.
    pub sample_size_used: u32,
}

/// Interactive crop state for one view instance.
#[derive(Debug, Clone)]
pub struct CropView {
    options: CropOptions,
    window: CropWindow,
    image: Option<ImageState>,
    view_width: f32,
    view_height: f32,
    degrees_rotated: i32,
    flip_horizontally: bool,
    flip_vertically: bool,
    zoom: f32,
    zoom_offset_x: f32,
    zoom_offset_y: f32,
    matrix: Matrix,
    /// Image corners mapped into view space.
    footprint: [f32; 8],
    /// A 100-unit square mapped into view space; measures the scale.
    scale_probe: [f32; 8],
    drag: Option<DragHandler>,
}

impl CropView {
    /// Validate the configuration and build an empty view.
    pub fn new(options: CropOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let mut window = CropWindow::default();
        window.apply_options(&options);
        Ok(Self {
            options,
            window,
            image: None,
            view_width: 0.0,
            view_height: 0.0,
            degrees_rotated: 0,
            flip_horizontally: false,
            flip_vertically: false,
            zoom: 1.0,
            zoom_offset_x: 0.0,
            zoom_offset_y: 0.0,
            matrix: Matrix::identity(),
            footprint: [0.0; 8],
            scale_probe: [0.0; 8],
            drag: None,
        })
    }

    pub fn options(&self) -> &CropOptions {
        &self.options
    }

    pub fn window_rect(&self) -> RectF {
        self.window.rect()
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.degrees_rotated
    }

    pub fn is_flipped_horizontally(&self) -> bool {
        self.flip_horizontally
    }

    pub fn is_flipped_vertically(&self) -> bool {
        self.flip_vertically
    }

    pub fn sample_size(&self) -> u32 {
        self.image.map(|i| i.sample_size).unwrap_or(1)
    }

    /// Image corners in view space.
    pub fn footprint(&self) -> [f32; 8] {
        self.footprint
    }

    /// The size of the view hosting the image.
    pub fn set_view_size(&mut self, width: f32, height: f32) {
        self.view_width = width;
        self.view_height = height;
        self.apply_matrix(true);
    }

    /// Adopt a freshly loaded (sampled) image.
    ///
    /// Resets the window, zoom and pan; `degrees_rotated` is the rotation
    /// baked into the source metadata (plus any initial rotation the host
    /// wants applied).
    pub fn set_image(&mut self, width: u32, height: u32, sample_size: u32, degrees_rotated: i32) {
        self.image = Some(ImageState {
            width,
            height,
            sample_size: sample_size.max(1),
        });
        self.window.reset();
        self.window.set_initial_rect(None);
        self.degrees_rotated = degrees_rotated.rem_euclid(360);
        self.flip_horizontally = self.options.flip_horizontally;
        self.flip_vertically = self.options.flip_vertically;
        self.zoom = 1.0;
        self.zoom_offset_x = 0.0;
        self.zoom_offset_y = 0.0;
        self.matrix.reset();
        self.apply_matrix(true);
    }

    /// Drop the image and all geometry derived from it.
    pub fn clear_image(&mut self) {
        self.image = None;
        self.window.reset();
        self.matrix.reset();
        self.footprint = [0.0; 8];
        self.scale_probe = [0.0; 8];
        self.drag = None;
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Original (un-sampled) image extent.
    pub fn whole_image_rect(&self) -> Option<ImageRect> {
        let image = self.image?;
        Some(ImageRect::new(
            0,
            0,
            image.width * image.sample_size,
            image.height * image.sample_size,
        ))
    }

    /// Selection corners in original-image pixels: the window rect pulled
    /// back through the display matrix and scaled by the sample size.
    pub fn crop_points(&self) -> [f32; 8] {
        let mut points = self.window.rect().corner_points();
        if let Some(inverse) = self.matrix.invert() {
            inverse.map_points(&mut points);
        }
        let sample = self.sample_size() as f32;
        for value in &mut points {
            *value *= sample;
        }
        points
    }

    /// Axis-aligned selection in original-image pixels.
    pub fn crop_rect(&self) -> Option<ImageRect> {
        let whole = self.whole_image_rect()?;
        Some(rect_from_points(
            &self.crop_points(),
            whole.width(),
            whole.height(),
            self.window.is_fixed_aspect(),
            self.window.aspect_x(),
            self.window.aspect_y(),
        ))
    }

    /// Set the window from a rectangle in original-image pixels.
    pub fn set_crop_rect(&mut self, rect: Option<ImageRect>) {
        self.window.set_initial_rect(rect);
        if self.window.is_initialized() {
            self.window
                .init_window(&self.footprint, self.view_width, self.view_height);
        }
    }

    /// Re-derive the window from scratch (initial placement rules).
    pub fn reset_crop_rect(&mut self) {
        if self.window.is_initialized() {
            self.window
                .init_window(&self.footprint, self.view_width, self.view_height);
        }
    }

    /// Change the aspect lock; re-places the window when one is active.
    pub fn set_aspect(
        &mut self,
        fixed: bool,
        aspect_x: f32,
        aspect_y: f32,
    ) -> Result<(), ConfigError> {
        if aspect_x <= 0.0 || aspect_y <= 0.0 {
            return Err(ConfigError::InvalidAspectRatio);
        }
        self.window.set_aspect(fixed, aspect_x, aspect_y);
        if self.window.is_initialized() {
            self.window
                .init_window(&self.footprint, self.view_width, self.view_height);
        }
        Ok(())
    }

    /// Rotate the displayed image to an absolute angle.
    pub fn set_rotation_degrees(&mut self, degrees: i32) {
        let normalized = degrees.rem_euclid(360);
        if normalized != self.degrees_rotated {
            self.degrees_rotated = normalized;
            self.apply_matrix(true);
            self.window
                .fix_current_rect(&self.footprint, self.view_width, self.view_height);
        }
    }

    /// Rotate relative to the current angle.
    pub fn rotate_by(&mut self, degrees: i32) {
        self.set_rotation_degrees(self.degrees_rotated + degrees);
    }

    pub fn set_flipped_horizontally(&mut self, flipped: bool) {
        if self.flip_horizontally != flipped {
            self.flip_horizontally = flipped;
            self.apply_matrix(true);
        }
    }

    pub fn set_flipped_vertically(&mut self, flipped: bool) {
        if self.flip_vertically != flipped {
            self.flip_vertically = flipped;
            self.apply_matrix(true);
        }
    }

    /// Magnification above the fit-to-view scale, >= 1.
    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = zoom.max(1.0);
        if zoom != self.zoom {
            self.zoom = zoom;
            self.apply_matrix(true);
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Begin a gesture. Returns the engaged handle, if any.
    pub fn press(&mut self, x: f32, y: f32) -> Option<Handle> {
        self.drag = self
            .window
            .grab(x, y, self.options.touch_radius, self.options.shape);
        self.drag.as_ref().map(|handler| handler.handle())
    }

    /// Move the active gesture's pointer. Returns false when no gesture is
    /// active.
    pub fn drag_to(&mut self, x: f32, y: f32) -> bool {
        let Some(handler) = self.drag.as_mut() else {
            return false;
        };
        let mut rect = self.window.rect();
        let (bounds, rotated) = calculate_bounds(&self.footprint, rect);
        // Tightened bounds are exact; snapping onto them would jump.
        let snap_margin = if rotated {
            0.0
        } else {
            self.options.snap_radius
        };
        handler.drag(
            &mut rect,
            x,
            y,
            bounds,
            self.view_width,
            self.view_height,
            snap_margin,
            self.window.is_fixed_aspect(),
            self.window.target_aspect_ratio(),
        );
        self.window.set_rect(rect);
        true
    }

    /// End the gesture. Returns whether one was active.
    pub fn release(&mut self) -> bool {
        self.drag.take().is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether a crop should go back to the streamable source rather than
    /// the displayed buffer.
    ///
    /// The displayed buffer is full-resolution only when it was loaded at
    /// sample size 1; otherwise (or when sampling is explicitly requested)
    /// re-decoding from the source yields a sharper result.
    pub fn prefers_stream_source(&self) -> bool {
        self.sample_size() > 1 || self.options.size_mode == SizeMode::Sampling
    }

    /// Snapshot the current geometry into an immutable crop request.
    ///
    /// Returns `None` until an image is set. The requested output size is
    /// dropped when the size mode performs no resize, mirroring how the
    /// options surface treats it.
    pub fn crop_request(
        &self,
        source: CropSource,
        output: Option<OutputSpec>,
    ) -> Option<CropRequest> {
        let image = self.image?;
        let use_requested_size =
            self.options.size_mode != SizeMode::None;
        Some(CropRequest {
            source,
            points: self.crop_points(),
            degrees_rotated: self.degrees_rotated,
            org_width: image.width * image.sample_size,
            org_height: image.height * image.sample_size,
            fixed_aspect: self.window.is_fixed_aspect(),
            aspect_x: self.window.aspect_x(),
            aspect_y: self.window.aspect_y(),
            req_width: if use_requested_size {
                self.options.output_width
            } else {
                0
            },
            req_height: if use_requested_size {
                self.options.output_height
            } else {
                0
            },
            flip_horizontally: self.flip_horizontally,
            flip_vertically: self.flip_vertically,
            size_mode: self.options.size_mode,
            output,
        })
    }

    /// Geometry record accompanying a finished crop.
    pub fn completion(&self, sample_size_used: u32) -> Option<CropCompletion> {
        Some(CropCompletion {
            crop_points: self.crop_points(),
            crop_rect: self.crop_rect()?,
            whole_image_rect: self.whole_image_rect()?,
            rotation_degrees: self.degrees_rotated,
            sample_size_used,
        })
    }

    /// Rebuild the display matrix and push the derived state (footprint,
    /// scale factors, window limits) into the crop window.
    ///
    /// `center` recenters the pan offsets on the crop window; passing false
    /// keeps the current pan and only clamps it.
    fn apply_matrix(&mut self, center: bool) {
        let Some(image) = self.image else {
            return;
        };
        let (width, height) = (self.view_width, self.view_height);
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        // Keep the crop window attached to the image content: pull it back
        // to image space under the old matrix, push it forward under the
        // new one.
        let inverse = self.matrix.invert().unwrap_or_else(Matrix::identity);
        let crop_rect = inverse.map_rect(self.window.rect());

        self.matrix.reset();
        self.matrix.post_translate(
            (width - image.width as f32) / 2.0,
            (height - image.height as f32) / 2.0,
        );
        self.map_image_points(image);

        if self.degrees_rotated > 0 {
            self.matrix.post_rotate(
                self.degrees_rotated as f32,
                points_center_x(&self.footprint),
                points_center_y(&self.footprint),
            );
            self.map_image_points(image);
        }

        let fit_scale = (width / points_width(&self.footprint))
            .min(height / points_height(&self.footprint));
        self.matrix.post_scale(
            fit_scale,
            fit_scale,
            points_center_x(&self.footprint),
            points_center_y(&self.footprint),
        );
        self.map_image_points(image);

        let scale_x = if self.flip_horizontally {
            -self.zoom
        } else {
            self.zoom
        };
        let scale_y = if self.flip_vertically {
            -self.zoom
        } else {
            self.zoom
        };
        self.matrix.post_scale(
            scale_x,
            scale_y,
            points_center_x(&self.footprint),
            points_center_y(&self.footprint),
        );
        self.map_image_points(image);

        let mut crop_rect = self.matrix.map_rect(crop_rect);

        if center {
            self.zoom_offset_x = if width > points_width(&self.footprint) {
                0.0
            } else {
                (width / 2.0 - crop_rect.center_x())
                    .min(-points_left(&self.footprint))
                    .max(width - points_right(&self.footprint))
                    / scale_x
            };
            self.zoom_offset_y = if height > points_height(&self.footprint) {
                0.0
            } else {
                (height / 2.0 - crop_rect.center_y())
                    .min(-points_top(&self.footprint))
                    .max(height - points_bottom(&self.footprint))
                    / scale_y
            };
        } else {
            self.zoom_offset_x = (self.zoom_offset_x * scale_x)
                .max(-crop_rect.left)
                .min(-crop_rect.right + width)
                / scale_x;
            self.zoom_offset_y = (self.zoom_offset_y * scale_y)
                .max(-crop_rect.top)
                .min(-crop_rect.bottom + height)
                / scale_y;
        }

        self.matrix
            .post_translate(self.zoom_offset_x * scale_x, self.zoom_offset_y * scale_y);
        crop_rect.offset(self.zoom_offset_x * scale_x, self.zoom_offset_y * scale_y);
        self.window.set_rect(crop_rect);
        self.map_image_points(image);

        self.update_window_limits(image);
    }

    fn map_image_points(&mut self, image: ImageState) {
        self.footprint =
            RectF::new(0.0, 0.0, image.width as f32, image.height as f32).corner_points();
        self.matrix.map_points(&mut self.footprint);
        self.scale_probe = RectF::new(0.0, 0.0, 100.0, 100.0).corner_points();
        self.matrix.map_points(&mut self.scale_probe);
    }

    /// Derive the view scale factors from the probe square and hand the
    /// window its limits; place the window if it has none yet.
    fn update_window_limits(&mut self, image: ImageState) {
        let sample = image.sample_size as f32;
        let scale_factor_x = 100.0 * sample / points_width(&self.scale_probe).abs();
        let scale_factor_y = 100.0 * sample / points_height(&self.scale_probe).abs();
        self.window
            .set_window_limits(self.view_width, self.view_height, scale_factor_x, scale_factor_y);
        if !self.window.is_initialized() || self.window.rect().is_empty() {
            self.window
                .init_window(&self.footprint, self.view_width, self.view_height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::hit::CropShape;

    fn view_with_image() -> CropView {
        let mut view = CropView::new(CropOptions::default()).unwrap();
        view.set_view_size(200.0, 160.0);
        view.set_image(100, 80, 1, 0);
        view
    }

    const EPS: f32 = 1e-2;

    #[test]
    fn test_new_rejects_invalid_options() {
        let mut options = CropOptions::default();
        options.aspect_ratio_x = 0.0;
        assert!(CropView::new(options).is_err());
    }

    #[test]
    fn test_fit_center_fills_view() {
        let view = view_with_image();
        let footprint = view.footprint();
        assert!((points_left(&footprint) - 0.0).abs() < EPS);
        assert!((points_top(&footprint) - 0.0).abs() < EPS);
        assert!((points_right(&footprint) - 200.0).abs() < EPS);
        assert!((points_bottom(&footprint) - 160.0).abs() < EPS);
    }

    #[test]
    fn test_initial_window_is_padded_footprint() {
        let view = view_with_image();
        let rect = view.window_rect();
        assert!((rect.left - 20.0).abs() < EPS);
        assert!((rect.top - 16.0).abs() < EPS);
        assert!((rect.right - 180.0).abs() < EPS);
        assert!((rect.bottom - 144.0).abs() < EPS);
    }

    #[test]
    fn test_crop_points_scale_by_sample_size() {
        let mut view = CropView::new(CropOptions::default()).unwrap();
        view.set_view_size(200.0, 160.0);
        // Sampled 100x80 buffer at sample size 2: the original is 400x320...
        view.set_image(100, 80, 2, 0);

        let points = view.crop_points();
        // Window (20,16)-(180,144) in view space maps to (10,8)-(90,72) in
        // sampled space, times the sample size of 2.
        assert!((points[0] - 20.0).abs() < EPS, "x0 was {}", points[0]);
        assert!((points[1] - 16.0).abs() < EPS);
        assert!((points[4] - 180.0).abs() < EPS);
        assert!((points[5] - 144.0).abs() < EPS);

        let rect = view.crop_rect().unwrap();
        assert_eq!(rect, ImageRect::new(20, 16, 180, 144));
        assert_eq!(view.whole_image_rect().unwrap(), ImageRect::new(0, 0, 200, 160));
    }

    #[test]
    fn test_rotation_90_swaps_footprint() {
        let mut view = view_with_image();
        view.set_rotation_degrees(90);
        let footprint = view.footprint();
        // 100x80 image rotated: 80x100 aspect fitted into 200x160 gives a
        // 128x160 footprint centered horizontally.
        assert!((points_width(&footprint) - 128.0).abs() < 0.1);
        assert!((points_height(&footprint) - 160.0).abs() < 0.1);
        assert!((points_left(&footprint) - 36.0).abs() < 0.1);
    }

    #[test]
    fn test_gesture_moves_window() {
        let mut view = view_with_image();
        let handle = view.press(20.0, 16.0);
        assert_eq!(handle, Some(Handle::TopLeft));
        assert!(view.is_dragging());

        assert!(view.drag_to(40.0, 30.0));
        let rect = view.window_rect();
        assert!((rect.left - 40.0).abs() < EPS);
        assert!((rect.top - 30.0).abs() < EPS);

        assert!(view.release());
        assert!(!view.is_dragging());
        assert!(!view.drag_to(50.0, 50.0));
    }

    #[test]
    fn test_press_outside_engages_nothing() {
        let mut view = view_with_image();
        // The window occupies (20,16)-(180,144); far corner is empty
        assert_eq!(view.press(199.0, 159.0), None);
        assert!(!view.is_dragging());
    }

    #[test]
    fn test_oval_shape_always_engages() {
        let mut options = CropOptions::default();
        options.shape = CropShape::Oval;
        let mut view = CropView::new(options).unwrap();
        view.set_view_size(200.0, 160.0);
        view.set_image(100, 80, 1, 0);
        assert!(view.press(1.0, 1.0).is_some());
    }

    #[test]
    fn test_flip_preserves_window_size() {
        let mut view = view_with_image();
        let before = view.window_rect();
        view.set_flipped_horizontally(true);
        let after = view.window_rect();
        assert!((before.width() - after.width()).abs() < EPS);
        assert!((before.height() - after.height()).abs() < EPS);
        assert!(view.is_flipped_horizontally());
    }

    #[test]
    fn test_set_crop_rect_places_window() {
        let mut view = view_with_image();
        view.set_crop_rect(Some(ImageRect::new(20, 20, 60, 60)));
        let rect = view.crop_rect().unwrap();
        // Fit scale 2 against sample size 2 gives scale factors of exactly
        // 1, so the placement round-trips through view space unchanged.
        assert_eq!(rect, ImageRect::new(20, 20, 60, 60));
    }

    #[test]
    fn test_crop_request_snapshot() {
        let mut view = view_with_image();
        view.set_rotation_degrees(90);
        let request = view
            .crop_request(CropSource::Stream("img".to_string()), None)
            .unwrap();
        assert_eq!(request.degrees_rotated, 90);
        assert_eq!(request.org_width, 100);
        assert_eq!(request.org_height, 80);
        // Default size mode performs no resize, so the requested size is
        // dropped from the snapshot.
        assert_eq!((request.req_width, request.req_height), (0, 0));
    }

    #[test]
    fn test_completion_record() {
        let view = view_with_image();
        let completion = view.completion(2).unwrap();
        assert_eq!(completion.sample_size_used, 2);
        assert_eq!(completion.whole_image_rect, ImageRect::new(0, 0, 100, 80));
        assert_eq!(completion.rotation_degrees, 0);
    }

    #[test]
    fn test_stream_source_preference() {
        let mut view = view_with_image();
        // Loaded at sample size 1: the buffer is full resolution
        assert!(!view.prefers_stream_source());
        view.set_image(100, 80, 4, 0);
        assert!(view.prefers_stream_source());
    }

    #[test]
    fn test_no_image_yields_no_request() {
        let view = CropView::new(CropOptions::default()).unwrap();
        assert!(view
            .crop_request(CropSource::Stream("img".to_string()), None)
            .is_none());
        assert!(view.crop_rect().is_none());
    }

    #[test]
    fn test_clear_image_resets_geometry() {
        let mut view = view_with_image();
        view.clear_image();
        assert!(!view.has_image());
        assert!(view.window_rect().is_empty());
    }
}


#[cfg(test)]
impl CropView {
    /// Test hook: install a window rect without running placement rules.
    pub(crate) fn force_window_rect(&mut self, rect: RectF) {
        self.window.set_rect(rect);
    }

    /// Test hook: the current display matrix.
    pub(crate) fn matrix_for_tests(&self) -> Matrix {
        self.matrix
    }
}
