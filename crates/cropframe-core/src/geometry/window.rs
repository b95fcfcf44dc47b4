//! The crop window: current rectangle, size limits, and placement rules.
//!
//! `CropWindow` is a value holder. It stores the window rectangle in view
//! space together with the size limits and the view scale factors, and it
//! owns the two placement routines (initial placement and the rule-based
//! fix-up). All interactive clamping lives in [`super::drag`]; the window
//! never mutates itself during a gesture beyond `set_rect`.
//!
//! Size limits combine two spaces: *window* limits are view pixels, *result*
//! limits are original-image pixels. The effective limit is the tighter of
//! the two once the result limits are divided by the view scale factors.

use super::bounds::calculate_bounds;
use super::drag::DragHandler;
use super::hit::{hit_test, CropShape, Handle};
use super::rect::{points_bottom, points_left, points_right, points_top, ImageRect, RectF};
use crate::options::CropOptions;

/// Window dimensions below this show no guidelines, and interior presses
/// prioritize the center handle.
const GUIDELINES_MIN_DIMENSION: f32 = 100.0;

/// Aspect drift tolerated by the fix-up rules before re-centering.
const ASPECT_FIX_TOLERANCE: f32 = 0.1;

/// Crop-window state and limits.
#[derive(Debug, Clone)]
pub struct CropWindow {
    rect: RectF,
    min_window_width: f32,
    min_window_height: f32,
    max_window_width: f32,
    max_window_height: f32,
    min_result_width: f32,
    min_result_height: f32,
    max_result_width: f32,
    max_result_height: f32,
    scale_factor_x: f32,
    scale_factor_y: f32,
    fixed_aspect: bool,
    aspect_x: f32,
    aspect_y: f32,
    padding_ratio: f32,
    initial_rect: Option<ImageRect>,
    initialized: bool,
}

impl Default for CropWindow {
    fn default() -> Self {
        Self {
            rect: RectF::default(),
            min_window_width: 42.0,
            min_window_height: 42.0,
            max_window_width: 0.0,
            max_window_height: 0.0,
            min_result_width: 40.0,
            min_result_height: 40.0,
            max_result_width: 99999.0,
            max_result_height: 99999.0,
            scale_factor_x: 1.0,
            scale_factor_y: 1.0,
            fixed_aspect: false,
            aspect_x: 1.0,
            aspect_y: 1.0,
            padding_ratio: 0.1,
            initial_rect: None,
            initialized: false,
        }
    }
}

impl CropWindow {
    /// Adopt the geometry-relevant settings of a validated configuration.
    pub fn apply_options(&mut self, options: &CropOptions) {
        self.min_window_width = options.min_window_width;
        self.min_window_height = options.min_window_height;
        self.min_result_width = options.min_result_width;
        self.min_result_height = options.min_result_height;
        self.max_result_width = options.max_result_width;
        self.max_result_height = options.max_result_height;
        self.fixed_aspect = options.fixed_aspect_ratio;
        self.aspect_x = options.aspect_ratio_x;
        self.aspect_y = options.aspect_ratio_y;
        self.padding_ratio = options.initial_padding_ratio;
    }

    /// The current window rectangle (a copy).
    pub fn rect(&self) -> RectF {
        self.rect
    }

    pub fn set_rect(&mut self, rect: RectF) {
        self.rect = rect;
    }

    /// Effective minimum window width in view pixels.
    pub fn min_crop_width(&self) -> f32 {
        self.min_window_width
            .max(self.min_result_width / self.scale_factor_x)
    }

    /// Effective minimum window height in view pixels.
    pub fn min_crop_height(&self) -> f32 {
        self.min_window_height
            .max(self.min_result_height / self.scale_factor_y)
    }

    /// Effective maximum window width in view pixels.
    pub fn max_crop_width(&self) -> f32 {
        self.max_window_width
            .min(self.max_result_width / self.scale_factor_x)
    }

    /// Effective maximum window height in view pixels.
    pub fn max_crop_height(&self) -> f32 {
        self.max_window_height
            .min(self.max_result_height / self.scale_factor_y)
    }

    pub fn scale_factor_x(&self) -> f32 {
        self.scale_factor_x
    }

    pub fn scale_factor_y(&self) -> f32 {
        self.scale_factor_y
    }

    pub fn set_min_window_size(&mut self, width: f32, height: f32) {
        self.min_window_width = width;
        self.min_window_height = height;
    }

    /// Set the result-space limits (original-image pixels).
    pub fn set_result_limits(&mut self, min_width: f32, min_height: f32, max_width: f32, max_height: f32) {
        self.min_result_width = min_width;
        self.min_result_height = min_height;
        self.max_result_width = max_width;
        self.max_result_height = max_height;
    }

    /// Atomically update the window-space maximum and the view scale
    /// factors. Called by the view whenever the display transform changes.
    pub fn set_window_limits(
        &mut self,
        max_width: f32,
        max_height: f32,
        scale_factor_x: f32,
        scale_factor_y: f32,
    ) {
        self.max_window_width = max_width;
        self.max_window_height = max_height;
        self.scale_factor_x = scale_factor_x;
        self.scale_factor_y = scale_factor_y;
    }

    pub fn set_aspect(&mut self, fixed: bool, aspect_x: f32, aspect_y: f32) {
        self.fixed_aspect = fixed;
        self.aspect_x = aspect_x;
        self.aspect_y = aspect_y;
    }

    pub fn is_fixed_aspect(&self) -> bool {
        self.fixed_aspect
    }

    pub fn target_aspect_ratio(&self) -> f32 {
        self.aspect_x / self.aspect_y
    }

    pub fn aspect_x(&self) -> f32 {
        self.aspect_x
    }

    pub fn aspect_y(&self) -> f32 {
        self.aspect_y
    }

    /// Provide (or clear) a caller-supplied initial rectangle in
    /// original-image pixels, used at the next (re)initialization.
    pub fn set_initial_rect(&mut self, rect: Option<ImageRect>) {
        self.initial_rect = rect;
    }

    pub fn initial_rect(&self) -> Option<ImageRect> {
        self.initial_rect
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Forget the current rectangle so the next `init_window` replaces it.
    pub fn reset(&mut self) {
        self.rect = RectF::default();
        self.initialized = false;
    }

    /// Guidelines are hidden while the window is small; an interior press
    /// then engages the center handle ahead of the edges.
    pub fn show_guidelines(&self) -> bool {
        !(self.rect.width() < GUIDELINES_MIN_DIMENSION
            || self.rect.height() < GUIDELINES_MIN_DIMENSION)
    }

    /// Classify a press and, when it engages a handle, capture a drag
    /// gesture with the current limits snapshotted.
    pub fn grab(&self, x: f32, y: f32, touch_radius: f32, shape: CropShape) -> Option<DragHandler> {
        let focus_center = !self.show_guidelines();
        hit_test(shape, self.rect, x, y, touch_radius, focus_center)
            .map(|handle| DragHandler::new(handle, self, x, y))
    }

    /// Classify a press without capturing a gesture.
    pub fn handle_at(&self, x: f32, y: f32, touch_radius: f32, shape: CropShape) -> Option<Handle> {
        hit_test(shape, self.rect, x, y, touch_radius, !self.show_guidelines())
    }

    /// Place the window inside the image footprint.
    ///
    /// A caller-supplied initial rectangle (original-image pixels) wins and
    /// is mapped through the scale factors; a locked aspect ratio centers a
    /// ratio-true window inside the padded footprint; otherwise the padded
    /// footprint itself becomes the window. The fix-up rules run afterwards
    /// in every case.
    pub fn init_window(&mut self, footprint: &[f32; 8], view_width: f32, view_height: f32) {
        let left_limit = points_left(footprint).max(0.0);
        let top_limit = points_top(footprint).max(0.0);
        let right_limit = points_right(footprint).min(view_width);
        let bottom_limit = points_bottom(footprint).min(view_height);
        if right_limit <= left_limit || bottom_limit <= top_limit {
            return;
        }

        self.initialized = true;
        let horizontal_padding = self.padding_ratio * (right_limit - left_limit);
        let vertical_padding = self.padding_ratio * (bottom_limit - top_limit);

        let mut rect = RectF::default();
        if let Some(initial) = self.initial_rect.filter(|r| !r.is_empty()) {
            rect.left = left_limit + initial.left as f32 / self.scale_factor_x;
            rect.top = top_limit + initial.top as f32 / self.scale_factor_y;
            rect.right = rect.left + initial.width() as f32 / self.scale_factor_x;
            rect.bottom = rect.top + initial.height() as f32 / self.scale_factor_y;
            rect.left = rect.left.max(left_limit);
            rect.top = rect.top.max(top_limit);
            rect.right = rect.right.min(right_limit);
            rect.bottom = rect.bottom.min(bottom_limit);
        } else if self.fixed_aspect {
            let target = self.target_aspect_ratio();
            let footprint_ratio = (right_limit - left_limit) / (bottom_limit - top_limit);
            if footprint_ratio > target {
                rect.top = top_limit + vertical_padding;
                rect.bottom = bottom_limit - vertical_padding;
                let center_x = view_width / 2.0;
                let crop_width = self.min_crop_width().max(rect.height() * target);
                rect.left = center_x - crop_width / 2.0;
                rect.right = center_x + crop_width / 2.0;
            } else {
                rect.left = left_limit + horizontal_padding;
                rect.right = right_limit - horizontal_padding;
                let center_y = view_height / 2.0;
                let crop_height = self.min_crop_height().max(rect.width() / target);
                rect.top = center_y - crop_height / 2.0;
                rect.bottom = center_y + crop_height / 2.0;
            }
        } else {
            rect.left = left_limit + horizontal_padding;
            rect.top = top_limit + vertical_padding;
            rect.right = right_limit - horizontal_padding;
            rect.bottom = bottom_limit - vertical_padding;
        }

        self.fix_rect(&mut rect, footprint, view_width, view_height);
        self.rect = rect;
    }

    /// Re-apply the placement rules to the current rectangle.
    pub fn fix_current_rect(&mut self, footprint: &[f32; 8], view_width: f32, view_height: f32) {
        let mut rect = self.rect;
        self.fix_rect(&mut rect, footprint, view_width, view_height);
        self.rect = rect;
    }

    /// Rule-based fix-up: grow to the effective minimum, shrink to the
    /// effective maximum (both symmetrically), clamp into the
    /// rotation-tightened bounds intersected with the view, then re-center
    /// a drifted aspect lock.
    fn fix_rect(&self, rect: &mut RectF, footprint: &[f32; 8], view_width: f32, view_height: f32) {
        if rect.width() < self.min_crop_width() {
            let adjustment = (self.min_crop_width() - rect.width()) / 2.0;
            rect.left -= adjustment;
            rect.right += adjustment;
        }
        if rect.height() < self.min_crop_height() {
            let adjustment = (self.min_crop_height() - rect.height()) / 2.0;
            rect.top -= adjustment;
            rect.bottom += adjustment;
        }
        if rect.width() > self.max_crop_width() {
            let adjustment = (rect.width() - self.max_crop_width()) / 2.0;
            rect.left += adjustment;
            rect.right -= adjustment;
        }
        if rect.height() > self.max_crop_height() {
            let adjustment = (rect.height() - self.max_crop_height()) / 2.0;
            rect.top += adjustment;
            rect.bottom -= adjustment;
        }

        let (bounds, _) = calculate_bounds(footprint, *rect);
        if bounds.width() > 0.0 && bounds.height() > 0.0 {
            let left_limit = bounds.left.max(0.0);
            let top_limit = bounds.top.max(0.0);
            let right_limit = bounds.right.min(view_width);
            let bottom_limit = bounds.bottom.min(view_height);
            if rect.left < left_limit {
                rect.left = left_limit;
            }
            if rect.top < top_limit {
                rect.top = top_limit;
            }
            if rect.right > right_limit {
                rect.right = right_limit;
            }
            if rect.bottom > bottom_limit {
                rect.bottom = bottom_limit;
            }
        }

        if self.fixed_aspect {
            let target = self.target_aspect_ratio();
            if (rect.width() - rect.height() * target).abs() > ASPECT_FIX_TOLERANCE {
                if rect.width() > rect.height() * target {
                    let adjustment = (rect.height() * target - rect.width()).abs() / 2.0;
                    rect.left += adjustment;
                    rect.right -= adjustment;
                } else {
                    let adjustment = (rect.width() / target - rect.height()).abs() / 2.0;
                    rect.top += adjustment;
                    rect.bottom -= adjustment;
                }
            }
        }
    }
}
