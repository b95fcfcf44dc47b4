//! Per-gesture drag resolution for the crop window.
//!
//! A [`DragHandler`] is created at press time and lives for exactly one
//! gesture. It captures the engaged handle, the offset between the touch
//! point and the handle's anchor, and a snapshot of the effective size
//! limits. Every pointer move runs the full rule set: view clamping with
//! elastic damping, bounds clamping, snap-to-edge, min/max enforcement, and
//! aspect-ratio locking.
//!
//! The damping constants (1.05 divisor, 1.1 and 2.0 offset refunds) give
//! drags a stretchy feel at hard limits instead of a frozen pointer. Out of
//! range input always degrades to a clamped, still-valid rectangle.

use super::hit::Handle;
use super::rect::RectF;
use super::window::CropWindow;

/// Stateful resolver for a single drag gesture.
#[derive(Debug, Clone)]
pub struct DragHandler {
    handle: Handle,
    touch_offset_x: f32,
    touch_offset_y: f32,
    min_width: f32,
    min_height: f32,
    max_width: f32,
    max_height: f32,
}

impl DragHandler {
    /// Capture a gesture on `handle` starting at `(touch_x, touch_y)`.
    ///
    /// The effective min/max window size is snapshotted here; mid-gesture
    /// limit changes apply to the next gesture.
    pub fn new(handle: Handle, window: &CropWindow, touch_x: f32, touch_y: f32) -> Self {
        let rect = window.rect();
        let (anchor_x, anchor_y) = anchor_point(handle, rect);
        Self {
            handle,
            touch_offset_x: anchor_x - touch_x,
            touch_offset_y: anchor_y - touch_y,
            min_width: window.min_crop_width(),
            min_height: window.min_crop_height(),
            max_width: window.max_crop_width(),
            max_height: window.max_crop_height(),
        }
    }

    /// The handle captured at press time.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Resolve a pointer move to a new window rectangle.
    ///
    /// `bounds` is the clamping region (image footprint, possibly tightened
    /// for rotation), `view_width`/`view_height` the hosting view size,
    /// `snap_margin` the snap distance, and `aspect_ratio` the locked
    /// width/height ratio used when `fixed_aspect` is set.
    #[allow(clippy::too_many_arguments)]
    pub fn drag(
        &mut self,
        rect: &mut RectF,
        x: f32,
        y: f32,
        bounds: RectF,
        view_width: f32,
        view_height: f32,
        snap_margin: f32,
        fixed_aspect: bool,
        aspect_ratio: f32,
    ) {
        let adj_x = x + self.touch_offset_x;
        let adj_y = y + self.touch_offset_y;
        if self.handle == Handle::Center {
            self.move_center(rect, adj_x, adj_y, bounds, view_width, view_height, snap_margin);
        } else if fixed_aspect {
            self.move_with_fixed_aspect(
                rect,
                adj_x,
                adj_y,
                bounds,
                view_width,
                view_height,
                snap_margin,
                aspect_ratio,
            );
        } else {
            self.move_with_free_aspect(
                rect,
                adj_x,
                adj_y,
                bounds,
                view_width,
                view_height,
                snap_margin,
            );
        }
    }

    /// Translate the whole window. Crossing the view or bounds edge damps
    /// the delta and refunds half of it into the touch offset; afterwards
    /// any edge at or beyond a bounds edge is pulled exactly onto it.
    #[allow(clippy::too_many_arguments)]
    fn move_center(
        &mut self,
        rect: &mut RectF,
        x: f32,
        y: f32,
        bounds: RectF,
        view_width: f32,
        view_height: f32,
        snap_margin: f32,
    ) {
        let mut dx = x - rect.center_x();
        let mut dy = y - rect.center_y();
        if rect.left + dx < 0.0
            || rect.right + dx > view_width
            || rect.left + dx < bounds.left
            || rect.right + dx > bounds.right
        {
            dx /= 1.05;
            self.touch_offset_x -= dx / 2.0;
        }
        if rect.top + dy < 0.0
            || rect.bottom + dy > view_height
            || rect.top + dy < bounds.top
            || rect.bottom + dy > bounds.bottom
        {
            dy /= 1.05;
            self.touch_offset_y -= dy / 2.0;
        }
        rect.offset(dx, dy);
        snap_edges_to_bounds(rect, bounds, snap_margin);
    }

    #[allow(clippy::too_many_arguments)]
    fn move_with_free_aspect(
        &mut self,
        rect: &mut RectF,
        x: f32,
        y: f32,
        bounds: RectF,
        view_width: f32,
        view_height: f32,
        snap: f32,
    ) {
        match self.handle {
            Handle::TopLeft => {
                self.adjust_top(rect, y, bounds, snap, 0.0, false, false);
                self.adjust_left(rect, x, bounds, snap, 0.0, false, false);
            }
            Handle::TopRight => {
                self.adjust_top(rect, y, bounds, snap, 0.0, false, false);
                self.adjust_right(rect, x, bounds, view_width, snap, 0.0, false, false);
            }
            Handle::BottomLeft => {
                self.adjust_bottom(rect, y, bounds, view_height, snap, 0.0, false, false);
                self.adjust_left(rect, x, bounds, snap, 0.0, false, false);
            }
            Handle::BottomRight => {
                self.adjust_bottom(rect, y, bounds, view_height, snap, 0.0, false, false);
                self.adjust_right(rect, x, bounds, view_width, snap, 0.0, false, false);
            }
            Handle::Left => self.adjust_left(rect, x, bounds, snap, 0.0, false, false),
            Handle::Top => self.adjust_top(rect, y, bounds, snap, 0.0, false, false),
            Handle::Right => self.adjust_right(rect, x, bounds, view_width, snap, 0.0, false, false),
            Handle::Bottom => {
                self.adjust_bottom(rect, y, bounds, view_height, snap, 0.0, false, false)
            }
            Handle::Center => {}
        }
    }

    /// Corner handles pick the aspect-dominant edge by comparing the ratio
    /// implied by the moved corner against the target; the other edge is
    /// derived from the lock. Single-edge handles resize their edge and
    /// recenter the perpendicular pair.
    #[allow(clippy::too_many_arguments)]
    fn move_with_fixed_aspect(
        &mut self,
        rect: &mut RectF,
        x: f32,
        y: f32,
        bounds: RectF,
        view_width: f32,
        view_height: f32,
        snap: f32,
        ratio: f32,
    ) {
        match self.handle {
            Handle::TopLeft => {
                if aspect_ratio_of(x, y, rect.right, rect.bottom) < ratio {
                    self.adjust_top(rect, y, bounds, snap, ratio, true, false);
                    adjust_left_by_aspect(rect, ratio);
                } else {
                    self.adjust_left(rect, x, bounds, snap, ratio, true, false);
                    adjust_top_by_aspect(rect, ratio);
                }
            }
            Handle::TopRight => {
                if aspect_ratio_of(rect.left, y, x, rect.bottom) < ratio {
                    self.adjust_top(rect, y, bounds, snap, ratio, false, true);
                    adjust_right_by_aspect(rect, ratio);
                } else {
                    self.adjust_right(rect, x, bounds, view_width, snap, ratio, true, false);
                    adjust_top_by_aspect(rect, ratio);
                }
            }
            Handle::BottomLeft => {
                if aspect_ratio_of(x, rect.top, rect.right, y) < ratio {
                    self.adjust_bottom(rect, y, bounds, view_height, snap, ratio, true, false);
                    adjust_left_by_aspect(rect, ratio);
                } else {
                    self.adjust_left(rect, x, bounds, snap, ratio, false, true);
                    adjust_bottom_by_aspect(rect, ratio);
                }
            }
            Handle::BottomRight => {
                if aspect_ratio_of(rect.left, rect.top, x, y) < ratio {
                    self.adjust_bottom(rect, y, bounds, view_height, snap, ratio, false, true);
                    adjust_right_by_aspect(rect, ratio);
                } else {
                    self.adjust_right(rect, x, bounds, view_width, snap, ratio, false, true);
                    adjust_bottom_by_aspect(rect, ratio);
                }
            }
            Handle::Left => {
                self.adjust_left(rect, x, bounds, snap, ratio, true, true);
                adjust_top_bottom_by_aspect(rect, bounds, ratio);
            }
            Handle::Top => {
                self.adjust_top(rect, y, bounds, snap, ratio, true, true);
                adjust_left_right_by_aspect(rect, bounds, ratio);
            }
            Handle::Right => {
                self.adjust_right(rect, x, bounds, view_width, snap, ratio, true, true);
                adjust_top_bottom_by_aspect(rect, bounds, ratio);
            }
            Handle::Bottom => {
                self.adjust_bottom(rect, y, bounds, view_height, snap, ratio, true, true);
                adjust_left_right_by_aspect(rect, bounds, ratio);
            }
            Handle::Center => {}
        }
    }

    /// Resolve a new left edge. `top_moves`/`bottom_moves` describe which
    /// ends of the perpendicular edge follow when the aspect lock (a ratio
    /// > 0) re-derives the height from the new width.
    #[allow(clippy::too_many_arguments)]
    fn adjust_left(
        &mut self,
        rect: &mut RectF,
        left: f32,
        bounds: RectF,
        snap_margin: f32,
        aspect_ratio: f32,
        top_moves: bool,
        bottom_moves: bool,
    ) {
        let mut new_left = left;
        if new_left < 0.0 {
            new_left /= 1.05;
            self.touch_offset_x -= new_left / 1.1;
        }
        if new_left < bounds.left {
            self.touch_offset_x -= (new_left - bounds.left) / 2.0;
        }
        if new_left - bounds.left < snap_margin {
            new_left = bounds.left;
        }
        if rect.right - new_left < self.min_width {
            new_left = rect.right - self.min_width;
        }
        if rect.right - new_left > self.max_width {
            new_left = rect.right - self.max_width;
        }
        if new_left - bounds.left < snap_margin {
            new_left = bounds.left;
        }
        if aspect_ratio > 0.0 {
            let mut new_height = (rect.right - new_left) / aspect_ratio;
            if new_height < self.min_height {
                new_left = bounds.left.max(rect.right - self.min_height * aspect_ratio);
                new_height = (rect.right - new_left) / aspect_ratio;
            }
            if new_height > self.max_height {
                new_left = bounds.left.max(rect.right - self.max_height * aspect_ratio);
                new_height = (rect.right - new_left) / aspect_ratio;
            }
            if top_moves && bottom_moves {
                new_left = new_left.max(bounds.left.max(rect.right - bounds.height() * aspect_ratio));
            } else {
                if top_moves && rect.bottom - new_height < bounds.top {
                    new_left = bounds
                        .left
                        .max(rect.right - (rect.bottom - bounds.top) * aspect_ratio);
                    new_height = (rect.right - new_left) / aspect_ratio;
                }
                if bottom_moves && rect.top + new_height > bounds.bottom {
                    new_left = new_left.max(
                        bounds
                            .left
                            .max(rect.right - (bounds.bottom - rect.top) * aspect_ratio),
                    );
                }
            }
        }
        rect.left = new_left;
    }

    #[allow(clippy::too_many_arguments)]
    fn adjust_right(
        &mut self,
        rect: &mut RectF,
        right: f32,
        bounds: RectF,
        view_width: f32,
        snap_margin: f32,
        aspect_ratio: f32,
        top_moves: bool,
        bottom_moves: bool,
    ) {
        let mut new_right = right;
        if new_right > view_width {
            new_right = view_width + (new_right - view_width) / 1.05;
            self.touch_offset_x -= (new_right - view_width) / 1.1;
        }
        if new_right > bounds.right {
            self.touch_offset_x -= (new_right - bounds.right) / 2.0;
        }
        if bounds.right - new_right < snap_margin {
            new_right = bounds.right;
        }
        if new_right - rect.left < self.min_width {
            new_right = rect.left + self.min_width;
        }
        if new_right - rect.left > self.max_width {
            new_right = rect.left + self.max_width;
        }
        if bounds.right - new_right < snap_margin {
            new_right = bounds.right;
        }
        if aspect_ratio > 0.0 {
            let mut new_height = (new_right - rect.left) / aspect_ratio;
            if new_height < self.min_height {
                new_right = bounds.right.min(rect.left + self.min_height * aspect_ratio);
                new_height = (new_right - rect.left) / aspect_ratio;
            }
            if new_height > self.max_height {
                new_right = bounds.right.min(rect.left + self.max_height * aspect_ratio);
                new_height = (new_right - rect.left) / aspect_ratio;
            }
            if top_moves && bottom_moves {
                new_right =
                    new_right.min(bounds.right.min(rect.left + bounds.height() * aspect_ratio));
            } else {
                if top_moves && rect.bottom - new_height < bounds.top {
                    new_right = bounds
                        .right
                        .min(rect.left + (rect.bottom - bounds.top) * aspect_ratio);
                    new_height = (new_right - rect.left) / aspect_ratio;
                }
                if bottom_moves && rect.top + new_height > bounds.bottom {
                    new_right = new_right.min(
                        bounds
                            .right
                            .min(rect.left + (bounds.bottom - rect.top) * aspect_ratio),
                    );
                }
            }
        }
        rect.right = new_right;
    }

    #[allow(clippy::too_many_arguments)]
    fn adjust_top(
        &mut self,
        rect: &mut RectF,
        top: f32,
        bounds: RectF,
        snap_margin: f32,
        aspect_ratio: f32,
        left_moves: bool,
        right_moves: bool,
    ) {
        let mut new_top = top;
        if new_top < 0.0 {
            new_top /= 1.05;
            self.touch_offset_y -= new_top / 1.1;
        }
        if new_top < bounds.top {
            self.touch_offset_y -= (new_top - bounds.top) / 2.0;
        }
        if new_top - bounds.top < snap_margin {
            new_top = bounds.top;
        }
        if rect.bottom - new_top < self.min_height {
            new_top = rect.bottom - self.min_height;
        }
        if rect.bottom - new_top > self.max_height {
            new_top = rect.bottom - self.max_height;
        }
        if new_top - bounds.top < snap_margin {
            new_top = bounds.top;
        }
        if aspect_ratio > 0.0 {
            let mut new_width = (rect.bottom - new_top) * aspect_ratio;
            if new_width < self.min_width {
                new_top = bounds.top.max(rect.bottom - self.min_width / aspect_ratio);
                new_width = (rect.bottom - new_top) * aspect_ratio;
            }
            if new_width > self.max_width {
                new_top = bounds.top.max(rect.bottom - self.max_width / aspect_ratio);
                new_width = (rect.bottom - new_top) * aspect_ratio;
            }
            if left_moves && right_moves {
                new_top = new_top.max(bounds.top.max(rect.bottom - bounds.width() / aspect_ratio));
            } else {
                if left_moves && rect.right - new_width < bounds.left {
                    new_top = bounds
                        .top
                        .max(rect.bottom - (rect.right - bounds.left) / aspect_ratio);
                    new_width = (rect.bottom - new_top) * aspect_ratio;
                }
                if right_moves && rect.left + new_width > bounds.right {
                    new_top = new_top.max(
                        bounds
                            .top
                            .max(rect.bottom - (bounds.right - rect.left) / aspect_ratio),
                    );
                }
            }
        }
        rect.top = new_top;
    }

    #[allow(clippy::too_many_arguments)]
    fn adjust_bottom(
        &mut self,
        rect: &mut RectF,
        bottom: f32,
        bounds: RectF,
        view_height: f32,
        snap_margin: f32,
        aspect_ratio: f32,
        left_moves: bool,
        right_moves: bool,
    ) {
        let mut new_bottom = bottom;
        if new_bottom > view_height {
            new_bottom = view_height + (new_bottom - view_height) / 1.05;
            self.touch_offset_y -= (new_bottom - view_height) / 1.1;
        }
        if new_bottom > bounds.bottom {
            self.touch_offset_y -= (new_bottom - bounds.bottom) / 2.0;
        }
        if bounds.bottom - new_bottom < snap_margin {
            new_bottom = bounds.bottom;
        }
        if new_bottom - rect.top < self.min_height {
            new_bottom = rect.top + self.min_height;
        }
        if new_bottom - rect.top > self.max_height {
            new_bottom = rect.top + self.max_height;
        }
        if bounds.bottom - new_bottom < snap_margin {
            new_bottom = bounds.bottom;
        }
        if aspect_ratio > 0.0 {
            let mut new_width = (new_bottom - rect.top) * aspect_ratio;
            if new_width < self.min_width {
                new_bottom = bounds.bottom.min(rect.top + self.min_width / aspect_ratio);
                new_width = (new_bottom - rect.top) * aspect_ratio;
            }
            if new_width > self.max_width {
                new_bottom = bounds.bottom.min(rect.top + self.max_width / aspect_ratio);
                new_width = (new_bottom - rect.top) * aspect_ratio;
            }
            if left_moves && right_moves {
                new_bottom =
                    new_bottom.min(bounds.bottom.min(rect.top + bounds.width() / aspect_ratio));
            } else {
                if left_moves && rect.right - new_width < bounds.left {
                    new_bottom = bounds
                        .bottom
                        .min(rect.top + (rect.right - bounds.left) / aspect_ratio);
                    new_width = (new_bottom - rect.top) * aspect_ratio;
                }
                if right_moves && rect.left + new_width > bounds.right {
                    new_bottom = new_bottom.min(
                        bounds
                            .bottom
                            .min(rect.top + (bounds.right - rect.left) / aspect_ratio),
                    );
                }
            }
        }
        rect.bottom = new_bottom;
    }
}

/// The fixed per-handle anchor whose offset from the touch point is carried
/// through the gesture.
fn anchor_point(handle: Handle, rect: RectF) -> (f32, f32) {
    match handle {
        Handle::TopLeft => (rect.left, rect.top),
        Handle::TopRight => (rect.right, rect.top),
        Handle::BottomLeft => (rect.left, rect.bottom),
        Handle::BottomRight => (rect.right, rect.bottom),
        Handle::Left => (rect.left, 0.0),
        Handle::Top => (0.0, rect.top),
        Handle::Right => (rect.right, 0.0),
        Handle::Bottom => (0.0, rect.bottom),
        Handle::Center => (rect.center_x(), rect.center_y()),
    }
}

/// Pull any edge within `margin` of a bounds edge (or beyond it) exactly
/// onto that edge by translating the whole rectangle.
fn snap_edges_to_bounds(rect: &mut RectF, bounds: RectF, margin: f32) {
    if rect.left < bounds.left + margin {
        rect.offset(bounds.left - rect.left, 0.0);
    }
    if rect.top < bounds.top + margin {
        rect.offset(0.0, bounds.top - rect.top);
    }
    if rect.right > bounds.right - margin {
        rect.offset(bounds.right - rect.right, 0.0);
    }
    if rect.bottom > bounds.bottom - margin {
        rect.offset(0.0, bounds.bottom - rect.bottom);
    }
}

fn adjust_left_by_aspect(rect: &mut RectF, aspect_ratio: f32) {
    rect.left = rect.right - rect.height() * aspect_ratio;
}

fn adjust_top_by_aspect(rect: &mut RectF, aspect_ratio: f32) {
    rect.top = rect.bottom - rect.width() / aspect_ratio;
}

fn adjust_right_by_aspect(rect: &mut RectF, aspect_ratio: f32) {
    rect.right = rect.left + rect.height() * aspect_ratio;
}

fn adjust_bottom_by_aspect(rect: &mut RectF, aspect_ratio: f32) {
    rect.bottom = rect.top + rect.width() / aspect_ratio;
}

/// Recenter left/right to match the ratio, then shift back inside bounds.
fn adjust_left_right_by_aspect(rect: &mut RectF, bounds: RectF, aspect_ratio: f32) {
    rect.inset((rect.width() - rect.height() * aspect_ratio) / 2.0, 0.0);
    if rect.left < bounds.left {
        rect.offset(bounds.left - rect.left, 0.0);
    }
    if rect.right > bounds.right {
        rect.offset(bounds.right - rect.right, 0.0);
    }
}

/// Recenter top/bottom to match the ratio, then shift back inside bounds.
fn adjust_top_bottom_by_aspect(rect: &mut RectF, bounds: RectF, aspect_ratio: f32) {
    rect.inset(0.0, (rect.height() - rect.width() / aspect_ratio) / 2.0);
    if rect.top < bounds.top {
        rect.offset(0.0, bounds.top - rect.top);
    }
    if rect.bottom > bounds.bottom {
        rect.offset(0.0, bounds.bottom - rect.bottom);
    }
}

fn aspect_ratio_of(left: f32, top: f32, right: f32, bottom: f32) -> f32 {
    (right - left) / (bottom - top)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::geometry::window::CropWindow;
    use proptest::prelude::*;

    fn handle_strategy() -> impl Strategy<Value = Handle> {
        prop_oneof![
            Just(Handle::TopLeft),
            Just(Handle::TopRight),
            Just(Handle::BottomLeft),
            Just(Handle::BottomRight),
            Just(Handle::Left),
            Just(Handle::Top),
            Just(Handle::Right),
            Just(Handle::Bottom),
            Just(Handle::Center),
        ]
    }

    proptest! {
        /// After any sequence of free-aspect drags the window stays inside
        /// the bounds and within the effective size limits.
        #[test]
        fn prop_drag_keeps_window_valid(
            handle in handle_strategy(),
            moves in prop::collection::vec((0.0f32..400.0, 0.0f32..400.0), 1..12),
            press in (120.0f32..280.0, 120.0f32..280.0),
        ) {
            let bounds = RectF::new(40.0, 40.0, 360.0, 360.0);
            let rect0 = RectF::new(120.0, 120.0, 280.0, 280.0);
            let min = 30.0;
            let max = 320.0;

            let mut window = CropWindow::default();
            window.set_min_window_size(min, min);
            window.set_result_limits(0.0, 0.0, 99999.0, 99999.0);
            window.set_window_limits(max, max, 1.0, 1.0);
            window.set_rect(rect0);

            let mut handler = DragHandler::new(handle, &window, press.0, press.1);
            let mut rect = rect0;
            for (x, y) in moves {
                handler.drag(&mut rect, x, y, bounds, 400.0, 400.0, 3.0, false, 0.0);
            }

            let eps = 0.01;
            prop_assert!(rect.left >= bounds.left - eps, "left {} escaped", rect.left);
            prop_assert!(rect.top >= bounds.top - eps, "top {} escaped", rect.top);
            prop_assert!(rect.right <= bounds.right + eps, "right {} escaped", rect.right);
            prop_assert!(rect.bottom <= bounds.bottom + eps, "bottom {} escaped", rect.bottom);
            prop_assert!(rect.width() >= min - eps, "width {} under min", rect.width());
            prop_assert!(rect.height() >= min - eps, "height {} under min", rect.height());
            prop_assert!(rect.width() <= max + eps, "width {} over max", rect.width());
            prop_assert!(rect.height() <= max + eps, "height {} over max", rect.height());
        }

        /// A locked ratio survives any single-handle drag.
        #[test]
        fn prop_fixed_aspect_preserved(
            handle in handle_strategy(),
            target in (60.0f32..340.0, 60.0f32..340.0),
        ) {
            let ratio = 16.0 / 9.0;
            let bounds = RectF::new(0.0, 0.0, 400.0, 400.0);
            let rect0 = RectF::new(120.0, 120.0, 280.0, 210.0);

            let mut window = CropWindow::default();
            window.set_min_window_size(20.0, 20.0);
            window.set_result_limits(0.0, 0.0, 99999.0, 99999.0);
            window.set_window_limits(400.0, 400.0, 1.0, 1.0);
            window.set_rect(rect0);

            let mut handler = DragHandler::new(handle, &window, rect0.center_x(), rect0.center_y());
            let mut rect = rect0;
            handler.drag(&mut rect, target.0, target.1, bounds, 400.0, 400.0, 0.0, true, ratio);

            if handle != Handle::Center {
                let actual = rect.width() / rect.height();
                prop_assert!((actual - ratio).abs() < 0.01, "ratio drifted to {}", actual);
            }
        }
    }
}
