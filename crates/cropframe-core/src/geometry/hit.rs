//! Press classification: which crop-window handle a touch point engages.
//!
//! Hit testing is a pure function of the current window rectangle and is
//! re-evaluated on every press. The rectangle shape tests zones in priority
//! order (corners first); the oval shape partitions the bounding box into a
//! 6x6 grid and classifies every point, so an oval press always engages a
//! handle.

use serde::{Deserialize, Serialize};

use super::rect::RectF;

/// The part of the crop window a gesture manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Left,
    Top,
    Right,
    Bottom,
    Center,
}

/// Shape of the crop selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CropShape {
    #[default]
    Rectangle,
    Oval,
}

/// Classify a press at `(x, y)` against the crop window `rect`.
///
/// `touch_radius` is the tolerance around corners and edges. `focus_center`
/// gives the center zone priority over the edge zones; the window enables it
/// when the rectangle is too small for guidelines, where an interior press
/// almost always means "move the whole window".
pub fn hit_test(
    shape: CropShape,
    rect: RectF,
    x: f32,
    y: f32,
    touch_radius: f32,
    focus_center: bool,
) -> Option<Handle> {
    match shape {
        CropShape::Rectangle => rectangle_handle(rect, x, y, touch_radius, focus_center),
        CropShape::Oval => Some(oval_handle(rect, x, y)),
    }
}

fn rectangle_handle(
    rect: RectF,
    x: f32,
    y: f32,
    radius: f32,
    focus_center: bool,
) -> Option<Handle> {
    if in_corner_zone(x, y, rect.left, rect.top, radius) {
        Some(Handle::TopLeft)
    } else if in_corner_zone(x, y, rect.right, rect.top, radius) {
        Some(Handle::TopRight)
    } else if in_corner_zone(x, y, rect.left, rect.bottom, radius) {
        Some(Handle::BottomLeft)
    } else if in_corner_zone(x, y, rect.right, rect.bottom, radius) {
        Some(Handle::BottomRight)
    } else if rect.contains(x, y) && focus_center {
        Some(Handle::Center)
    } else if in_horizontal_zone(x, y, rect.left, rect.right, rect.top, radius) {
        Some(Handle::Top)
    } else if in_horizontal_zone(x, y, rect.left, rect.right, rect.bottom, radius) {
        Some(Handle::Bottom)
    } else if in_vertical_zone(x, y, rect.left, rect.top, rect.bottom, radius) {
        Some(Handle::Left)
    } else if in_vertical_zone(x, y, rect.right, rect.top, rect.bottom, radius) {
        Some(Handle::Right)
    } else if rect.contains(x, y) && !focus_center {
        Some(Handle::Center)
    } else {
        None
    }
}

/// 6x6 grid over the bounding box: the four 2x2 corner blocks map to corner
/// handles, the edge-center blocks to edge handles, the middle block to
/// center. Points beyond the box fall into the nearest outer block.
fn oval_handle(rect: RectF, x: f32, y: f32) -> Handle {
    let cell_width = rect.width() / 6.0;
    let left_center = rect.left + cell_width;
    let right_center = rect.left + 5.0 * cell_width;
    let cell_height = rect.height() / 6.0;
    let top_center = rect.top + cell_height;
    let bottom_center = rect.top + 5.0 * cell_height;

    if x < left_center {
        if y < top_center {
            Handle::TopLeft
        } else if y < bottom_center {
            Handle::Left
        } else {
            Handle::BottomLeft
        }
    } else if x < right_center {
        if y < top_center {
            Handle::Top
        } else if y < bottom_center {
            Handle::Center
        } else {
            Handle::Bottom
        }
    } else if y < top_center {
        Handle::TopRight
    } else if y < bottom_center {
        Handle::Right
    } else {
        Handle::BottomRight
    }
}

fn in_corner_zone(x: f32, y: f32, corner_x: f32, corner_y: f32, radius: f32) -> bool {
    (x - corner_x).abs() <= radius && (y - corner_y).abs() <= radius
}

fn in_horizontal_zone(x: f32, y: f32, x_start: f32, x_end: f32, edge_y: f32, radius: f32) -> bool {
    x > x_start && x < x_end && (y - edge_y).abs() <= radius
}

fn in_vertical_zone(x: f32, y: f32, edge_x: f32, y_start: f32, y_end: f32, radius: f32) -> bool {
    (x - edge_x).abs() <= radius && y > y_start && y < y_end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> RectF {
        RectF::new(100.0, 100.0, 300.0, 300.0)
    }

    fn hit_rect(x: f32, y: f32) -> Option<Handle> {
        hit_test(CropShape::Rectangle, window(), x, y, 24.0, false)
    }

    #[test]
    fn test_corners() {
        assert_eq!(hit_rect(100.0, 100.0), Some(Handle::TopLeft));
        assert_eq!(hit_rect(310.0, 95.0), Some(Handle::TopRight));
        assert_eq!(hit_rect(90.0, 310.0), Some(Handle::BottomLeft));
        assert_eq!(hit_rect(300.0, 300.0), Some(Handle::BottomRight));
    }

    #[test]
    fn test_corner_beats_edge() {
        // Inside both the top-left corner box and the top edge band
        assert_eq!(hit_rect(120.0, 100.0), Some(Handle::TopLeft));
    }

    #[test]
    fn test_edges() {
        assert_eq!(hit_rect(200.0, 102.0), Some(Handle::Top));
        assert_eq!(hit_rect(200.0, 298.0), Some(Handle::Bottom));
        assert_eq!(hit_rect(98.0, 200.0), Some(Handle::Left));
        assert_eq!(hit_rect(302.0, 200.0), Some(Handle::Right));
    }

    #[test]
    fn test_center_tested_last_when_guidelines_shown() {
        // Near the top edge but inside the rect: the edge wins
        assert_eq!(hit_rect(200.0, 110.0), Some(Handle::Top));
        // Deep inside: center
        assert_eq!(hit_rect(200.0, 200.0), Some(Handle::Center));
    }

    #[test]
    fn test_center_wins_over_edges_when_focused() {
        let h = hit_test(CropShape::Rectangle, window(), 200.0, 110.0, 24.0, true);
        assert_eq!(h, Some(Handle::Center));
    }

    #[test]
    fn test_miss_returns_none() {
        assert_eq!(hit_rect(10.0, 10.0), None);
        assert_eq!(hit_rect(400.0, 400.0), None);
    }

    #[test]
    fn test_oval_grid() {
        let hit_oval = |x, y| hit_test(CropShape::Oval, window(), x, y, 24.0, false);
        // 6x6 grid: cells are ~33.3 px wide
        assert_eq!(hit_oval(110.0, 110.0), Some(Handle::TopLeft));
        assert_eq!(hit_oval(200.0, 110.0), Some(Handle::Top));
        assert_eq!(hit_oval(290.0, 110.0), Some(Handle::TopRight));
        assert_eq!(hit_oval(110.0, 200.0), Some(Handle::Left));
        assert_eq!(hit_oval(200.0, 200.0), Some(Handle::Center));
        assert_eq!(hit_oval(290.0, 200.0), Some(Handle::Right));
        assert_eq!(hit_oval(110.0, 290.0), Some(Handle::BottomLeft));
        assert_eq!(hit_oval(200.0, 290.0), Some(Handle::Bottom));
        assert_eq!(hit_oval(290.0, 290.0), Some(Handle::BottomRight));
    }

    #[test]
    fn test_oval_classifies_every_point() {
        // Even far outside the bounding box the grid yields a handle
        let h = hit_test(CropShape::Oval, window(), -500.0, -500.0, 24.0, false);
        assert_eq!(h, Some(Handle::TopLeft));
    }
}
