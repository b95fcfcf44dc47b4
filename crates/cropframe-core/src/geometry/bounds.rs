//! Clamping bounds for the crop window.
//!
//! While the displayed image is axis-aligned its footprint hull is the
//! clamping region. When the image is rotated by an angle that is not a
//! multiple of 90 degrees the footprint becomes a tilted quadrilateral and
//! the hull over-reports the usable area; [`calculate_bounds`] tightens the
//! axis-aligned box by intersecting the crop rectangle's diagonal directions
//! with the two footprint edges nearest to it.

use super::rect::{points_bottom, points_left, points_right, points_top, RectF};

/// True when the footprint is rotated by a non-multiple-of-90 angle:
/// two opposite corners share neither their x nor their y coordinate.
pub fn is_non_straight_rotation(points: &[f32; 8]) -> bool {
    points[0] != points[6] && points[1] != points[7]
}

/// Compute the clamping bounds for `rect` inside the footprint `points`.
///
/// Returns the bounds and whether they were tightened for rotation. When
/// tightened, callers suppress edge snapping for the gesture step (the
/// tightened edges are already exact).
pub fn calculate_bounds(points: &[f32; 8], rect: RectF) -> (RectF, bool) {
    let mut left = points_left(points);
    let mut top = points_top(points);
    let mut right = points_right(points);
    let mut bottom = points_bottom(points);

    if !is_non_straight_rotation(points) {
        return (
            RectF {
                left,
                top,
                right,
                bottom,
            },
            false,
        );
    }

    // Re-label the quad so (x0, y0) is the corner the relevant edges leave
    // from, (x2, y2) the opposite corner and (x3, y3) its neighbor, ordered
    // by the corners' vertical positions.
    let mut x0 = points[0];
    let mut y0 = points[1];
    let mut x2 = points[4];
    let mut y2 = points[5];
    let mut x3 = points[6];
    let mut y3 = points[7];
    if points[7] < points[1] {
        if points[1] < points[3] {
            x0 = points[6];
            y0 = points[7];
            x2 = points[2];
            y2 = points[3];
            x3 = points[4];
            y3 = points[5];
        } else {
            x0 = points[4];
            y0 = points[5];
            x2 = points[0];
            y2 = points[1];
            x3 = points[2];
            y3 = points[3];
        }
    } else if points[1] > points[3] {
        x0 = points[2];
        y0 = points[3];
        x2 = points[6];
        y2 = points[7];
        x3 = points[0];
        y3 = points[1];
    }

    // Footprint edge through (x0, y0) and its perpendicular, plus the
    // parallel pair through (x2, y2).
    let a0 = (y3 - y0) / (x3 - x0);
    let a1 = -1.0 / a0;
    let b0 = y0 - a0 * x0;
    let b1 = y0 - a1 * x0;
    let b2 = y2 - a0 * x2;
    let b3 = y2 - a1 * x2;

    // The crop rectangle's diagonal direction and its mirror, anchored at
    // the top corners.
    let c0 = (rect.center_y() - rect.top) / (rect.center_x() - rect.left);
    let c1 = -c0;
    let d0 = rect.top - c0 * rect.left;
    let d1 = rect.top - c1 * rect.right;

    let candidate = (d0 - b0) / (a0 - c0);
    left = left.max(if candidate < rect.right { candidate } else { left });
    let candidate = (d0 - b1) / (a1 - c0);
    left = left.max(if candidate < rect.right { candidate } else { left });
    let candidate = (d1 - b3) / (a1 - c1);
    left = left.max(if candidate < rect.right { candidate } else { left });

    let candidate = (d1 - b1) / (a1 - c1);
    right = right.min(if candidate > rect.left { candidate } else { right });
    let candidate = (d1 - b2) / (a0 - c1);
    right = right.min(if candidate > rect.left { candidate } else { right });
    let candidate = (d0 - b2) / (a0 - c0);
    right = right.min(if candidate > rect.left { candidate } else { right });

    top = top.max((a0 * left + b0).max(a1 * right + b1));
    bottom = bottom.min((a1 * left + b3).min(a0 * right + b2));

    (
        RectF {
            left,
            top,
            right,
            bottom,
        },
        true,
    )
}
