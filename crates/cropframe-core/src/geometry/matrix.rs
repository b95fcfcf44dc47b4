//! A minimal 2D affine transform for mapping between image and view space.
//!
//! The matrix maps a point `(x, y)` to:
//!
//! ```text
//! X = a * x + c * y + tx
//! Y = b * x + d * y + ty
//! ```
//!
//! All composition methods are "post" operations: the new transform is
//! applied *after* the existing one, so a view matrix reads top-to-bottom as
//! a recipe (translate, then rotate, then scale, ...). With y pointing down,
//! a positive rotation angle turns clockwise on screen.

use super::rect::RectF;

/// Row-major 2D affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    tx: f32,
    ty: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Reset to the identity transform.
    pub fn reset(&mut self) {
        *self = Self::identity();
    }

    /// Compose `other` after `self`.
    pub fn post_concat(&mut self, other: &Matrix) {
        let a = other.a * self.a + other.c * self.b;
        let b = other.b * self.a + other.d * self.b;
        let c = other.a * self.c + other.c * self.d;
        let d = other.b * self.c + other.d * self.d;
        let tx = other.a * self.tx + other.c * self.ty + other.tx;
        let ty = other.b * self.tx + other.d * self.ty + other.ty;
        *self = Self { a, b, c, d, tx, ty };
    }

    /// Translate by `(dx, dy)` after the current transform.
    pub fn post_translate(&mut self, dx: f32, dy: f32) {
        self.tx += dx;
        self.ty += dy;
    }

    /// Rotate by `degrees` about the pivot `(px, py)` after the current
    /// transform. Positive angles turn clockwise (y-down convention).
    ///
    /// Right angles use exact sine/cosine values so that a straight
    /// rotation maps axis-aligned rectangles onto axis-aligned rectangles
    /// bit-for-bit; rotation detection depends on this.
    pub fn post_rotate(&mut self, degrees: f32, px: f32, py: f32) {
        let normalized = degrees.rem_euclid(360.0);
        let (sin, cos) = if normalized == 0.0 {
            (0.0, 1.0)
        } else if normalized == 90.0 {
            (1.0, 0.0)
        } else if normalized == 180.0 {
            (0.0, -1.0)
        } else if normalized == 270.0 {
            (-1.0, 0.0)
        } else {
            normalized.to_radians().sin_cos()
        };
        let rotation = Matrix {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: px - cos * px + sin * py,
            ty: py - sin * px - cos * py,
        };
        self.post_concat(&rotation);
    }

    /// Scale by `(sx, sy)` about the pivot `(px, py)` after the current
    /// transform. Negative factors mirror about the pivot axis.
    pub fn post_scale(&mut self, sx: f32, sy: f32, px: f32, py: f32) {
        let scale = Matrix {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            tx: px * (1.0 - sx),
            ty: py * (1.0 - sy),
        };
        self.post_concat(&scale);
    }

    /// Map a single point.
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Map an interleaved corner array in place.
    pub fn map_points(&self, points: &mut [f32; 8]) {
        for i in (0..8).step_by(2) {
            let (x, y) = self.map_point(points[i], points[i + 1]);
            points[i] = x;
            points[i + 1] = y;
        }
    }

    /// Map a rectangle and return the axis-aligned bounding box of the
    /// mapped corners.
    pub fn map_rect(&self, rect: RectF) -> RectF {
        let mut points = rect.corner_points();
        self.map_points(&mut points);
        RectF {
            left: super::rect::points_left(&points),
            top: super::rect::points_top(&points),
            right: super::rect::points_right(&points),
            bottom: super::rect::points_bottom(&points),
        }
    }

    /// The inverse transform, or `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.c * self.b;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = self.d * inv_det;
        let b = -self.b * inv_det;
        let c = -self.c * inv_det;
        let d = self.a * inv_det;
        Some(Matrix {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + c * self.ty),
            ty: -(b * self.tx + d * self.ty),
        })
    }
}
