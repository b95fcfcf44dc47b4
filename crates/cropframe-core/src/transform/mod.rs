//! Pixel transforms applied after decode: compositing and output resizing.
//!
//! # Transform Order
//!
//! A crop result is produced in this order:
//! 1. Axis-aligned crop of the selection hull
//! 2. Rotation about the center (with canvas expansion)
//! 3. Horizontal/vertical mirroring
//! 4. Residual crop (only for non-right-angle rotations)
//! 5. Output resize per the requested [`SizeMode`]

pub mod compose;
pub mod resize;

pub use compose::{crop_with_transform, rect_from_points, rotate_and_flip, rotated_bounds};
pub use resize::{resize_output, SizeMode};
