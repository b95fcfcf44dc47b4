//! Engine configuration.
//!
//! `CropOptions` gathers every tunable the engine consumes: crop shape,
//! aspect lock, size limits, touch/snap radii, initial placement padding,
//! baked-in rotation/flips, and the output request. Validation is eager —
//! a bad configuration is rejected by [`CropOptions::validate`] before it
//! can reach the geometry or the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::OutputFormat;
use crate::geometry::hit::CropShape;
use crate::transform::resize::SizeMode;

/// A configuration value was out of range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("aspect ratio values must be greater than 0")]
    InvalidAspectRatio,

    #[error("touch radius cannot be negative")]
    NegativeTouchRadius,

    #[error("snap radius cannot be negative")]
    NegativeSnapRadius,

    #[error("initial padding ratio must be in [0, 0.5)")]
    InvalidPaddingRatio,

    #[error("minimum window size cannot be negative")]
    NegativeMinWindowSize,

    #[error("minimum result size cannot be negative")]
    NegativeMinResultSize,

    #[error("maximum result size cannot be smaller than the minimum")]
    MaxResultBelowMin,

    #[error("rotation degrees must be in [0, 360]")]
    InvalidRotation,

    #[error("output quality must be in 1..=100")]
    InvalidOutputQuality,
}

/// Everything the engine needs to know about one crop view instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropOptions {
    /// Shape of the crop selection.
    pub shape: CropShape,
    /// Distance (view px) at which window edges snap onto the bounds.
    pub snap_radius: f32,
    /// Tolerance radius (view px) for handle hit testing.
    pub touch_radius: f32,
    /// Fraction of the footprint left free around the initial window,
    /// per side. Must be below 0.5 or no window would remain.
    pub initial_padding_ratio: f32,
    /// Lock the window to `aspect_ratio_x : aspect_ratio_y`.
    pub fixed_aspect_ratio: bool,
    pub aspect_ratio_x: f32,
    pub aspect_ratio_y: f32,
    /// Minimum window size in view pixels.
    pub min_window_width: f32,
    pub min_window_height: f32,
    /// Minimum crop result in original-image pixels.
    pub min_result_width: f32,
    pub min_result_height: f32,
    /// Maximum crop result in original-image pixels.
    pub max_result_width: f32,
    pub max_result_height: f32,
    /// Rotation applied to the image when it is first shown, degrees.
    pub rotation_degrees: i32,
    pub flip_horizontally: bool,
    pub flip_vertically: bool,
    /// Requested output size in pixels; 0 means "as cropped".
    pub output_width: u32,
    pub output_height: u32,
    /// How the requested output size is honored.
    pub size_mode: SizeMode,
    pub output_format: OutputFormat,
    /// Encoder quality for lossy formats, 1-100.
    pub output_quality: u8,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            shape: CropShape::Rectangle,
            snap_radius: 3.0,
            touch_radius: 24.0,
            initial_padding_ratio: 0.1,
            fixed_aspect_ratio: false,
            aspect_ratio_x: 1.0,
            aspect_ratio_y: 1.0,
            min_window_width: 42.0,
            min_window_height: 42.0,
            min_result_width: 40.0,
            min_result_height: 40.0,
            max_result_width: 99999.0,
            max_result_height: 99999.0,
            rotation_degrees: 0,
            flip_horizontally: false,
            flip_vertically: false,
            output_width: 0,
            output_height: 0,
            size_mode: SizeMode::None,
            output_format: OutputFormat::Jpeg,
            output_quality: 90,
        }
    }
}

impl CropOptions {
    /// Check every field against its allowed range.
    ///
    /// Called by the view at configuration time; an `Err` here means the
    /// instance is never constructed, so the pipeline can rely on the
    /// invariants without re-checking.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.touch_radius < 0.0 {
            return Err(ConfigError::NegativeTouchRadius);
        }
        if self.snap_radius < 0.0 {
            return Err(ConfigError::NegativeSnapRadius);
        }
        if !(0.0..0.5).contains(&self.initial_padding_ratio) {
            return Err(ConfigError::InvalidPaddingRatio);
        }
        if self.aspect_ratio_x <= 0.0 || self.aspect_ratio_y <= 0.0 {
            return Err(ConfigError::InvalidAspectRatio);
        }
        if self.min_window_width < 0.0 || self.min_window_height < 0.0 {
            return Err(ConfigError::NegativeMinWindowSize);
        }
        if self.min_result_width < 0.0 || self.min_result_height < 0.0 {
            return Err(ConfigError::NegativeMinResultSize);
        }
        if self.max_result_width < self.min_result_width
            || self.max_result_height < self.min_result_height
        {
            return Err(ConfigError::MaxResultBelowMin);
        }
        if !(0..=360).contains(&self.rotation_degrees) {
            return Err(ConfigError::InvalidRotation);
        }
        if self.output_quality == 0 || self.output_quality > 100 {
            return Err(ConfigError::InvalidOutputQuality);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert_eq!(CropOptions::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_negative_radii() {
        let mut options = CropOptions::default();
        options.touch_radius = -1.0;
        assert_eq!(options.validate(), Err(ConfigError::NegativeTouchRadius));

        let mut options = CropOptions::default();
        options.snap_radius = -0.5;
        assert_eq!(options.validate(), Err(ConfigError::NegativeSnapRadius));
    }

    #[test]
    fn test_rejects_padding_ratio_at_half() {
        let mut options = CropOptions::default();
        options.initial_padding_ratio = 0.5;
        assert_eq!(options.validate(), Err(ConfigError::InvalidPaddingRatio));

        options.initial_padding_ratio = 0.49;
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_aspect_ratio() {
        let mut options = CropOptions::default();
        options.aspect_ratio_y = 0.0;
        assert_eq!(options.validate(), Err(ConfigError::InvalidAspectRatio));
    }

    #[test]
    fn test_rejects_max_result_below_min() {
        let mut options = CropOptions::default();
        options.min_result_width = 500.0;
        options.max_result_width = 100.0;
        assert_eq!(options.validate(), Err(ConfigError::MaxResultBelowMin));
    }

    #[test]
    fn test_rejects_out_of_range_rotation() {
        let mut options = CropOptions::default();
        options.rotation_degrees = 361;
        assert_eq!(options.validate(), Err(ConfigError::InvalidRotation));

        options.rotation_degrees = 360;
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_quality() {
        let mut options = CropOptions::default();
        options.output_quality = 0;
        assert_eq!(options.validate(), Err(ConfigError::InvalidOutputQuality));
    }
}
