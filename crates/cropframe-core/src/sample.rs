//! Power-of-two sample-size calculation.
//!
//! A sample size of `n` decodes every n-th pixel in both axes, dividing
//! memory use by `n*n`. Two calculators exist and intentionally differ:
//! [`for_requested`] halves the dimensions once more before comparing (it
//! targets a *preferred* size, so overshooting one step is acceptable),
//! while [`for_texture`] compares the full dimensions against a hard
//! ceiling that must never be exceeded. Do not unify the two formulas.

/// Fallback and lower bound for the device texture ceiling.
pub const DEFAULT_TEXTURE_CEILING: u32 = 2048;

/// Smallest power of two so that further halving would drop both
/// dimensions to the requested size or below.
pub fn for_requested(width: u32, height: u32, req_width: u32, req_height: u32) -> u32 {
    let mut sample_size = 1;
    if height > req_height || width > req_width {
        while (height / 2 / sample_size) > req_height && (width / 2 / sample_size) > req_width {
            sample_size *= 2;
        }
    }
    sample_size
}

/// Smallest power of two bringing both dimensions under the texture
/// ceiling.
pub fn for_texture(width: u32, height: u32, ceiling: &TextureCeiling) -> u32 {
    let mut sample_size = 1;
    let limit = ceiling.limit();
    if limit > 0 {
        while (height / sample_size) > limit || (width / sample_size) > limit {
            sample_size *= 2;
        }
    }
    sample_size
}

/// Cached device capability: the largest texture dimension the display
/// path can handle.
///
/// The provider is queried exactly once, at construction; the engine only
/// ever sees the cached value. A probe failure falls back to
/// [`DEFAULT_TEXTURE_CEILING`], and successful probes are clamped up to it
/// so an implausibly small probe cannot cripple decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureCeiling {
    limit: u32,
}

impl Default for TextureCeiling {
    fn default() -> Self {
        Self {
            limit: DEFAULT_TEXTURE_CEILING,
        }
    }
}

impl TextureCeiling {
    /// Probe the capability once through `provider`.
    pub fn probe<F>(provider: F) -> Self
    where
        F: FnOnce() -> Option<u32>,
    {
        let limit = provider()
            .map(|probed| probed.max(DEFAULT_TEXTURE_CEILING))
            .unwrap_or(DEFAULT_TEXTURE_CEILING);
        Self { limit }
    }

    /// Use a fixed ceiling without probing. Intended for tests and for
    /// hosts that know their limit up front.
    pub fn fixed(limit: u32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}
