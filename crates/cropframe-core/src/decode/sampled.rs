//! Sample-size escalation around the decode capabilities.
//!
//! Every entry point here owns one concern: turning a decode that may blow
//! the memory ceiling into either a buffer at a coarser sample size or a
//! terminal failure. On [`DecodeError::OutOfMemory`] the sample size doubles
//! and the decode retries; past [`MAX_SAMPLE_SIZE`] the escalation becomes
//! [`DecodeError::SampleSizeExhausted`]. Any other error passes through.

use super::reader::{ImageReader, SourceOpener};
use super::types::{DecodeError, LoadedImage, SampledImage};
use crate::geometry::rect::ImageRect;
use crate::sample::{self, TextureCeiling};

/// Escalation ceiling for a single decode.
pub const MAX_SAMPLE_SIZE: u32 = 512;

/// Decode the whole image, escalating the sample size on OOM.
pub fn decode_whole_sampled(
    reader: &mut dyn ImageReader,
    initial_sample_size: u32,
) -> Result<SampledImage, DecodeError> {
    let mut sample_size = initial_sample_size.max(1);
    loop {
        match reader.decode_whole(sample_size) {
            Ok(image) => {
                return Ok(SampledImage { image, sample_size });
            }
            Err(DecodeError::OutOfMemory) => {
                sample_size *= 2;
                if sample_size > MAX_SAMPLE_SIZE {
                    return Err(DecodeError::SampleSizeExhausted(sample_size));
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Decode a region at `multiplier x` the sample size implied by the
/// requested output, escalating on OOM.
pub fn decode_region_sampled(
    reader: &mut dyn ImageReader,
    region: ImageRect,
    req_width: u32,
    req_height: u32,
    multiplier: u32,
) -> Result<SampledImage, DecodeError> {
    let mut sample_size =
        multiplier * sample::for_requested(region.width(), region.height(), req_width, req_height);
    sample_size = sample_size.max(1);
    loop {
        match reader.decode_region(region, sample_size) {
            Ok(image) => {
                return Ok(SampledImage { image, sample_size });
            }
            Err(DecodeError::OutOfMemory) => {
                sample_size *= 2;
                if sample_size > MAX_SAMPLE_SIZE {
                    return Err(DecodeError::SampleSizeExhausted(sample_size));
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Initial load of a source for display.
///
/// The sample size is the larger of the requested-size calculation (the
/// view roughly `req_width x req_height`) and the hard texture ceiling, so
/// the loaded buffer is both display-sized and displayable.
pub fn load_sampled(
    opener: &dyn SourceOpener,
    id: &str,
    req_width: u32,
    req_height: u32,
    ceiling: &TextureCeiling,
) -> Result<LoadedImage, DecodeError> {
    let mut reader = opener.open(id)?;
    let (width, height) = reader.decode_bounds()?;
    let sample_size = sample::for_requested(width, height, req_width, req_height)
        .max(sample::for_texture(width, height, ceiling));
    let sampled = decode_whole_sampled(&mut *reader, sample_size)?;
    let degrees_rotated = reader.orientation_degrees();
    Ok(LoadedImage {
        image: sampled.image,
        sample_size: sampled.sample_size,
        degrees_rotated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::types::DecodedImage;

    /// Reader double that refuses allocations above a pixel budget and
    /// counts decode attempts.
    pub(crate) struct StubReader {
        pub width: u32,
        pub height: u32,
        /// Largest output pixel count a decode may allocate.
        pub max_pixels: u32,
        pub attempts: u32,
        pub degrees: i32,
    }

    impl StubReader {
        pub fn new(width: u32, height: u32, max_pixels: u32) -> Self {
            Self {
                width,
                height,
                max_pixels,
                attempts: 0,
                degrees: 0,
            }
        }

        fn produce(&mut self, width: u32, height: u32) -> Result<DecodedImage, DecodeError> {
            self.attempts += 1;
            if u64::from(width) * u64::from(height) > u64::from(self.max_pixels) {
                return Err(DecodeError::OutOfMemory);
            }
            Ok(DecodedImage::new(
                width,
                height,
                vec![0u8; (width * height * 3) as usize],
            ))
        }
    }

    impl ImageReader for StubReader {
        fn decode_bounds(&mut self) -> Result<(u32, u32), DecodeError> {
            Ok((self.width, self.height))
        }

        fn decode_whole(&mut self, sample_size: u32) -> Result<DecodedImage, DecodeError> {
            let w = (self.width / sample_size).max(1);
            let h = (self.height / sample_size).max(1);
            self.produce(w, h)
        }

        fn decode_region(
            &mut self,
            region: ImageRect,
            sample_size: u32,
        ) -> Result<DecodedImage, DecodeError> {
            let w = (region.width() / sample_size).max(1);
            let h = (region.height() / sample_size).max(1);
            self.produce(w, h)
        }

        fn orientation_degrees(&mut self) -> i32 {
            self.degrees
        }
    }

    struct StubOpener {
        width: u32,
        height: u32,
        max_pixels: u32,
        degrees: i32,
    }

    impl SourceOpener for StubOpener {
        fn open(&self, _id: &str) -> Result<Box<dyn ImageReader>, DecodeError> {
            let mut reader = StubReader::new(self.width, self.height, self.max_pixels);
            reader.degrees = self.degrees;
            Ok(Box::new(reader))
        }
    }

    #[test]
    fn test_whole_decode_without_pressure() {
        let mut reader = StubReader::new(1000, 800, u32::MAX);
        let sampled = decode_whole_sampled(&mut reader, 1).unwrap();
        assert_eq!(sampled.sample_size, 1);
        assert_eq!(sampled.image.width, 1000);
        assert_eq!(reader.attempts, 1);
    }

    #[test]
    fn test_whole_decode_escalates_until_it_fits() {
        // 4000x4000 with room for at most 1000x1000 pixels: sample sizes
        // 1, 2 fail, 4 fits.
        let mut reader = StubReader::new(4000, 4000, 1_000_000);
        let sampled = decode_whole_sampled(&mut reader, 1).unwrap();
        assert_eq!(sampled.sample_size, 4);
        assert_eq!(sampled.image.width, 1000);
        assert_eq!(reader.attempts, 3);
    }

    #[test]
    fn test_whole_decode_exhausts_past_ceiling() {
        // Nothing ever fits: the loop must terminate with the escalation
        // converted into a terminal failure after the 512 attempt.
        let mut reader = StubReader::new(100_000, 100_000, 0);
        let result = decode_whole_sampled(&mut reader, 1);
        assert!(matches!(result, Err(DecodeError::SampleSizeExhausted(1024))));
        // Attempts at 1, 2, 4, ..., 512 = 10 tries, not an infinite loop
        assert_eq!(reader.attempts, 10);
    }

    #[test]
    fn test_region_decode_uses_requested_size_sample() {
        // 2000x2000 region shown at 500x500: for_requested gives 2
        let mut reader = StubReader::new(4000, 4000, u32::MAX);
        let sampled = decode_region_sampled(
            &mut reader,
            ImageRect::new(0, 0, 2000, 2000),
            500,
            500,
            1,
        )
        .unwrap();
        assert_eq!(sampled.sample_size, 2);
        assert_eq!(sampled.image.width, 1000);
    }

    #[test]
    fn test_region_decode_multiplier_scales_sample() {
        let mut reader = StubReader::new(4000, 4000, u32::MAX);
        let sampled = decode_region_sampled(
            &mut reader,
            ImageRect::new(0, 0, 2000, 2000),
            500,
            500,
            4,
        )
        .unwrap();
        assert_eq!(sampled.sample_size, 8);
    }

    #[test]
    fn test_region_decode_exhaustion_is_terminal() {
        let mut reader = StubReader::new(4000, 4000, 0);
        let result = decode_region_sampled(
            &mut reader,
            ImageRect::new(0, 0, 2000, 2000),
            2000,
            2000,
            1,
        );
        assert!(matches!(result, Err(DecodeError::SampleSizeExhausted(_))));
    }

    #[test]
    fn test_load_combines_requested_and_texture_sample_sizes() {
        // 4000x3000 source, display request far larger than the image, so
        // only the 2048 texture ceiling forces sampling: expect 2.
        let opener = StubOpener {
            width: 4000,
            height: 3000,
            max_pixels: u32::MAX,
            degrees: 90,
        };
        let loaded = load_sampled(&opener, "stub", 4000, 4000, &TextureCeiling::default()).unwrap();
        assert_eq!(loaded.sample_size, 2);
        assert_eq!(loaded.image.width, 2000);
        assert_eq!(loaded.degrees_rotated, 90);
    }

    #[test]
    fn test_load_prefers_display_sample_when_larger() {
        // Small display: requested-size sampling dominates the ceiling.
        let opener = StubOpener {
            width: 4000,
            height: 3000,
            max_pixels: u32::MAX,
            degrees: 0,
        };
        let loaded = load_sampled(&opener, "stub", 500, 400, &TextureCeiling::default()).unwrap();
        // for_requested(4000, 3000, 500, 400) escalates while both halved
        // axes exceed the target (true at 1 and 2), landing on 4; the
        // texture ceiling alone would only need 2.
        assert_eq!(loaded.sample_size, 4);
    }
}
