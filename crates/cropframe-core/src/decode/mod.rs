//! Memory-bounded image decoding.
//!
//! This module provides:
//! - The decode capability traits ([`SourceOpener`], [`ImageReader`]) the
//!   pipeline consumes
//! - A built-in reader over the `image` crate ([`BytesReader`], [`FsSource`])
//! - Sample-size escalation loops that recover from out-of-memory failures
//!   ([`decode_whole_sampled`], [`decode_region_sampled`], [`load_sampled`])
//!
//! # Memory Strategy
//!
//! Decodes are attempted at the smallest power-of-two sample size that the
//! requested output and the texture ceiling allow. When a decode reports
//! [`DecodeError::OutOfMemory`] (the [`MemoryBudget`] was exceeded), the
//! sample size doubles and the decode retries up to a fixed ceiling; beyond
//! it the failure is terminal. Successful decodes always report the sample
//! size actually used so callers can rescale coordinates.

mod reader;
mod sampled;
mod types;

pub use reader::{BytesReader, FsSource, ImageReader, SourceOpener};
pub use sampled::{
    decode_region_sampled, decode_whole_sampled, load_sampled, MAX_SAMPLE_SIZE,
};
pub use types::{DecodeError, DecodedImage, LoadedImage, MemoryBudget, SampledImage};
