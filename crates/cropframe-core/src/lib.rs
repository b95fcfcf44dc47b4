//! Cropframe Core - Interactive crop engine
//!
//! This crate provides the core functionality for Cropframe: crop-window
//! geometry under simultaneous constraints (aspect lock, size limits,
//! rotated-image bounds, snapping, elastic resistance), and a memory-bounded
//! crop pipeline that decodes arbitrarily large sources by adaptively
//! downsampling and retrying.
//!
//! # Architecture
//!
//! - [`geometry`] - rectangles, hit testing, drag resolution, bounds
//! - [`view`] - the display matrix and gesture orchestration
//! - [`sample`] - power-of-two sample-size calculation
//! - [`decode`] - decode capabilities with out-of-memory recovery
//! - [`transform`] - compositing (rotate/flip/crop) and output resizing
//! - [`encode`] - result encoding and destinations
//! - [`pipeline`] - request snapshots, strategy selection, background tasks
//!
//! Geometry is synchronous and single-threaded; pixel work runs on worker
//! threads against immutable snapshots (see [`pipeline::task`]).

pub mod decode;
pub mod encode;
pub mod geometry;
pub mod options;
pub mod pipeline;
pub mod sample;
pub mod transform;
pub mod view;

pub use decode::{DecodeError, DecodedImage, FsSource, MemoryBudget, SourceOpener};
pub use encode::{FsSink, OutputFormat, OutputSink};
pub use geometry::{CropShape, Handle, ImageRect, RectF};
pub use options::{ConfigError, CropOptions};
pub use pipeline::task::{CropScheduler, LoadOutcome};
pub use pipeline::{CropError, CropOutput, CropRequest, CropSource, OutputSpec};
pub use sample::TextureCeiling;
pub use transform::SizeMode;
pub use view::{CropCompletion, CropView};
