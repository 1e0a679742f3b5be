//! # weft-core
//!
//! Core types for the weft compositing pipeline.
//!
//! This crate provides the foundation the node graph is built on:
//!
//! - [`Error`], [`Result`] - unified error handling
//! - [`DataRange`] - the pixels a producer actually wrote
//! - [`PixelFormat`] - format identifiers and geometry
//! - [`Palette`] - RGBA8 palettes for index formats
//! - [`memory`] - allocator seam, heap/pool implementations, RAII handle
//! - [`ImageBuffer`], [`ViewPort`] - owned storage and non-owning views
//! - [`strip`] - per-frame pool of scanline strips
//! - [`render`] - the pull-protocol contract and per-frame context
//!
//! ## Design Philosophy
//!
//! Peak memory is O(width): producers answer one strip at a time and
//! strip storage is recycled through a per-frame pool. Every allocation
//! flows through an [`Allocator`](memory::Allocator) so embedded targets
//! can prove a frame fits a preallocated pool.
//!
//! ## Crate Structure
//!
//! ```text
//! weft-math
//!    ^
//!    |
//! weft-core (this crate)
//!    ^
//!    |
//!    +-- weft-pix   (format kernels)
//!    +-- weft-graph (nodes, renderer)
//! ```

#![warn(missing_docs)]

pub mod buffer;
pub mod error;
pub mod format;
pub mod memory;
pub mod palette;
pub mod range;
pub mod render;
pub mod strip;
pub mod viewport;

pub use buffer::ImageBuffer;
pub use error::{Error, Result};
pub use format::PixelFormat;
pub use palette::Palette;
pub use range::DataRange;
pub use render::{
    AffineCapability, FrameMetrics, PrepareStatus, RenderContext, RenderRequest, RenderResponse,
};
pub use strip::{Strip, StripKey, StripPool};
pub use viewport::ViewPort;
