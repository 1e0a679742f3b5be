//! # weft-math
//!
//! Fixed-point math primitives for the weft compositing pipeline.
//!
//! Everything the pipeline computes with is 16.16 fixed-point. Floats are
//! accepted only on outer setter APIs and converted immediately, so a frame
//! renders bit-identically on a desktop host and on a microcontroller
//! without an FPU.
//!
//! - [`Fixed`] - 32-bit signed scalar with 16 fractional bits
//! - [`Point`] - 2D point (origins, pivots, translations)
//! - [`Affine`] - 2x3 affine matrix with composition and inversion
//! - [`RECIP_U8`] - reciprocal table turning small divisions into
//!   multiply-and-shift
//!
//! ## Crate Structure
//!
//! This crate is the foundation of weft and has no dependencies. All other
//! weft crates depend on `weft-math`.

#![warn(missing_docs)]

pub mod affine;
pub mod fixed;
pub mod point;

pub use affine::{Affine, TransformClass};
pub use fixed::{recip_div, Fixed, RECIP_SHIFT, RECIP_U8};
pub use point::Point;
