//! Error types for core pipeline operations.
//!
//! # Overview
//!
//! The [`Error`] enum covers the failure modes of buffer construction,
//! the memory layer and format dispatch. Graph wiring errors live in
//! `weft-graph`, which wraps this enum.
//!
//! Allocation and format errors are fatal for a frame: the renderer aborts
//! its scanline loop and surfaces them. Geometry degeneracies are *not*
//! errors; nodes recover locally by producing empty strips.
//!
//! # Dependencies
//!
//! - [`thiserror`] - derive macro for error implementations

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core pipeline types.
#[derive(Debug, Error)]
pub enum Error {
    /// Memory allocation failed.
    #[error("failed to allocate {requested} bytes: {reason}")]
    AllocationFailed {
        /// Bytes requested.
        requested: usize,
        /// Failure reason.
        reason: String,
    },

    /// An armed allocation trap rejected a heap allocation.
    ///
    /// Embedded callers arm the trap after startup to prove that all
    /// per-frame allocations are served by the pool.
    #[error("allocation trap armed: refused heap request for {requested} bytes")]
    TrapArmed {
        /// Bytes requested.
        requested: usize,
    },

    /// No conversion kernel exists for the requested pixel format pair.
    #[error("unsupported pixel format: {format}")]
    UnsupportedFormat {
        /// Format name or description.
        format: String,
    },

    /// Width or height is unusable.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Why the dimensions are invalid.
        reason: String,
    },

    /// Stride smaller than a row of pixels.
    #[error("stride {stride} is less than minimum {min_stride} for width {width}")]
    InvalidStride {
        /// Provided stride.
        stride: usize,
        /// Minimum required stride.
        min_stride: usize,
        /// Row width in pixels.
        width: u32,
    },

    /// Pixel coordinates outside a buffer.
    #[error("pixel ({x}, {y}) out of bounds for {width}x{height}")]
    OutOfBounds {
        /// X coordinate accessed.
        x: u32,
        /// Y coordinate accessed.
        y: u32,
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },

    /// Generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an [`Error::AllocationFailed`].
    #[inline]
    pub fn allocation_failed(requested: usize, reason: impl Into<String>) -> Self {
        Self::AllocationFailed {
            requested,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::UnsupportedFormat`].
    #[inline]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates an [`Error::InvalidDimensions`].
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::OutOfBounds`].
    #[inline]
    pub fn out_of_bounds(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::Other`].
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// `true` for allocation failures, including trap refusals.
    #[inline]
    pub fn is_allocation_error(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. } | Self::TrapArmed { .. }
        )
    }

    /// `true` for format dispatch failures.
    #[inline]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_failed_display() {
        let err = Error::allocation_failed(4096, "pool exhausted");
        assert!(err.to_string().contains("4096"));
        assert!(err.to_string().contains("pool exhausted"));
        assert!(err.is_allocation_error());
    }

    #[test]
    fn test_trap_armed_is_allocation_error() {
        assert!(Error::TrapArmed { requested: 16 }.is_allocation_error());
    }

    #[test]
    fn test_unsupported_format() {
        let err = Error::unsupported_format("Index4 without palette");
        assert!(err.is_format_error());
        assert!(err.to_string().contains("Index4"));
    }
}
