//! The pull-protocol contract: requests, responses, prepare status,
//! capability bits, and the per-frame render context.
//!
//! # Protocol
//!
//! A consumer asks its upstream for a strip with a [`RenderRequest`]; the
//! producer answers with a [`RenderResponse`] whose strip is valid until
//! dropped (it is an owned pool guard). The producer may answer with a
//! wider strip aligned to its own grid; the consumer re-clips using the
//! response's `origin` and `range`.
//!
//! Fatal conditions (allocation, missing format kernels) are `Err`;
//! "nothing here" is a successful empty response. This is the `Result`
//! rendition of the original status-code contract.

use crate::strip::{Strip, StripKey, StripPool};
use crate::{memory::AllocatorHandle, DataRange, PixelFormat, Result};
use bitflags::bitflags;
use weft_math::{Point, TransformClass};

/// A consumer's request for a strip of pixels.
///
/// `origin` is in the consumer's output frame; `height` is typically 1
/// (scanline pull) but batched heights are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    /// Strip width in pixels.
    pub width: u32,
    /// Strip height in pixels.
    pub height: u32,
    /// Top-left corner of the strip in the consumer's output frame.
    pub origin: Point,
}

impl RenderRequest {
    /// Request for one row of `width` pixels at `origin`.
    #[inline]
    pub const fn row(width: u32, origin: Point) -> Self {
        Self {
            width,
            height: 1,
            origin,
        }
    }

    /// The strip extent as a range anchored at the (integer floor of the)
    /// origin.
    #[inline]
    pub fn extent(&self) -> DataRange {
        DataRange::new(
            self.origin.x.floor(),
            self.origin.y.floor(),
            self.width as i32,
            self.height as i32,
        )
    }
}

/// A producer's answer to a [`RenderRequest`].
#[derive(Debug)]
pub struct RenderResponse {
    /// Produced pixels, `None` for a fully transparent answer.
    pub strip: Option<Strip>,
    /// Top-left corner of `strip` in the requester's frame. May differ
    /// from the request origin when the producer answered on its own
    /// grid.
    pub origin: Point,
    /// Pixels actually written, in the requester's frame. Everything
    /// outside is transparent.
    pub range: DataRange,
}

impl RenderResponse {
    /// A fully transparent response.
    #[inline]
    pub fn empty(origin: Point) -> Self {
        Self {
            strip: None,
            origin,
            range: DataRange::EMPTY,
        }
    }

    /// `true` when no pixels were produced.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty() || self.strip.is_none()
    }
}

/// Outcome of a node's prepare phase.
///
/// Fatal conditions are `Err` on the prepare call itself, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrepareStatus {
    /// Ready to produce pixels.
    #[default]
    Ready,
    /// A transform was accepted and will be materialized lazily.
    Deferred,
    /// The node will produce nothing this frame.
    Empty,
}

impl PrepareStatus {
    /// The worse of two statuses (`Ready < Deferred < Empty`).
    pub fn worst(self, other: Self) -> Self {
        use PrepareStatus::{Deferred, Empty, Ready};
        match (self, other) {
            (Empty, _) | (_, Empty) => Empty,
            (Deferred, _) | (_, Deferred) => Deferred,
            (Ready, Ready) => Ready,
        }
    }
}

bitflags! {
    /// What a node can absorb when a downstream neighbor pushes a
    /// transform into it.
    ///
    /// A push is legal only when the node's capability contains the
    /// transform's [`required`](AffineCapability::required) bits. A node
    /// that silently absorbs a transform must declare the matching bits
    /// (otherwise downstream clipping goes wrong).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AffineCapability: u8 {
        /// Translation.
        const TRANSLATE = 1 << 0;
        /// Scale with equal factors.
        const SCALE_UNIFORM = 1 << 1;
        /// Scale with distinct per-axis factors.
        const SCALE_ANY = 1 << 2;
        /// Rotation.
        const ROTATE = 1 << 3;
    }
}

impl AffineCapability {
    /// Everything: the node absorbs arbitrary affine transforms.
    pub const FULL_AFFINE: Self = Self::all();

    /// Capability bits a transform of the given class requires.
    pub fn required(class: TransformClass) -> Self {
        match class {
            TransformClass::Identity => Self::empty(),
            TransformClass::Translation => Self::TRANSLATE,
            TransformClass::ScaleUniform => Self::TRANSLATE | Self::SCALE_UNIFORM,
            TransformClass::ScaleAny => {
                Self::TRANSLATE | Self::SCALE_UNIFORM | Self::SCALE_ANY
            }
            TransformClass::Rotation => {
                Self::TRANSLATE | Self::SCALE_UNIFORM | Self::ROTATE
            }
            TransformClass::General => Self::FULL_AFFINE,
        }
    }
}

/// Per-frame counters, logged at frame end.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMetrics {
    /// Rows the renderer emitted.
    pub rows_rendered: u64,
    /// Pull requests issued across the graph.
    pub pulls: u64,
    /// Pixels run through a blend kernel.
    pub pixels_blended: u64,
    /// Strips acquired from the pool.
    pub strip_acquires: u64,
    /// Acquires served from cached storage.
    pub strip_reuses: u64,
}

/// Mutable per-frame state threaded through prepare and pull.
///
/// One context per `exec`; contexts are not reentrant and pipelines
/// running concurrently must hold disjoint contexts and allocators.
#[derive(Debug)]
pub struct RenderContext {
    /// Strip cache for this frame.
    pub pool: StripPool,
    /// Allocator for frame-lifetime buffers (affine materialization).
    pub allocator: AllocatorHandle,
    /// Frame counters.
    pub metrics: FrameMetrics,
    /// Frame number, used to memoize prepare.
    pub frame: u64,
}

impl RenderContext {
    /// Creates the context for frame `frame`.
    pub fn new(allocator: AllocatorHandle, frame: u64) -> Self {
        Self {
            pool: StripPool::new(allocator.clone()),
            allocator,
            metrics: FrameMetrics::default(),
            frame,
        }
    }

    /// Acquires a cleared straight-RGBA8 row strip.
    #[inline]
    pub fn acquire_rgba_row(&mut self, width: u32) -> Result<Strip> {
        self.pool.acquire(StripKey::row(PixelFormat::Rgba8, width))
    }

    /// Folds pool counters into the metrics and logs the frame summary.
    pub fn finish_frame(&mut self) {
        let (acquires, reuses) = self.pool.stats();
        self.metrics.strip_acquires = acquires;
        self.metrics.strip_reuses = reuses;
        tracing::debug!(
            frame = self.frame,
            rows = self.metrics.rows_rendered,
            pulls = self.metrics.pulls,
            pixels_blended = self.metrics.pixels_blended,
            strip_acquires = acquires,
            strip_reuses = reuses,
            "frame complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::HeapAllocator;
    use weft_math::Affine;

    #[test]
    fn test_prepare_status_worst() {
        use PrepareStatus::{Deferred, Empty, Ready};
        assert_eq!(Ready.worst(Ready), Ready);
        assert_eq!(Ready.worst(Deferred), Deferred);
        assert_eq!(Deferred.worst(Empty), Empty);
        assert_eq!(Empty.worst(Ready), Empty);
    }

    #[test]
    fn test_capability_required() {
        let translate = Affine::translation_int(3, 4);
        assert_eq!(
            AffineCapability::required(translate.classify()),
            AffineCapability::TRANSLATE
        );
        let rot = Affine::rotation_scale(0.7, 1.0, 1.0);
        assert!(AffineCapability::FULL_AFFINE
            .contains(AffineCapability::required(rot.classify())));
        assert!(!AffineCapability::TRANSLATE
            .contains(AffineCapability::required(rot.classify())));
    }

    #[test]
    fn test_empty_response() {
        let resp = RenderResponse::empty(Point::from_int(0, 5));
        assert!(resp.is_empty());
        assert!(resp.strip.is_none());
    }

    #[test]
    fn test_context_rgba_row() {
        let mut ctx = RenderContext::new(HeapAllocator::shared(), 1);
        let strip = ctx.acquire_rgba_row(320).unwrap();
        assert_eq!(strip.width(), 320);
        assert_eq!(strip.format(), PixelFormat::Rgba8);
        drop(strip);
        ctx.finish_frame();
        assert_eq!(ctx.metrics.strip_acquires, 1);
    }
}
