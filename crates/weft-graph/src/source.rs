//! Image source node.
//!
//! [`SourceNode`] is where pixels enter the graph: it holds a decoded
//! image plus an affine state (position, pivot, rotation, scale) and
//! samples the image along each requested row with the format's DDA
//! kernel.
//!
//! The source declares it can absorb arbitrary affine transforms: a
//! downstream [`AffineNode`](crate::AffineNode) pushes its matrix here
//! instead of materializing an intermediate, and the source folds it
//! into its sampling matrix, so the whole transform chain costs one
//! inverse per frame.

use crate::error::GraphResult;
use crate::geom::transform_bounds;
use weft_core::{
    AffineCapability, DataRange, ImageBuffer, PrepareStatus, RenderContext, RenderRequest,
    RenderResponse, StripKey, PixelFormat,
};
use weft_math::{Affine, Point};
use weft_pix::{descriptor, DdaParams, SampleFilter};

/// A single-image source with affine placement state.
#[derive(Debug)]
pub struct SourceNode {
    image: ImageBuffer,
    position: Point,
    pivot: Point,
    rotation: f32,
    scale: (f32, f32),
    filter: SampleFilter,
    pushed: Affine,
    pushed_frame: Option<u64>,
    // prepare-time cache: total inverse and transformed bounds
    inv: Option<Affine>,
    out_bounds: DataRange,
}

impl SourceNode {
    /// Creates a source over `image`, placed at the origin.
    pub fn new(image: ImageBuffer) -> Self {
        Self {
            image,
            position: Point::ZERO,
            pivot: Point::ZERO,
            rotation: 0.0,
            scale: (1.0, 1.0),
            filter: SampleFilter::Nearest,
            pushed: Affine::IDENTITY,
            pushed_frame: None,
            inv: None,
            out_bounds: DataRange::EMPTY,
        }
    }

    /// Replaces the source image.
    pub fn set_source(&mut self, image: ImageBuffer) {
        self.image = image;
    }

    /// Places the image's pivot at (x, y) in output space.
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Point::from_f32(x, y);
    }

    /// Sets the pivot in image space (rotation/scale center).
    pub fn set_pivot(&mut self, x: f32, y: f32) {
        self.pivot = Point::from_f32(x, y);
    }

    /// Centers the pivot on the image.
    pub fn set_pivot_center(&mut self) {
        self.pivot = Point::from_f32(
            self.image.width() as f32 / 2.0,
            self.image.height() as f32 / 2.0,
        );
    }

    /// Sets the rotation in radians.
    pub fn set_rotation(&mut self, radians: f32) {
        self.rotation = radians;
    }

    /// Sets per-axis scale factors.
    pub fn set_scale(&mut self, sx: f32, sy: f32) {
        self.scale = (sx, sy);
    }

    /// Sets the sampling filter.
    pub fn set_interpolation(&mut self, filter: SampleFilter) {
        self.filter = filter;
    }

    /// The image currently wired in.
    pub fn source(&self) -> &ImageBuffer {
        &self.image
    }

    fn total_matrix(&self, frame: u64) -> Affine {
        let own = Affine::translation(-self.pivot)
            .then(&Affine::rotation_scale(self.rotation, self.scale.0, self.scale.1))
            .then(&Affine::translation(self.position));
        match self.pushed_frame {
            Some(f) if f == frame => own.then(&self.pushed),
            _ => own,
        }
    }

    pub(crate) fn absorb_capability(&self) -> AffineCapability {
        AffineCapability::FULL_AFFINE
    }

    /// Accepts a transform pushed from downstream for this frame.
    pub(crate) fn push_transform(&mut self, m: &Affine, frame: u64) -> bool {
        match self.pushed_frame {
            Some(f) if f == frame => self.pushed = self.pushed.then(m),
            _ => {
                self.pushed = *m;
                self.pushed_frame = Some(frame);
            }
        }
        true
    }

    pub(crate) fn prepare(&mut self, frame: u64) -> (PrepareStatus, DataRange) {
        let total = self.total_matrix(frame);
        self.inv = total.invert();
        if self.inv.is_none() {
            // singular placement collapses to nothing; transparent, not fatal
            self.out_bounds = DataRange::EMPTY;
            return (PrepareStatus::Empty, DataRange::EMPTY);
        }
        self.out_bounds = transform_bounds(&total, self.image.bounds());
        (PrepareStatus::Ready, self.out_bounds)
    }

    pub(crate) fn pull(
        &mut self,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let Some(inv) = self.inv else {
            return Ok(RenderResponse::empty(req.origin));
        };
        let x0 = req.origin.x.floor();
        let y0 = req.origin.y.floor();
        let mut strip = ctx.pool.acquire(StripKey {
            format: PixelFormat::Rgba8,
            width: req.width,
            height: req.height,
        })?;
        let desc = descriptor(self.image.format());
        let view = self.image.view();
        let mut lit = DataRange::EMPTY;
        for dy in 0..req.height {
            let y = y0 + dy as i32;
            let row_span = self
                .out_bounds
                .intersect(&DataRange::new(x0, y, req.width as i32, 1));
            if row_span.is_empty() {
                continue;
            }
            let start = inv.apply(Point::from_int(row_span.x, y));
            let params = DdaParams {
                u0: start.x,
                v0: start.y,
                du: inv.a,
                dv: inv.c,
                filter: self.filter,
            };
            let off = (row_span.x - x0) as usize * 4;
            let len = row_span.w as usize * 4;
            let dst = &mut strip.row_mut(dy)[off..off + len];
            (desc.copy_row_dda)(dst, &view, &params);
            lit = lit.union(&row_span);
        }
        if lit.is_empty() {
            return Ok(RenderResponse::empty(req.origin));
        }
        Ok(RenderResponse {
            strip: Some(strip),
            origin: Point::from_int(x0, y0),
            range: lit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::memory::HeapAllocator;

    fn red_blue_2x1() -> ImageBuffer {
        ImageBuffer::from_bytes(
            2,
            1,
            PixelFormat::Rgba8,
            &[255, 0, 0, 255, 0, 0, 255, 255],
            &HeapAllocator::shared(),
        )
        .unwrap()
    }

    #[test]
    fn test_identity_pull() {
        let mut node = SourceNode::new(red_blue_2x1());
        let (status, bounds) = node.prepare(1);
        assert_eq!(status, PrepareStatus::Ready);
        assert_eq!(bounds, DataRange::new(0, 0, 2, 1));

        let mut ctx = RenderContext::new(HeapAllocator::shared(), 1);
        let req = RenderRequest::row(4, Point::from_int(0, 0));
        let resp = node.pull(&req, &mut ctx).unwrap();
        assert_eq!(resp.range, DataRange::new(0, 0, 2, 1));
        let strip = resp.strip.unwrap();
        assert_eq!(&strip.row(0)[0..4], &[255, 0, 0, 255]);
        assert_eq!(&strip.row(0)[4..8], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_miss_is_empty() {
        let mut node = SourceNode::new(red_blue_2x1());
        node.prepare(1);
        let mut ctx = RenderContext::new(HeapAllocator::shared(), 1);
        let req = RenderRequest::row(4, Point::from_int(0, 5));
        let resp = node.pull(&req, &mut ctx).unwrap();
        assert!(resp.is_empty());
    }

    #[test]
    fn test_pushed_scale_samples_wider() {
        let mut node = SourceNode::new(red_blue_2x1());
        node.push_transform(&Affine::scale(2.0, 1.0), 1);
        let (_, bounds) = node.prepare(1);
        assert_eq!(bounds, DataRange::new(0, 0, 4, 1));

        let mut ctx = RenderContext::new(HeapAllocator::shared(), 1);
        let resp = node
            .pull(&RenderRequest::row(4, Point::from_int(0, 0)), &mut ctx)
            .unwrap();
        let strip = resp.strip.unwrap();
        assert_eq!(&strip.row(0)[0..4], &[255, 0, 0, 255]);
        assert_eq!(&strip.row(0)[4..8], &[255, 0, 0, 255]);
        assert_eq!(&strip.row(0)[8..12], &[0, 0, 255, 255]);
        assert_eq!(&strip.row(0)[12..16], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_push_expires_next_frame() {
        let mut node = SourceNode::new(red_blue_2x1());
        node.push_transform(&Affine::scale(2.0, 1.0), 1);
        let (_, bounds) = node.prepare(2);
        assert_eq!(bounds, DataRange::new(0, 0, 2, 1));
    }
}
