//! The renderer node: owner of the scanline loop.
//!
//! [`RendererNode`] holds the virtual screen geometry and drives the
//! frame from [`Graph::exec`](crate::Graph::exec): prepare the chain,
//! then pull one row at a time and hand each strip to the sink. Its own
//! pull translates between screen space and the upstream frame and
//! converts the strip to the configured output format.

use crate::error::GraphResult;
use crate::graph::{Graph, NodeId};
use crate::rows;
use weft_core::memory::AllocatorHandle;
use weft_core::{
    AffineCapability, DataRange, PixelFormat, PrepareStatus, RenderContext, RenderRequest,
    RenderResponse, StripKey,
};
use weft_math::{Affine, Point, TransformClass};
use weft_pix::{descriptor, ensure_convertible};

/// Scanline renderer with a virtual screen.
#[derive(Debug)]
pub struct RendererNode {
    width: u32,
    height: u32,
    origin: (i32, i32),
    out_format: Option<PixelFormat>,
    allocator: Option<AllocatorHandle>,
}

impl RendererNode {
    /// Creates a renderer with a `width` x `height` virtual screen.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            origin: (0, 0),
            out_format: None,
            allocator: None,
        }
    }

    /// Resizes the virtual screen.
    pub fn set_virtual_screen(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Places the screen's top-left corner in the upstream frame.
    pub fn set_origin(&mut self, x: i32, y: i32) {
        self.origin = (x, y);
    }

    /// Centers the screen on the upstream origin.
    pub fn set_pivot_center(&mut self) {
        self.origin = (-(self.width as i32) / 2, -(self.height as i32) / 2);
    }

    /// Sets the strip format offered to the sink. Defaults to the
    /// upstream working format (straight RGBA8).
    pub fn set_output_format(&mut self, format: PixelFormat) {
        self.out_format = Some(format);
    }

    /// Binds the allocator used for the frame's contexts.
    pub fn set_allocator(&mut self, allocator: AllocatorHandle) {
        self.allocator = Some(allocator);
    }

    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn allocator_handle(&self) -> Option<AllocatorHandle> {
        self.allocator.clone()
    }

    pub(crate) fn absorb_capability(&self) -> AffineCapability {
        AffineCapability::TRANSLATE
    }

    /// Absorbs integer translations into the screen origin.
    pub(crate) fn push_transform(&mut self, m: &Affine) -> bool {
        match m.classify() {
            TransformClass::Identity => true,
            TransformClass::Translation if m.tx.is_integer() && m.ty.is_integer() => {
                self.origin.0 -= m.tx.floor();
                self.origin.1 -= m.ty.floor();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        if let Some(format) = self.out_format {
            ensure_convertible(format, false)?;
        }
        let status = graph.prepare_input(id, 0, ctx)?;
        Ok((
            status,
            DataRange::from_size(self.width, self.height),
        ))
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let shift = Point::from_int(self.origin.0, self.origin.1);
        let upstream_req = RenderRequest {
            width: req.width,
            height: req.height,
            origin: req.origin + shift,
        };
        let mut resp = graph.pull_input(id, 0, &upstream_req, ctx)?;
        // back into screen space
        resp.origin = resp.origin - shift;
        resp.range = resp.range.translate(-self.origin.0, -self.origin.1);

        let Some(format) = self.out_format else {
            return Ok(resp);
        };
        if resp.is_empty()
            || resp
                .strip
                .as_ref()
                .is_some_and(|strip| strip.format() == format)
        {
            return Ok(resp);
        }
        self.convert(req, resp, format, ctx)
    }

    /// Re-encodes a straight RGBA8 response into the configured format.
    fn convert(
        &self,
        req: &RenderRequest,
        resp: RenderResponse,
        format: PixelFormat,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let x0 = req.origin.x.floor();
        let y0 = req.origin.y.floor();
        let extent = DataRange::new(x0, y0, req.width as i32, req.height as i32);
        let range = resp.range.intersect(&extent);
        if range.is_empty() {
            return Ok(RenderResponse::empty(req.origin));
        }
        let desc = descriptor(format);
        let mut native = ctx.pool.acquire(StripKey {
            format,
            width: req.width,
            height: req.height,
        })?;
        let mut scratch = ctx.acquire_rgba_row(req.width)?;
        for dy in 0..req.height {
            let y = y0 + dy as i32;
            scratch.row_mut(0).fill(0);
            rows::copy_lit(scratch.row_mut(0), x0, req.width, &resp, y);
            (desc.unstraighten)(native.row_mut(dy), scratch.row(0), req.width as usize, None);
        }
        Ok(RenderResponse {
            strip: Some(native),
            origin: Point::from_int(x0, y0),
            range,
        })
    }
}
