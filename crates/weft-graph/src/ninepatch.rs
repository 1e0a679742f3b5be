//! Nine-patch source node.
//!
//! Splits the source image into a 3x3 grid by fixed-pixel border widths
//! and stretches only the center and edges to a destination size: corners
//! keep pixel scale, the top/bottom edges stretch horizontally, the
//! left/right edges vertically, the center both ways. Each output row is
//! three DDA runs with independent steps.

use crate::error::GraphResult;
use weft_core::{
    AffineCapability, DataRange, ImageBuffer, PixelFormat, PrepareStatus, RenderContext,
    RenderRequest, RenderResponse, StripKey,
};
use weft_math::{Fixed, Point};
use weft_pix::{descriptor, DdaParams, SampleFilter};

/// Fixed-pixel border widths of a nine-patch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Margins {
    /// Left border width.
    pub left: u32,
    /// Right border width.
    pub right: u32,
    /// Top border height.
    pub top: u32,
    /// Bottom border height.
    pub bottom: u32,
}

/// A stretched-border source node.
#[derive(Debug)]
pub struct NinePatchSourceNode {
    image: ImageBuffer,
    margins: Margins,
    dest_width: u32,
    dest_height: u32,
    position: (i32, i32),
    filter: SampleFilter,
    // effective margins after clamping against source and dest extents
    eff: Margins,
}

impl NinePatchSourceNode {
    /// Creates a nine-patch stretching `image` to `dest_width` x
    /// `dest_height`.
    pub fn new(image: ImageBuffer, margins: Margins, dest_width: u32, dest_height: u32) -> Self {
        Self {
            image,
            margins,
            dest_width,
            dest_height,
            position: (0, 0),
            filter: SampleFilter::Nearest,
            eff: Margins::default(),
        }
    }

    /// Places the patch's top-left corner in output space.
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.position = (x, y);
    }

    /// Changes the stretched size.
    pub fn set_dest_size(&mut self, width: u32, height: u32) {
        self.dest_width = width;
        self.dest_height = height;
    }

    /// Sets the sampling filter.
    pub fn set_interpolation(&mut self, filter: SampleFilter) {
        self.filter = filter;
    }

    pub(crate) fn absorb_capability(&self) -> AffineCapability {
        AffineCapability::empty()
    }

    pub(crate) fn prepare(&mut self) -> (PrepareStatus, DataRange) {
        if self.dest_width == 0 || self.dest_height == 0 {
            return (PrepareStatus::Empty, DataRange::EMPTY);
        }
        let (sw, sh) = (self.image.width(), self.image.height());
        let left = self.margins.left.min(sw).min(self.dest_width);
        let right = self
            .margins
            .right
            .min(sw - left)
            .min(self.dest_width - left);
        let top = self.margins.top.min(sh).min(self.dest_height);
        let bottom = self
            .margins
            .bottom
            .min(sh - top)
            .min(self.dest_height - top);
        self.eff = Margins {
            left,
            right,
            top,
            bottom,
        };
        let bounds = DataRange::new(
            self.position.0,
            self.position.1,
            self.dest_width as i32,
            self.dest_height as i32,
        );
        (PrepareStatus::Ready, bounds)
    }

    /// Source v coordinate for a local destination row.
    fn source_v(&self, y_local: i32) -> Fixed {
        let (sh, dh) = (self.image.height() as i32, self.dest_height as i32);
        let (top, bottom) = (self.eff.top as i32, self.eff.bottom as i32);
        if y_local < top {
            return Fixed::from_int(y_local);
        }
        if y_local >= dh - bottom {
            return Fixed::from_int(sh - (dh - y_local));
        }
        let span_src = sh - top - bottom;
        let span_dst = dh - top - bottom;
        let sy = Fixed::from_int(span_src).div(Fixed::from_int(span_dst));
        Fixed::from_int(top) + Fixed::from_int(y_local - top) * sy
    }

    /// The three column segments as (local x range, u at segment start,
    /// du).
    fn column_segments(&self) -> [(i32, i32, Fixed, Fixed); 3] {
        let (sw, dw) = (self.image.width() as i32, self.dest_width as i32);
        let (left, right) = (self.eff.left as i32, self.eff.right as i32);
        let span_src = sw - left - right;
        let span_dst = dw - left - right;
        let sx = if span_dst > 0 {
            Fixed::from_int(span_src).div(Fixed::from_int(span_dst))
        } else {
            Fixed::ZERO
        };
        [
            (0, left, Fixed::ZERO, Fixed::ONE),
            (left, dw - right, Fixed::from_int(left), sx),
            (dw - right, dw, Fixed::from_int(sw - right), Fixed::ONE),
        ]
    }

    pub(crate) fn pull(
        &mut self,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let x0 = req.origin.x.floor();
        let y0 = req.origin.y.floor();
        let bounds = DataRange::new(
            self.position.0,
            self.position.1,
            self.dest_width as i32,
            self.dest_height as i32,
        );
        let mut strip = ctx.pool.acquire(StripKey {
            format: PixelFormat::Rgba8,
            width: req.width,
            height: req.height,
        })?;
        let desc = descriptor(self.image.format());
        let view = self.image.view();
        let segments = self.column_segments();
        let mut lit = DataRange::EMPTY;
        for dy in 0..req.height {
            let y = y0 + dy as i32;
            let row_span = bounds.intersect(&DataRange::new(x0, y, req.width as i32, 1));
            if row_span.is_empty() {
                continue;
            }
            let v = self.source_v(y - self.position.1);
            for (seg_start, seg_end, u_base, du) in segments {
                // clip the segment (local coords) against the strip span
                let lo = (seg_start + self.position.0).max(row_span.x);
                let hi = (seg_end + self.position.0).min(row_span.right());
                if lo >= hi {
                    continue;
                }
                let local_lo = lo - self.position.0 - seg_start;
                let u0 = u_base + Fixed::from_int(local_lo) * du;
                let params = DdaParams {
                    u0,
                    v0: v,
                    du,
                    dv: Fixed::ZERO,
                    filter: self.filter,
                };
                let off = (lo - x0) as usize * 4;
                let len = (hi - lo) as usize * 4;
                let dst = &mut strip.row_mut(dy)[off..off + len];
                (desc.copy_row_dda)(dst, &view, &params);
            }
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
