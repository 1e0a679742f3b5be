//! Separable box blur nodes.
//!
//! A box blur of radius `r` averages a `2r+1` window. Horizontal and
//! vertical passes are separate nodes so a full blur composes as
//! `HorizontalBlurNode >> VerticalBlurNode` (either order; the division
//! path is identical, so the two orders agree pixel-exactly).
//!
//! Divisions go through the reciprocal table
//! ([`recip_div`](weft_math::recip_div)), which bounds the radius at 127.
//!
//! The vertical pass keeps a ring of normalized upstream rows and a
//! rolling per-channel sum. It leans on the renderer's ordering
//! guarantee (pulls arrive with non-decreasing y) to advance the ring
//! instead of re-pulling the window every row. Rows outside the upstream
//! extent are clamped (edge replication); the horizontal pass replicates
//! at the lit span's ends the same way.

use crate::error::GraphResult;
use crate::graph::{Graph, NodeId};
use crate::rows;
use weft_core::{
    DataRange, PixelFormat, PrepareStatus, RenderContext, RenderRequest, RenderResponse, Strip,
    StripKey,
};
use weft_math::{recip_div, Point};

/// Largest supported blur radius (`2r+1` must fit the reciprocal table).
pub const MAX_BLUR_RADIUS: u32 = 127;

/// Horizontal box blur: `out[x]` averages `src[x-r ..= x+r]`.
#[derive(Debug)]
pub struct HorizontalBlurNode {
    radius: u32,
}

impl HorizontalBlurNode {
    /// Creates a horizontal blur; the radius saturates at
    /// [`MAX_BLUR_RADIUS`].
    pub fn new(radius: u32) -> Self {
        Self {
            radius: radius.min(MAX_BLUR_RADIUS),
        }
    }

    /// The effective radius.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        let status = graph.prepare_input(id, 0, ctx)?;
        let up = graph.input(id, 0)?;
        Ok((status, graph.node_bounds(up).inflate(self.radius as i32, 0)))
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        if self.radius == 0 {
            return graph.pull_input(id, 0, req, ctx);
        }
        let r = self.radius as i32;
        let window = 2 * r as usize + 1;
        let divisor = window as u8;
        let x0 = req.origin.x.floor();
        let y0 = req.origin.y.floor();
        let wide = RenderRequest {
            width: req.width + 2 * self.radius,
            height: req.height,
            origin: req.origin - Point::from_int(r, 0),
        };
        let resp = graph.pull_input(id, 0, &wide, ctx)?;
        if resp.is_empty() {
            return Ok(RenderResponse::empty(req.origin));
        }
        let mut strip = ctx.pool.acquire(StripKey {
            format: PixelFormat::Rgba8,
            width: req.width,
            height: req.height,
        })?;
        let mut lit = DataRange::EMPTY;
        for dy in 0..req.height {
            let y = y0 + dy as i32;
            let lit_in = rows::lit_row_range(&resp, y);
            if lit_in.is_empty() {
                continue;
            }
            let out_span = lit_in
                .inflate(r, 0)
                .intersect(&DataRange::new(x0, y, req.width as i32, 1));
            if out_span.is_empty() {
                continue;
            }
            // materialize the window's worth of replicated samples once,
            // then a plain rolling sum does the rest
            let padded_w = out_span.w as usize + 2 * r as usize;
            let mut padded = ctx.pool.acquire(StripKey::row(PixelFormat::Rgba8, padded_w as u32))?;
            {
                let prow = padded.row_mut(0);
                for i in 0..padded_w {
                    let x = out_span.x - r + i as i32;
                    let cx = x.clamp(lit_in.x, lit_in.right() - 1);
                    prow[i * 4..i * 4 + 4].copy_from_slice(&rows::rgba_at(&resp, cx, y));
                }
            }
            let prow = padded.row(0);
            let orow = strip.row_mut(dy);
            let mut sums = [0u32; 4];
            for i in 0..window {
                for c in 0..4 {
                    sums[c] += prow[i * 4 + c] as u32;
                }
            }
            for o in 0..out_span.w as usize {
                let ox = (out_span.x - x0) as usize + o;
                for c in 0..4 {
                    orow[ox * 4 + c] = recip_div(sums[c], divisor) as u8;
                }
                if o + 1 < out_span.w as usize {
                    let enter = (o + window) * 4;
                    let leave = o * 4;
                    for c in 0..4 {
                        sums[c] += prow[enter + c] as u32;
                        sums[c] -= prow[leave + c] as u32;
                    }
                }
            }
            lit = lit.union(&out_span);
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
    use crate::{Graph, SourceNode};
    use weft_core::memory::HeapAllocator;
    use weft_core::{ImageBuffer, PixelFormat};

    /// 3x3 opaque black with a red pixel in the middle.
    fn center_red_3x3() -> ImageBuffer {
        let mut bytes = vec![0u8; 9 * 4];
        for px in bytes.chunks_exact_mut(4) {
            px[3] = 255;
        }
        bytes[4 * 4..4 * 4 + 4].copy_from_slice(&[255, 0, 0, 255]);
        ImageBuffer::from_bytes(3, 3, PixelFormat::Rgba8, &bytes, &HeapAllocator::shared())
            .unwrap()
    }

    fn blur_graph(radius: u32) -> (Graph, crate::NodeId) {
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(center_red_3x3()));
        let h = g.add(HorizontalBlurNode::new(radius));
        let v = g.add(VerticalBlurNode::new(radius));
        g.connect(src, h).unwrap();
        g.connect(h, v).unwrap();
        (g, v)
    }

    #[test]
    fn test_box_blur_r1_spreads_to_ninth() {
        let (mut g, tail) = blur_graph(1);
        let mut ctx = RenderContext::new(HeapAllocator::shared(), 1);
        g.prepare_node(tail, &mut ctx).unwrap();
        for y in 0..3 {
            let req = RenderRequest::row(3, Point::from_int(0, y));
            let resp = g.pull_node(tail, &req, &mut ctx).unwrap();
            let strip = resp.strip.unwrap();
            for x in 0..3usize {
                let px = &strip.row(0)[x * 4..x * 4 + 4];
                // 255 / 9 lands on 28 with the reciprocal rounding
                assert_eq!(px, &[28, 0, 0, 255], "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_vertical_blur_keeps_origin_x() {
        let (mut g, tail) = blur_graph(1);
        let mut ctx = RenderContext::new(HeapAllocator::shared(), 1);
        g.prepare_node(tail, &mut ctx).unwrap();
        for y in -1..4 {
            let req = RenderRequest::row(3, Point::from_int(0, y));
            let resp = g.pull_node(tail, &req, &mut ctx).unwrap();
            assert_eq!(
                resp.origin.x.floor(),
                0,
                "vertical blur shifted origin.x on row {y}"
            );
        }
    }

    #[test]
    fn test_radius_zero_is_passthrough() {
        let (mut g, tail) = blur_graph(0);
        let mut ctx = RenderContext::new(HeapAllocator::shared(), 1);
        g.prepare_node(tail, &mut ctx).unwrap();
        let req = RenderRequest::row(3, Point::from_int(0, 1));
        let resp = g.pull_node(tail, &req, &mut ctx).unwrap();
        let strip = resp.strip.unwrap();
        assert_eq!(&strip.row(0)[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_blur_grows_declared_bounds() {
        let (mut g, tail) = blur_graph(2);
        let mut ctx = RenderContext::new(HeapAllocator::shared(), 1);
        g.prepare_node(tail, &mut ctx).unwrap();
        // 3x3 source, h grows x by 2, v grows y by 2
        assert_eq!(g.node_bounds(tail), DataRange::new(-2, -2, 7, 7));
    }
}

#[derive(Debug)]
struct RingRow {
    y: i32,
    x0: i32,
    w: u32,
    strip: Strip,
    range: DataRange,
}

/// The normalized bytes of ring row `y` (already clamped), if resident.
fn find_row<'r>(ring: &'r [RingRow], y: i32, x0: i32, w: u32) -> Option<&'r [u8]> {
    ring.iter()
        .find(|row| row.y == y && row.x0 == x0 && row.w == w)
        .map(|row| row.strip.row(0))
}

/// Vertical box blur with a rolling `2r+1`-row window.
#[derive(Debug)]
pub struct VerticalBlurNode {
    radius: u32,
    ring: Vec<RingRow>,
    acc: Vec<u32>,
    acc_pos: Option<(i32, i32, u32)>,
}

impl VerticalBlurNode {
    /// Creates a vertical blur; the radius saturates at
    /// [`MAX_BLUR_RADIUS`].
    pub fn new(radius: u32) -> Self {
        Self {
            radius: radius.min(MAX_BLUR_RADIUS),
            ring: Vec::new(),
            acc: Vec::new(),
            acc_pos: None,
        }
    }

    /// The effective radius.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        self.ring.clear();
        self.acc_pos = None;
        let status = graph.prepare_input(id, 0, ctx)?;
        let up = graph.input(id, 0)?;
        Ok((status, graph.node_bounds(up).inflate(0, self.radius as i32)))
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        if self.radius == 0 {
            return graph.pull_input(id, 0, req, ctx);
        }
        let up = graph.input(id, 0)?;
        let ub = graph.node_bounds(up);
        if ub.is_empty() {
            return Ok(RenderResponse::empty(req.origin));
        }
        let r = self.radius as i32;
        let divisor = (2 * r + 1) as u8;
        let x0 = req.origin.x.floor();
        let y0 = req.origin.y.floor();
        let w = req.width;
        let (top, bot) = (ub.y, ub.bottom());
        let len = w as usize * 4;
        let mut strip = ctx.pool.acquire(StripKey {
            format: PixelFormat::Rgba8,
            width: w,
            height: req.height,
        })?;
        let mut lit = DataRange::EMPTY;
        for dy in 0..req.height {
            let y = y0 + dy as i32;
            let lo = (y - r).clamp(top, bot - 1);
            let hi = (y + r).clamp(top, bot - 1);
            // fetch window rows not yet resident, ascending
            for j in lo..=hi {
                if self
                    .ring
                    .iter()
                    .any(|row| row.y == j && row.x0 == x0 && row.w == w)
                {
                    continue;
                }
                let row_req = RenderRequest::row(w, Point::from_int(x0, j));
                let resp = graph.pull_node(up, &row_req, ctx)?;
                let mut row_strip = ctx.acquire_rgba_row(w)?;
                let range = rows::copy_lit(row_strip.row_mut(0), x0, w, &resp, j);
                self.ring.push(RingRow {
                    y: j,
                    x0,
                    w,
                    strip: row_strip,
                    range,
                });
            }
            let ring = &self.ring;
            let acc = &mut self.acc;
            let can_slide = self.acc_pos == Some((y - 1, x0, w)) && acc.len() == len;
            if can_slide {
                let enter = find_row(ring, (y + r).clamp(top, bot - 1), x0, w);
                let leave = find_row(ring, (y - 1 - r).clamp(top, bot - 1), x0, w);
                if let (Some(enter), Some(leave)) = (enter, leave) {
                    for i in 0..len {
                        acc[i] += enter[i] as u32;
                        acc[i] -= leave[i] as u32;
                    }
                }
            } else {
                acc.clear();
                acc.resize(len, 0);
                for j in (y - r)..=(y + r) {
                    if let Some(bytes) = find_row(ring, j.clamp(top, bot - 1), x0, w) {
                        for i in 0..len {
                            acc[i] += bytes[i] as u32;
                        }
                    }
                }
            }
            self.acc_pos = Some((y, x0, w));
            {
                let orow = strip.row_mut(dy);
                for i in 0..len {
                    orow[i] = recip_div(self.acc[i], divisor) as u8;
                }
            }
            // lit span: the union of the window rows' spans, on this row
            let mut span = DataRange::EMPTY;
            for j in (y - r)..=(y + r) {
                let jc = j.clamp(top, bot - 1);
                if let Some(row) = self
                    .ring
                    .iter()
                    .find(|row| row.y == jc && row.x0 == x0 && row.w == w)
                {
                    if !row.range.is_empty() {
                        span = span.union(&DataRange::new(row.range.x, y, row.range.w, 1));
                    }
                }
            }
            let span = span.intersect(&DataRange::new(x0, y, w as i32, 1));
            if !span.is_empty() {
                lit = lit.union(&span);
            }
            // evict below the window; keep the row the next slide removes
            self.ring
                .retain(|row| row.y >= lo && row.x0 == x0 && row.w == w);
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
