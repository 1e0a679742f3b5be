//! Alpha-mask keying node.
//!
//! [`MatteNode`] mixes a foreground (input 0) and a background (input 1)
//! under a mask (input 2): `out = lerp(bg, fg, mask / 255)` per pixel on
//! straightened RGBA8. The output's data range is the union of the
//! foreground and background ranges intersected with the mask's range,
//! so pixels the mask never covered stay transparent. Spans where the
//! mask is uniformly 0 or 255 skip the blend and copy the losing side
//! through; an entirely empty mask response short-circuits to the
//! background without pulling the foreground at all.

use crate::error::GraphResult;
use crate::graph::{Graph, NodeId};
use crate::rows;
use weft_core::{
    DataRange, PixelFormat, PrepareStatus, RenderContext, RenderRequest, RenderResponse, StripKey,
};
use weft_math::Point;
use weft_pix::{lerp_px, luma601};

/// Which channel of the mask input drives the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskChannel {
    /// The straightened alpha channel (Alpha8 sources, rendered shapes).
    #[default]
    Alpha,
    /// Rec.601 luma of the straightened RGB (grayscale mask images).
    Luma,
}

/// Foreground-over-background keying by a mask.
#[derive(Debug, Default)]
pub struct MatteNode {
    mask_channel: MaskChannel,
}

impl MatteNode {
    /// Creates a matte keyed by the mask's alpha channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses the mask channel.
    pub fn set_mask_channel(&mut self, channel: MaskChannel) {
        self.mask_channel = channel;
    }

    fn mask_value(&self, mask: &RenderResponse, x: i32, y: i32) -> u8 {
        let px = rows::rgba_at(mask, x, y);
        match self.mask_channel {
            MaskChannel::Alpha => px[3],
            MaskChannel::Luma => luma601(px[0], px[1], px[2]),
        }
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        let mut bounds = DataRange::EMPTY;
        for port in 0..3 {
            graph.prepare_input(id, port, ctx)?;
        }
        for port in [0usize, 1] {
            let up = graph.input(id, port)?;
            bounds = bounds.union(&graph.node_bounds(up));
        }
        let status = if bounds.is_empty() {
            PrepareStatus::Empty
        } else {
            PrepareStatus::Ready
        };
        Ok((status, bounds))
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let mask = graph.pull_input(id, 2, req, ctx)?;
        if mask.is_empty() {
            // no mask anywhere: background wins without blending
            return graph.pull_input(id, 1, req, ctx);
        }
        let fg = graph.pull_input(id, 0, req, ctx)?;
        let bg = graph.pull_input(id, 1, req, ctx)?;
        let x0 = req.origin.x.floor();
        let y0 = req.origin.y.floor();
        let mut out = ctx.pool.acquire(StripKey {
            format: PixelFormat::Rgba8,
            width: req.width,
            height: req.height,
        })?;
        let mut lit = DataRange::EMPTY;
        for dy in 0..req.height {
            let y = y0 + dy as i32;
            let row_extent = DataRange::new(x0, y, req.width as i32, 1);
            let mask_span = rows::lit_row_range(&mask, y).intersect(&row_extent);
            let span = fg
                .range
                .union(&bg.range)
                .intersect(&row_extent)
                .intersect(&mask_span);
            if span.is_empty() {
                continue;
            }
            let orow = out.row_mut(dy);
            // a uniform mask over the covered span skips the per-pixel
            // blend and copies the winning side through
            if let Some(uniform) = self.uniform_mask_row(&mask, &span) {
                let winner = match uniform {
                    255 => Some(&fg),
                    0 => Some(&bg),
                    _ => None,
                };
                if let Some(winner) = winner {
                    let lo = (span.x - x0) as usize * 4;
                    let hi = (span.right() - x0) as usize * 4;
                    let copied =
                        rows::copy_lit(&mut orow[lo..hi], span.x, span.w as u32, winner, y);
                    lit = lit.union(&copied);
                    continue;
                }
            }
            for x in span.x..span.right() {
                let m = self.mask_value(&mask, x, y);
                let px = lerp_px(rows::rgba_at(&bg, x, y), rows::rgba_at(&fg, x, y), m);
                let off = (x - x0) as usize * 4;
                orow[off..off + 4].copy_from_slice(&px);
            }
            ctx.metrics.pixels_blended += span.w as u64;
            lit = lit.union(&span);
        }
        if lit.is_empty() {
            return Ok(RenderResponse::empty(req.origin));
        }
        Ok(RenderResponse {
            strip: Some(out),
            origin: Point::from_int(x0, y0),
            range: lit,
        })
    }

    /// `Some(v)` when the mask is the constant `v` across the span.
    fn uniform_mask_row(&self, mask: &RenderResponse, span: &DataRange) -> Option<u8> {
        let first = self.mask_value(mask, span.x, span.y);
        for x in (span.x + 1)..span.right() {
            if self.mask_value(mask, x, span.y) != first {
                return None;
            }
        }
        Some(first)
    }
}
