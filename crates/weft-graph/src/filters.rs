//! Per-pixel filter nodes: brightness, grayscale, alpha.
//!
//! Per-pixel filters are transparent to transform negotiation: they
//! forward their upstream's absorb capability and pass pushes through,
//! since a pointwise color map commutes with any resampling.

use crate::error::GraphResult;
use crate::graph::{Graph, NodeId};
use weft_core::{DataRange, PrepareStatus, RenderContext, RenderRequest, RenderResponse};
use weft_pix::{div255, luma601};

/// Pulls the input and applies `f` to every lit RGBA8 span in place.
fn map_lit_rows(
    graph: &mut Graph,
    id: NodeId,
    req: &RenderRequest,
    ctx: &mut RenderContext,
    f: impl Fn(&mut [u8]),
) -> GraphResult<RenderResponse> {
    let mut resp = graph.pull_input(id, 0, req, ctx)?;
    let range = resp.range;
    let ox = resp.origin.x.floor();
    let oy = resp.origin.y.floor();
    let Some(strip) = resp.strip.as_mut() else {
        return Ok(resp);
    };
    for y in range.y..range.bottom() {
        let iy = y - oy;
        if iy < 0 || iy >= strip.height() as i32 {
            continue;
        }
        let off = (range.x - ox) as usize * 4;
        let len = range.w as usize * 4;
        f(&mut strip.row_mut(iy as u32)[off..off + len]);
    }
    Ok(resp)
}

/// Adds a constant to RGB, leaving alpha alone.
///
/// The delta is given as a float in `-1.0..=1.0` and quantized to an
/// 8-bit offset once: `+0.5` maps to `+128`.
#[derive(Debug)]
pub struct BrightnessNode {
    offset: i16,
}

impl BrightnessNode {
    /// Creates a brightness filter; `delta` outside `-1..=1` saturates.
    pub fn new(delta: f32) -> Self {
        let mut node = Self { offset: 0 };
        node.set_delta(delta);
        node
    }

    /// Changes the brightness delta.
    pub fn set_delta(&mut self, delta: f32) {
        self.offset = (delta.clamp(-1.0, 1.0) * 255.0).round() as i16;
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let offset = self.offset;
        map_lit_rows(graph, id, req, ctx, |row| {
            for px in row.chunks_exact_mut(4) {
                for c in 0..3 {
                    px[c] = (px[c] as i16 + offset).clamp(0, 255) as u8;
                }
            }
        })
    }
}

/// Replaces RGB with Rec.601 luma, leaving alpha alone.
#[derive(Debug, Default)]
pub struct GrayscaleNode;

impl GrayscaleNode {
    /// Creates a grayscale filter.
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        map_lit_rows(graph, id, req, ctx, |row| {
            for px in row.chunks_exact_mut(4) {
                let y = luma601(px[0], px[1], px[2]);
                px[0] = y;
                px[1] = y;
                px[2] = y;
            }
        })
    }
}

/// Scales alpha by a constant factor.
#[derive(Debug)]
pub struct AlphaNode {
    factor: u8,
}

impl AlphaNode {
    /// Creates an alpha filter; `alpha` outside `0..=1` saturates.
    pub fn new(alpha: f32) -> Self {
        let mut node = Self { factor: 255 };
        node.set_alpha(alpha);
        node
    }

    /// Changes the alpha factor.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.factor = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let factor = self.factor as u32;
        map_lit_rows(graph, id, req, ctx, |row| {
            for px in row.chunks_exact_mut(4) {
                px[3] = div255(px[3] as u32 * factor) as u8;
            }
        })
    }
}

/// Shared prepare for all pointwise filters: geometry and status pass
/// through.
pub(crate) fn passthrough_prepare(
    graph: &mut Graph,
    id: NodeId,
    ctx: &mut RenderContext,
) -> GraphResult<(PrepareStatus, DataRange)> {
    let status = graph.prepare_input(id, 0, ctx)?;
    let up = graph.input(id, 0)?;
    Ok((status, graph.node_bounds(up)))
}
