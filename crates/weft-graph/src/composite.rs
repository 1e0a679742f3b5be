//! N-input over-compositing node.
//!
//! Inputs are walked in painter order, front to back: the accumulator
//! starts transparent, the topmost layer lands first and every following
//! layer is blended *underneath* with the `blend_under` kernel. Input 0
//! is topmost by default; [`set_first_on_top`](CompositeNode::set_first_on_top)
//! flips the convention for callers that wire background first.

use crate::error::GraphResult;
use crate::graph::{Graph, NodeId};
use crate::rows;
use weft_core::{
    DataRange, PixelFormat, PrepareStatus, RenderContext, RenderRequest, RenderResponse, StripKey,
};
use weft_math::Point;

/// Source-over compositor over any number of inputs.
#[derive(Debug)]
pub struct CompositeNode {
    first_on_top: bool,
}

impl CompositeNode {
    /// Creates a compositor with input 0 topmost.
    pub fn new() -> Self {
        Self { first_on_top: true }
    }

    /// Chooses whether input 0 is the top layer (default) or the bottom.
    pub fn set_first_on_top(&mut self, first_on_top: bool) {
        self.first_on_top = first_on_top;
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        let mut bounds = DataRange::EMPTY;
        let mut deferred = false;
        for port in 0..graph.input_count(id) {
            if graph.input_opt(id, port).is_none() {
                continue;
            }
            let status = graph.prepare_input(id, port, ctx)?;
            deferred |= status == PrepareStatus::Deferred;
            let up = graph.input(id, port)?;
            bounds = bounds.union(&graph.node_bounds(up));
        }
        let status = if bounds.is_empty() {
            PrepareStatus::Empty
        } else if deferred {
            PrepareStatus::Deferred
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
        let n = graph.input_count(id);
        let x0 = req.origin.x.floor();
        let y0 = req.origin.y.floor();
        let mut acc = ctx.pool.acquire(StripKey {
            format: PixelFormat::Rgba8,
            width: req.width,
            height: req.height,
        })?;
        let mut lit = DataRange::EMPTY;
        let order: Vec<usize> = if self.first_on_top {
            (0..n).collect()
        } else {
            (0..n).rev().collect()
        };
        for port in order {
            if graph.input_opt(id, port).is_none() {
                continue;
            }
            let resp = graph.pull_input(id, port, req, ctx)?;
            if resp.is_empty() {
                continue;
            }
            for dy in 0..req.height {
                let y = y0 + dy as i32;
                let span = rows::blend_lit(acc.row_mut(dy), x0, req.width, &resp, y);
                if !span.is_empty() {
                    ctx.metrics.pixels_blended += span.w as u64;
                    lit = lit.union(&span);
                }
            }
        }
        if lit.is_empty() {
            return Ok(RenderResponse::empty(req.origin));
        }
        Ok(RenderResponse {
            strip: Some(acc),
            origin: Point::from_int(x0, y0),
            range: lit,
        })
    }
}

impl Default for CompositeNode {
    fn default() -> Self {
        Self::new()
    }
}
