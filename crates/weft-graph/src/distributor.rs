//! Fan-out node.
//!
//! [`DistributorNode`] lets several consumers share one upstream without
//! pulling it once per consumer: the first request for a strip pulls and
//! caches it, later identical requests get copies. The cache retires
//! once every consumer has taken the strip, counted against the number
//! of connections made from this node at wire time.

use crate::error::GraphResult;
use crate::graph::{Graph, NodeId};
use weft_core::{DataRange, PrepareStatus, RenderContext, RenderRequest, RenderResponse, Strip};
use weft_math::Point;

#[derive(Debug)]
struct CachedStrip {
    request: RenderRequest,
    origin: Point,
    range: DataRange,
    strip: Option<Strip>,
    served: usize,
}

/// One-input, many-consumer fan-out with per-row caching.
#[derive(Debug, Default)]
pub struct DistributorNode {
    cache: Option<CachedStrip>,
}

impl DistributorNode {
    /// Creates a distributor.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        self.cache = None;
        let status = graph.prepare_input(id, 0, ctx)?;
        let up = graph.input(id, 0)?;
        Ok((status, graph.node_bounds(up)))
    }

    fn serve_copy(&self, ctx: &mut RenderContext) -> GraphResult<RenderResponse> {
        let cache = self.cache.as_ref().expect("cache present");
        let Some(strip) = cache.strip.as_ref() else {
            return Ok(RenderResponse::empty(cache.origin));
        };
        let mut copy = ctx.pool.acquire(strip.key())?;
        copy.bytes_mut().copy_from_slice(strip.bytes());
        Ok(RenderResponse {
            strip: Some(copy),
            origin: cache.origin,
            range: cache.range,
        })
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let consumers = graph.consumer_count(id).max(1);
        let cached_matches = self
            .cache
            .as_ref()
            .is_some_and(|cache| cache.request == *req);
        if !cached_matches {
            let resp = graph.pull_input(id, 0, req, ctx)?;
            if consumers == 1 {
                return Ok(resp);
            }
            self.cache = Some(CachedStrip {
                request: *req,
                origin: resp.origin,
                range: resp.range,
                strip: resp.strip,
                served: 0,
            });
        }
        let out = self.serve_copy(ctx)?;
        let cache = self.cache.as_mut().expect("cache present");
        cache.served += 1;
        if cache.served >= consumers {
            self.cache = None;
        }
        Ok(out)
    }
}
