//! Affine transform node.
//!
//! [`AffineNode`] accumulates a transform and decides, at prepare time,
//! how to honor it:
//!
//! 1. **Push** - the upstream chain can absorb the matrix (a source
//!    folds it into its sampling matrix). The node becomes a pass-through
//!    and prepare reports `Deferred`.
//! 2. **Offset** - the matrix is an integer translation: requests are
//!    rewritten on the way up and responses shifted on the way down. No
//!    pixel is touched.
//! 3. **Materialize** - anything else. The upstream output is pulled
//!    once into a frame-cached buffer and each output row is sampled
//!    from it through the inverse matrix. This is the expensive path;
//!    pushing exists to avoid it.
//!
//! A singular matrix renders as fully transparent, not as an error.

use crate::error::GraphResult;
use crate::geom::transform_bounds;
use crate::graph::{Graph, NodeId};
use weft_core::{
    AffineCapability, DataRange, PixelFormat, PrepareStatus, RenderContext, RenderRequest,
    RenderResponse, Strip, StripKey,
};
use weft_math::{Affine, Fixed, Point, TransformClass};
use weft_pix::{descriptor, DdaParams, SampleFilter};

#[derive(Debug, Clone, Copy, Default)]
enum Mode {
    #[default]
    Unprepared,
    Pushed,
    Offset {
        dx: i32,
        dy: i32,
    },
    Materialize {
        inv: Affine,
    },
    Degenerate,
}

#[derive(Debug)]
struct UpstreamCache {
    frame: u64,
    bounds: DataRange,
    strip: Strip,
}

/// A transform node: push when possible, materialize when not.
#[derive(Debug)]
pub struct AffineNode {
    matrix: Affine,
    filter: SampleFilter,
    pushed: Affine,
    pushed_frame: Option<u64>,
    mode: Mode,
    out_bounds: DataRange,
    cache: Option<UpstreamCache>,
}

impl AffineNode {
    /// Creates an identity transform node.
    pub fn new() -> Self {
        Self {
            matrix: Affine::IDENTITY,
            filter: SampleFilter::Nearest,
            pushed: Affine::IDENTITY,
            pushed_frame: None,
            mode: Mode::Unprepared,
            out_bounds: DataRange::EMPTY,
            cache: None,
        }
    }

    /// Sets the full matrix from float elements.
    pub fn set_matrix(&mut self, a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) {
        self.matrix = Affine::new(
            Fixed::from_f32(a),
            Fixed::from_f32(b),
            Fixed::from_f32(tx),
            Fixed::from_f32(c),
            Fixed::from_f32(d),
            Fixed::from_f32(ty),
        );
    }

    /// Replaces the linear part with rotation-and-scale, keeping the
    /// translation.
    pub fn set_rotation_scale(&mut self, theta: f32, sx: f32, sy: f32) {
        let rs = Affine::rotation_scale(theta, sx, sy);
        self.matrix = Affine {
            a: rs.a,
            b: rs.b,
            tx: self.matrix.tx,
            c: rs.c,
            d: rs.d,
            ty: self.matrix.ty,
        };
    }

    /// Uniform scale, keeping the translation.
    pub fn set_scale(&mut self, s: f32) {
        self.set_rotation_scale(0.0, s, s);
    }

    /// Sets the translation, keeping the linear part.
    pub fn set_translation(&mut self, x: f32, y: f32) {
        self.matrix.tx = Fixed::from_f32(x);
        self.matrix.ty = Fixed::from_f32(y);
    }

    /// Sets the sampling filter used when materializing.
    pub fn set_interpolation(&mut self, filter: SampleFilter) {
        self.filter = filter;
    }

    /// The matrix including any transform pushed down onto this node.
    fn effective(&self, frame: u64) -> Affine {
        match self.pushed_frame {
            Some(f) if f == frame => self.matrix.then(&self.pushed),
            _ => self.matrix,
        }
    }

    pub(crate) fn absorb_capability(&self) -> AffineCapability {
        // anything pushed here just composes into the matrix
        AffineCapability::FULL_AFFINE
    }

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

    fn integer_translation(m: &Affine) -> Option<(i32, i32)> {
        match m.classify() {
            TransformClass::Identity => Some((0, 0)),
            TransformClass::Translation if m.tx.is_integer() && m.ty.is_integer() => {
                Some((m.tx.floor(), m.ty.floor()))
            }
            _ => None,
        }
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        self.cache = None;
        let up = graph.input(id, 0)?;
        let m = self.effective(ctx.frame);

        let caps = graph.absorb_capability_of(up);
        let needed = AffineCapability::required(m.classify());
        if caps.contains(needed) && graph.push_transform_to(up, &m, ctx.frame)? {
            tracing::debug!(node = id.index(), "affine pushed upstream");
            self.mode = Mode::Pushed;
            let status = graph.prepare_input(id, 0, ctx)?;
            self.out_bounds = graph.node_bounds(up);
            return Ok((PrepareStatus::Deferred.worst(status), self.out_bounds));
        }

        if let Some((dx, dy)) = Self::integer_translation(&m) {
            self.mode = Mode::Offset { dx, dy };
            let status = graph.prepare_input(id, 0, ctx)?;
            self.out_bounds = graph.node_bounds(up).translate(dx, dy);
            return Ok((status, self.out_bounds));
        }

        let Some(inv) = m.invert() else {
            self.mode = Mode::Degenerate;
            self.out_bounds = DataRange::EMPTY;
            return Ok((PrepareStatus::Empty, DataRange::EMPTY));
        };
        tracing::debug!(node = id.index(), "affine materializes");
        self.mode = Mode::Materialize { inv };
        let status = graph.prepare_input(id, 0, ctx)?;
        self.out_bounds = transform_bounds(&m, graph.node_bounds(up));
        if self.out_bounds.is_empty() {
            return Ok((PrepareStatus::Empty, DataRange::EMPTY));
        }
        Ok((status, self.out_bounds))
    }

    /// Pulls the whole upstream extent into the frame cache, rows
    /// ascending.
    fn fill_cache(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<()> {
        if self
            .cache
            .as_ref()
            .is_some_and(|c| c.frame == ctx.frame)
        {
            return Ok(());
        }
        let up = graph.input(id, 0)?;
        let bounds = graph.node_bounds(up);
        let mut strip = ctx.pool.acquire(StripKey {
            format: PixelFormat::Rgba8,
            width: bounds.w as u32,
            height: bounds.h as u32,
        })?;
        for j in 0..bounds.h {
            let y = bounds.y + j;
            let req = RenderRequest::row(bounds.w as u32, Point::from_int(bounds.x, y));
            let resp = graph.pull_node(up, &req, ctx)?;
            crate::rows::copy_lit(strip.row_mut(j as u32), bounds.x, bounds.w as u32, &resp, y);
        }
        self.cache = Some(UpstreamCache {
            frame: ctx.frame,
            bounds,
            strip,
        });
        Ok(())
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        match self.mode {
            Mode::Unprepared | Mode::Degenerate => Ok(RenderResponse::empty(req.origin)),
            Mode::Pushed => graph.pull_input(id, 0, req, ctx),
            Mode::Offset { dx, dy } => {
                let shifted = RenderRequest {
                    width: req.width,
                    height: req.height,
                    origin: req.origin - Point::from_int(dx, dy),
                };
                let mut resp = graph.pull_input(id, 0, &shifted, ctx)?;
                resp.origin = resp.origin + Point::from_int(dx, dy);
                resp.range = resp.range.translate(dx, dy);
                Ok(resp)
            }
            Mode::Materialize { inv } => self.pull_materialized(graph, id, req, ctx, inv),
        }
    }

    fn pull_materialized(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
        inv: Affine,
    ) -> GraphResult<RenderResponse> {
        if self.out_bounds.is_empty() {
            return Ok(RenderResponse::empty(req.origin));
        }
        self.fill_cache(graph, id, ctx)?;
        let cache = self.cache.as_ref().expect("cache filled above");
        let x0 = req.origin.x.floor();
        let y0 = req.origin.y.floor();
        let mut strip = ctx.pool.acquire(StripKey {
            format: PixelFormat::Rgba8,
            width: req.width,
            height: req.height,
        })?;
        let desc = descriptor(PixelFormat::Rgba8);
        let cache_view = cache.strip.view();
        let cache_origin = Point::from_int(cache.bounds.x, cache.bounds.y);
        let mut lit = DataRange::EMPTY;
        for dy in 0..req.height {
            let y = y0 + dy as i32;
            let row_span = self
                .out_bounds
                .intersect(&DataRange::new(x0, y, req.width as i32, 1));
            if row_span.is_empty() {
                continue;
            }
            let start = inv.apply(Point::from_int(row_span.x, y)) - cache_origin;
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
            (desc.copy_row_dda)(dst, &cache_view, &params);
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

impl Default for AffineNode {
    fn default() -> Self {
        Self::new()
    }
}
