//! The node graph arena and the pull protocol plumbing.
//!
//! # Lifecycle
//!
//! Build: [`Graph::add`] nodes, wire them with [`Graph::connect`] /
//! [`Graph::connect_to`] (cycles and arity violations are rejected at
//! wire time). Run: [`Graph::exec`] on a renderer node. One `exec` is
//! one frame: a fresh [`RenderContext`], one prepare sweep
//! (downstream to upstream, memoized), then the scanline loop.
//!
//! # The take-out pattern
//!
//! During prepare and pull a node needs `&mut` access to itself *and*
//! to the graph (to reach its inputs). The arena lends the node out:
//! its slot is swapped to [`NodeKind::Vacant`], the node runs against
//! the graph, and the slot is restored. Re-entering a vacant slot means
//! a cycle slipped past wiring and is reported as such.

use crate::error::{GraphError, GraphResult};
use crate::node::NodeKind;
use smallvec::SmallVec;
use weft_core::memory::HeapAllocator;
use weft_core::{
    AffineCapability, DataRange, PrepareStatus, RenderContext, RenderRequest, RenderResponse,
};
use weft_math::{Affine, Point};

/// Index-based handle to a node in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The arena index, for logs.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct NodeSlot {
    kind: NodeKind,
    inputs: SmallVec<[Option<NodeId>; 2]>,
    consumers: usize,
    prepared_frame: Option<u64>,
    prepare_status: PrepareStatus,
    bounds: DataRange,
    last_pull_y: Option<i32>,
}

impl NodeSlot {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            inputs: SmallVec::new(),
            consumers: 0,
            prepared_frame: None,
            prepare_status: PrepareStatus::Ready,
            bounds: DataRange::EMPTY,
            last_pull_y: None,
        }
    }
}

/// A DAG of nodes plus the frame driver.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<NodeSlot>,
    frame: u64,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, returning its handle.
    pub fn add(&mut self, node: impl Into<NodeKind>) -> NodeId {
        self.nodes.push(NodeSlot::new(node.into()));
        NodeId(self.nodes.len() - 1)
    }

    /// Borrows a node.
    pub fn node(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Mutably borrows a node (parameter changes between frames).
    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    /// Wires `from`'s output to `to`'s input 0.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> GraphResult<()> {
        self.connect_to(from, to, 0)
    }

    /// Wires `from`'s output to `to`'s input `port`.
    pub fn connect_to(&mut self, from: NodeId, to: NodeId, port: usize) -> GraphResult<()> {
        if from == to {
            return Err(GraphError::CycleDetected);
        }
        if !self.nodes[from.0].kind.has_output() {
            return Err(GraphError::invalid_connection(format!(
                "{} has no output",
                self.nodes[from.0].kind.name()
            )));
        }
        let max = self.nodes[to.0].kind.max_inputs();
        if port >= max {
            return Err(GraphError::PortOutOfRange { port, max });
        }
        if self.nodes[to.0].inputs.get(port).copied().flatten().is_some() {
            return Err(GraphError::invalid_connection(format!(
                "input {port} already connected"
            )));
        }
        if self.reaches_upstream(from, to) {
            return Err(GraphError::CycleDetected);
        }
        let inputs = &mut self.nodes[to.0].inputs;
        if inputs.len() <= port {
            inputs.resize(port + 1, None);
        }
        inputs[port] = Some(from);
        self.nodes[from.0].consumers += 1;
        Ok(())
    }

    /// `true` when `needle` is reachable walking upstream from `start`.
    fn reaches_upstream(&self, start: NodeId, needle: NodeId) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == needle {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            for input in self.nodes[id.0].inputs.iter().copied().flatten() {
                stack.push(input);
            }
        }
        false
    }

    /// The upstream wired to `(id, port)`, if any.
    pub(crate) fn input_opt(&self, id: NodeId, port: usize) -> Option<NodeId> {
        self.nodes[id.0].inputs.get(port).copied().flatten()
    }

    /// The upstream wired to `(id, port)`.
    pub(crate) fn input(&self, id: NodeId, port: usize) -> GraphResult<NodeId> {
        self.input_opt(id, port)
            .ok_or(GraphError::MissingInput { port })
    }

    /// Number of input slots present on `id` (connected or not).
    pub(crate) fn input_count(&self, id: NodeId) -> usize {
        self.nodes[id.0].inputs.len()
    }

    /// How many consumers take `id`'s output.
    pub(crate) fn consumer_count(&self, id: NodeId) -> usize {
        self.nodes[id.0].consumers
    }

    /// Output bounds declared by `id`'s last prepare.
    pub(crate) fn node_bounds(&self, id: NodeId) -> DataRange {
        self.nodes[id.0].bounds
    }

    /// What `id` can absorb if a transform is pushed into it.
    ///
    /// Pointwise filters are transparent and answer for their upstream;
    /// everything that resamples or mixes pixels refuses.
    pub(crate) fn absorb_capability_of(&self, id: NodeId) -> AffineCapability {
        match &self.nodes[id.0].kind {
            NodeKind::Source(n) => n.absorb_capability(),
            NodeKind::NinePatch(n) => n.absorb_capability(),
            NodeKind::Affine(n) => n.absorb_capability(),
            NodeKind::Renderer(n) => n.absorb_capability(),
            NodeKind::Brightness(_) | NodeKind::Grayscale(_) | NodeKind::Alpha(_) => {
                match self.input_opt(id, 0) {
                    Some(up) => self.absorb_capability_of(up),
                    None => AffineCapability::empty(),
                }
            }
            _ => AffineCapability::empty(),
        }
    }

    /// Pushes a transform into `id` for this frame. `Ok(false)` means
    /// the node (or its situation) refused and the caller must handle
    /// the transform itself.
    pub(crate) fn push_transform_to(
        &mut self,
        id: NodeId,
        m: &Affine,
        frame: u64,
    ) -> GraphResult<bool> {
        // a shared output cannot absorb one consumer's transform, and a
        // node already prepared this frame would never see it
        if self.nodes[id.0].consumers > 1 || self.nodes[id.0].prepared_frame == Some(frame) {
            return Ok(false);
        }
        enum Action {
            Direct,
            Forward(NodeId),
            Refuse,
        }
        let action = match &self.nodes[id.0].kind {
            NodeKind::Source(_) | NodeKind::Affine(_) | NodeKind::Renderer(_) => Action::Direct,
            NodeKind::Brightness(_) | NodeKind::Grayscale(_) | NodeKind::Alpha(_) => {
                match self.input_opt(id, 0) {
                    Some(up) => Action::Forward(up),
                    None => Action::Refuse,
                }
            }
            _ => Action::Refuse,
        };
        match action {
            Action::Refuse => Ok(false),
            Action::Forward(up) => self.push_transform_to(up, m, frame),
            Action::Direct => Ok(match &mut self.nodes[id.0].kind {
                NodeKind::Source(n) => n.push_transform(m, frame),
                NodeKind::Affine(n) => n.push_transform(m, frame),
                NodeKind::Renderer(n) => n.push_transform(m),
                _ => false,
            }),
        }
    }

    /// Prepares `id` for this frame (memoized).
    pub(crate) fn prepare_node(
        &mut self,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<PrepareStatus> {
        if self.nodes[id.0].prepared_frame == Some(ctx.frame) {
            return Ok(self.nodes[id.0].prepare_status);
        }
        let mut kind = std::mem::take(&mut self.nodes[id.0].kind);
        let result = kind.prepare(self, id, ctx);
        self.nodes[id.0].kind = kind;
        let (status, bounds) = result?;
        let slot = &mut self.nodes[id.0];
        slot.prepared_frame = Some(ctx.frame);
        slot.prepare_status = status;
        slot.bounds = bounds;
        slot.last_pull_y = None;
        Ok(status)
    }

    /// Prepares the upstream of `(id, port)`.
    pub(crate) fn prepare_input(
        &mut self,
        id: NodeId,
        port: usize,
        ctx: &mut RenderContext,
    ) -> GraphResult<PrepareStatus> {
        let up = self.input(id, port)?;
        self.prepare_node(up, ctx)
    }

    /// Pulls a strip from `id`.
    pub(crate) fn pull_node(
        &mut self,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        ctx.metrics.pulls += 1;
        {
            let slot = &mut self.nodes[id.0];
            let y = req.origin.y.floor();
            if let Some(last) = slot.last_pull_y {
                debug_assert!(
                    y >= last,
                    "pull ordering violated: y {y} after {last} on {}",
                    slot.kind.name()
                );
            }
            slot.last_pull_y = Some(y);
        }
        let mut kind = std::mem::take(&mut self.nodes[id.0].kind);
        let result = kind.pull(self, id, req, ctx);
        self.nodes[id.0].kind = kind;
        result
    }

    /// Pulls a strip from the upstream of `(id, port)`.
    pub(crate) fn pull_input(
        &mut self,
        id: NodeId,
        port: usize,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        let up = self.input(id, port)?;
        self.pull_node(up, req, ctx)
    }

    /// Renders one frame driven by `renderer`.
    ///
    /// Creates a fresh context on the renderer's allocator, prepares the
    /// chain through the attached sink, then pulls the virtual screen
    /// row by row and hands each strip to the sink. Returns the worst
    /// prepare status the chain reported.
    pub fn exec(&mut self, renderer: NodeId) -> GraphResult<PrepareStatus> {
        let Some(node) = self.nodes[renderer.0].kind.as_renderer() else {
            return Err(GraphError::NotARenderer);
        };
        let (width, height) = (node.width(), node.height());
        let allocator = node
            .allocator_handle()
            .unwrap_or_else(HeapAllocator::shared);
        let sink = self
            .nodes
            .iter()
            .position(|slot| {
                slot.kind.as_sink().is_some()
                    && slot.inputs.first().copied().flatten() == Some(renderer)
            })
            .map(NodeId)
            .ok_or(GraphError::NoSink)?;

        self.frame += 1;
        let mut ctx = RenderContext::new(allocator, self.frame);
        tracing::debug!(frame = self.frame, width, height, "exec begins");

        for slot in &mut self.nodes {
            slot.last_pull_y = None;
        }
        let status = self.prepare_node(sink, &mut ctx)?;
        if status != PrepareStatus::Empty {
            for y in 0..height {
                let req = RenderRequest::row(width, Point::from_int(0, y as i32));
                let resp = self.pull_node(renderer, &req, &mut ctx)?;
                ctx.metrics.rows_rendered += 1;
                let Some(sink_node) = self.nodes[sink.0].kind.as_sink_mut() else {
                    return Err(GraphError::NoSink);
                };
                sink_node.write_strip(&resp, &mut ctx)?;
            }
        }
        ctx.finish_frame();
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AffineNode, CompositeNode, RendererNode, SinkNode, SourceNode};
    use weft_core::memory::HeapAllocator;
    use weft_core::{ImageBuffer, PixelFormat};

    fn tiny_image() -> ImageBuffer {
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
    fn test_connect_rejects_cycle() {
        let mut g = Graph::new();
        let a = g.add(AffineNode::new());
        let b = g.add(AffineNode::new());
        g.connect(a, b).unwrap();
        assert!(matches!(g.connect(b, a), Err(GraphError::CycleDetected)));
        assert!(matches!(g.connect(a, a), Err(GraphError::CycleDetected)));
    }

    #[test]
    fn test_connect_rejects_bad_ports() {
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(tiny_image()));
        let aff = g.add(AffineNode::new());
        // sources take no inputs
        assert!(matches!(
            g.connect(aff, src),
            Err(GraphError::PortOutOfRange { .. })
        ));
        // single-input nodes reject port 1
        assert!(matches!(
            g.connect_to(src, aff, 1),
            Err(GraphError::PortOutOfRange { .. })
        ));
        // double connection to the same port
        g.connect(src, aff).unwrap();
        let another = g.add(SourceNode::new(tiny_image()));
        assert!(matches!(
            g.connect(another, aff),
            Err(GraphError::InvalidConnection { .. })
        ));
    }

    #[test]
    fn test_connect_rejects_sink_output() {
        let mut g = Graph::new();
        let sink = g.add(SinkNode::new());
        let aff = g.add(AffineNode::new());
        assert!(matches!(
            g.connect(sink, aff),
            Err(GraphError::InvalidConnection { .. })
        ));
    }

    #[test]
    fn test_exec_requires_renderer_and_sink() {
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(tiny_image()));
        assert!(matches!(g.exec(src), Err(GraphError::NotARenderer)));

        let renderer = g.add(RendererNode::new(2, 1));
        g.connect(src, renderer).unwrap();
        assert!(matches!(g.exec(renderer), Err(GraphError::NoSink)));
    }

    #[test]
    fn test_exec_passthrough() {
        let alloc = HeapAllocator::shared();
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(tiny_image()));
        let renderer = g.add(RendererNode::new(2, 1));
        let target = ImageBuffer::new(2, 1, PixelFormat::Rgba8, &alloc).unwrap();
        let sink = g.add(SinkNode::with_target(target));
        g.connect(src, renderer).unwrap();
        g.connect(renderer, sink).unwrap();

        let status = g.exec(renderer).unwrap();
        assert_eq!(status, PrepareStatus::Ready);

        let out = g.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap();
        assert_eq!(&out.row(0)[0..4], &[255, 0, 0, 255]);
        assert_eq!(&out.row(0)[4..8], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_exec_reports_deferred_push() {
        let alloc = HeapAllocator::shared();
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(tiny_image()));
        let aff = g.add(AffineNode::new());
        g.node_mut(aff).as_affine_mut().unwrap().set_scale(2.0);
        let renderer = g.add(RendererNode::new(4, 1));
        let sink = g.add(SinkNode::with_target(
            ImageBuffer::new(4, 1, PixelFormat::Rgba8, &alloc).unwrap(),
        ));
        g.connect(src, aff).unwrap();
        g.connect(aff, renderer).unwrap();
        g.connect(renderer, sink).unwrap();

        let status = g.exec(renderer).unwrap();
        assert_eq!(status, PrepareStatus::Deferred);

        // nearest 2x upscale of [red, blue]
        let out = g.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap();
        assert_eq!(&out.row(0)[0..4], &[255, 0, 0, 255]);
        assert_eq!(&out.row(0)[4..8], &[255, 0, 0, 255]);
        assert_eq!(&out.row(0)[8..12], &[0, 0, 255, 255]);
        assert_eq!(&out.row(0)[12..16], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_composite_accepts_many_inputs() {
        let mut g = Graph::new();
        let comp = g.add(CompositeNode::new());
        for i in 0..5 {
            let src = g.add(SourceNode::new(tiny_image()));
            g.connect_to(src, comp, i).unwrap();
        }
        assert_eq!(g.input_count(comp), 5);
    }
}
