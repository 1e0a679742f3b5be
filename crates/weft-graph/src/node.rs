//! Tagged node storage and dispatch.
//!
//! Nodes live in the graph arena as [`NodeKind`] variants, per the
//! index-port design: no per-node boxing, no vtables, and a vacancy
//! marker that lets the arena lend a node out to itself during
//! recursion (the take-out pattern in
//! [`Graph::pull_node`](crate::graph::Graph)).

use crate::affine_node::AffineNode;
use crate::blur::{HorizontalBlurNode, VerticalBlurNode};
use crate::composite::CompositeNode;
use crate::distributor::DistributorNode;
use crate::error::{GraphError, GraphResult};
use crate::filters::{passthrough_prepare, AlphaNode, BrightnessNode, GrayscaleNode};
use crate::graph::{Graph, NodeId};
use crate::matte::MatteNode;
use crate::ninepatch::NinePatchSourceNode;
use crate::renderer::RendererNode;
use crate::sink::SinkNode;
use crate::source::SourceNode;
use weft_core::{DataRange, PrepareStatus, RenderContext, RenderRequest, RenderResponse};

/// A node in the graph arena.
#[derive(Debug, Default)]
pub enum NodeKind {
    /// Placeholder while a node is lent out during recursion.
    #[default]
    Vacant,
    /// Image source.
    Source(SourceNode),
    /// Stretched-border source.
    NinePatch(NinePatchSourceNode),
    /// Affine transform.
    Affine(AffineNode),
    /// Brightness filter.
    Brightness(BrightnessNode),
    /// Grayscale filter.
    Grayscale(GrayscaleNode),
    /// Alpha filter.
    Alpha(AlphaNode),
    /// Horizontal box blur.
    HorizontalBlur(HorizontalBlurNode),
    /// Vertical box blur.
    VerticalBlur(VerticalBlurNode),
    /// N-input compositor.
    Composite(CompositeNode),
    /// Mask keying.
    Matte(MatteNode),
    /// Fan-out.
    Distributor(DistributorNode),
    /// Scanline renderer.
    Renderer(RendererNode),
    /// Output sink.
    Sink(SinkNode),
}

macro_rules! from_node {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for NodeKind {
            fn from(node: $ty) -> Self {
                NodeKind::$variant(node)
            }
        })*
    };
}

from_node! {
    Source => SourceNode,
    NinePatch => NinePatchSourceNode,
    Affine => AffineNode,
    Brightness => BrightnessNode,
    Grayscale => GrayscaleNode,
    Alpha => AlphaNode,
    HorizontalBlur => HorizontalBlurNode,
    VerticalBlur => VerticalBlurNode,
    Composite => CompositeNode,
    Matte => MatteNode,
    Distributor => DistributorNode,
    Renderer => RendererNode,
    Sink => SinkNode,
}

macro_rules! kind_accessors {
    ($($as_ref:ident / $as_mut:ident => $variant:ident($ty:ty)),* $(,)?) => {
        $(
            /// Borrows the node if it is this kind.
            pub fn $as_ref(&self) -> Option<&$ty> {
                match self {
                    NodeKind::$variant(node) => Some(node),
                    _ => None,
                }
            }

            /// Mutably borrows the node if it is this kind.
            pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                match self {
                    NodeKind::$variant(node) => Some(node),
                    _ => None,
                }
            }
        )*
    };
}

impl NodeKind {
    kind_accessors! {
        as_source / as_source_mut => Source(SourceNode),
        as_nine_patch / as_nine_patch_mut => NinePatch(NinePatchSourceNode),
        as_affine / as_affine_mut => Affine(AffineNode),
        as_brightness / as_brightness_mut => Brightness(BrightnessNode),
        as_grayscale / as_grayscale_mut => Grayscale(GrayscaleNode),
        as_alpha / as_alpha_mut => Alpha(AlphaNode),
        as_horizontal_blur / as_horizontal_blur_mut => HorizontalBlur(HorizontalBlurNode),
        as_vertical_blur / as_vertical_blur_mut => VerticalBlur(VerticalBlurNode),
        as_composite / as_composite_mut => Composite(CompositeNode),
        as_matte / as_matte_mut => Matte(MatteNode),
        as_distributor / as_distributor_mut => Distributor(DistributorNode),
        as_renderer / as_renderer_mut => Renderer(RendererNode),
        as_sink / as_sink_mut => Sink(SinkNode),
    }

    /// Short name for errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Vacant => "vacant",
            NodeKind::Source(_) => "source",
            NodeKind::NinePatch(_) => "nine-patch",
            NodeKind::Affine(_) => "affine",
            NodeKind::Brightness(_) => "brightness",
            NodeKind::Grayscale(_) => "grayscale",
            NodeKind::Alpha(_) => "alpha",
            NodeKind::HorizontalBlur(_) => "horizontal-blur",
            NodeKind::VerticalBlur(_) => "vertical-blur",
            NodeKind::Composite(_) => "composite",
            NodeKind::Matte(_) => "matte",
            NodeKind::Distributor(_) => "distributor",
            NodeKind::Renderer(_) => "renderer",
            NodeKind::Sink(_) => "sink",
        }
    }

    /// How many input ports this node accepts.
    pub(crate) fn max_inputs(&self) -> usize {
        match self {
            NodeKind::Vacant | NodeKind::Source(_) | NodeKind::NinePatch(_) => 0,
            NodeKind::Composite(_) => usize::MAX,
            NodeKind::Matte(_) => 3,
            _ => 1,
        }
    }

    /// `true` when the node produces strips.
    pub(crate) fn has_output(&self) -> bool {
        !matches!(self, NodeKind::Vacant | NodeKind::Sink(_))
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        match self {
            NodeKind::Vacant => Err(GraphError::CycleDetected),
            NodeKind::Source(n) => Ok(n.prepare(ctx.frame)),
            NodeKind::NinePatch(n) => Ok(n.prepare()),
            NodeKind::Affine(n) => n.prepare(graph, id, ctx),
            NodeKind::Brightness(_) | NodeKind::Grayscale(_) | NodeKind::Alpha(_) => {
                passthrough_prepare(graph, id, ctx)
            }
            NodeKind::HorizontalBlur(n) => n.prepare(graph, id, ctx),
            NodeKind::VerticalBlur(n) => n.prepare(graph, id, ctx),
            NodeKind::Composite(n) => n.prepare(graph, id, ctx),
            NodeKind::Matte(n) => n.prepare(graph, id, ctx),
            NodeKind::Distributor(n) => n.prepare(graph, id, ctx),
            NodeKind::Renderer(n) => n.prepare(graph, id, ctx),
            NodeKind::Sink(n) => n.prepare(graph, id, ctx),
        }
    }

    pub(crate) fn pull(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        req: &RenderRequest,
        ctx: &mut RenderContext,
    ) -> GraphResult<RenderResponse> {
        match self {
            NodeKind::Vacant => Err(GraphError::CycleDetected),
            NodeKind::Source(n) => n.pull(req, ctx),
            NodeKind::NinePatch(n) => n.pull(req, ctx),
            NodeKind::Affine(n) => n.pull(graph, id, req, ctx),
            NodeKind::Brightness(n) => n.pull(graph, id, req, ctx),
            NodeKind::Grayscale(n) => n.pull(graph, id, req, ctx),
            NodeKind::Alpha(n) => n.pull(graph, id, req, ctx),
            NodeKind::HorizontalBlur(n) => n.pull(graph, id, req, ctx),
            NodeKind::VerticalBlur(n) => n.pull(graph, id, req, ctx),
            NodeKind::Composite(n) => n.pull(graph, id, req, ctx),
            NodeKind::Matte(n) => n.pull(graph, id, req, ctx),
            NodeKind::Distributor(n) => n.pull(graph, id, req, ctx),
            NodeKind::Renderer(n) => n.pull(graph, id, req, ctx),
            NodeKind::Sink(_) => Err(GraphError::invalid_connection("sink has no output")),
        }
    }
}
