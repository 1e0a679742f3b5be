//! # weft-graph
//!
//! The node graph and scanline renderer of the weft compositing
//! pipeline.
//!
//! Users assemble a DAG of nodes and ask a renderer to produce a frame:
//!
//! ```rust
//! use weft_core::memory::HeapAllocator;
//! use weft_core::{ImageBuffer, PixelFormat};
//! use weft_graph::{Graph, GrayscaleNode, RendererNode, SinkNode, SourceNode};
//!
//! let alloc = HeapAllocator::shared();
//! let image = ImageBuffer::from_bytes(
//!     2, 1, PixelFormat::Rgba8,
//!     &[255, 0, 0, 255, 0, 0, 255, 255],
//!     &alloc,
//! ).unwrap();
//!
//! let mut graph = Graph::new();
//! let source = graph.add(SourceNode::new(image));
//! let gray = graph.add(GrayscaleNode::new());
//! let renderer = graph.add(RendererNode::new(2, 1));
//! let target = ImageBuffer::new(2, 1, PixelFormat::Rgba8, &alloc).unwrap();
//! let sink = graph.add(SinkNode::with_target(target));
//! graph.connect(source, gray).unwrap();
//! graph.connect(gray, renderer).unwrap();
//! graph.connect(renderer, sink).unwrap();
//!
//! graph.exec(renderer).unwrap();
//! let out = graph.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap();
//! assert_eq!(&out.row(0)[0..4], &[76, 76, 76, 255]);
//! ```
//!
//! ## Execution model
//!
//! One `exec` is one frame. The renderer prepares the chain (geometry
//! declarations, transform-capability negotiation, strip reservations),
//! then requests horizontal strips one row at a time; each node produces
//! only the strip needed, so peak memory stays proportional to the row
//! width regardless of image sizes. Within a frame, pulls to any node
//! arrive with non-decreasing row numbers, which the vertical blur's
//! rolling window relies on.

#![warn(missing_docs)]

mod affine_node;
mod blur;
mod composite;
mod distributor;
mod error;
mod filters;
mod geom;
mod graph;
mod matte;
mod ninepatch;
mod node;
mod renderer;
mod rows;
mod sink;
mod source;

pub use affine_node::AffineNode;
pub use blur::{HorizontalBlurNode, VerticalBlurNode, MAX_BLUR_RADIUS};
pub use composite::CompositeNode;
pub use distributor::DistributorNode;
pub use error::{GraphError, GraphResult};
pub use filters::{AlphaNode, BrightnessNode, GrayscaleNode};
pub use graph::{Graph, NodeId};
pub use matte::{MaskChannel, MatteNode};
pub use ninepatch::{Margins, NinePatchSourceNode};
pub use node::NodeKind;
pub use renderer::RendererNode;
pub use sink::SinkNode;
pub use source::SourceNode;

// the working pixel filter is part of the public node API
pub use weft_pix::SampleFilter;
