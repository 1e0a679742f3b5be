//! Integration tests for the weft crates.
//!
//! End-to-end pipeline scenarios that cross crate boundaries: graph
//! wiring, format kernels, pooled strips and the scanline loop together.

use weft_core::memory::{AllocatorHandle, HeapAllocator};
use weft_core::{ImageBuffer, PixelFormat};

/// Builds an RGBA8 image from pixel rows (row-major).
pub fn rgba_image(width: u32, height: u32, pixels: &[[u8; 4]]) -> ImageBuffer {
    assert_eq!(pixels.len(), (width * height) as usize);
    let bytes: Vec<u8> = pixels.iter().flatten().copied().collect();
    ImageBuffer::from_bytes(width, height, PixelFormat::Rgba8, &bytes, &heap()).unwrap()
}

/// Builds a single-channel image (Alpha8 or Gray8).
pub fn byte_image(width: u32, height: u32, format: PixelFormat, bytes: &[u8]) -> ImageBuffer {
    ImageBuffer::from_bytes(width, height, format, bytes, &heap()).unwrap()
}

/// The shared test allocator.
pub fn heap() -> AllocatorHandle {
    HeapAllocator::shared()
}

/// Reads the RGBA8 pixel at (x, y) from an RGBA8 buffer.
pub fn px(buffer: &ImageBuffer, x: u32, y: u32) -> [u8; 4] {
    let bytes = buffer.pixel_bytes(x, y).unwrap();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}


#[cfg(test)]
mod transforms {
    use super::*;
    use weft_graph::{
        AffineNode, Graph, HorizontalBlurNode, RendererNode, SampleFilter, SinkNode, SourceNode,
        VerticalBlurNode,
    };

    fn render(graph: &mut Graph, tail: weft_graph::NodeId, width: u32, height: u32) -> ImageBuffer {
        let renderer = graph.add(RendererNode::new(width, height));
        let target = ImageBuffer::new(width, height, PixelFormat::Rgba8, &heap()).unwrap();
        let sink = graph.add(SinkNode::with_target(target));
        graph.connect(tail, renderer).unwrap();
        graph.connect(renderer, sink).unwrap();
        graph.exec(renderer).unwrap();
        graph
            .node_mut(sink)
            .as_sink_mut()
            .unwrap()
            .take_target()
            .unwrap()
    }

    #[test]
    fn test_nearest_scale_2x() {
        let image = rgba_image(2, 1, &[[255, 0, 0, 255], [0, 0, 255, 255]]);
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(image));
        let aff = g.add(AffineNode::new());
        g.node_mut(aff).as_affine_mut().unwrap().set_scale(2.0);
        g.connect(src, aff).unwrap();
        let out = render(&mut g, aff, 4, 1);
        assert_eq!(px(&out, 0, 0), [255, 0, 0, 255]);
        assert_eq!(px(&out, 1, 0), [255, 0, 0, 255]);
        assert_eq!(px(&out, 2, 0), [0, 0, 255, 255]);
        assert_eq!(px(&out, 3, 0), [0, 0, 255, 255]);
    }

    /// Pushdown (affine absorbed by the source) and materialization
    /// (affine sampling a cached upstream) must agree; nearest is exact.
    #[test]
    fn test_affine_pushdown_equals_materialize() {
        let pixels = [
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
            [255, 255, 0, 255],
            [0, 255, 255, 255],
            [255, 0, 255, 255],
        ];

        // pushed: source absorbs the scale
        let mut pushed = Graph::new();
        let src = pushed.add(SourceNode::new(rgba_image(3, 2, &pixels)));
        let aff = pushed.add(AffineNode::new());
        pushed.node_mut(aff).as_affine_mut().unwrap().set_scale(2.0);
        pushed.connect(src, aff).unwrap();
        let out_pushed = render(&mut pushed, aff, 6, 4);

        // materialized: a radius-0 blur blocks the push
        let mut mat = Graph::new();
        let src = mat.add(SourceNode::new(rgba_image(3, 2, &pixels)));
        let wall = mat.add(HorizontalBlurNode::new(0));
        let aff = mat.add(AffineNode::new());
        mat.node_mut(aff).as_affine_mut().unwrap().set_scale(2.0);
        mat.node_mut(aff)
            .as_affine_mut()
            .unwrap()
            .set_interpolation(SampleFilter::Nearest);
        mat.connect(src, wall).unwrap();
        mat.connect(wall, aff).unwrap();
        let out_mat = render(&mut mat, aff, 6, 4);

        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(px(&out_pushed, x, y), px(&out_mat, x, y), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_integer_translation_offsets() {
        let image = rgba_image(1, 1, &[[9, 8, 7, 255]]);
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(image));
        // a blur wall forces the offset path rather than pushdown
        let wall = g.add(HorizontalBlurNode::new(0));
        let aff = g.add(AffineNode::new());
        g.node_mut(aff).as_affine_mut().unwrap().set_translation(2.0, 1.0);
        g.connect(src, wall).unwrap();
        g.connect(wall, aff).unwrap();
        let out = render(&mut g, aff, 4, 3);
        assert_eq!(px(&out, 2, 1), [9, 8, 7, 255]);
        assert_eq!(px(&out, 0, 0), [0, 0, 0, 0]);
    }

    /// Separable box blur commutes: h-then-v equals v-then-h.
    #[test]
    fn test_blur_separability() {
        let mut pixels = vec![[0u8, 0, 0, 255]; 25];
        pixels[12] = [255, 0, 0, 255]; // center of 5x5
        let hv = {
            let mut g = Graph::new();
            let src = g.add(SourceNode::new(rgba_image(5, 5, &pixels)));
            let h = g.add(HorizontalBlurNode::new(1));
            let v = g.add(VerticalBlurNode::new(1));
            g.connect(src, h).unwrap();
            g.connect(h, v).unwrap();
            render(&mut g, v, 5, 5)
        };
        let vh = {
            let mut g = Graph::new();
            let src = g.add(SourceNode::new(rgba_image(5, 5, &pixels)));
            let v = g.add(VerticalBlurNode::new(1));
            let h = g.add(HorizontalBlurNode::new(1));
            g.connect(src, v).unwrap();
            g.connect(v, h).unwrap();
            render(&mut g, h, 5, 5)
        };
        for y in 0..5 {
            for x in 0..5 {
                assert_eq!(px(&hv, x, y), px(&vh, x, y), "at ({x}, {y})");
            }
        }
        // the red energy spreads over the 3x3 window: 255 / 9
        assert_eq!(px(&hv, 2, 2), [28, 0, 0, 255]);
        assert_eq!(px(&hv, 1, 1), [28, 0, 0, 255]);
    }
}

#[cfg(test)]
mod matte_and_fanout {
    use super::*;
    use weft_graph::{
        DistributorNode, Graph, GrayscaleNode, MatteNode, RendererNode, SinkNode, SourceNode,
    };

    fn matte_pipeline(mask_bytes: &[u8]) -> ImageBuffer {
        let fg = rgba_image(2, 1, &[[255, 0, 0, 255], [255, 0, 0, 255]]);
        let bg = rgba_image(2, 1, &[[0, 0, 255, 255], [0, 0, 255, 255]]);
        let mask = byte_image(2, 1, PixelFormat::Alpha8, mask_bytes);

        let mut g = Graph::new();
        let fg = g.add(SourceNode::new(fg));
        let bg = g.add(SourceNode::new(bg));
        let mask = g.add(SourceNode::new(mask));
        let matte = g.add(MatteNode::new());
        g.connect_to(fg, matte, 0).unwrap();
        g.connect_to(bg, matte, 1).unwrap();
        g.connect_to(mask, matte, 2).unwrap();
        let renderer = g.add(RendererNode::new(2, 1));
        let sink = g.add(SinkNode::with_target(
            ImageBuffer::new(2, 1, PixelFormat::Rgba8, &heap()).unwrap(),
        ));
        g.connect(matte, renderer).unwrap();
        g.connect(renderer, sink).unwrap();
        g.exec(renderer).unwrap();
        g.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap()
    }

    #[test]
    fn test_matte_identity_at_extremes() {
        // mask 255 everywhere: foreground, no fringing
        let out = matte_pipeline(&[255, 255]);
        assert_eq!(px(&out, 0, 0), [255, 0, 0, 255]);
        assert_eq!(px(&out, 1, 0), [255, 0, 0, 255]);

        // mask 0 everywhere: background
        let out = matte_pipeline(&[0, 0]);
        assert_eq!(px(&out, 0, 0), [0, 0, 255, 255]);
        assert_eq!(px(&out, 1, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn test_matte_mixes_midpoint() {
        let out = matte_pipeline(&[128, 64]);
        // lerp(bg, fg, m): channel = div255(bg * (255 - m) + fg * m)
        assert_eq!(px(&out, 0, 0), [128, 0, 127, 255]);
        assert_eq!(px(&out, 1, 0), [64, 0, 191, 255]);
    }

    /// The matte's range is (fg ∪ bg) ∩ mask: pixels the mask never
    /// covered stay transparent even where foreground and background
    /// both have data.
    #[test]
    fn test_matte_range_clipped_to_mask() {
        let fg = rgba_image(2, 1, &[[255, 0, 0, 255], [255, 0, 0, 255]]);
        let bg = rgba_image(2, 1, &[[0, 0, 255, 255], [0, 0, 255, 255]]);
        // mask covers only the left pixel
        let mask = byte_image(1, 1, PixelFormat::Alpha8, &[255]);

        let mut g = Graph::new();
        let fg = g.add(SourceNode::new(fg));
        let bg = g.add(SourceNode::new(bg));
        let mask = g.add(SourceNode::new(mask));
        let matte = g.add(MatteNode::new());
        g.connect_to(fg, matte, 0).unwrap();
        g.connect_to(bg, matte, 1).unwrap();
        g.connect_to(mask, matte, 2).unwrap();
        let renderer = g.add(RendererNode::new(2, 1));
        let sink = g.add(SinkNode::with_target(
            ImageBuffer::new(2, 1, PixelFormat::Rgba8, &heap()).unwrap(),
        ));
        g.connect(matte, renderer).unwrap();
        g.connect(renderer, sink).unwrap();
        g.exec(renderer).unwrap();
        let out = g.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap();

        assert_eq!(px(&out, 0, 0), [255, 0, 0, 255]);
        assert_eq!(px(&out, 1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_distributor_feeds_two_branches() {
        let image = rgba_image(2, 1, &[[255, 0, 0, 255], [0, 0, 255, 255]]);
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(image));
        let dist = g.add(DistributorNode::new());
        g.connect(src, dist).unwrap();

        // branch A: grayscale; branch B: untouched; matte keys between
        let gray = g.add(GrayscaleNode::new());
        g.connect(dist, gray).unwrap();
        let matte = g.add(MatteNode::new());
        let mask = g.add(SourceNode::new(byte_image(
            2,
            1,
            PixelFormat::Alpha8,
            &[255, 0],
        )));
        g.connect_to(gray, matte, 0).unwrap();
        g.connect_to(dist, matte, 1).unwrap();
        g.connect_to(mask, matte, 2).unwrap();

        let renderer = g.add(RendererNode::new(2, 1));
        let sink = g.add(SinkNode::with_target(
            ImageBuffer::new(2, 1, PixelFormat::Rgba8, &heap()).unwrap(),
        ));
        g.connect(matte, renderer).unwrap();
        g.connect(renderer, sink).unwrap();
        g.exec(renderer).unwrap();
        let out = g.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap();

        // x 0 keyed to the grayscale branch, x 1 to the original
        assert_eq!(px(&out, 0, 0), [76, 76, 76, 255]);
        assert_eq!(px(&out, 1, 0), [0, 0, 255, 255]);
    }
}

#[cfg(test)]
mod formats_and_memory {
    use super::*;
    use std::sync::Arc;
    use weft_core::memory::{Allocator, HeapAllocator, PoolAllocator};
    use weft_graph::{Graph, RendererNode, SinkNode, SourceNode};

    #[test]
    fn test_render_to_rgb565_target() {
        let image = rgba_image(2, 1, &[[255, 255, 255, 255], [248, 0, 0, 255]]);
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(image));
        let renderer = g.add(RendererNode::new(2, 1));
        let target = ImageBuffer::new(2, 1, PixelFormat::Rgb565Le, &heap()).unwrap();
        let sink = g.add(SinkNode::with_target(target));
        g.connect(src, renderer).unwrap();
        g.connect(renderer, sink).unwrap();
        g.exec(renderer).unwrap();
        let out = g.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap();
        // white encodes to 0xffff, pure red to 0xf800 (little-endian)
        assert_eq!(&out.row(0)[0..2], &[0xff, 0xff]);
        assert_eq!(&out.row(0)[2..4], &[0x00, 0xf8]);
    }

    #[test]
    fn test_index4_source_renders_through_palette() {
        use std::sync::Arc;
        use weft_core::Palette;

        let palette = Arc::new(Palette::new(vec![
            [0, 0, 0, 255],
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
        ]));
        // 4 pixels of Index4, MSB first: indices 1, 2, 3, 0
        let image = ImageBuffer::from_bytes(
            4,
            1,
            PixelFormat::Index4,
            &[0x12, 0x30],
            &heap(),
        )
        .unwrap()
        .with_palette(palette);

        let mut g = Graph::new();
        let src = g.add(SourceNode::new(image));
        let renderer = g.add(RendererNode::new(4, 1));
        let sink = g.add(SinkNode::with_target(
            ImageBuffer::new(4, 1, PixelFormat::Rgba8, &heap()).unwrap(),
        ));
        g.connect(src, renderer).unwrap();
        g.connect(renderer, sink).unwrap();
        g.exec(renderer).unwrap();
        let out = g.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap();
        assert_eq!(px(&out, 0, 0), [255, 0, 0, 255]);
        assert_eq!(px(&out, 1, 0), [0, 255, 0, 255]);
        assert_eq!(px(&out, 2, 0), [0, 0, 255, 255]);
        assert_eq!(px(&out, 3, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_disabled_sink_writes_nothing() {
        let image = rgba_image(1, 1, &[[255, 255, 255, 255]]);
        let mut g = Graph::new();
        let src = g.add(SourceNode::new(image));
        let renderer = g.add(RendererNode::new(1, 1));
        let sink = g.add(SinkNode::with_target(
            ImageBuffer::new(1, 1, PixelFormat::Rgba8, &heap()).unwrap(),
        ));
        g.node_mut(sink).as_sink_mut().unwrap().set_draw_enabled(false);
        g.connect(src, renderer).unwrap();
        g.connect(renderer, sink).unwrap();
        g.exec(renderer).unwrap();
        let out = g.node_mut(sink).as_sink_mut().unwrap().take_target().unwrap();
        assert_eq!(px(&out, 0, 0), [0, 0, 0, 0]);
    }

    /// With a big-enough pool bound and the heap trap armed, a frame
    /// completes without touching the heap.
    #[test]
    fn test_pool_contains_frame_allocations() {
        let fallback = Arc::new(HeapAllocator::new());
        let fallback_handle: weft_core::memory::AllocatorHandle = fallback.clone();
        let pool = Arc::new(PoolAllocator::new(4096, 16, fallback_handle));

        let image = rgba_image(2, 2, &[[1, 2, 3, 255]; 4]);
        let target = ImageBuffer::new(2, 2, PixelFormat::Rgba8, &heap()).unwrap();

        let mut g = Graph::new();
        let src = g.add(SourceNode::new(image));
        let renderer = g.add(RendererNode::new(2, 2));
        g.node_mut(renderer)
            .as_renderer_mut()
            .unwrap()
            .set_allocator(pool.clone());
        let sink = g.add(SinkNode::with_target(target));
        g.connect(src, renderer).unwrap();
        g.connect(renderer, sink).unwrap();

        fallback.arm_trap();
        let result = g.exec(renderer);
        fallback.disarm_trap();
        result.unwrap();

        assert_eq!(pool.stats().pool_misses, 0);
        assert!(pool.stats().pool_hits > 0);
    }
}
