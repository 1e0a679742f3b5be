//! Sink node: where pixels leave the graph.
//!
//! [`SinkNode`] wraps a target [`ImageBuffer`] (standing in for a frame
//! buffer or an LCD transfer window) and is the only node with
//! externally visible side effects. Each strip the renderer offers is
//! clipped against the target, converted to the target's format, and
//! written row by row.

use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, NodeId};
use weft_core::{DataRange, Error, ImageBuffer, PrepareStatus, RenderContext, RenderResponse};
use weft_pix::{convert_row, ensure_convertible};

/// Writes offered strips into a target buffer.
#[derive(Debug, Default)]
pub struct SinkNode {
    target: Option<ImageBuffer>,
    origin: (i32, i32),
    draw_enabled: bool,
}

impl SinkNode {
    /// Creates a sink with no target; drawing is enabled.
    pub fn new() -> Self {
        Self {
            target: None,
            origin: (0, 0),
            draw_enabled: true,
        }
    }

    /// Creates a sink writing into `target`.
    pub fn with_target(target: ImageBuffer) -> Self {
        let mut sink = Self::new();
        sink.set_target(target);
        sink
    }

    /// Sets the target buffer.
    pub fn set_target(&mut self, target: ImageBuffer) {
        self.target = Some(target);
    }

    /// Takes the target buffer back out (after a frame, typically).
    pub fn take_target(&mut self) -> Option<ImageBuffer> {
        self.target.take()
    }

    /// The current target.
    pub fn target(&self) -> Option<&ImageBuffer> {
        self.target.as_ref()
    }

    /// Offsets screen coordinates into the target: a strip pixel at
    /// screen (x, y) lands at target (x + ox, y + oy).
    pub fn set_origin(&mut self, x: i32, y: i32) {
        self.origin = (x, y);
    }

    /// Enables or disables writing (the clip-and-convert work is skipped
    /// entirely while disabled).
    pub fn set_draw_enabled(&mut self, enabled: bool) {
        self.draw_enabled = enabled;
    }

    pub(crate) fn prepare(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        ctx: &mut RenderContext,
    ) -> GraphResult<(PrepareStatus, DataRange)> {
        if let Some(target) = &self.target {
            ensure_convertible(target.format(), target.palette().is_some())?;
        }
        let status = graph.prepare_input(id, 0, ctx)?;
        Ok((status, DataRange::EMPTY))
    }

    /// Writes one offered strip into the target.
    pub(crate) fn write_strip(
        &mut self,
        resp: &RenderResponse,
        ctx: &mut RenderContext,
    ) -> GraphResult<()> {
        if !self.draw_enabled || resp.is_empty() {
            return Ok(());
        }
        let Some(target) = self.target.as_mut() else {
            return Ok(());
        };
        let Some(strip) = resp.strip.as_ref() else {
            return Ok(());
        };
        let (ox, oy) = self.origin;
        // target extent, seen from screen space
        let visible = DataRange::new(-ox, -oy, target.width() as i32, target.height() as i32);
        let lit = resp.range.intersect(&visible);
        if lit.is_empty() {
            return Ok(());
        }
        let strip_format = strip.format();
        let target_format = target.format();
        let target_palette = target.palette().cloned();
        let dst_bit = (lit.x + ox) as usize * target_format.bits_per_pixel() as usize;
        if dst_bit % 8 != 0 {
            return Err(GraphError::Core(Error::unsupported_format(format!(
                "{} target writes must start on a byte boundary",
                target_format.name()
            ))));
        }
        let dst_byte = dst_bit / 8;
        let count = lit.w as usize;
        let mut scratch = ctx.acquire_rgba_row(lit.w as u32)?;
        let resp_ox = resp.origin.x.floor();
        let resp_oy = resp.origin.y.floor();
        for y in lit.y..lit.bottom() {
            let iy = y - resp_oy;
            if iy < 0 || iy >= strip.height() as i32 {
                continue;
            }
            let src_row = strip.row(iy as u32);
            let src_byte = strip_format.row_bytes((lit.x - resp_ox) as u32);
            let dst_row = target.row_mut((y + oy) as u32)?;
            convert_row(
                &mut dst_row[dst_byte..],
                target_format,
                target_palette.as_deref(),
                &src_row[src_byte..],
                strip_format,
                None,
                scratch.row_mut(0),
                count,
            )?;
        }
        Ok(())
    }
}

impl From<ImageBuffer> for SinkNode {
    fn from(target: ImageBuffer) -> Self {
        Self::with_target(target)
    }
}
