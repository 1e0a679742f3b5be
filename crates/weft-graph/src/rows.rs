//! Row assembly helpers shared by the compositing nodes.
//!
//! A producer may answer with a strip anchored anywhere (its `origin`)
//! and lit only inside its `range`. These helpers re-clip one row of a
//! response against a consumer's row span, in absolute (requester-frame)
//! coordinates throughout.

use weft_core::{DataRange, RenderResponse};
use weft_pix::blend_under_rgba_row;

/// The lit span of `resp` on row `y_abs`, or empty.
pub(crate) fn lit_row_range(resp: &RenderResponse, y_abs: i32) -> DataRange {
    if resp.range.y <= y_abs && y_abs < resp.range.bottom() {
        DataRange::new(resp.range.x, y_abs, resp.range.w, 1)
    } else {
        DataRange::EMPTY
    }
}

/// The RGBA8 bytes of the response strip covering row `y_abs`.
pub(crate) fn resp_row(resp: &RenderResponse, y_abs: i32) -> Option<&[u8]> {
    let strip = resp.strip.as_ref()?;
    let iy = y_abs - resp.origin.y.floor();
    if iy < 0 || iy >= strip.height() as i32 {
        return None;
    }
    Some(strip.row(iy as u32))
}

/// The decoded pixel of `resp` at absolute (x, y); transparent outside
/// the lit range.
pub(crate) fn rgba_at(resp: &RenderResponse, x: i32, y_abs: i32) -> [u8; 4] {
    if !resp.range.contains(x, y_abs) {
        return [0, 0, 0, 0];
    }
    let Some(row) = resp_row(resp, y_abs) else {
        return [0, 0, 0, 0];
    };
    let ix = (x - resp.origin.x.floor()) as usize * 4;
    [row[ix], row[ix + 1], row[ix + 2], row[ix + 3]]
}

/// Copies the lit pixels of row `y_abs` into an RGBA8 row anchored at
/// `dst_x0`, returning the span actually written.
pub(crate) fn copy_lit(
    dst_row: &mut [u8],
    dst_x0: i32,
    dst_w: u32,
    resp: &RenderResponse,
    y_abs: i32,
) -> DataRange {
    let span = lit_row_range(resp, y_abs).intersect(&DataRange::new(dst_x0, y_abs, dst_w as i32, 1));
    if span.is_empty() {
        return DataRange::EMPTY;
    }
    let Some(src_row) = resp_row(resp, y_abs) else {
        return DataRange::EMPTY;
    };
    let src_off = (span.x - resp.origin.x.floor()) as usize * 4;
    let dst_off = (span.x - dst_x0) as usize * 4;
    let len = span.w as usize * 4;
    dst_row[dst_off..dst_off + len].copy_from_slice(&src_row[src_off..src_off + len]);
    span
}

/// Blends the lit pixels of row `y_abs` underneath an RGBA8 accumulator
/// row anchored at `acc_x0`, returning the span touched.
pub(crate) fn blend_lit(
    acc_row: &mut [u8],
    acc_x0: i32,
    acc_w: u32,
    resp: &RenderResponse,
    y_abs: i32,
) -> DataRange {
    let span = lit_row_range(resp, y_abs).intersect(&DataRange::new(acc_x0, y_abs, acc_w as i32, 1));
    if span.is_empty() {
        return DataRange::EMPTY;
    }
    let Some(src_row) = resp_row(resp, y_abs) else {
        return DataRange::EMPTY;
    };
    let src_off = (span.x - resp.origin.x.floor()) as usize * 4;
    let acc_off = (span.x - acc_x0) as usize * 4;
    let len = span.w as usize * 4;
    blend_under_rgba_row(
        &mut acc_row[acc_off..acc_off + len],
        &src_row[src_off..src_off + len],
    );
    span
}
