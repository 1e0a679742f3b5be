//! Format-to-format row conversion.
//!
//! Conversion is always the 2-step path: any format straightens to RGBA8,
//! RGBA8 unstraightens to any format. N formats therefore need 2N
//! kernels, not N^2 converters, at the cost of one scratch row.

use crate::descriptor;
use weft_core::{Error, Palette, PixelFormat, Result, ViewPort};

/// Checks that rows of `format` can pass through the converter.
///
/// Index formats need a palette; everything else always converts.
pub fn ensure_convertible(format: PixelFormat, has_palette: bool) -> Result<()> {
    if format.uses_palette() && !has_palette {
        return Err(Error::unsupported_format(format!(
            "{} without a palette",
            format.name()
        )));
    }
    Ok(())
}

/// Converts `count` pixels from `src` (in `src_format`) into `dst` (in
/// `dst_format`) through a caller-provided RGBA8 scratch row.
///
/// Equal formats short-circuit to a byte copy (palettes are assumed to
/// match; converting between palettes goes through two explicit calls).
#[allow(clippy::too_many_arguments)]
pub fn convert_row(
    dst: &mut [u8],
    dst_format: PixelFormat,
    dst_palette: Option<&Palette>,
    src: &[u8],
    src_format: PixelFormat,
    src_palette: Option<&Palette>,
    scratch: &mut [u8],
    count: usize,
) -> Result<()> {
    ensure_convertible(src_format, src_palette.is_some())?;
    ensure_convertible(dst_format, dst_palette.is_some())?;
    if src_format == dst_format {
        let bytes = src_format.row_bytes(count as u32);
        dst[..bytes].copy_from_slice(&src[..bytes]);
        return Ok(());
    }
    if scratch.len() < count * 4 {
        return Err(Error::other(format!(
            "conversion scratch holds {} bytes, row needs {}",
            scratch.len(),
            count * 4
        )));
    }
    (descriptor(src_format).straighten)(scratch, src, count, src_palette);
    (descriptor(dst_format).unstraighten)(dst, scratch, count, dst_palette);
    Ok(())
}

/// Decodes the pixel at (x, y), or `None` outside the view.
pub fn read_pixel_rgba(view: &ViewPort<'_>, x: i32, y: i32) -> Option<[u8; 4]> {
    if x < 0 || y < 0 || x >= view.width() as i32 || y >= view.height() as i32 {
        return None;
    }
    Some((descriptor(view.format()).fetch)(view, x, y))
}
