//! Canvas helpers: rectangle fills and test backgrounds.
//!
//! Convenience routines for seeding buffers in demos and tests. These run
//! outside the render path, so they allocate their scratch rows directly.

use crate::descriptor;
use weft_core::{DataRange, Error, ImageBuffer, Result};

/// Fills `range` (clipped to the buffer) with a straight RGBA8 color.
///
/// For bit-packed formats the clipped left edge must land on a byte
/// boundary.
pub fn fill_rect_rgba(buffer: &mut ImageBuffer, range: DataRange, rgba: [u8; 4]) -> Result<()> {
    let clipped = buffer.bounds().intersect(&range);
    if clipped.is_empty() {
        return Ok(());
    }
    let format = buffer.format();
    let bit_offset = clipped.x as usize * format.bits_per_pixel() as usize;
    if bit_offset % 8 != 0 {
        return Err(Error::invalid_dimensions(
            clipped.w as u32,
            clipped.h as u32,
            "packed fill must start on a byte boundary",
        ));
    }
    let desc = descriptor(format);
    let count = clipped.w as usize;
    let scratch: Vec<u8> = rgba.iter().copied().cycle().take(count * 4).collect();
    let palette = buffer.palette().cloned();
    let byte = bit_offset / 8;
    for y in clipped.y..clipped.bottom() {
        let row = buffer.row_mut(y as u32)?;
        (desc.unstraighten)(&mut row[byte..], &scratch, count, palette.as_deref());
    }
    Ok(())
}

/// Fills the whole buffer with an alternating two-color checkerboard.
pub fn checkerboard(
    buffer: &mut ImageBuffer,
    cell: u32,
    a: [u8; 4],
    b: [u8; 4],
) -> Result<()> {
    if cell == 0 {
        return Err(Error::invalid_dimensions(cell, cell, "zero checker cell"));
    }
    let desc = descriptor(buffer.format());
    let width = buffer.width() as usize;
    let palette = buffer.palette().cloned();
    let mut scratch = vec![0u8; width * 4];
    for y in 0..buffer.height() {
        for x in 0..width {
            let color = if ((x as u32 / cell) + (y / cell)) % 2 == 0 {
                a
            } else {
                b
            };
            scratch[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
        let row = buffer.row_mut(y)?;
        (desc.unstraighten)(row, &scratch, width, palette.as_deref());
    }
    Ok(())
}
