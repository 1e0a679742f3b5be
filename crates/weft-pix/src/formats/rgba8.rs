//! Straight-alpha RGBA, byte order R G B A.
//!
//! The pipeline's working format: strips travel as Rgba8, so straighten
//! and unstraighten are plain copies here.

use weft_core::{Palette, ViewPort};

pub(crate) fn straighten(dst: &mut [u8], src: &[u8], count: usize, _palette: Option<&Palette>) {
    dst[..count * 4].copy_from_slice(&src[..count * 4]);
}

pub(crate) fn unstraighten(dst: &mut [u8], src: &[u8], count: usize, _palette: Option<&Palette>) {
    dst[..count * 4].copy_from_slice(&src[..count * 4]);
}

#[inline]
pub(crate) fn fetch(src: &ViewPort<'_>, x: i32, y: i32) -> [u8; 4] {
    let row = src.row(y as u32);
    let o = x as usize * 4;
    [row[o], row[o + 1], row[o + 2], row[o + 3]]
}
