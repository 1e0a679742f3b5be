//! Single-byte formats: Alpha8 (coverage only) and Gray8 (luma only).
//!
//! Alpha8 straightens to transparent black with the byte as coverage;
//! Gray8 straightens to an opaque gray. Unstraightening Gray8 takes
//! Rec.601 luma, which makes the gray round trip exact.

use super::luma601;
use weft_core::{Palette, ViewPort};

pub(crate) fn straighten_alpha(dst: &mut [u8], src: &[u8], count: usize, _palette: Option<&Palette>) {
    for i in 0..count {
        dst[i * 4..i * 4 + 4].copy_from_slice(&[0, 0, 0, src[i]]);
    }
}

pub(crate) fn unstraighten_alpha(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    _palette: Option<&Palette>,
) {
    for i in 0..count {
        dst[i] = src[i * 4 + 3];
    }
}

pub(crate) fn straighten_gray(dst: &mut [u8], src: &[u8], count: usize, _palette: Option<&Palette>) {
    for i in 0..count {
        let g = src[i];
        dst[i * 4..i * 4 + 4].copy_from_slice(&[g, g, g, 255]);
    }
}

pub(crate) fn unstraighten_gray(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    _palette: Option<&Palette>,
) {
    for i in 0..count {
        let s = &src[i * 4..i * 4 + 4];
        dst[i] = luma601(s[0], s[1], s[2]);
    }
}

#[inline]
pub(crate) fn fetch_alpha(src: &ViewPort<'_>, x: i32, y: i32) -> [u8; 4] {
    [0, 0, 0, src.row(y as u32)[x as usize]]
}

#[inline]
pub(crate) fn fetch_gray(src: &ViewPort<'_>, x: i32, y: i32) -> [u8; 4] {
    let g = src.row(y as u32)[x as usize];
    [g, g, g, 255]
}
