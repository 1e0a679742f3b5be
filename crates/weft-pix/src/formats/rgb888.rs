//! 24-bit RGB, both channel orders, tightly packed, always opaque.

use weft_core::{Palette, ViewPort};

pub(crate) fn straighten_rgb(dst: &mut [u8], src: &[u8], count: usize, _palette: Option<&Palette>) {
    for i in 0..count {
        let s = &src[i * 3..i * 3 + 3];
        let d = &mut dst[i * 4..i * 4 + 4];
        d[0] = s[0];
        d[1] = s[1];
        d[2] = s[2];
        d[3] = 255;
    }
}

pub(crate) fn unstraighten_rgb(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    _palette: Option<&Palette>,
) {
    for i in 0..count {
        let s = &src[i * 4..i * 4 + 4];
        let d = &mut dst[i * 3..i * 3 + 3];
        d[0] = s[0];
        d[1] = s[1];
        d[2] = s[2];
    }
}

pub(crate) fn straighten_bgr(dst: &mut [u8], src: &[u8], count: usize, _palette: Option<&Palette>) {
    for i in 0..count {
        let s = &src[i * 3..i * 3 + 3];
        let d = &mut dst[i * 4..i * 4 + 4];
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
        d[3] = 255;
    }
}

pub(crate) fn unstraighten_bgr(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    _palette: Option<&Palette>,
) {
    for i in 0..count {
        let s = &src[i * 4..i * 4 + 4];
        let d = &mut dst[i * 3..i * 3 + 3];
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
    }
}

#[inline]
pub(crate) fn fetch_rgb(src: &ViewPort<'_>, x: i32, y: i32) -> [u8; 4] {
    let row = src.row(y as u32);
    let o = x as usize * 3;
    [row[o], row[o + 1], row[o + 2], 255]
}

#[inline]
pub(crate) fn fetch_bgr(src: &ViewPort<'_>, x: i32, y: i32) -> [u8; 4] {
    let row = src.row(y as u32);
    let o = x as usize * 3;
    [row[o + 2], row[o + 1], row[o], 255]
}
