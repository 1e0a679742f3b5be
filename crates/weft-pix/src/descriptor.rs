//! The pixel-format descriptor table.
//!
//! One immutable [`FormatDescriptor`] per [`PixelFormat`], held in a flat
//! static table for O(1) dispatch. Formats differ in data, not behavior
//! shape, so the descriptor is a bundle of function pointers:
//!
//! - `straighten` / `unstraighten` - native row to/from straight RGBA8
//! - `copy_row_dda` - fixed-point sampled read into RGBA8
//! - `blend_under` - straight RGBA8 source composited beneath a native
//!   destination row
//! - `fetch` - one pixel, decoded (bounds pre-checked by callers)
//!
//! # Usage
//!
//! ```rust
//! use weft_core::PixelFormat;
//! use weft_pix::descriptor;
//!
//! let desc = descriptor(PixelFormat::Rgb565Le);
//! let src = [0x00u8, 0xf8]; // pure red
//! let mut rgba = [0u8; 4];
//! (desc.straighten)(&mut rgba, &src, 1, None);
//! assert_eq!(rgba, [248, 0, 0, 255]);
//! ```

use crate::blend::blend_under_rgba_row;
use crate::dda::{sample_row, DdaParams};
use crate::formats;
use weft_core::{Palette, PixelFormat, ViewPort};

/// Row codec: `(dst, src, count, palette)`.
pub type RowCodecFn = fn(&mut [u8], &[u8], usize, Option<&Palette>);

/// Blend-under kernel: `(dst_native, src_rgba8, count, palette)`.
pub type BlendUnderFn = fn(&mut [u8], &[u8], usize, Option<&Palette>);

/// Sampled row read: `(dst_rgba8, src_view, params)`.
pub type CopyRowDdaFn = fn(&mut [u8], &ViewPort<'_>, &DdaParams);

/// Single-pixel decode, coordinates already bounds-checked.
pub type FetchFn = fn(&ViewPort<'_>, i32, i32) -> [u8; 4];

/// Immutable per-format kernel bundle.
#[derive(Debug, Clone, Copy)]
pub struct FormatDescriptor {
    /// The format these kernels implement.
    pub format: PixelFormat,
    /// Decode a native row to straight RGBA8.
    pub straighten: RowCodecFn,
    /// Encode straight RGBA8 into a native row.
    pub unstraighten: RowCodecFn,
    /// Composite straight RGBA8 beneath a native row.
    pub blend_under: BlendUnderFn,
    /// Sample along a fixed-point ray into RGBA8.
    pub copy_row_dda: CopyRowDdaFn,
    /// Decode one pixel.
    pub fetch: FetchFn,
}

/// Blends through the row codecs in fixed 64-pixel chunks.
///
/// 64 pixels is a whole number of bytes for every packed layout, so the
/// chunked walk never splits a byte.
fn blend_under_via(
    straighten: RowCodecFn,
    unstraighten: RowCodecFn,
    bits: usize,
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    palette: Option<&Palette>,
) {
    const CHUNK: usize = 64;
    let mut scratch = [0u8; CHUNK * 4];
    let mut x = 0;
    while x < count {
        let n = (count - x).min(CHUNK);
        let byte = x * bits / 8;
        straighten(&mut scratch, &dst[byte..], n, palette);
        blend_under_rgba_row(&mut scratch[..n * 4], &src[x * 4..(x + n) * 4]);
        unstraighten(&mut dst[byte..], &scratch, n, palette);
        x += n;
    }
}

macro_rules! descriptor_entry {
    ($straighten:path, $unstraighten:path, $fetch:path, $bits:expr,
     $dda:ident, $blend:ident) => {
        fn $dda(dst: &mut [u8], src: &ViewPort<'_>, params: &DdaParams) {
            sample_row(dst, src, params, $fetch);
        }

        fn $blend(dst: &mut [u8], src: &[u8], count: usize, palette: Option<&Palette>) {
            blend_under_via($straighten, $unstraighten, $bits, dst, src, count, palette);
        }
    };
}

fn dda_rgba8(dst: &mut [u8], src: &ViewPort<'_>, params: &DdaParams) {
    sample_row(dst, src, params, formats::rgba8::fetch);
}

fn blend_rgba8(dst: &mut [u8], src: &[u8], count: usize, _palette: Option<&Palette>) {
    blend_under_rgba_row(&mut dst[..count * 4], &src[..count * 4]);
}

descriptor_entry!(
    formats::rgb888::straighten_rgb,
    formats::rgb888::unstraighten_rgb,
    formats::rgb888::fetch_rgb,
    24,
    dda_rgb888,
    blend_rgb888
);
descriptor_entry!(
    formats::rgb888::straighten_bgr,
    formats::rgb888::unstraighten_bgr,
    formats::rgb888::fetch_bgr,
    24,
    dda_bgr888,
    blend_bgr888
);
descriptor_entry!(
    formats::rgb565::straighten_le,
    formats::rgb565::unstraighten_le,
    formats::rgb565::fetch_le,
    16,
    dda_rgb565le,
    blend_rgb565le
);
descriptor_entry!(
    formats::rgb565::straighten_be,
    formats::rgb565::unstraighten_be,
    formats::rgb565::fetch_be,
    16,
    dda_rgb565be,
    blend_rgb565be
);
descriptor_entry!(
    formats::rgb332::straighten,
    formats::rgb332::unstraighten,
    formats::rgb332::fetch,
    8,
    dda_rgb332,
    blend_rgb332
);
descriptor_entry!(
    formats::gray::straighten_alpha,
    formats::gray::unstraighten_alpha,
    formats::gray::fetch_alpha,
    8,
    dda_alpha8,
    blend_alpha8
);
descriptor_entry!(
    formats::gray::straighten_gray,
    formats::gray::unstraighten_gray,
    formats::gray::fetch_gray,
    8,
    dda_gray8,
    blend_gray8
);
descriptor_entry!(
    formats::index::straighten_1,
    formats::index::unstraighten_1,
    formats::index::fetch_1,
    1,
    dda_index1,
    blend_index1
);
descriptor_entry!(
    formats::index::straighten_2,
    formats::index::unstraighten_2,
    formats::index::fetch_2,
    2,
    dda_index2,
    blend_index2
);
descriptor_entry!(
    formats::index::straighten_4,
    formats::index::unstraighten_4,
    formats::index::fetch_4,
    4,
    dda_index4,
    blend_index4
);
descriptor_entry!(
    formats::index::straighten_8,
    formats::index::unstraighten_8,
    formats::index::fetch_8,
    8,
    dda_index8,
    blend_index8
);

macro_rules! table_entry {
    ($format:ident, $straighten:path, $unstraighten:path, $fetch:path, $dda:ident, $blend:ident) => {
        FormatDescriptor {
            format: PixelFormat::$format,
            straighten: $straighten,
            unstraighten: $unstraighten,
            blend_under: $blend,
            copy_row_dda: $dda,
            fetch: $fetch,
        }
    };
}

/// The table, ordered like [`PixelFormat::ALL`].
static TABLE: [FormatDescriptor; 12] = [
    table_entry!(
        Rgba8,
        formats::rgba8::straighten,
        formats::rgba8::unstraighten,
        formats::rgba8::fetch,
        dda_rgba8,
        blend_rgba8
    ),
    table_entry!(
        Rgb888,
        formats::rgb888::straighten_rgb,
        formats::rgb888::unstraighten_rgb,
        formats::rgb888::fetch_rgb,
        dda_rgb888,
        blend_rgb888
    ),
    table_entry!(
        Bgr888,
        formats::rgb888::straighten_bgr,
        formats::rgb888::unstraighten_bgr,
        formats::rgb888::fetch_bgr,
        dda_bgr888,
        blend_bgr888
    ),
    table_entry!(
        Rgb565Le,
        formats::rgb565::straighten_le,
        formats::rgb565::unstraighten_le,
        formats::rgb565::fetch_le,
        dda_rgb565le,
        blend_rgb565le
    ),
    table_entry!(
        Rgb565Be,
        formats::rgb565::straighten_be,
        formats::rgb565::unstraighten_be,
        formats::rgb565::fetch_be,
        dda_rgb565be,
        blend_rgb565be
    ),
    table_entry!(
        Rgb332,
        formats::rgb332::straighten,
        formats::rgb332::unstraighten,
        formats::rgb332::fetch,
        dda_rgb332,
        blend_rgb332
    ),
    table_entry!(
        Alpha8,
        formats::gray::straighten_alpha,
        formats::gray::unstraighten_alpha,
        formats::gray::fetch_alpha,
        dda_alpha8,
        blend_alpha8
    ),
    table_entry!(
        Gray8,
        formats::gray::straighten_gray,
        formats::gray::unstraighten_gray,
        formats::gray::fetch_gray,
        dda_gray8,
        blend_gray8
    ),
    table_entry!(
        Index1,
        formats::index::straighten_1,
        formats::index::unstraighten_1,
        formats::index::fetch_1,
        dda_index1,
        blend_index1
    ),
    table_entry!(
        Index2,
        formats::index::straighten_2,
        formats::index::unstraighten_2,
        formats::index::fetch_2,
        dda_index2,
        blend_index2
    ),
    table_entry!(
        Index4,
        formats::index::straighten_4,
        formats::index::unstraighten_4,
        formats::index::fetch_4,
        dda_index4,
        blend_index4
    ),
    table_entry!(
        Index8,
        formats::index::straighten_8,
        formats::index::unstraighten_8,
        formats::index::fetch_8,
        dda_index8,
        blend_index8
    ),
];

/// Looks up the descriptor for `format`.
#[inline]
pub fn descriptor(format: PixelFormat) -> &'static FormatDescriptor {
    let index = PixelFormat::ALL
        .iter()
        .position(|&f| f == format)
        .expect("every format has a table entry");
    &TABLE[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_all() {
        for (i, &format) in PixelFormat::ALL.iter().enumerate() {
            assert_eq!(TABLE[i].format, format);
            assert_eq!(descriptor(format).format, format);
        }
    }

    #[test]
    fn test_blend_under_native_rgb565_is_occluded() {
        // 565 has no alpha: a zeroed row decodes opaque black, which
        // occludes anything blended underneath
        let desc = descriptor(PixelFormat::Rgb565Le);
        let mut dst = [0u8; 2];
        let red = [248u8, 0, 0, 255];
        (desc.blend_under)(&mut dst, &red, 1, None);
        assert_eq!(dst, [0, 0]);
    }

    #[test]
    fn test_blend_under_native_alpha8_accumulates() {
        let desc = descriptor(PixelFormat::Alpha8);
        let mut dst = [128u8];
        (desc.blend_under)(&mut dst, &[0, 0, 0, 255], 1, None);
        assert_eq!(dst, [255]);
    }

    /// Lossless formats survive straighten/unstraighten byte-exactly;
    /// lossy formats are stable after the first quantization.
    #[test]
    fn test_row_codec_round_trips() {
        let samples: Vec<u8> = (0u32..64).map(|i| (i * 37 % 256) as u8).collect();

        for format in [
            PixelFormat::Rgb888,
            PixelFormat::Bgr888,
            PixelFormat::Gray8,
            PixelFormat::Alpha8,
        ] {
            let count = samples.len() * 8 / format.bits_per_pixel() as usize;
            let native = &samples[..format.row_bytes(count as u32)];
            let desc = descriptor(format);
            let mut rgba = vec![0u8; count * 4];
            (desc.straighten)(&mut rgba, native, count, None);
            let mut back = vec![0u8; native.len()];
            (desc.unstraighten)(&mut back, &rgba, count, None);
            assert_eq!(&back[..], native, "{} is lossless", format.name());
        }

        for format in [
            PixelFormat::Rgb565Le,
            PixelFormat::Rgb565Be,
            PixelFormat::Rgb332,
        ] {
            let count = samples.len() * 8 / format.bits_per_pixel() as usize;
            let row_bytes = format.row_bytes(count as u32);
            let desc = descriptor(format);
            // quantize once, then the round trip must be exact
            let mut rgba = vec![0u8; count * 4];
            (desc.straighten)(&mut rgba, &samples[..row_bytes], count, None);
            let mut once = vec![0u8; row_bytes];
            (desc.unstraighten)(&mut once, &rgba, count, None);
            let mut rgba2 = vec![0u8; count * 4];
            (desc.straighten)(&mut rgba2, &once, count, None);
            let mut twice = vec![0u8; row_bytes];
            (desc.unstraighten)(&mut twice, &rgba2, count, None);
            assert_eq!(once, twice, "{} quantization is stable", format.name());
        }
    }
}
