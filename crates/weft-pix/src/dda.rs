//! Fixed-point DDA sampling across a scanline.
//!
//! The sampling engine walks a (u, v) ray through source space at a
//! constant per-pixel increment and writes straight RGBA8 samples. Every
//! format supplies a `fetch` closure that decodes one native pixel; the
//! engine handles bounds, stepping and bilinear weighting, so the
//! per-format kernels stay small and the walk is bit-identical across
//! formats.
//!
//! Samples use the corner convention: an identity transform lands every
//! ray point exactly on an integer coordinate, making nearest *and*
//! bilinear pass-through byte-exact.

use weft_core::ViewPort;
use weft_math::Fixed;

/// Interpolation used when a sample lands between source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFilter {
    /// Floor of the fixed-point sample point.
    #[default]
    Nearest,
    /// Four-neighbor blend in integer arithmetic.
    Bilinear,
}

/// One scanline's sampling ray.
#[derive(Debug, Clone, Copy)]
pub struct DdaParams {
    /// Source-space u for the first destination pixel.
    pub u0: Fixed,
    /// Source-space v for the first destination pixel.
    pub v0: Fixed,
    /// Per-destination-pixel u increment.
    pub du: Fixed,
    /// Per-destination-pixel v increment.
    pub dv: Fixed,
    /// Interpolation mode.
    pub filter: SampleFilter,
}

/// Walks the ray and writes `dst.len() / 4` RGBA8 samples.
///
/// `fetch` is called only with in-bounds coordinates; out-of-bounds
/// samples (and out-of-bounds bilinear neighbors) contribute transparent
/// black.
#[inline]
pub fn sample_row<F>(dst: &mut [u8], src: &ViewPort<'_>, params: &DdaParams, fetch: F)
where
    F: Fn(&ViewPort<'_>, i32, i32) -> [u8; 4],
{
    let w = src.width() as i32;
    let h = src.height() as i32;
    let mut u = params.u0;
    let mut v = params.v0;

    let guarded = |x: i32, y: i32| -> [u8; 4] {
        if x >= 0 && x < w && y >= 0 && y < h {
            fetch(src, x, y)
        } else {
            [0, 0, 0, 0]
        }
    };

    match params.filter {
        SampleFilter::Nearest => {
            for px in dst.chunks_exact_mut(4) {
                px.copy_from_slice(&guarded(u.floor(), v.floor()));
                u += params.du;
                v += params.dv;
            }
        }
        SampleFilter::Bilinear => {
            for px in dst.chunks_exact_mut(4) {
                let x0 = u.floor();
                let y0 = v.floor();
                // 8-bit weights keep the accumulation in u32
                let fx = (u.frac().to_bits() >> 8) as u32;
                let fy = (v.frac().to_bits() >> 8) as u32;
                let c00 = guarded(x0, y0);
                let c10 = guarded(x0 + 1, y0);
                let c01 = guarded(x0, y0 + 1);
                let c11 = guarded(x0 + 1, y0 + 1);
                let w00 = (256 - fx) * (256 - fy);
                let w10 = fx * (256 - fy);
                let w01 = (256 - fx) * fy;
                let w11 = fx * fy;
                for c in 0..4 {
                    let sum = c00[c] as u32 * w00
                        + c10[c] as u32 * w10
                        + c01[c] as u32 * w01
                        + c11[c] as u32 * w11;
                    px[c] = ((sum + (1 << 15)) >> 16) as u8;
                }
                u += params.du;
                v += params.dv;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::memory::HeapAllocator;
    use weft_core::{ImageBuffer, PixelFormat};

    fn rgba_2x1(left: [u8; 4], right: [u8; 4]) -> ImageBuffer {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&left);
        bytes.extend_from_slice(&right);
        ImageBuffer::from_bytes(2, 1, PixelFormat::Rgba8, &bytes, &HeapAllocator::shared())
            .unwrap()
    }

    fn fetch_rgba(src: &ViewPort<'_>, x: i32, y: i32) -> [u8; 4] {
        let row = src.row(y as u32);
        let o = x as usize * 4;
        [row[o], row[o + 1], row[o + 2], row[o + 3]]
    }

    #[test]
    fn test_nearest_identity() {
        let img = rgba_2x1([255, 0, 0, 255], [0, 0, 255, 255]);
        let params = DdaParams {
            u0: Fixed::ZERO,
            v0: Fixed::ZERO,
            du: Fixed::ONE,
            dv: Fixed::ZERO,
            filter: SampleFilter::Nearest,
        };
        let mut dst = [0u8; 8];
        sample_row(&mut dst, &img.view(), &params, fetch_rgba);
        assert_eq!(&dst[0..4], &[255, 0, 0, 255]);
        assert_eq!(&dst[4..8], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_nearest_scale_2x() {
        // 2x upscale: u steps by one half
        let img = rgba_2x1([255, 0, 0, 255], [0, 0, 255, 255]);
        let params = DdaParams {
            u0: Fixed::ZERO,
            v0: Fixed::ZERO,
            du: Fixed::HALF,
            dv: Fixed::ZERO,
            filter: SampleFilter::Nearest,
        };
        let mut dst = [0u8; 16];
        sample_row(&mut dst, &img.view(), &params, fetch_rgba);
        assert_eq!(&dst[0..4], &[255, 0, 0, 255]);
        assert_eq!(&dst[4..8], &[255, 0, 0, 255]);
        assert_eq!(&dst[8..12], &[0, 0, 255, 255]);
        assert_eq!(&dst[12..16], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_bilinear_identity_is_exact() {
        let img = rgba_2x1([10, 20, 30, 255], [200, 100, 50, 255]);
        let params = DdaParams {
            u0: Fixed::ZERO,
            v0: Fixed::ZERO,
            du: Fixed::ONE,
            dv: Fixed::ZERO,
            filter: SampleFilter::Bilinear,
        };
        let mut dst = [0u8; 8];
        sample_row(&mut dst, &img.view(), &params, fetch_rgba);
        assert_eq!(&dst[0..4], &[10, 20, 30, 255]);
        assert_eq!(&dst[4..8], &[200, 100, 50, 255]);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let img = rgba_2x1([0, 0, 0, 255], [100, 200, 50, 255]);
        let params = DdaParams {
            u0: Fixed::HALF,
            v0: Fixed::ZERO,
            du: Fixed::ONE,
            dv: Fixed::ZERO,
            filter: SampleFilter::Bilinear,
        };
        let mut dst = [0u8; 4];
        sample_row(&mut dst, &img.view(), &params, fetch_rgba);
        assert_eq!(dst, [50, 100, 25, 255]);
    }

    #[test]
    fn test_out_of_bounds_is_transparent() {
        let img = rgba_2x1([255, 255, 255, 255], [255, 255, 255, 255]);
        let params = DdaParams {
            u0: Fixed::from_int(-3),
            v0: Fixed::ZERO,
            du: Fixed::ONE,
            dv: Fixed::ZERO,
            filter: SampleFilter::Nearest,
        };
        let mut dst = [9u8; 12];
        sample_row(&mut dst, &img.view(), &params, fetch_rgba);
        assert_eq!(&dst[0..4], &[0, 0, 0, 0]);
        assert_eq!(&dst[4..8], &[0, 0, 0, 0]);
        assert_eq!(&dst[8..12], &[0, 0, 0, 0]);
    }
}
