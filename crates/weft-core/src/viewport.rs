//! Non-owning views over pixel storage.
//!
//! A [`ViewPort`] is the read seam between nodes and pixel memory: a
//! pointer-width-height-stride tuple plus format and optional palette. It
//! may alias an [`ImageBuffer`](crate::ImageBuffer), a pooled strip, or
//! external memory. Rows are iterated left to right only.

use crate::{DataRange, Error, ImageBuffer, Palette, PixelFormat, Result};

/// Immutable view over a rectangle of pixels.
#[derive(Debug, Clone, Copy)]
pub struct ViewPort<'a> {
    bytes: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    palette: Option<&'a Palette>,
}

impl<'a> ViewPort<'a> {
    /// Creates a view from raw parts.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidStride`] when `stride` cannot hold a row;
    /// [`Error::InvalidDimensions`] when `bytes` is too short.
    pub fn new(
        bytes: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        palette: Option<&'a Palette>,
    ) -> Result<Self> {
        let min_stride = format.row_bytes(width);
        if stride < min_stride {
            return Err(Error::InvalidStride {
                stride,
                min_stride,
                width,
            });
        }
        let needed = if height == 0 {
            0
        } else {
            (height as usize - 1) * stride + min_stride
        };
        if bytes.len() < needed {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("view needs {} bytes, got {}", needed, bytes.len()),
            ));
        }
        Ok(Self {
            bytes,
            width,
            height,
            stride,
            format,
            palette,
        })
    }

    /// View over a whole buffer.
    pub(crate) fn from_buffer(buffer: &'a ImageBuffer) -> Self {
        Self {
            bytes: buffer.data(),
            width: buffer.width(),
            height: buffer.height(),
            stride: buffer.stride(),
            format: buffer.format(),
            palette: buffer.palette().map(|p| p.as_ref()),
        }
    }

    /// View width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// View height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel format.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Palette for index formats.
    #[inline]
    pub fn palette(&self) -> Option<&'a Palette> {
        self.palette
    }

    /// Full extent as a range at the origin.
    #[inline]
    pub fn bounds(&self) -> DataRange {
        DataRange::from_size(self.width, self.height)
    }

    /// One row, trimmed to its meaningful bytes.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u8] {
        debug_assert!(y < self.height, "row out of bounds");
        let start = y as usize * self.stride;
        &self.bytes[start..start + self.format.row_bytes(self.width)]
    }

    /// Sub-rectangle view.
    ///
    /// For bit-packed formats the left edge must land on a byte boundary.
    pub fn sub_rect(&self, range: DataRange) -> Result<ViewPort<'a>> {
        let clipped = self.bounds().intersect(&range);
        if clipped != range {
            return Err(Error::invalid_dimensions(
                range.w.max(0) as u32,
                range.h.max(0) as u32,
                "sub-rect exceeds view bounds",
            ));
        }
        let bit_offset = range.x as usize * self.format.bits_per_pixel() as usize;
        if bit_offset % 8 != 0 {
            return Err(Error::invalid_dimensions(
                range.w as u32,
                range.h as u32,
                "packed sub-rect must start on a byte boundary",
            ));
        }
        let start = range.y as usize * self.stride + bit_offset / 8;
        Ok(ViewPort {
            bytes: &self.bytes[start..],
            width: range.w as u32,
            height: range.h as u32,
            stride: self.stride,
            format: self.format,
            palette: self.palette,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::HeapAllocator;

    fn gray_4x2() -> ImageBuffer {
        let bytes = [0u8, 1, 2, 3, 10, 11, 12, 13];
        ImageBuffer::from_bytes(4, 2, PixelFormat::Gray8, &bytes, &HeapAllocator::shared())
            .unwrap()
    }

    #[test]
    fn test_row_access() {
        let img = gray_4x2();
        let view = img.view();
        assert_eq!(view.row(0), &[0, 1, 2, 3]);
        assert_eq!(view.row(1), &[10, 11, 12, 13]);
    }

    #[test]
    fn test_sub_rect() {
        let img = gray_4x2();
        let view = img.view();
        let sub = view.sub_rect(DataRange::new(1, 1, 2, 1)).unwrap();
        assert_eq!(sub.width(), 2);
        assert_eq!(sub.row(0), &[11, 12]);
    }

    #[test]
    fn test_sub_rect_out_of_bounds() {
        let img = gray_4x2();
        assert!(img.view().sub_rect(DataRange::new(2, 0, 4, 1)).is_err());
    }

    #[test]
    fn test_stride_validation() {
        let bytes = [0u8; 8];
        assert!(ViewPort::new(&bytes, 4, 2, 2, PixelFormat::Gray8, None).is_err());
        assert!(ViewPort::new(&bytes, 4, 2, 4, PixelFormat::Gray8, None).is_ok());
    }
}
