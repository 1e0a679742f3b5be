//! Owned pixel storage.
//!
//! [`ImageBuffer`] owns a pixel block allocated through an
//! [`Allocator`](crate::memory::Allocator) and hands out
//! [`ViewPort`](crate::ViewPort)s over it.
//!
//! # Memory Layout
//!
//! Pixels are row-major, top-to-bottom, rows `stride` bytes apart.
//! `stride >= row_bytes(width)` always, and is rounded up to 4 bytes for
//! formats of two or more bytes per pixel.
//!
//! # Sharing
//!
//! The block lives in an `Arc<BufferHandle>`: cloning a buffer is cheap
//! and the last clone to drop returns the bytes to the allocator.
//! Mutation goes through [`data_mut`](ImageBuffer::data_mut), which
//! copies the block through the same allocator when it is shared
//! (copy-on-write).
//!
//! # Usage
//!
//! ```rust
//! use weft_core::{ImageBuffer, PixelFormat};
//! use weft_core::memory::HeapAllocator;
//!
//! let alloc = HeapAllocator::shared();
//! let mut img = ImageBuffer::new(4, 2, PixelFormat::Rgba8, &alloc).unwrap();
//! img.row_mut(0).unwrap()[0..4].copy_from_slice(&[255, 0, 0, 255]);
//! assert_eq!(&img.row(0)[0..4], &[255, 0, 0, 255]);
//! ```

use crate::memory::{AllocatorHandle, BufferHandle};
use crate::{DataRange, Error, Palette, PixelFormat, Result, ViewPort};
use std::fmt;
use std::sync::Arc;

/// Owned pixel buffer with format, stride and optional palette.
#[derive(Clone)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    palette: Option<Arc<Palette>>,
    data: Arc<BufferHandle>,
}

impl ImageBuffer {
    /// Creates a zero-filled buffer.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        alloc: &AllocatorHandle,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "zero extent"));
        }
        let stride = format.stride_for_width(width);
        let handle = BufferHandle::new(alloc, stride * height as usize)?;
        Ok(Self {
            width,
            height,
            stride,
            format,
            palette: None,
            data: Arc::new(handle),
        })
    }

    /// Creates a buffer from tightly packed rows.
    ///
    /// `bytes` must be exactly `row_bytes(width) * height` long; rows are
    /// re-laid to the buffer's stride.
    pub fn from_bytes(
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: &[u8],
        alloc: &AllocatorHandle,
    ) -> Result<Self> {
        let row_bytes = format.row_bytes(width);
        let expected = row_bytes * height as usize;
        if bytes.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} bytes, got {}", expected, bytes.len()),
            ));
        }
        let mut buffer = Self::new(width, height, format, alloc)?;
        {
            let stride = buffer.stride;
            let data = buffer.data_mut()?;
            for (y, src_row) in bytes.chunks_exact(row_bytes).enumerate() {
                data[y * stride..y * stride + row_bytes].copy_from_slice(src_row);
            }
        }
        Ok(buffer)
    }

    /// Attaches a palette (index formats).
    pub fn with_palette(mut self, palette: Arc<Palette>) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Buffer width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
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

    /// Attached palette, if any.
    #[inline]
    pub fn palette(&self) -> Option<&Arc<Palette>> {
        self.palette.as_ref()
    }

    /// Full extent as a range at the origin.
    #[inline]
    pub fn bounds(&self) -> DataRange {
        DataRange::from_size(self.width, self.height)
    }

    /// Raw bytes, stride layout.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Raw bytes for mutation.
    ///
    /// When the block is shared with clones, it is first copied through
    /// its own allocator (copy-on-write); that copy can fail, hence the
    /// `Result`.
    pub fn data_mut(&mut self) -> Result<&mut [u8]> {
        if Arc::get_mut(&mut self.data).is_none() {
            let mut copy = BufferHandle::new(self.data.allocator(), self.data.len())?;
            copy.as_mut_slice().copy_from_slice(self.data.as_slice());
            self.data = Arc::new(copy);
        }
        // get_mut cannot fail now: the Arc was just made unique
        Ok(Arc::get_mut(&mut self.data)
            .expect("freshly cloned buffer is unique")
            .as_mut_slice())
    }

    /// One row, trimmed to its meaningful bytes.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height` (debug assertion).
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        debug_assert!(y < self.height, "row out of bounds");
        let start = y as usize * self.stride;
        &self.data.as_slice()[start..start + self.format.row_bytes(self.width)]
    }

    /// One row for mutation (copy-on-write like [`data_mut`](Self::data_mut)).
    pub fn row_mut(&mut self, y: u32) -> Result<&mut [u8]> {
        if y >= self.height {
            return Err(Error::out_of_bounds(0, y, self.width, self.height));
        }
        let stride = self.stride;
        let row_bytes = self.format.row_bytes(self.width);
        let data = self.data_mut()?;
        let start = y as usize * stride;
        Ok(&mut data[start..start + row_bytes])
    }

    /// Raw bytes of the pixel at (x, y), for byte-aligned formats.
    pub fn pixel_bytes(&self, x: u32, y: u32) -> Result<&[u8]> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        let bpp = self
            .format
            .bytes_per_pixel()
            .ok_or_else(|| Error::unsupported_format(format!("{} is bit-packed", self.format.name())))?;
        let start = y as usize * self.stride + x as usize * bpp;
        Ok(&self.data.as_slice()[start..start + bpp])
    }

    /// A view over the whole buffer.
    pub fn view(&self) -> ViewPort<'_> {
        ViewPort::from_buffer(self)
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format.name())
            .field("palette", &self.palette.as_ref().map(|p| p.len()))
            .finish()
    }
}
