//! Per-frame pool of reusable scanline strips.
//!
//! The renderer pulls one horizontal strip per row, so without reuse a
//! frame would allocate `height` short-lived buffers per node. The
//! [`StripPool`] caches strip storage keyed by `(format, width, height)`
//! and hands out RAII [`Strip`] guards: dropping a strip returns its
//! bytes to the pool on every exit path, including early empty returns.
//!
//! The pool lives inside a
//! [`RenderContext`](crate::render::RenderContext) and dies with it, so
//! cached storage never outlives the frame. At most one holder per entry
//! exists at a time; Rust ownership of the guard is the busy bit.

use crate::memory::{AllocatorHandle, BufferHandle};
use crate::{PixelFormat, Result, ViewPort};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Cache key for a pooled strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StripKey {
    /// Pixel format of the strip.
    pub format: PixelFormat,
    /// Strip width in pixels.
    pub width: u32,
    /// Strip height in pixels (usually 1).
    pub height: u32,
}

impl StripKey {
    /// Key for a single row of `width` pixels.
    #[inline]
    pub const fn row(format: PixelFormat, width: u32) -> Self {
        Self {
            format,
            width,
            height: 1,
        }
    }
}

#[derive(Debug)]
struct PoolInner {
    alloc: AllocatorHandle,
    entries: HashMap<StripKey, Vec<BufferHandle>>,
    acquires: u64,
    reuses: u64,
}

/// Per-frame strip cache.
///
/// Single-threaded by design: a pipeline execution never crosses
/// threads, so the pool uses `Rc`/`RefCell` instead of locks.
#[derive(Debug, Clone)]
pub struct StripPool {
    inner: Rc<RefCell<PoolInner>>,
}

impl StripPool {
    /// Creates an empty pool drawing from `alloc`.
    pub fn new(alloc: AllocatorHandle) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PoolInner {
                alloc,
                entries: HashMap::new(),
                acquires: 0,
                reuses: 0,
            })),
        }
    }

    /// Acquires a cleared strip for `key`, reusing cached storage when
    /// available.
    pub fn acquire(&self, key: StripKey) -> Result<Strip> {
        let stride = key.format.stride_for_width(key.width);
        let mut inner = self.inner.borrow_mut();
        inner.acquires += 1;
        let cached = inner.entries.get_mut(&key).and_then(Vec::pop);
        let mut data = match cached {
            Some(handle) => {
                inner.reuses += 1;
                handle
            }
            None => {
                let len = stride * key.height as usize;
                BufferHandle::new(&inner.alloc.clone(), len)?
            }
        };
        drop(inner);
        data.clear();
        Ok(Strip {
            data: Some(data),
            key,
            stride,
            home: Rc::downgrade(&self.inner),
        })
    }

    /// `(total acquires, served from cache)` so far.
    pub fn stats(&self) -> (u64, u64) {
        let inner = self.inner.borrow();
        (inner.acquires, inner.reuses)
    }
}

/// A pooled strip of pixels; returns to its pool on drop.
#[derive(Debug)]
pub struct Strip {
    data: Option<BufferHandle>,
    key: StripKey,
    stride: usize,
    home: Weak<RefCell<PoolInner>>,
}

impl Strip {
    /// The key this strip was acquired under.
    #[inline]
    pub fn key(&self) -> StripKey {
        self.key
    }

    /// Pixel format.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.key.format
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.key.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.key.height
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Strip bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.data.as_ref().map_or(&[], BufferHandle::as_slice)
    }

    /// Strip bytes, mutably.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match self.data.as_mut() {
            Some(handle) => handle.as_mut_slice(),
            None => &mut [],
        }
    }

    /// One row of the strip.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        debug_assert!(y < self.key.height, "strip row out of bounds");
        let start = y as usize * self.stride;
        &self.bytes()[start..start + self.key.format.row_bytes(self.key.width)]
    }

    /// One row of the strip, mutably.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        debug_assert!(y < self.key.height, "strip row out of bounds");
        let start = y as usize * self.stride;
        let row_bytes = self.key.format.row_bytes(self.key.width);
        &mut self.bytes_mut()[start..start + row_bytes]
    }

    /// A view over the strip (no palette; strips hold direct color).
    pub fn view(&self) -> ViewPort<'_> {
        ViewPort::new(
            self.bytes(),
            self.key.width,
            self.key.height,
            self.stride,
            self.key.format,
            None,
        )
        .expect("pooled strip geometry is self-consistent")
    }
}

impl Drop for Strip {
    fn drop(&mut self) {
        let Some(handle) = self.data.take() else {
            return;
        };
        match self.home.upgrade() {
            Some(inner) => {
                inner
                    .borrow_mut()
                    .entries
                    .entry(self.key)
                    .or_default()
                    .push(handle);
            }
            // Pool already gone: the handle reclaims to its allocator.
            None => drop(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Allocator, HeapAllocator};

    #[test]
    fn test_acquire_and_reuse() {
        let pool = StripPool::new(HeapAllocator::shared());
        let key = StripKey::row(PixelFormat::Rgba8, 16);
        {
            let mut strip = pool.acquire(key).unwrap();
            strip.bytes_mut()[0] = 0xAA;
        }
        let strip = pool.acquire(key).unwrap();
        // reused storage comes back cleared
        assert_eq!(strip.bytes()[0], 0);
        assert_eq!(pool.stats(), (2, 1));
    }

    #[test]
    fn test_distinct_keys_do_not_share() {
        let pool = StripPool::new(HeapAllocator::shared());
        let a = pool.acquire(StripKey::row(PixelFormat::Rgba8, 8)).unwrap();
        let b = pool.acquire(StripKey::row(PixelFormat::Rgba8, 9)).unwrap();
        assert_ne!(a.bytes().len(), b.bytes().len());
        drop((a, b));
        assert_eq!(pool.stats(), (2, 0));
    }

    #[test]
    fn test_strip_outliving_pool_reclaims() {
        let heap = std::sync::Arc::new(HeapAllocator::new());
        let alloc: AllocatorHandle = heap.clone();
        let strip = {
            let pool = StripPool::new(alloc);
            pool.acquire(StripKey::row(PixelFormat::Gray8, 32)).unwrap()
        };
        assert!(heap.stats().bytes_in_use > 0);
        drop(strip);
        assert_eq!(heap.stats().bytes_in_use, 0);
    }
}
