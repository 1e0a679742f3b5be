//! RAII buffer handle.

use super::{Allocator, AllocatorHandle};
use crate::Result;
use std::fmt;

/// An allocator-backed byte block that reclaims itself on drop.
///
/// The handle pairs the block with the allocator it came from, so it can
/// be moved freely (across buffers, into pools) and still return to the
/// right place on every exit path.
pub struct BufferHandle {
    bytes: Option<Vec<u8>>,
    alloc: AllocatorHandle,
}

impl BufferHandle {
    /// Allocates a zeroed block of `len` bytes.
    pub fn new(alloc: &AllocatorHandle, len: usize) -> Result<Self> {
        let bytes = alloc.allocate(len)?;
        Ok(Self {
            bytes: Some(bytes),
            alloc: alloc.clone(),
        })
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.as_ref().map_or(0, Vec::len)
    }

    /// `true` for a zero-length block.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The block's bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or(&[])
    }

    /// The block's bytes, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.bytes.as_deref_mut().unwrap_or(&mut [])
    }

    /// The allocator this handle reclaims to.
    #[inline]
    pub fn allocator(&self) -> &AllocatorHandle {
        &self.alloc
    }

    /// Zeroes the block.
    pub fn clear(&mut self) {
        if let Some(bytes) = self.bytes.as_deref_mut() {
            bytes.fill(0);
        }
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        if let Some(bytes) = self.bytes.take() {
            self.alloc.reclaim(bytes);
        }
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferHandle")
            .field("len", &self.len())
            .field("allocator", &self.alloc.name())
            .finish()
    }
}
