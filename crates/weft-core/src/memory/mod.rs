//! Memory layer: allocator seam, heap and pool implementations, RAII
//! buffer handle.
//!
//! # Overview
//!
//! The pipeline never calls the global allocator directly. Every byte of
//! pixel storage flows through an [`Allocator`]:
//!
//! - [`HeapAllocator`] - plain heap, with a *trap* mode that refuses every
//!   allocation once armed
//! - [`PoolAllocator`] - a fixed set of recycled blocks with heap failover
//! - [`BufferHandle`] - RAII guard returning its block on drop
//!
//! On an embedded target the intended shape is: build a pool sized for
//! the frame's strips at startup, arm the heap trap, then render. A frame
//! that completes with zero pool misses is proven to fit.
//!
//! Blocks are `Vec<u8>` rather than raw pointers: recycling vectors keeps
//! the layer entirely safe while preserving the original pool semantics
//! (fixed block size, failover, miss accounting).

mod handle;
mod heap;
mod pool;

pub use handle::BufferHandle;
pub use heap::HeapAllocator;
pub use pool::{MemoryRegion, PoolAllocator};

use crate::Result;
use std::sync::Arc;

/// Shared handle to an allocator.
pub type AllocatorHandle = Arc<dyn Allocator>;

/// The allocation seam all pixel storage goes through.
pub trait Allocator: Send + Sync + std::fmt::Debug {
    /// Allocates a zeroed block of `len` bytes.
    fn allocate(&self, len: usize) -> Result<Vec<u8>>;

    /// Returns a block for reuse or release.
    fn reclaim(&self, block: Vec<u8>);

    /// Current counters.
    fn stats(&self) -> AllocStats;

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "allocator"
    }
}

/// Counters exposed by every allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Blocks handed out.
    pub allocations: u64,
    /// Blocks returned.
    pub reclaims: u64,
    /// Requests served from a pool's free list.
    pub pool_hits: u64,
    /// Requests a pool had to route to its fallback.
    pub pool_misses: u64,
    /// Bytes currently outstanding.
    pub bytes_in_use: usize,
    /// High-water mark of outstanding bytes.
    pub peak_bytes: usize,
}
