//! Fixed-block pool allocator.

use super::{Allocator, AllocStats, AllocatorHandle};
use crate::Result;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Placement hint for a pool's backing memory.
///
/// Purely advisory on hosted targets; embedded ports use it to choose
/// between on-chip SRAM and external PSRAM when reserving the backing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryRegion {
    /// Fast on-chip memory.
    #[default]
    Internal,
    /// Larger, slower external memory.
    External,
}

/// Pool of `block_count` recycled blocks of `block_size` bytes each.
///
/// Requests at most `block_size` bytes long are served from the free
/// list. An empty free list or an oversized request fails over to the
/// fallback allocator and is counted as a miss. On reclaim, a block with
/// pool capacity is adopted while the free list is below `block_count`;
/// everything else routes back to the fallback.
///
/// # Example
///
/// ```rust
/// use weft_core::memory::{Allocator, HeapAllocator, PoolAllocator};
///
/// let pool = PoolAllocator::new(1024, 4, HeapAllocator::shared());
/// let strip = pool.allocate(640).unwrap();
/// pool.reclaim(strip);
/// assert_eq!(pool.stats().pool_hits, 1);
/// assert_eq!(pool.stats().pool_misses, 0);
/// ```
#[derive(Debug)]
pub struct PoolAllocator {
    block_size: usize,
    block_count: usize,
    region: MemoryRegion,
    free: Mutex<Vec<Vec<u8>>>,
    fallback: AllocatorHandle,
    hits: AtomicU64,
    misses: AtomicU64,
    reclaims: AtomicU64,
    blocks_out: AtomicUsize,
    peak_blocks: AtomicUsize,
}

impl PoolAllocator {
    /// Creates a pool, reserving its backing blocks immediately.
    pub fn new(block_size: usize, block_count: usize, fallback: AllocatorHandle) -> Self {
        Self::with_region(block_size, block_count, MemoryRegion::Internal, fallback)
    }

    /// Creates a pool with a placement hint for the backing memory.
    pub fn with_region(
        block_size: usize,
        block_count: usize,
        region: MemoryRegion,
        fallback: AllocatorHandle,
    ) -> Self {
        let free = (0..block_count).map(|_| vec![0u8; block_size]).collect();
        Self {
            block_size,
            block_count,
            region,
            free: Mutex::new(free),
            fallback,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            reclaims: AtomicU64::new(0),
            blocks_out: AtomicUsize::new(0),
            peak_blocks: AtomicUsize::new(0),
        }
    }

    /// Block size in bytes.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Where the backing memory was asked to live.
    #[inline]
    pub fn region(&self) -> MemoryRegion {
        self.region
    }
}

impl Allocator for PoolAllocator {
    fn allocate(&self, len: usize) -> Result<Vec<u8>> {
        if len <= self.block_size {
            if let Some(mut block) = self.free.lock().expect("pool poisoned").pop() {
                block.clear();
                block.resize(len, 0);
                self.hits.fetch_add(1, Ordering::Relaxed);
                let out = self.blocks_out.fetch_add(1, Ordering::Relaxed) + 1;
                self.peak_blocks.fetch_max(out, Ordering::Relaxed);
                return Ok(block);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.fallback.allocate(len)
    }

    fn reclaim(&self, block: Vec<u8>) {
        self.reclaims.fetch_add(1, Ordering::Relaxed);
        if block.capacity() == self.block_size {
            let mut free = self.free.lock().expect("pool poisoned");
            if free.len() < self.block_count {
                free.push(block);
                drop(free);
                let _ = self.blocks_out.fetch_update(
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                    |v| Some(v.saturating_sub(1)),
                );
                return;
            }
        }
        self.fallback.reclaim(block);
    }

    fn stats(&self) -> AllocStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let out = self.blocks_out.load(Ordering::Relaxed);
        AllocStats {
            allocations: hits + misses,
            reclaims: self.reclaims.load(Ordering::Relaxed),
            pool_hits: hits,
            pool_misses: misses,
            bytes_in_use: out * self.block_size,
            peak_bytes: self.peak_blocks.load(Ordering::Relaxed) * self.block_size,
        }
    }

    fn name(&self) -> &'static str {
        "pool"
    }
}

impl Drop for PoolAllocator {
    fn drop(&mut self) {
        let free = self.free.get_mut().map(|v| v.len()).unwrap_or(0);
        if free < self.block_count {
            tracing::debug!(
                outstanding = self.block_count - free,
                "pool dropped with blocks outstanding"
            );
        }
    }
}
