//! Default heap allocator with trap mode.

use super::{Allocator, AllocStats, AllocatorHandle};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Thin wrapper over the process heap.
///
/// The trap, once armed, makes every subsequent allocation fail with
/// [`Error::TrapArmed`]. Embedded callers arm it after building their
/// pools to prove that steady-state rendering performs no heap
/// allocation.
///
/// # Example
///
/// ```rust
/// use weft_core::memory::{Allocator, HeapAllocator};
///
/// let heap = HeapAllocator::new();
/// let block = heap.allocate(64).unwrap();
/// heap.arm_trap();
/// assert!(heap.allocate(64).is_err());
/// heap.reclaim(block);
/// ```
#[derive(Debug, Default)]
pub struct HeapAllocator {
    trap: AtomicBool,
    allocations: AtomicU64,
    reclaims: AtomicU64,
    bytes_in_use: AtomicUsize,
    peak_bytes: AtomicUsize,
}

impl HeapAllocator {
    /// Creates a heap allocator with the trap disarmed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default allocator.
    pub fn shared() -> AllocatorHandle {
        static SHARED: OnceLock<Arc<HeapAllocator>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(HeapAllocator::new())).clone()
    }

    /// Makes every later [`allocate`](Allocator::allocate) fail.
    pub fn arm_trap(&self) {
        self.trap.store(true, Ordering::Release);
    }

    /// Re-enables allocation.
    pub fn disarm_trap(&self) {
        self.trap.store(false, Ordering::Release);
    }

    /// `true` when the trap is armed.
    pub fn trap_armed(&self) -> bool {
        self.trap.load(Ordering::Acquire)
    }
}

impl Allocator for HeapAllocator {
    fn allocate(&self, len: usize) -> Result<Vec<u8>> {
        if self.trap_armed() {
            return Err(Error::TrapArmed { requested: len });
        }
        self.allocations.fetch_add(1, Ordering::Relaxed);
        let in_use = self.bytes_in_use.fetch_add(len, Ordering::Relaxed) + len;
        self.peak_bytes.fetch_max(in_use, Ordering::Relaxed);
        Ok(vec![0u8; len])
    }

    fn reclaim(&self, block: Vec<u8>) {
        self.reclaims.fetch_add(1, Ordering::Relaxed);
        self.bytes_in_use.fetch_sub(block.len(), Ordering::Relaxed);
    }

    fn stats(&self) -> AllocStats {
        AllocStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            reclaims: self.reclaims.load(Ordering::Relaxed),
            pool_hits: 0,
            pool_misses: 0,
            bytes_in_use: self.bytes_in_use.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
        }
    }

    fn name(&self) -> &'static str {
        "heap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_counts_bytes() {
        let heap = HeapAllocator::new();
        let a = heap.allocate(100).unwrap();
        let b = heap.allocate(50).unwrap();
        assert_eq!(heap.stats().bytes_in_use, 150);
        assert_eq!(heap.stats().peak_bytes, 150);
        heap.reclaim(a);
        assert_eq!(heap.stats().bytes_in_use, 50);
        assert_eq!(heap.stats().peak_bytes, 150);
        heap.reclaim(b);
        assert_eq!(heap.stats().allocations, 2);
        assert_eq!(heap.stats().reclaims, 2);
    }

    #[test]
    fn test_trap_blocks_allocation() {
        let heap = HeapAllocator::new();
        heap.arm_trap();
        let err = heap.allocate(8).unwrap_err();
        assert!(err.is_allocation_error());
        heap.disarm_trap();
        assert!(heap.allocate(8).is_ok());
    }

    #[test]
    fn test_allocation_is_zeroed() {
        let heap = HeapAllocator::new();
        let block = heap.allocate(32).unwrap();
        assert!(block.iter().all(|&b| b == 0));
    }
}
