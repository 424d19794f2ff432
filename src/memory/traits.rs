/*!
 * Memory Traits
 * Address-range allocation abstractions
 */

use super::types::*;
use crate::core::types::{GpuAddress, Size};

/// Address-range allocator interface
pub trait RangeAllocator: Send + Sync {
    /// Reserve a range of at least `size` bytes
    fn allocate(&self, size: Size) -> HeapResult<Allocation>;

    /// Reserve a range whose start is a multiple of `alignment`
    fn allocate_with_custom_alignment(&self, size: Size, alignment: u64) -> HeapResult<Allocation>;

    /// Return a range with the size it was granted with
    fn free(&self, address: GpuAddress, size: Size);

    /// Return a previously granted allocation
    fn release(&self, allocation: Allocation) {
        self.free(allocation.address, allocation.size)
    }
}

/// Heap statistics provider
pub trait HeapInfo: Send + Sync {
    /// Free bytes
    fn left_size(&self) -> u64;

    /// Granted bytes
    fn used_size(&self) -> u64;

    /// Used fraction in `[0, 1]`
    fn usage(&self) -> f64;

    fn stats(&self) -> HeapStats;

    fn pressure(&self) -> MemoryPressure {
        self.stats().memory_pressure()
    }
}
