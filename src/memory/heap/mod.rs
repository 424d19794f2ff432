/*!
 * Heap Allocator
 *
 * Dual-zone arena that suballocates address ranges out of one contiguous
 * region. The arena only keeps bookkeeping; it never touches the memory the
 * addresses refer to.
 *
 * ## Layout
 *
 * ```text
 *  base                                                        base + size
 *   |  big allocations -->  |      unused       |  <-- small allocations |
 *   |                  left_bound          right_bound                   |
 * ```
 *
 * - **Big requests** (above the size threshold) bump `left_bound` upward
 * - **Small requests** bump `right_bound` downward
 * - **Freed ranges** go to the free list of their side, or straight back into
 *   the unused middle when they touch a bound
 *
 * ## Fragmentation
 *
 * - **Cascade**: freeing at a bound also reclaims the most recent free chunk
 *   if it now touches that bound (one step, never a sweep)
 * - **Defragment**: full sort-and-merge of both lists, run only when an
 *   allocation would otherwise fail
 *
 * Every public call holds one exclusive lock for its whole duration.
 */

mod allocator;
mod defrag;
mod free_list;

use super::config::HeapConfig;
use super::traits::{HeapInfo, RangeAllocator};
use super::types::{Allocation, FreeChunk, HeapResult, HeapStats, MemoryPressure, SizeClass};
use crate::core::align::checked_align_up;
use crate::core::types::{AddressRange, GpuAddress, Size};
use free_list::FreeList;
use parking_lot::Mutex;
use tracing::info;

/// Mutable arena state, only touched under the lock
#[derive(Debug)]
struct HeapState {
    left_bound: GpuAddress,
    right_bound: GpuAddress,
    available_size: u64,
    big_free: FreeList,
    small_free: FreeList,
}

impl HeapState {
    fn new(base: GpuAddress, size: u64) -> Self {
        Self {
            left_bound: base,
            right_bound: base + size,
            available_size: size,
            big_free: FreeList::new(),
            small_free: FreeList::new(),
        }
    }

    /// Free bytes are exactly the unused middle plus both free lists
    #[inline]
    fn debug_check_available(&self) {
        debug_assert_eq!(
            self.available_size,
            (self.right_bound - self.left_bound)
                + self.big_free.total_size()
                + self.small_free.total_size(),
            "available size out of sync with bounds and free lists"
        );
    }
}

/// Dual-zone arena over `[base, base + size)`
#[derive(Debug)]
pub struct HeapAllocator {
    base: GpuAddress,
    size: u64,
    allocation_alignment: u64,
    size_threshold: u64,
    state: Mutex<HeapState>,
}

impl HeapAllocator {
    /// Arena with default alignment and size threshold
    pub fn new(base: GpuAddress, size: u64) -> Self {
        Self::from_config(base, size, &HeapConfig::default())
    }

    /// Arena with a custom allocation alignment and the default threshold
    pub fn with_alignment(base: GpuAddress, size: u64, alignment: u64) -> Self {
        Self::from_config(base, size, &HeapConfig::default().with_alignment(alignment))
    }

    pub fn with_threshold(base: GpuAddress, size: u64, alignment: u64, threshold: u64) -> Self {
        let config = HeapConfig::default()
            .with_alignment(alignment)
            .with_size_threshold(threshold);
        Self::from_config(base, size, &config)
    }

    pub fn from_config(base: GpuAddress, size: u64, config: &HeapConfig) -> Self {
        info!(
            base = %base,
            size = size,
            alignment = config.allocation_alignment,
            threshold = config.size_threshold,
            "Heap allocator initialized"
        );
        Self {
            base,
            size,
            allocation_alignment: config.allocation_alignment,
            size_threshold: config.size_threshold,
            state: Mutex::new(HeapState::new(base, size)),
        }
    }

    /// Base address given at construction
    pub fn base_address(&self) -> GpuAddress {
        self.base
    }

    /// Total bytes governed by the arena
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn range(&self) -> AddressRange {
        AddressRange::new(self.base, self.size)
    }

    pub fn allocation_alignment(&self) -> u64 {
        self.allocation_alignment
    }

    pub fn size_threshold(&self) -> u64 {
        self.size_threshold
    }

    /// Request size after rounding to the allocation alignment
    ///
    /// Zero-byte requests still reserve one granule so every grant is unique.
    /// `None` when the rounded size does not fit in a `u64`.
    pub fn round_size(&self, size: Size) -> Option<u64> {
        checked_align_up((size as u64).max(1), self.allocation_alignment)
    }

    pub fn size_class(&self, rounded_size: u64) -> SizeClass {
        if rounded_size > self.size_threshold {
            SizeClass::Big
        } else {
            SizeClass::Small
        }
    }

    /// Free bytes, counting both free lists and the unused middle
    pub fn left_size(&self) -> u64 {
        self.state.lock().available_size
    }

    pub fn used_size(&self) -> u64 {
        self.size - self.left_size()
    }

    /// Used fraction in `[0, 1]`; an empty arena reports 0
    pub fn usage(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        self.used_size() as f64 / self.size as f64
    }

    pub fn pressure(&self) -> MemoryPressure {
        MemoryPressure::from_usage(self.usage())
    }

    pub fn stats(&self) -> HeapStats {
        let state = self.state.lock();
        let used = self.size - state.available_size;
        HeapStats {
            base: self.base,
            size: self.size,
            left_bound: state.left_bound,
            right_bound: state.right_bound,
            available: state.available_size,
            used,
            usage: if self.size == 0 {
                0.0
            } else {
                used as f64 / self.size as f64
            },
            big_free_chunks: state.big_free.len(),
            small_free_chunks: state.small_free.len(),
        }
    }

    /// Snapshot of one free list in insertion order
    pub fn free_chunks(&self, class: SizeClass) -> Vec<FreeChunk> {
        let state = self.state.lock();
        match class {
            SizeClass::Big => state.big_free.chunks().to_vec(),
            SizeClass::Small => state.small_free.chunks().to_vec(),
        }
    }
}

impl RangeAllocator for HeapAllocator {
    fn allocate(&self, size: Size) -> HeapResult<Allocation> {
        HeapAllocator::allocate(self, size)
    }

    fn allocate_with_custom_alignment(&self, size: Size, alignment: u64) -> HeapResult<Allocation> {
        HeapAllocator::allocate_with_custom_alignment(self, size, alignment)
    }

    fn free(&self, address: GpuAddress, size: Size) {
        HeapAllocator::free(self, address, size)
    }
}

impl HeapInfo for HeapAllocator {
    fn left_size(&self) -> u64 {
        HeapAllocator::left_size(self)
    }

    fn used_size(&self) -> u64 {
        HeapAllocator::used_size(self)
    }

    fn usage(&self) -> f64 {
        HeapAllocator::usage(self)
    }

    fn stats(&self) -> HeapStats {
        HeapAllocator::stats(self)
    }
}
