/*!
 * Heap Allocator Implementation
 * Allocation and deallocation logic
 */

use super::super::types::{Allocation, HeapError, HeapResult, SizeClass};
use super::{HeapAllocator, HeapState};
use crate::core::align::{align_down, checked_align_up};
use crate::core::types::{GpuAddress, Size};
use tracing::{debug, warn};

impl HeapAllocator {
    /// Reserve `size` bytes aligned to the allocation alignment
    pub fn allocate(&self, size: Size) -> HeapResult<Allocation> {
        self.allocate_with_custom_alignment(size, 0)
    }

    /// Reserve `size` bytes starting at a multiple of `alignment`
    ///
    /// An alignment of 0, or one below the allocation alignment, falls back to
    /// the allocation alignment. The granted size is rounded to the allocation
    /// alignment only, never to `alignment`.
    pub fn allocate_with_custom_alignment(
        &self,
        size: Size,
        alignment: u64,
    ) -> HeapResult<Allocation> {
        let alignment = alignment.max(self.allocation_alignment);
        let rounded = match self.round_size(size) {
            Some(rounded) if rounded <= self.size => rounded,
            _ => {
                let available = self.left_size();
                warn!(
                    requested = size,
                    size = self.size,
                    available = available,
                    "Request larger than heap"
                );
                return Err(HeapError::OutOfSpace {
                    requested: size,
                    available,
                });
            }
        };
        let class = self.size_class(rounded);

        let mut state = self.state.lock();
        match state.reserve(rounded, alignment, class) {
            Some((address, granted)) => {
                debug!(
                    address = %address,
                    requested = size,
                    granted = granted,
                    class = %class,
                    "Allocated range"
                );
                Ok(Allocation {
                    address,
                    size: granted as Size,
                })
            }
            None => {
                let available = state.available_size;
                warn!(
                    requested = size,
                    rounded = rounded,
                    alignment = alignment,
                    available = available,
                    "Heap exhausted"
                );
                Err(HeapError::OutOfSpace {
                    requested: size,
                    available,
                })
            }
        }
    }

    /// Sentinel-style allocation
    ///
    /// Rewrites `size` to the granted size and returns the address, or
    /// `GpuAddress::NULL` when the heap is exhausted (with `size` rounded, or
    /// unchanged when it is too large to round).
    pub fn try_allocate(&self, size: &mut Size) -> GpuAddress {
        match self.allocate(*size) {
            Ok(allocation) => {
                *size = allocation.size;
                allocation.address
            }
            Err(_) => {
                if let Some(rounded) = self.round_size(*size) {
                    *size = rounded as Size;
                }
                GpuAddress::NULL
            }
        }
    }

    /// Return a range granted by `allocate`
    ///
    /// `size` must be the size the range was granted with. Freeing
    /// `GpuAddress::NULL` is a no-op.
    pub fn free(&self, address: GpuAddress, size: Size) {
        if address.is_null() {
            return;
        }
        let Some(size) = self.round_size(size) else {
            warn!(address = %address, size = size, "Ignoring free with unroundable size");
            return;
        };
        debug_assert!(
            self.range().contains(address),
            "freeing {} outside of heap {}",
            address,
            self.range()
        );

        let mut state = self.state.lock();
        state.release(address, size);
        debug!(address = %address, size = size, "Freed range");
    }

    /// Run the full coalescing sweep now
    pub fn defragment(&self) {
        self.state.lock().defragment();
    }
}

impl HeapState {
    /// Free list first, then bump, then one defragment-and-retry
    ///
    /// Returns the address and the bytes taken from the available pool.
    fn reserve(&mut self, size: u64, alignment: u64, class: SizeClass) -> Option<(GpuAddress, u64)> {
        let mut defragmented = false;
        loop {
            if self.available_size < size {
                return None;
            }

            let reused = match class {
                SizeClass::Big => self.big_free.take_fit(size, alignment),
                SizeClass::Small => self.small_free.take_fit(size, alignment),
            };
            if let Some((address, consumed)) = reused {
                self.available_size -= consumed;
                self.debug_check_available();
                return Some((address, consumed));
            }

            let bumped = match class {
                SizeClass::Big => self.bump_left(size, alignment),
                SizeClass::Small => self.bump_right(size, alignment),
            };
            if let Some(address) = bumped {
                self.available_size -= size;
                self.debug_check_available();
                return Some((address, size));
            }

            if defragmented {
                return None;
            }
            self.defragment();
            defragmented = true;
        }
    }

    /// Grant from the low end; a misalignment gap goes to the big free list
    fn bump_left(&mut self, size: u64, alignment: u64) -> Option<GpuAddress> {
        let aligned = checked_align_up(self.left_bound.raw(), alignment)?;
        let end = aligned.checked_add(size)?;
        if end > self.right_bound.raw() {
            return None;
        }

        let misalignment = aligned - self.left_bound.raw();
        if misalignment > 0 {
            self.big_free.store(self.left_bound, misalignment);
            self.left_bound = GpuAddress::new(aligned);
        }

        let address = self.left_bound;
        self.left_bound = address + size;
        Some(address)
    }

    /// Grant from the high end; a misalignment gap goes to the small free list
    fn bump_right(&mut self, size: u64, alignment: u64) -> Option<GpuAddress> {
        let start = self.right_bound.raw().checked_sub(size)?;
        let aligned = align_down(start, alignment);
        if aligned < self.left_bound.raw() {
            return None;
        }

        let misalignment = start - aligned;
        if misalignment > 0 {
            self.right_bound = self.right_bound - misalignment;
            self.small_free.store(self.right_bound, misalignment);
        }

        self.right_bound = self.right_bound - size;
        Some(self.right_bound)
    }

    fn release(&mut self, address: GpuAddress, size: u64) {
        if address == self.right_bound {
            self.right_bound = address + size;
            self.reclaim_small_boundary();
        } else if self.left_bound.raw() >= size && address == self.left_bound - size {
            self.left_bound = address;
            self.reclaim_big_boundary();
        } else if address < self.left_bound {
            self.big_free.store(address, size);
        } else {
            self.small_free.store(address, size);
        }
        self.available_size += size;
        self.debug_check_available();
    }

    /// Fold the last small chunk into the middle if it starts at `right_bound`
    pub(super) fn reclaim_small_boundary(&mut self) -> bool {
        match self.small_free.pop_last_starting_at(self.right_bound) {
            Some(chunk) => {
                self.right_bound = chunk.end();
                debug!(chunk = %chunk.address, size = chunk.size, "Reclaimed small chunk at boundary");
                true
            }
            None => false,
        }
    }

    /// Fold the last big chunk into the middle if it ends at `left_bound`
    pub(super) fn reclaim_big_boundary(&mut self) -> bool {
        match self.big_free.pop_last_ending_at(self.left_bound) {
            Some(chunk) => {
                self.left_bound = chunk.address;
                debug!(chunk = %chunk.address, size = chunk.size, "Reclaimed big chunk at boundary");
                true
            }
            None => false,
        }
    }
}
