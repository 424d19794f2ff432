/*!
 * Free List
 * Unordered list of freed chunks with best-fit lookup
 */

use super::super::types::FreeChunk;
use crate::core::align::{align_down, is_aligned};
use crate::core::limits::SPLIT_FACTOR;
use crate::core::types::GpuAddress;

/// Freed chunks of one size class
///
/// Insertion order matters: lookups prefer the first of equally good
/// candidates, and the boundary cascade only ever looks at the last entry.
#[derive(Debug, Default, Clone)]
pub(super) struct FreeList {
    chunks: Vec<FreeChunk>,
}

impl FreeList {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[FreeChunk] {
        &self.chunks
    }

    pub fn total_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.size).sum()
    }

    /// Find space for `size` bytes starting at an `alignment` boundary
    ///
    /// Returns the address and the number of bytes consumed from the list.
    /// - An exact size match wins immediately.
    /// - Otherwise the smallest larger chunk is used: split from its top when it
    ///   is at least twice the request, taken whole when it is not.
    /// - Chunks whose start is not aligned are skipped.
    pub fn take_fit(&mut self, size: u64, alignment: u64) -> Option<(GpuAddress, u64)> {
        let mut best: Option<usize> = None;

        for i in 0..self.chunks.len() {
            let chunk = self.chunks[i];
            if !is_aligned(chunk.address.raw(), alignment) {
                continue;
            }
            if chunk.size == size {
                self.chunks.remove(i);
                return Some((chunk.address, chunk.size));
            }
            if chunk.size > size && best.map_or(true, |b| chunk.size < self.chunks[b].size) {
                best = Some(i);
            }
        }

        let index = best?;
        let chunk = self.chunks[index];

        if chunk.size / SPLIT_FACTOR >= size {
            let end = chunk.end();
            let address = GpuAddress::new(align_down((end - size).raw(), alignment));
            let consumed = end - address;
            if consumed >= chunk.size {
                self.chunks.remove(index);
                return Some((chunk.address, chunk.size));
            }
            self.chunks[index].size -= consumed;
            Some((address, consumed))
        } else {
            self.chunks.remove(index);
            Some((chunk.address, chunk.size))
        }
    }

    /// Add a chunk, extending the first neighbour it touches
    pub fn store(&mut self, address: GpuAddress, size: u64) {
        for chunk in &mut self.chunks {
            if chunk.address == address + size {
                chunk.address = address;
                chunk.size += size;
                return;
            }
            if chunk.end() == address {
                chunk.size += size;
                return;
            }
        }
        self.chunks.push(FreeChunk::new(address, size));
    }

    /// Remove the most recent entry if it starts at `bound`
    pub fn pop_last_starting_at(&mut self, bound: GpuAddress) -> Option<FreeChunk> {
        match self.chunks.last() {
            Some(last) if last.address == bound => self.chunks.pop(),
            _ => None,
        }
    }

    /// Remove the most recent entry if it ends at `bound`
    pub fn pop_last_ending_at(&mut self, bound: GpuAddress) -> Option<FreeChunk> {
        match self.chunks.last() {
            Some(last) if last.end() == bound => self.chunks.pop(),
            _ => None,
        }
    }

    /// Sort by address, ascending or descending
    pub fn sort_by_address(&mut self, descending: bool) {
        if descending {
            self.chunks.sort_by(|a, b| b.address.cmp(&a.address));
        } else {
            self.chunks.sort_by_key(|c| c.address);
        }
    }

    /// Merge contiguous neighbours of an address-sorted list
    ///
    /// Walks from the tail so a run of contiguous chunks collapses into its
    /// head entry. Returns the number of merges performed.
    pub fn merge_sorted(&mut self) -> usize {
        let mut merged = 0;
        let mut i = self.chunks.len();
        while i > 1 {
            i -= 1;
            let current = self.chunks[i];
            let previous = self.chunks[i - 1];
            if previous.end() == current.address {
                self.chunks[i - 1].size += current.size;
                self.chunks.remove(i);
                merged += 1;
            } else if current.end() == previous.address {
                self.chunks[i - 1].address = current.address;
                self.chunks[i - 1].size += current.size;
                self.chunks.remove(i);
                merged += 1;
            }
        }
        merged
    }
}

impl From<Vec<FreeChunk>> for FreeList {
    fn from(chunks: Vec<FreeChunk>) -> Self {
        Self { chunks }
    }
}
