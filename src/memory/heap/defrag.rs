/*!
 * Heap Defragmentation
 * Full coalescing sweep over both free lists
 */

use super::HeapState;
use tracing::info;

impl HeapState {
    /// Merge every pair of contiguous free chunks, then retry both boundaries
    ///
    /// Small chunks are ordered high-to-low and big chunks low-to-high, so in
    /// both lists the chunk nearest its bound ends up last, where the
    /// boundary reclaim looks for it.
    pub(super) fn defragment(&mut self) {
        let small_before = self.small_free.len();
        let big_before = self.big_free.len();

        let mut merged = 0;
        if self.small_free.len() > 1 {
            self.small_free.sort_by_address(true);
            merged += self.small_free.merge_sorted();
        }
        let small_reclaimed = self.reclaim_small_boundary();

        if self.big_free.len() > 1 {
            self.big_free.sort_by_address(false);
            merged += self.big_free.merge_sorted();
        }
        let big_reclaimed = self.reclaim_big_boundary();

        if merged > 0 || small_reclaimed || big_reclaimed {
            info!(
                merged = merged,
                small_chunks = format_args!("{} -> {}", small_before, self.small_free.len()),
                big_chunks = format_args!("{} -> {}", big_before, self.big_free.len()),
                "Defragmented heap"
            );
        }
    }
}
