/*!
 * Address Recycling Test
 * Verifies that freed ranges are reused, coalesced and folded back into the
 * unused middle of the heap
 */

use gfx_heap::core::limits::{MEGABYTE, PAGE_SIZE};
use gfx_heap::memory::FreeChunk;
use gfx_heap::{GpuAddress, HeapAllocator, SizeClass};
use pretty_assertions::assert_eq;

const BASE: u64 = 0x2_0000_0000;
const HEAP_SIZE: u64 = 64 * MEGABYTE;
const PAGE: usize = PAGE_SIZE as usize;

fn heap() -> HeapAllocator {
    HeapAllocator::new(GpuAddress::new(BASE), HEAP_SIZE)
}

fn top() -> GpuAddress {
    GpuAddress::new(BASE + HEAP_SIZE)
}

#[test]
fn test_exact_fit_is_reused() {
    let heap = heap();

    let _a1 = heap.allocate(PAGE).unwrap();
    let a2 = heap.allocate(PAGE).unwrap();
    let _a3 = heap.allocate(PAGE).unwrap();

    heap.free(a2.address, a2.size);
    assert_eq!(
        heap.free_chunks(SizeClass::Small),
        vec![FreeChunk::new(a2.address, PAGE_SIZE)]
    );

    let reused = heap.allocate(PAGE).unwrap();
    assert_eq!(reused.address, a2.address);
    assert!(heap.free_chunks(SizeClass::Small).is_empty());
}

#[test]
fn test_large_chunk_is_split_from_top() {
    let heap = heap();

    let a1 = heap.allocate(4 * PAGE).unwrap();
    let _a2 = heap.allocate(PAGE).unwrap();
    heap.free(a1.address, a1.size);

    let reused = heap.allocate(PAGE).unwrap();

    assert_eq!(reused.address, top() - PAGE_SIZE);
    assert_eq!(reused.size, PAGE);
    assert_eq!(
        heap.free_chunks(SizeClass::Small),
        vec![FreeChunk::new(top() - 4 * PAGE_SIZE, 3 * PAGE_SIZE)]
    );
}

#[test]
fn test_chunk_below_split_factor_is_taken_whole() {
    let heap = heap();

    let a1 = heap.allocate(3 * PAGE).unwrap();
    let _a2 = heap.allocate(PAGE).unwrap();
    heap.free(a1.address, a1.size);
    let before = heap.left_size();

    let reused = heap.allocate(2 * PAGE).unwrap();

    assert_eq!(reused.address, top() - 3 * PAGE_SIZE);
    assert_eq!(reused.size, 3 * PAGE);
    assert_eq!(heap.left_size(), before - 3 * PAGE_SIZE);

    heap.free(reused.address, reused.size);
    assert_eq!(heap.left_size(), before);
}

#[test]
fn test_smallest_larger_chunk_wins() {
    let heap = heap();

    let a1 = heap.allocate(8 * PAGE).unwrap();
    let _g1 = heap.allocate(PAGE).unwrap();
    let a2 = heap.allocate(3 * PAGE).unwrap();
    let _g2 = heap.allocate(PAGE).unwrap();

    heap.free(a1.address, a1.size);
    heap.free(a2.address, a2.size);

    let reused = heap.allocate(2 * PAGE).unwrap();
    assert_eq!(reused.address, a2.address);
}

#[test]
fn test_adjacent_frees_merge_on_store() {
    let heap = heap();

    let _a1 = heap.allocate(PAGE).unwrap();
    let a2 = heap.allocate(PAGE).unwrap();
    let a3 = heap.allocate(PAGE).unwrap();
    let _a4 = heap.allocate(PAGE).unwrap();

    heap.free(a2.address, a2.size);
    heap.free(a3.address, a3.size);

    assert_eq!(
        heap.free_chunks(SizeClass::Small),
        vec![FreeChunk::new(a3.address, 2 * PAGE_SIZE)]
    );
}

#[test]
fn test_free_at_right_bound_cascades_once() {
    let heap = heap();

    let a1 = heap.allocate(PAGE).unwrap();
    let a2 = heap.allocate(PAGE).unwrap();
    let a3 = heap.allocate(PAGE).unwrap();

    heap.free(a2.address, a2.size);
    heap.free(a3.address, a3.size);

    let stats = heap.stats();
    assert_eq!(stats.right_bound, top() - PAGE_SIZE);
    assert_eq!(stats.small_free_chunks, 0);

    heap.free(a1.address, a1.size);
    assert_eq!(heap.stats().right_bound, top());
    assert_eq!(heap.left_size(), HEAP_SIZE);
}

#[test]
fn test_free_at_left_bound_cascades_once() {
    let heap = heap();
    let big = (8 * MEGABYTE) as usize;

    let b1 = heap.allocate(big).unwrap();
    let b2 = heap.allocate(big).unwrap();
    let b3 = heap.allocate(big).unwrap();

    heap.free(b2.address, b2.size);
    assert_eq!(heap.stats().big_free_chunks, 1);

    heap.free(b3.address, b3.size);

    let stats = heap.stats();
    assert_eq!(stats.left_bound, b2.address);
    assert_eq!(stats.big_free_chunks, 0);

    heap.free(b1.address, b1.size);
    assert_eq!(heap.stats().left_bound, GpuAddress::new(BASE));
}

#[test]
fn test_big_chunk_is_split_from_top() {
    let heap = heap();

    let b1 = heap.allocate((16 * MEGABYTE) as usize).unwrap();
    let _b2 = heap.allocate((8 * MEGABYTE) as usize).unwrap();
    heap.free(b1.address, b1.size);

    let reused = heap.allocate((8 * MEGABYTE) as usize).unwrap();

    assert_eq!(reused.address, GpuAddress::new(BASE + 8 * MEGABYTE));
    assert_eq!(
        heap.free_chunks(SizeClass::Big),
        vec![FreeChunk::new(GpuAddress::new(BASE), 8 * MEGABYTE)]
    );
}

/// Frees in an order the one-step cascade cannot fully unwind
fn leave_stranded_chunks(heap: &HeapAllocator) {
    let a1 = heap.allocate(PAGE).unwrap();
    let a2 = heap.allocate(PAGE).unwrap();
    let a3 = heap.allocate(PAGE).unwrap();
    let a4 = heap.allocate(PAGE).unwrap();

    heap.free(a3.address, a3.size);
    heap.free(a1.address, a1.size);
    heap.free(a2.address, a2.size);
    heap.free(a4.address, a4.size);
}

#[test]
fn test_cascade_leaves_stranded_chunks() {
    let heap = heap();
    leave_stranded_chunks(&heap);

    assert_eq!(heap.left_size(), HEAP_SIZE);
    assert_eq!(heap.stats().right_bound, top() - 3 * PAGE_SIZE);
    assert_eq!(
        heap.free_chunks(SizeClass::Small),
        vec![
            FreeChunk::new(top() - 3 * PAGE_SIZE, 2 * PAGE_SIZE),
            FreeChunk::new(top() - PAGE_SIZE, PAGE_SIZE),
        ]
    );
}

#[test]
fn test_defragment_reclaims_stranded_chunks() {
    let heap = heap();
    leave_stranded_chunks(&heap);

    heap.defragment();

    let stats = heap.stats();
    assert_eq!(stats.right_bound, top());
    assert_eq!(stats.small_free_chunks, 0);
    assert_eq!(heap.left_size(), HEAP_SIZE);
}

#[test]
fn test_allocation_defragments_before_failing() {
    let heap = HeapAllocator::new(GpuAddress::new(BASE), 4 * PAGE_SIZE);
    leave_stranded_chunks(&heap);
    assert_eq!(heap.stats().small_free_chunks, 2);

    let whole = heap.allocate(4 * PAGE).unwrap();

    assert_eq!(whole.address, GpuAddress::new(BASE));
    assert_eq!(heap.left_size(), 0);
    assert_eq!(heap.stats().small_free_chunks, 0);
}

#[test]
fn test_defragment_merges_big_chunks() {
    let heap = heap();
    let big = (8 * MEGABYTE) as usize;

    let b1 = heap.allocate(big).unwrap();
    let b2 = heap.allocate(big).unwrap();
    let b3 = heap.allocate(big).unwrap();
    let _b4 = heap.allocate(big).unwrap();

    heap.free(b1.address, b1.size);
    heap.free(b3.address, b3.size);
    heap.free(b2.address, b2.size);
    assert_eq!(heap.stats().big_free_chunks, 2);

    heap.defragment();
    assert_eq!(
        heap.free_chunks(SizeClass::Big),
        vec![FreeChunk::new(GpuAddress::new(BASE), 24 * MEGABYTE)]
    );
}

#[test]
fn test_reverse_order_frees_restore_heap() {
    let heap = heap();

    let allocations: Vec<_> = (1..=16)
        .map(|i| heap.allocate(i * PAGE).unwrap())
        .collect();

    for allocation in allocations.iter().rev() {
        heap.free(allocation.address, allocation.size);
    }

    let stats = heap.stats();
    assert_eq!(stats.right_bound, top());
    assert_eq!(stats.small_free_chunks, 0);
    assert_eq!(heap.left_size(), HEAP_SIZE);
}

#[test]
fn test_small_pages_free_back_to_boundary() {
    let base = GpuAddress::new(0x100000);
    let size = 1024 * PAGE_SIZE;
    let heap = HeapAllocator::with_threshold(base, size, PAGE_SIZE, 16 * PAGE_SIZE);
    let top = base + size;

    let a1 = heap.allocate(PAGE).unwrap();
    let a2 = heap.allocate(PAGE).unwrap();
    let a3 = heap.allocate(PAGE).unwrap();
    assert_eq!(
        [a1.address, a2.address, a3.address],
        [top - PAGE_SIZE, top - 2 * PAGE_SIZE, top - 3 * PAGE_SIZE]
    );

    heap.free(a2.address, a2.size);
    assert_eq!(heap.stats().small_free_chunks, 1);

    heap.free(a1.address, a1.size);
    assert_eq!(
        heap.free_chunks(SizeClass::Small),
        vec![FreeChunk::new(a2.address, 2 * PAGE_SIZE)]
    );

    heap.free(a3.address, a3.size);
    let stats = heap.stats();
    assert_eq!(stats.right_bound, top);
    assert_eq!(stats.small_free_chunks, 0);
    assert_eq!(heap.left_size(), size);
}
