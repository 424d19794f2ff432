/*!
 * Heap Property Tests
 * Random allocate/free sequences checked against the heap invariants
 */

use gfx_heap::core::limits::{MEGABYTE, PAGE_SIZE};
use gfx_heap::{Allocation, GpuAddress, HeapAllocator, SizeClass};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASE: u64 = 0x4_0000_0000;
const HEAP_SIZE: u64 = 64 * MEGABYTE;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    AllocateAligned(usize, u32),
    Free(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..=2048).prop_map(|pages| Op::Allocate(pages * PAGE_SIZE as usize)),
        1 => (1usize..=64, 12u32..=21).prop_map(|(pages, shift)| {
            Op::AllocateAligned(pages * PAGE_SIZE as usize, shift)
        }),
        3 => any::<usize>().prop_map(Op::Free),
    ]
}

fn check_invariants(heap: &HeapAllocator, live: &[Allocation]) {
    let stats = heap.stats();
    let used: u64 = live.iter().map(|a| a.size as u64).sum();

    assert_eq!(stats.available, HEAP_SIZE - used);
    assert!(stats.left_bound <= stats.right_bound);
    assert!(stats.left_bound >= GpuAddress::new(BASE));
    assert!(stats.right_bound <= GpuAddress::new(BASE + HEAP_SIZE));

    let free: u64 = heap
        .free_chunks(SizeClass::Big)
        .iter()
        .chain(heap.free_chunks(SizeClass::Small).iter())
        .map(|c| c.size)
        .sum();
    assert_eq!(free + stats.unused_middle(), stats.available);

    let mut ranges: Vec<_> = live.iter().map(Allocation::range).collect();
    ranges.sort_by_key(|r| r.base);
    for pair in ranges.windows(2) {
        assert!(!pair[0].overlaps(&pair[1]), "{} overlaps {}", pair[0], pair[1]);
    }
    for range in &ranges {
        assert!(heap.range().contains(range.base));
        assert!(range.end() <= heap.range().end());
    }
}

fn drain(heap: &HeapAllocator, live: &mut Vec<Allocation>) {
    for allocation in live.drain(..) {
        heap.free(allocation.address, allocation.size);
    }
    heap.defragment();

    let stats = heap.stats();
    assert_eq!(stats.available, HEAP_SIZE);
    assert_eq!(stats.left_bound, GpuAddress::new(BASE));
    assert_eq!(stats.right_bound, GpuAddress::new(BASE + HEAP_SIZE));
    assert_eq!(stats.big_free_chunks + stats.small_free_chunks, 0);
}

proptest! {
    #[test]
    fn prop_bookkeeping_is_conserved(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let heap = HeapAllocator::new(GpuAddress::new(BASE), HEAP_SIZE);
        let mut live: Vec<Allocation> = Vec::new();

        for op in ops {
            match op {
                Op::Allocate(size) => {
                    if let Ok(allocation) = heap.allocate(size) {
                        prop_assert!(allocation.size >= size);
                        prop_assert!(allocation.address.is_aligned(PAGE_SIZE));
                        live.push(allocation);
                    }
                }
                Op::AllocateAligned(size, shift) => {
                    if let Ok(allocation) = heap.allocate_with_custom_alignment(size, 1u64 << shift) {
                        prop_assert!(allocation.address.is_aligned(1u64 << shift));
                        live.push(allocation);
                    }
                }
                Op::Free(index) => {
                    if !live.is_empty() {
                        let allocation = live.swap_remove(index % live.len());
                        heap.free(allocation.address, allocation.size);
                    }
                }
            }
            check_invariants(&heap, &live);
        }

        drain(&heap, &mut live);
    }

    #[test]
    fn prop_failed_allocation_changes_nothing(fill_pages in 1u64..=16) {
        let heap = HeapAllocator::new(GpuAddress::new(BASE), 16 * PAGE_SIZE);
        heap.allocate((fill_pages * PAGE_SIZE) as usize).unwrap();
        let before = heap.stats();

        let result = heap.allocate(((17 - fill_pages) * PAGE_SIZE) as usize);

        prop_assert!(result.is_err());
        let after = heap.stats();
        prop_assert_eq!(before.available, after.available);
        prop_assert_eq!(before.left_bound, after.left_bound);
        prop_assert_eq!(before.right_bound, after.right_bound);
    }
}

#[test]
fn test_seeded_stress() {
    let mut rng = StdRng::seed_from_u64(0x6e65_6f68);
    let heap = HeapAllocator::new(GpuAddress::new(BASE), HEAP_SIZE);
    let mut live: Vec<Allocation> = Vec::new();

    for round in 0..10_000 {
        if live.is_empty() || rng.gen_bool(0.55) {
            let pages = if rng.gen_bool(0.1) {
                rng.gen_range(1025..=3072)
            } else {
                rng.gen_range(1..=32)
            };
            if let Ok(allocation) = heap.allocate(pages * PAGE_SIZE as usize) {
                live.push(allocation);
            }
        } else {
            let index = rng.gen_range(0..live.len());
            let allocation = live.swap_remove(index);
            heap.free(allocation.address, allocation.size);
        }

        if round % 500 == 0 {
            check_invariants(&heap, &live);
        }
    }

    check_invariants(&heap, &live);
    drain(&heap, &mut live);
}
