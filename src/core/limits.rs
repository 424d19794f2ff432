/*!
 * Allocator Limits and Constants
 *
 * Centralized location for sizes, granularities, and thresholds.
 * Organized by domain for maintainability and discoverability.
 *
 * - Performance-related constants are marked with [PERF]
 * - Hardware-imposed values are marked with [HW]
 */

// =============================================================================
// SIZE UNITS
// =============================================================================

pub const KILOBYTE: u64 = 1024;
pub const MEGABYTE: u64 = 1024 * KILOBYTE;
pub const GIGABYTE: u64 = 1024 * MEGABYTE;

/// Base page size (4KB)
/// [HW] Smallest unit the GPU page tables can map
pub const PAGE_SIZE: u64 = 4 * KILOBYTE;

// =============================================================================
// ARENA DEFAULTS
// =============================================================================

/// Default allocation alignment (4KB)
/// Every request and every free chunk is rounded to this
pub const DEFAULT_ALLOCATION_ALIGNMENT: u64 = PAGE_SIZE;

/// Default big/small size class boundary (4MB)
/// Requests above this bump from the low end, the rest from the high end
/// [PERF] Keeps long-lived large ranges away from churn of small ranges
pub const DEFAULT_SIZE_THRESHOLD: u64 = 4 * MEGABYTE;

/// A best-fit chunk is split only when at least this many times the request
pub const SPLIT_FACTOR: u64 = 2;

// =============================================================================
// MEMORY PRESSURE
// =============================================================================

pub const PRESSURE_MEDIUM: f64 = 0.60;
pub const PRESSURE_HIGH: f64 = 0.80;
pub const PRESSURE_CRITICAL: f64 = 0.95;

// =============================================================================
// GPU ADDRESS SPACE PARTITIONING
// =============================================================================

/// Widest GPU virtual address space that can be partitioned (48 bits)
/// [HW] Matches the 4-level GPU page table walk
pub const MAX_GPU_ADDRESS_BITS: u32 = 48;

/// Highest address usable for shared virtual memory (2^47 - 1)
/// [HW] Canonical user-space upper bound on x86-64
pub const MAX_SVM_ADDRESS: u64 = (1u64 << 47) - 1;

/// Size of each 32-bit addressable heap (4GB)
pub const HEAP_32_SIZE: u64 = 4 * GIGABYTE;

/// Heap base/limit granularity (64KB)
pub const HEAP_GRANULARITY: u64 = 64 * KILOBYTE;

/// Granularity of the 2MB standard heap
pub const HEAP_GRANULARITY_2MB: u64 = 2 * MEGABYTE;

/// Front window carved from the start of each internal heap (16MB)
pub const INTERNAL_FRONT_WINDOW_POOL_SIZE: u64 = 16 * MEGABYTE;

/// Highest value representable in `bits` bits
#[inline]
pub const fn max_n_bit_value(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
