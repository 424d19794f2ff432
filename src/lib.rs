/*!
 * GFX Heap Library
 * GPU virtual address space partitioning and dual-zone heap allocation
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::types::{AddressRange, GpuAddress, Size};
pub use memory::{
    Allocation, HeapAllocator, HeapConfig, HeapError, HeapIndex, HeapInfo, HeapPartition,
    HeapResult, HeapStats, MemoryPressure, PartitionConfig, PartitionError, PartitionResult,
    RangeAllocator, SizeClass,
};
pub use monitoring::init_tracing;
