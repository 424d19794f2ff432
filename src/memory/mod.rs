/*!
 * Memory Module
 * Address-range allocation and GPU address space partitioning
 */

pub mod config;
pub mod heap;
pub mod partition;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use config::HeapConfig;
pub use heap::HeapAllocator;
pub use partition::{HeapIndex, HeapPartition, PartitionConfig, PartitionError, PartitionResult};
pub use traits::*;
pub use types::*;
