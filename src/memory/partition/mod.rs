/*!
 * Heap Partition
 *
 * Divides a GPU virtual address space into named heaps, each backed by its
 * own [`HeapAllocator`].
 *
 * ## Layout
 *
 * - **SVM** `[0, 2^47)` when the GPU can address the whole CPU user space
 * - **32-bit heaps**: four 4GB heaps (internal device memory, internal,
 *   external device memory, external); each internal heap starts with a 16MB
 *   front window exposed as its own heap
 * - **Standard heaps**: standard, standard-64KB, standard-2MB split the rest
 *   equally; the 64KB heap is further divided between root devices
 *
 * Every heap keeps a guard band of one granule free at both ends.
 */

mod heap_index;

pub use heap_index::HeapIndex;

use super::config::HeapConfig;
use super::heap::HeapAllocator;
use super::types::{Allocation, HeapError, HeapStats};
use crate::core::align::{align_down, align_up};
use crate::core::limits::{
    max_n_bit_value, HEAP_32_SIZE, HEAP_GRANULARITY, HEAP_GRANULARITY_2MB,
    INTERNAL_FRONT_WINDOW_POOL_SIZE, MAX_GPU_ADDRESS_BITS, MAX_SVM_ADDRESS,
};
use crate::core::types::{AddressRange, GpuAddress, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Partition operation result
pub type PartitionResult<T> = Result<T, PartitionError>;

/// Partition errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Unsupported GPU address space: max address 0x{0:x}")]
    UnsupportedGpuRange(u64),

    #[error("A 47-bit GPU address space needs a non-empty reserved range")]
    MissingReservedRange,

    #[error("Reserved range {range} is not aligned to 0x{alignment:x}")]
    MisalignedReservedRange { range: AddressRange, alignment: u64 },

    #[error("Invalid root device {index} of {count}")]
    InvalidRootDevice { index: u32, count: u32 },

    #[error("Heap {0} is not initialized")]
    HeapNotInitialized(HeapIndex),

    #[error(transparent)]
    Heap(#[from] HeapError),
}

/// Partition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Highest GPU virtual address, e.g. `2^48 - 1`
    pub gpu_address_space: u64,
    /// Range already reserved on the CPU side; required for 47-bit GPUs
    pub reserved_range: Option<AddressRange>,
    pub root_device_index: u32,
    pub num_root_devices: u32,
    /// Settings for every heap's arena
    pub heap: HeapConfig,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            gpu_address_space: max_n_bit_value(MAX_GPU_ADDRESS_BITS),
            reserved_range: None,
            root_device_index: 0,
            num_root_devices: 1,
            heap: HeapConfig::default(),
        }
    }
}

impl PartitionConfig {
    pub fn new(gpu_address_space: u64) -> Self {
        Self {
            gpu_address_space,
            ..Default::default()
        }
    }

    pub fn with_reserved_range(mut self, range: AddressRange) -> Self {
        self.reserved_range = Some(range);
        self
    }

    pub fn with_root_device(mut self, index: u32, count: u32) -> Self {
        self.root_device_index = index;
        self.num_root_devices = count;
        self
    }

    pub fn with_heap_config(mut self, heap: HeapConfig) -> Self {
        self.heap = heap;
        self
    }
}

/// One initialized heap
#[derive(Debug)]
pub struct Heap {
    index: HeapIndex,
    base: GpuAddress,
    size: u64,
    minimal_address: GpuAddress,
    allocator: HeapAllocator,
}

impl Heap {
    fn new(index: HeapIndex, base: GpuAddress, size: u64, config: &HeapConfig) -> Self {
        let granularity = index.granularity();
        let (arena_base, arena_size) = if index.is_internal() {
            let front = INTERNAL_FRONT_WINDOW_POOL_SIZE;
            (base + front, size.saturating_sub(front + granularity))
        } else {
            (base + granularity, size.saturating_sub(2 * granularity))
        };
        let minimal_address = match index {
            HeapIndex::Svm => base,
            _ => arena_base,
        };

        Self {
            index,
            base,
            size,
            minimal_address,
            allocator: HeapAllocator::from_config(arena_base, arena_size, config),
        }
    }

    pub fn index(&self) -> HeapIndex {
        self.index
    }

    pub fn base(&self) -> GpuAddress {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last address inside the heap
    pub fn limit(&self) -> GpuAddress {
        self.base + (self.size - 1)
    }

    /// Lowest address the heap hands out
    pub fn minimal_address(&self) -> GpuAddress {
        self.minimal_address
    }

    pub fn range(&self) -> AddressRange {
        AddressRange::new(self.base, self.size)
    }

    pub fn allocator(&self) -> &HeapAllocator {
        &self.allocator
    }
}

/// Serializable description of one heap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapLayout {
    pub heap: HeapIndex,
    pub base: GpuAddress,
    pub size: u64,
    pub limit: GpuAddress,
    pub minimal_address: GpuAddress,
    pub stats: HeapStats,
}

/// GPU address space divided into heaps
#[derive(Debug)]
pub struct HeapPartition {
    heaps: [Option<Heap>; HeapIndex::COUNT],
}

impl HeapPartition {
    pub fn init(config: &PartitionConfig) -> PartitionResult<Self> {
        let gpu = config.gpu_address_space;
        if gpu > max_n_bit_value(MAX_GPU_ADDRESS_BITS) {
            return Err(PartitionError::UnsupportedGpuRange(gpu));
        }
        if config.num_root_devices == 0 || config.root_device_index >= config.num_root_devices {
            return Err(PartitionError::InvalidRootDevice {
                index: config.root_device_index,
                count: config.num_root_devices,
            });
        }

        let svm_top = MAX_SVM_ADDRESS + 1;
        let (svm_size, gfx_base, gfx_top) = if gpu == max_n_bit_value(48) {
            (svm_top, svm_top, gpu + 1)
        } else if gpu == max_n_bit_value(47) {
            let reserved = config
                .reserved_range
                .filter(|r| r.size > 0 && !r.base.is_null())
                .ok_or(PartitionError::MissingReservedRange)?;
            if !reserved.base.is_aligned(HEAP_GRANULARITY) {
                return Err(PartitionError::MisalignedReservedRange {
                    range: reserved,
                    alignment: HEAP_GRANULARITY,
                });
            }
            let reserved_top = reserved
                .base
                .raw()
                .checked_add(reserved.size)
                .ok_or(PartitionError::UnsupportedGpuRange(gpu))?;
            (svm_top, reserved.base.raw(), reserved_top)
        } else {
            (0, 0, gpu + 1)
        };

        let mut partition = Self {
            heaps: std::array::from_fn(|_| None),
        };

        if svm_size > 0 {
            partition.init_heap(HeapIndex::Svm, GpuAddress::NULL, svm_size, &config.heap);
        }

        let heap_32_end = gfx_base + HEAP_32_SIZE * HeapIndex::HEAP_32.len() as u64;
        if heap_32_end >= gfx_top {
            return Err(PartitionError::UnsupportedGpuRange(gpu));
        }

        let mut base = gfx_base;
        for heap in HeapIndex::HEAP_32 {
            partition.init_heap(heap, GpuAddress::new(base), HEAP_32_SIZE, &config.heap);
            if let Some(front_window) = heap.front_window() {
                partition.init_heap(
                    front_window,
                    GpuAddress::new(base),
                    INTERNAL_FRONT_WINDOW_POOL_SIZE,
                    &config.heap,
                );
            }
            base += HEAP_32_SIZE;
        }

        base = align_up(base, HEAP_GRANULARITY_2MB);
        let standard_size = match gfx_top.checked_sub(base) {
            Some(remaining) => align_down(remaining / HeapIndex::STANDARD.len() as u64, HEAP_GRANULARITY_2MB),
            None => 0,
        };
        if standard_size == 0 {
            return Err(PartitionError::UnsupportedGpuRange(gpu));
        }

        partition.init_heap(HeapIndex::Standard, GpuAddress::new(base), standard_size, &config.heap);
        base += standard_size;

        let size_64kb = align_down(
            standard_size / config.num_root_devices as u64,
            HEAP_GRANULARITY,
        );
        if size_64kb == 0 {
            return Err(PartitionError::InvalidRootDevice {
                index: config.root_device_index,
                count: config.num_root_devices,
            });
        }
        let base_64kb = base + config.root_device_index as u64 * size_64kb;
        partition.init_heap(HeapIndex::Standard64Kb, GpuAddress::new(base_64kb), size_64kb, &config.heap);
        base += standard_size;

        partition.init_heap(HeapIndex::Standard2Mb, GpuAddress::new(base), standard_size, &config.heap);

        info!(
            gpu_address_space = %format_args!("0x{:x}", gpu),
            svm = svm_size > 0,
            gfx_base = %format_args!("0x{:x}", gfx_base),
            gfx_top = %format_args!("0x{:x}", gfx_top),
            standard_size = standard_size,
            root_device = config.root_device_index,
            "Heap partition initialized"
        );
        Ok(partition)
    }

    fn init_heap(&mut self, index: HeapIndex, base: GpuAddress, size: u64, config: &HeapConfig) {
        debug!(heap = %index, base = %base, size = size, "Initializing heap");
        self.heaps[index.index()] = Some(Heap::new(index, base, size, config));
    }

    pub fn heap(&self, index: HeapIndex) -> Option<&Heap> {
        self.heaps[index.index()].as_ref()
    }

    fn initialized(&self, index: HeapIndex) -> PartitionResult<&Heap> {
        self.heap(index)
            .ok_or(PartitionError::HeapNotInitialized(index))
    }

    pub fn is_heap_initialized(&self, index: HeapIndex) -> bool {
        self.heap(index).is_some()
    }

    pub fn heap_base(&self, index: HeapIndex) -> Option<GpuAddress> {
        self.heap(index).map(Heap::base)
    }

    pub fn heap_size(&self, index: HeapIndex) -> Option<u64> {
        self.heap(index).map(Heap::size)
    }

    pub fn heap_limit(&self, index: HeapIndex) -> Option<GpuAddress> {
        self.heap(index).map(Heap::limit)
    }

    pub fn heap_minimal_address(&self, index: HeapIndex) -> Option<GpuAddress> {
        self.heap(index).map(Heap::minimal_address)
    }

    pub fn heap_allocate(&self, index: HeapIndex, size: Size) -> PartitionResult<Allocation> {
        Ok(self.initialized(index)?.allocator.allocate(size)?)
    }

    pub fn heap_allocate_with_custom_alignment(
        &self,
        index: HeapIndex,
        size: Size,
        alignment: u64,
    ) -> PartitionResult<Allocation> {
        Ok(self
            .initialized(index)?
            .allocator
            .allocate_with_custom_alignment(size, alignment)?)
    }

    pub fn heap_free(&self, index: HeapIndex, address: GpuAddress, size: Size) -> PartitionResult<()> {
        self.initialized(index)?.allocator.free(address, size);
        Ok(())
    }

    /// Initialized heaps in index order
    pub fn heaps(&self) -> impl Iterator<Item = &Heap> {
        self.heaps.iter().flatten()
    }

    pub fn layout(&self) -> Vec<HeapLayout> {
        self.heaps()
            .map(|heap| HeapLayout {
                heap: heap.index,
                base: heap.base,
                size: heap.size,
                limit: heap.limit(),
                minimal_address: heap.minimal_address,
                stats: heap.allocator.stats(),
            })
            .collect()
    }
}
