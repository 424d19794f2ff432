/*!
 * Heap Index
 * Names of the heaps a GPU address space is divided into
 */

use crate::core::limits::{HEAP_GRANULARITY, HEAP_GRANULARITY_2MB};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeapIndex {
    InternalDeviceMemory,
    Internal,
    ExternalDeviceMemory,
    External,
    InternalDeviceFrontWindow,
    InternalFrontWindow,
    Standard,
    Standard64Kb,
    Standard2Mb,
    Svm,
}

impl HeapIndex {
    pub const COUNT: usize = 10;

    pub const ALL: [HeapIndex; Self::COUNT] = [
        HeapIndex::InternalDeviceMemory,
        HeapIndex::Internal,
        HeapIndex::ExternalDeviceMemory,
        HeapIndex::External,
        HeapIndex::InternalDeviceFrontWindow,
        HeapIndex::InternalFrontWindow,
        HeapIndex::Standard,
        HeapIndex::Standard64Kb,
        HeapIndex::Standard2Mb,
        HeapIndex::Svm,
    ];

    /// 4GB heaps, in address order
    pub const HEAP_32: [HeapIndex; 4] = [
        HeapIndex::InternalDeviceMemory,
        HeapIndex::Internal,
        HeapIndex::ExternalDeviceMemory,
        HeapIndex::External,
    ];

    /// Heaps sharing the space above the 32-bit heaps, in address order
    pub const STANDARD: [HeapIndex; 3] = [
        HeapIndex::Standard,
        HeapIndex::Standard64Kb,
        HeapIndex::Standard2Mb,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Guard band kept free at each end of the heap
    pub const fn granularity(self) -> u64 {
        match self {
            HeapIndex::Standard2Mb => HEAP_GRANULARITY_2MB,
            _ => HEAP_GRANULARITY,
        }
    }

    pub const fn is_internal(self) -> bool {
        matches!(self, HeapIndex::Internal | HeapIndex::InternalDeviceMemory)
    }

    pub const fn is_front_window(self) -> bool {
        matches!(
            self,
            HeapIndex::InternalFrontWindow | HeapIndex::InternalDeviceFrontWindow
        )
    }

    /// Front window carved from this internal heap
    pub const fn front_window(self) -> Option<HeapIndex> {
        match self {
            HeapIndex::Internal => Some(HeapIndex::InternalFrontWindow),
            HeapIndex::InternalDeviceMemory => Some(HeapIndex::InternalDeviceFrontWindow),
            _ => None,
        }
    }
}

impl fmt::Display for HeapIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            HeapIndex::InternalDeviceMemory => "internal-device-memory",
            HeapIndex::Internal => "internal",
            HeapIndex::ExternalDeviceMemory => "external-device-memory",
            HeapIndex::External => "external",
            HeapIndex::InternalDeviceFrontWindow => "internal-device-front-window",
            HeapIndex::InternalFrontWindow => "internal-front-window",
            HeapIndex::Standard => "standard",
            HeapIndex::Standard64Kb => "standard-64kb",
            HeapIndex::Standard2Mb => "standard-2mb",
            HeapIndex::Svm => "svm",
        };
        write!(f, "{}", name)
    }
}
