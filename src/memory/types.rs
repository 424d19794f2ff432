/*!
 * Memory Types
 * Common types for address-range allocation
 */

use crate::core::limits::{PRESSURE_CRITICAL, PRESSURE_HIGH, PRESSURE_MEDIUM};
use crate::core::types::{AddressRange, GpuAddress, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Heap operation result
pub type HeapResult<T> = Result<T, HeapError>;

/// Heap errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("Out of address space: requested {requested} bytes, {available} bytes available")]
    OutOfSpace { requested: Size, available: u64 },
}

/// A granted address range
///
/// `size` is the number of bytes actually reserved, which can exceed the
/// request when it was rounded or when a whole free chunk was handed out.
/// Pass it back unchanged to `free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub address: GpuAddress,
    pub size: Size,
}

impl Allocation {
    pub fn range(&self) -> AddressRange {
        AddressRange::new(self.address, self.size as u64)
    }
}

/// Which end of the arena a request is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    /// Above the threshold; bumps upward from the base
    Big,
    /// At or below the threshold; bumps downward from the top
    Small,
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SizeClass::Big => write!(f, "big"),
            SizeClass::Small => write!(f, "small"),
        }
    }
}

/// Freed range available for reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeChunk {
    pub address: GpuAddress,
    pub size: u64,
}

impl FreeChunk {
    pub const fn new(address: GpuAddress, size: u64) -> Self {
        Self { address, size }
    }

    /// First address past the chunk
    #[inline]
    pub fn end(&self) -> GpuAddress {
        self.address + self.size
    }
}

/// Point-in-time view of an arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapStats {
    pub base: GpuAddress,
    pub size: u64,
    pub left_bound: GpuAddress,
    pub right_bound: GpuAddress,
    pub available: u64,
    pub used: u64,
    pub usage: f64,
    pub big_free_chunks: usize,
    pub small_free_chunks: usize,
}

impl HeapStats {
    pub fn memory_pressure(&self) -> MemoryPressure {
        MemoryPressure::from_usage(self.usage)
    }

    /// Bytes between the two bump cursors
    pub fn unused_middle(&self) -> u64 {
        self.right_bound - self.left_bound
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl MemoryPressure {
    pub fn from_usage(usage: f64) -> Self {
        if usage >= PRESSURE_CRITICAL {
            MemoryPressure::Critical
        } else if usage >= PRESSURE_HIGH {
            MemoryPressure::High
        } else if usage >= PRESSURE_MEDIUM {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}
