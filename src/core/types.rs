/*!
 * Core Types
 * Common types used across the allocator
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Size type for allocation requests
pub type Size = usize;

/// Opaque GPU virtual address
///
/// Addresses are plain 64-bit integers, never dereferenced. The same value may
/// name a CPU-visible mapping or a GPU-only range with no CPU counterpart.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GpuAddress(u64);

impl GpuAddress {
    /// Sentinel for "no allocation"
    pub const NULL: GpuAddress = GpuAddress(0);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_aligned(self, alignment: u64) -> bool {
        super::align::is_aligned(self.0, alignment)
    }
}

impl From<u64> for GpuAddress {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<GpuAddress> for u64 {
    fn from(address: GpuAddress) -> Self {
        address.0
    }
}

impl Add<u64> for GpuAddress {
    type Output = GpuAddress;

    #[inline]
    fn add(self, rhs: u64) -> GpuAddress {
        GpuAddress(self.0 + rhs)
    }
}

impl Sub<u64> for GpuAddress {
    type Output = GpuAddress;

    #[inline]
    fn sub(self, rhs: u64) -> GpuAddress {
        GpuAddress(self.0 - rhs)
    }
}

/// Distance in bytes between two addresses
impl Sub<GpuAddress> for GpuAddress {
    type Output = u64;

    #[inline]
    fn sub(self, rhs: GpuAddress) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for GpuAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for GpuAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Half-open address range `[base, base + size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub base: GpuAddress,
    pub size: u64,
}

impl AddressRange {
    pub const fn new(base: GpuAddress, size: u64) -> Self {
        Self { base, size }
    }

    /// First address past the range
    pub fn end(&self) -> GpuAddress {
        self.base + self.size
    }

    pub fn contains(&self, address: GpuAddress) -> bool {
        address >= self.base && address.raw() - self.base.raw() < self.size
    }

    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.base, self.end())
    }
}
