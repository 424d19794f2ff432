/*!
 * Alignment Helpers
 * Rounding of sizes and addresses to an alignment boundary
 */

/// Round `value` up to the next multiple of `alignment`
///
/// An alignment of 0 or 1 leaves the value untouched.
///
/// ```
/// use gfx_heap::core::align::align_up;
///
/// assert_eq!(align_up(1, 4096), 4096);
/// assert_eq!(align_up(8192, 4096), 8192);
/// assert_eq!(align_up(0x111111, 4096), 0x112000);
/// ```
#[inline]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    let rem = value % alignment;
    if rem == 0 {
        value
    } else {
        value + (alignment - rem)
    }
}

/// Like [`align_up`], but `None` when the result does not fit in a `u64`
#[inline]
pub const fn checked_align_up(value: u64, alignment: u64) -> Option<u64> {
    if alignment <= 1 {
        return Some(value);
    }
    let rem = value % alignment;
    if rem == 0 {
        Some(value)
    } else {
        value.checked_add(alignment - rem)
    }
}

/// Round `value` down to the previous multiple of `alignment`
#[inline]
pub const fn align_down(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value - value % alignment
}

#[inline]
pub const fn is_aligned(value: u64, alignment: u64) -> bool {
    alignment <= 1 || value % alignment == 0
}
