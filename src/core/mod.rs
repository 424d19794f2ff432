/*!
 * Core Module
 * Fundamental address types, alignment helpers and limits
 */

pub mod align;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use align::{align_down, align_up, checked_align_up, is_aligned};
pub use types::*;
