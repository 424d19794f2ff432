/*!
 * Heap Configuration
 *
 * Construction-time parameters for arenas
 */

use crate::core::limits::{DEFAULT_ALLOCATION_ALIGNMENT, DEFAULT_SIZE_THRESHOLD};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment override for the allocation alignment
pub const ALIGNMENT_ENV: &str = "GFX_HEAP_ALIGNMENT";
/// Environment override for the big/small threshold
pub const SIZE_THRESHOLD_ENV: &str = "GFX_HEAP_SIZE_THRESHOLD";

/// Arena configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Granule every request is rounded up to
    pub allocation_alignment: u64,
    /// Requests larger than this are served from the low end
    pub size_threshold: u64,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            allocation_alignment: DEFAULT_ALLOCATION_ALIGNMENT,
            size_threshold: DEFAULT_SIZE_THRESHOLD,
        }
    }
}

impl HeapConfig {
    pub fn with_alignment(mut self, alignment: u64) -> Self {
        self.allocation_alignment = alignment;
        self
    }

    pub fn with_size_threshold(mut self, threshold: u64) -> Self {
        self.size_threshold = threshold;
        self
    }

    /// Defaults overridden by `GFX_HEAP_ALIGNMENT` / `GFX_HEAP_SIZE_THRESHOLD`
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(alignment) = env_u64(ALIGNMENT_ENV) {
            config.allocation_alignment = alignment;
        }
        if let Some(threshold) = env_u64(SIZE_THRESHOLD_ENV) {
            config.size_threshold = threshold;
        }
        config
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse::<u64>() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(key = key, value = %value, error = %e, "Ignoring malformed heap config override");
            None
        }
    }
}
