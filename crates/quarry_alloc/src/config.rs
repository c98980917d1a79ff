//! # Allocator Configuration
//!
//! Runtime switches that replace build-time feature flags. The value is plain
//! data; it is passed explicitly to every allocator constructor rather than
//! living in any global state.

use serde::{Deserialize, Serialize};

/// Configuration value accepted by every allocator constructor.
///
/// # Example
///
/// ```rust,ignore
/// let config = AllocatorConfig {
///     track_usage: true,
///     ..AllocatorConfig::default()
/// };
/// let pool = PoolAllocator::new(&mut arena, 64, config)?;
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Maintain byte-usage and allocation-count counters.
    ///
    /// When disabled, the counters are unavailable (`None`), not zero.
    pub track_usage: bool,
    /// Check usage-discipline contracts on every call.
    ///
    /// When disabled, calls that would report
    /// [`AllocError::ContractViolation`](crate::AllocError) instead proceed
    /// unchecked; the allocator stays memory-safe but its bookkeeping may be
    /// left in an unspecified state.
    pub enforce_contracts: bool,
}

impl Default for AllocatorConfig {
    /// Contracts on, usage tracking off.
    fn default() -> Self {
        Self {
            track_usage: false,
            enforce_contracts: true,
        }
    }
}

impl AllocatorConfig {
    /// Configuration with every check and counter enabled.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            track_usage: true,
            enforce_contracts: true,
        }
    }

    /// Configuration with every check and counter disabled.
    ///
    /// The release-build analogue: the caller is trusted completely.
    #[must_use]
    pub const fn trusting() -> Self {
        Self {
            track_usage: false,
            enforce_contracts: false,
        }
    }
}
