//! # Allocator Error Types
//!
//! All errors that can be reported by the arena allocators.

use thiserror::Error;

/// Errors reported by the arena allocators.
///
/// Exhaustion is always reported as [`AllocError::OutOfMemory`]; there is no
/// fatal path anywhere in this crate. Contract checks can be disabled via
/// [`AllocatorConfig::enforce_contracts`](crate::AllocatorConfig), in which
/// case [`AllocError::ContractViolation`] is never produced and misuse yields
/// unspecified (but memory-safe) allocator state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The arena cannot satisfy the request.
    #[error("out of memory: requested {requested} bytes, largest usable region {available}")]
    OutOfMemory {
        /// Bytes the caller asked for.
        requested: usize,
        /// Size of the largest region that could still be handed out.
        available: usize,
    },

    /// The call was malformed independent of allocator state.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the call.
        reason: &'static str,
    },

    /// The caller broke the allocator's usage discipline.
    #[error("contract violation: {reason}")]
    ContractViolation {
        /// The discipline rule that was broken.
        reason: &'static str,
    },
}

/// Result type for allocator operations.
pub type AllocResult<T> = Result<T, AllocError>;
