//! # Stack Allocator
//!
//! Bump-pointer strategy: a single monotonically increasing offset (the
//! "marker") into the arena. Individual release is meaningless here; callers
//! checkpoint the marker and rewind to it, freeing everything allocated after
//! the checkpoint in one O(1) step.

use crate::allocator::{Allocator, Offset, UsageCounters};
use crate::config::AllocatorConfig;
use crate::error::{AllocError, AllocResult};

/// A stack allocator's high-water offset, usable as a checkpoint.
pub type Marker = usize;

/// Bump-pointer allocator with marker-based bulk release.
///
/// The fastest strategy in the crate: `allocate` is one addition, release is
/// one assignment. Correctness rests entirely on the caller respecting a
/// strict LIFO checkpoint/restore discipline; the allocator only verifies
/// that restored markers never move forward.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = [0u8; 4096];
/// let mut stack = StackAllocator::new(&mut arena, AllocatorConfig::default())?;
///
/// let checkpoint = stack.marker();
/// let scratch = stack.allocate(512)?;
/// // ... use the scratch region ...
/// stack.deallocate_to(checkpoint)?; // everything after the checkpoint is gone
/// ```
pub struct StackAllocator<'a> {
    /// The managed arena.
    arena: &'a mut [u8],
    /// Current high-water mark; bytes below it are handed out.
    marker: Marker,
    /// Runtime configuration.
    config: AllocatorConfig,
    /// Optional usage accounting.
    counters: UsageCounters,
}

impl<'a> StackAllocator<'a> {
    /// Creates a stack allocator over `arena`, zero-filling it.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidArgument`] if the arena is empty (with contracts
    /// enforced).
    pub fn new(arena: &'a mut [u8], config: AllocatorConfig) -> AllocResult<Self> {
        if config.enforce_contracts && arena.is_empty() {
            return Err(AllocError::InvalidArgument {
                reason: "stack arena must not be empty",
            });
        }
        arena.fill(0);
        Ok(Self {
            arena,
            marker: 0,
            config,
            counters: UsageCounters::new(config.track_usage),
        })
    }

    /// Returns the current high-water marker for later use as a checkpoint.
    #[inline]
    #[must_use]
    pub const fn marker(&self) -> Marker {
        self.marker
    }

    /// Read access to `len` bytes starting at an allocated offset.
    ///
    /// # Panics
    ///
    /// Panics if the range is not within the arena.
    #[inline]
    #[must_use]
    pub fn region(&self, offset: Offset, len: usize) -> &[u8] {
        &self.arena[offset.get()..offset.get() + len]
    }

    /// Write access to `len` bytes starting at an allocated offset.
    ///
    /// # Panics
    ///
    /// Panics if the range is not within the arena.
    #[inline]
    pub fn region_mut(&mut self, offset: Offset, len: usize) -> &mut [u8] {
        &mut self.arena[offset.get()..offset.get() + len]
    }

    /// Rewinds the marker to a previously observed checkpoint.
    ///
    /// Everything allocated after the checkpoint is released at once. The
    /// released bytes are **not** zeroed; they are simply up for reuse.
    ///
    /// With usage tracking enabled, a marker release is counted as retiring a
    /// single allocation.
    ///
    /// # Errors
    ///
    /// [`AllocError::ContractViolation`] if `marker` lies above the current
    /// marker (with contracts enforced).
    pub fn deallocate_to(&mut self, marker: Marker) -> AllocResult<()> {
        if self.config.enforce_contracts && marker > self.marker {
            tracing::warn!(marker, current = self.marker, "marker restore above current");
            return Err(AllocError::ContractViolation {
                reason: "restore marker lies above the current marker",
            });
        }
        self.counters.record_free(self.marker.saturating_sub(marker));
        self.marker = marker;
        Ok(())
    }
}

impl Allocator for StackAllocator<'_> {
    /// Returns the region at the current marker and advances it by `size`.
    ///
    /// O(1), no search, no bookkeeping inside the arena.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidArgument`] for a zero-size request (with
    /// contracts enforced); [`AllocError::OutOfMemory`] if fewer than `size`
    /// bytes remain above the marker.
    fn allocate(&mut self, size: usize) -> AllocResult<Offset> {
        if self.config.enforce_contracts && size == 0 {
            return Err(AllocError::InvalidArgument {
                reason: "stack request must be non-zero",
            });
        }
        let remaining = self.arena.len().saturating_sub(self.marker);
        if size > remaining {
            tracing::trace!(size, remaining, "stack exhausted");
            return Err(AllocError::OutOfMemory {
                requested: size,
                available: remaining,
            });
        }

        let offset = self.marker;
        self.marker += size;
        self.counters.record_alloc(size);
        Ok(Offset(offset))
    }

    /// Intentional no-op: single-region release is meaningless for a stack
    /// discipline. Use [`deallocate_to`](Self::deallocate_to) instead.
    fn deallocate(&mut self, _offset: Offset) -> AllocResult<()> {
        Ok(())
    }

    /// Resets the marker to zero and zero-fills the arena.
    fn clear(&mut self) {
        self.arena.fill(0);
        self.marker = 0;
        self.counters.reset();
    }

    fn is_out_of_memory(&self) -> bool {
        self.arena.is_empty()
    }

    fn capacity(&self) -> usize {
        self.arena.len()
    }

    fn memory(&self) -> &[u8] {
        self.arena
    }

    fn used_bytes(&self) -> Option<usize> {
        self.counters.used_bytes()
    }

    fn allocation_count(&self) -> Option<u32> {
        self.counters.allocation_count()
    }
}
