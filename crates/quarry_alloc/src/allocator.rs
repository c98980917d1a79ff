//! # Allocator Interface
//!
//! The common contract implemented by every arena allocator, plus the
//! offset/word primitives the concrete strategies share.
//!
//! All bookkeeping lives inside the arena bytes themselves. Instead of raw
//! pointers, allocators hand out [`Offset`] values into the arena, and linked
//! structures store the offset of their successor as a native-endian word at
//! a known position. The null link is the sentinel [`NIL`].

use crate::error::AllocResult;

/// Size in bytes of one bookkeeping word (a native `usize`).
pub const WORD: usize = std::mem::size_of::<usize>();

/// Sentinel offset meaning "no block" in an in-arena link word.
///
/// Offset zero is a valid arena position, so the null link must live at the
/// other end of the range.
pub(crate) const NIL: usize = usize::MAX;

/// A byte offset into an allocator's arena, handed out by `allocate`.
///
/// The offset is the safe-Rust stand-in for the raw pointer a native
/// allocator would return: payload bytes live at `arena[offset.get()..]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Offset(pub(crate) usize);

impl Offset {
    /// Returns the raw byte offset into the arena.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Reads one bookkeeping word stored at `offset` inside the arena.
#[inline]
pub(crate) fn read_word(arena: &[u8], offset: usize) -> usize {
    let mut word = [0u8; WORD];
    word.copy_from_slice(&arena[offset..offset + WORD]);
    usize::from_ne_bytes(word)
}

/// Writes one bookkeeping word at `offset` inside the arena.
#[inline]
pub(crate) fn write_word(arena: &mut [u8], offset: usize, value: usize) {
    arena[offset..offset + WORD].copy_from_slice(&value.to_ne_bytes());
}

/// Optional byte-usage and allocation-count accounting.
///
/// Counters are maintained only when enabled at construction; when disabled
/// the getters report `None` rather than a misleading zero.
#[derive(Clone, Copy, Debug)]
pub(crate) struct UsageCounters {
    enabled: bool,
    used: usize,
    allocations: u32,
}

impl UsageCounters {
    pub(crate) const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            used: 0,
            allocations: 0,
        }
    }

    #[inline]
    pub(crate) fn record_alloc(&mut self, bytes: usize) {
        if self.enabled {
            self.used += bytes;
            self.allocations += 1;
        }
    }

    #[inline]
    pub(crate) fn record_free(&mut self, bytes: usize) {
        if self.enabled {
            self.used = self.used.saturating_sub(bytes);
            self.allocations = self.allocations.saturating_sub(1);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.used = 0;
        self.allocations = 0;
    }

    pub(crate) fn used_bytes(&self) -> Option<usize> {
        self.enabled.then_some(self.used)
    }

    pub(crate) fn allocation_count(&self) -> Option<u32> {
        self.enabled.then_some(self.allocations)
    }
}

/// Common contract implemented by every arena allocator.
///
/// The trait is object-safe: components that need allocation take
/// `&mut dyn Allocator` (or a concrete type) through their constructors.
/// There is deliberately no process-wide default allocator.
///
/// # Ownership
///
/// An allocator exclusively borrows its arena for its whole lifetime, so the
/// borrow checker enforces both the lifetime rule (the arena outlives the
/// allocator) and the single-owner rule (no concurrent access).
pub trait Allocator {
    /// Requests a region of at least `size` usable bytes.
    ///
    /// # Errors
    ///
    /// [`AllocError::OutOfMemory`](crate::AllocError) when the arena cannot
    /// satisfy the request; policy-specific contract errors otherwise.
    fn allocate(&mut self, size: usize) -> AllocResult<Offset>;

    /// Releases a region previously returned by `allocate` on this instance.
    ///
    /// # Errors
    ///
    /// Policy-specific contract errors; passing an offset this instance never
    /// handed out is not reliably detected.
    fn deallocate(&mut self, offset: Offset) -> AllocResult<()>;

    /// Releases everything at once, returning to the just-constructed state.
    ///
    /// The full arena extent reads as zero afterwards.
    fn clear(&mut self);

    /// True only if the arena itself is absent (zero length).
    ///
    /// This reports catastrophic construction, **not** fullness; a full arena
    /// is observed through a failed `allocate`.
    fn is_out_of_memory(&self) -> bool;

    /// Total size of the managed arena in bytes.
    fn capacity(&self) -> usize;

    /// Read access to the full arena extent.
    fn memory(&self) -> &[u8];

    /// Bytes currently handed out, if usage tracking is enabled.
    fn used_bytes(&self) -> Option<usize>;

    /// Number of live allocations, if usage tracking is enabled.
    fn allocation_count(&self) -> Option<u32>;
}
