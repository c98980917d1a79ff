//! # Pool Allocator
//!
//! Fixed-size slot strategy over a caller-supplied arena. The arena is
//! partitioned up front into equal slots; free slots are linked through their
//! own first word, so the allocator carries no side tables at all.

use crate::allocator::{read_word, write_word, Allocator, Offset, UsageCounters, NIL, WORD};
use crate::config::AllocatorConfig;
use crate::error::{AllocError, AllocResult};

/// Fixed-size slot allocator with O(1) allocate and deallocate.
///
/// Every free slot stores the offset of the next free slot in its first word;
/// occupied slots have no header, so the caller's payload spans the full
/// slot. Reuse is LIFO: the most recently freed slot is handed out first.
///
/// # Sizing
///
/// Slot count is `arena_len / block_size`; a residual tail smaller than one
/// slot is deliberately wasted. Requests smaller than `block_size` still
/// consume a whole slot.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = [0u8; 4096];
/// let mut pool = PoolAllocator::new(&mut arena, 64, AllocatorConfig::default())?;
///
/// let slot = pool.allocate(48)?; // O(1), consumes one 64-byte slot
/// pool.deallocate(slot)?;        // O(1), slot zeroed and reused next
/// ```
pub struct PoolAllocator<'a> {
    /// The managed arena; free-list links live inside it.
    arena: &'a mut [u8],
    /// Size of one slot in bytes.
    block_size: usize,
    /// Offset of the first free slot, or `NIL` when the pool is exhausted.
    head: usize,
    /// Runtime configuration.
    config: AllocatorConfig,
    /// Optional usage accounting.
    counters: UsageCounters,
}

impl<'a> PoolAllocator<'a> {
    /// Creates a pool over `arena` partitioned into `block_size` slots.
    ///
    /// The arena is zero-filled and all slots are linked free, in ascending
    /// address order.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidArgument`] if `block_size` cannot hold a
    /// free-list link, or (with contracts enforced) if the arena is empty.
    pub fn new(
        arena: &'a mut [u8],
        block_size: usize,
        config: AllocatorConfig,
    ) -> AllocResult<Self> {
        // The link word must fit in-place even with contracts off; without it
        // the free list cannot exist.
        if block_size < WORD {
            return Err(AllocError::InvalidArgument {
                reason: "pool block size must hold at least one free-list link word",
            });
        }
        if config.enforce_contracts && arena.is_empty() {
            return Err(AllocError::InvalidArgument {
                reason: "pool arena must not be empty",
            });
        }

        let mut pool = Self {
            arena,
            block_size,
            head: NIL,
            config,
            counters: UsageCounters::new(config.track_usage),
        };
        pool.clear();
        Ok(pool)
    }

    /// Returns the size of one slot in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of slots the arena was partitioned into.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.arena.len() / self.block_size
    }

    /// Read access to the payload bytes of a slot.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not within the arena.
    #[inline]
    #[must_use]
    pub fn slot(&self, offset: Offset) -> &[u8] {
        &self.arena[offset.get()..offset.get() + self.block_size]
    }

    /// Write access to the payload bytes of a slot.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not within the arena.
    #[inline]
    pub fn slot_mut(&mut self, offset: Offset) -> &mut [u8] {
        &mut self.arena[offset.get()..offset.get() + self.block_size]
    }
}

impl Allocator for PoolAllocator<'_> {
    /// Pops the head of the free-slot list.
    ///
    /// `size` may be anything up to [`block_size`](Self::block_size); the
    /// request consumes a whole slot regardless.
    ///
    /// # Errors
    ///
    /// [`AllocError::ContractViolation`] if `size` exceeds the slot size
    /// (with contracts enforced); [`AllocError::OutOfMemory`] if every slot
    /// is occupied.
    fn allocate(&mut self, size: usize) -> AllocResult<Offset> {
        if self.config.enforce_contracts && size > self.block_size {
            tracing::warn!(size, block_size = self.block_size, "pool request exceeds slot size");
            return Err(AllocError::ContractViolation {
                reason: "pool request larger than the slot size",
            });
        }
        if self.head == NIL {
            tracing::trace!(size, "pool exhausted");
            return Err(AllocError::OutOfMemory {
                requested: size,
                available: 0,
            });
        }

        let offset = self.head;
        self.head = read_word(self.arena, offset);
        self.counters.record_alloc(self.block_size);
        Ok(Offset(offset))
    }

    /// Zero-fills the slot and pushes it onto the free-list head.
    ///
    /// The next `allocate` returns this slot again (LIFO reuse).
    ///
    /// # Errors
    ///
    /// [`AllocError::ContractViolation`] if the offset is not a slot boundary
    /// inside the arena (with contracts enforced).
    fn deallocate(&mut self, offset: Offset) -> AllocResult<()> {
        let slot = offset.get();
        if self.config.enforce_contracts {
            let slot_ok = slot % self.block_size == 0
                && slot
                    .checked_add(self.block_size)
                    .is_some_and(|end| end <= self.arena.len());
            if !slot_ok {
                return Err(AllocError::ContractViolation {
                    reason: "deallocated offset is not a pool slot boundary",
                });
            }
        }

        self.arena[slot..slot + self.block_size].fill(0);
        write_word(self.arena, slot, self.head);
        self.head = slot;
        self.counters.record_free(self.block_size);
        Ok(())
    }

    /// Zero-fills the arena and relinks every slot, in ascending address
    /// order, onto the free list.
    fn clear(&mut self) {
        self.arena.fill(0);

        let slot_count = self.slot_count();
        for index in 0..slot_count {
            let next = if index + 1 < slot_count {
                (index + 1) * self.block_size
            } else {
                NIL
            };
            write_word(self.arena, index * self.block_size, next);
        }
        self.head = if slot_count == 0 { NIL } else { 0 };
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
