//! # Block Allocator
//!
//! Variable-size strategy: a singly-linked list of free blocks threaded
//! through the arena itself, each block self-describing its size. Allocation
//! is a best-fit scan; deallocation reinserts in address order and merges
//! with physically adjacent free neighbors on both sides.
//!
//! ## In-arena layout
//!
//! A free block starts with two bookkeeping words: `{ size, next-offset }`.
//! An allocated block carries a single size word immediately before the
//! offset handed to the caller, covering the full block (header included), so
//! the block's extent can be recovered from the caller's offset alone.

use crate::allocator::{read_word, write_word, Allocator, Offset, UsageCounters, NIL, WORD};
use crate::config::AllocatorConfig;
use crate::error::{AllocError, AllocResult};

/// Size in bytes of an in-place free-block header: one size word plus one
/// link word.
pub const FREE_HEADER: usize = 2 * WORD;

/// Variable-size best-fit allocator with two-way coalescing.
///
/// The free list is kept in increasing address order, which makes adjacency
/// a pair of integer comparisons at deallocation time: the freed block can
/// only touch the free node immediately before its position and the one
/// immediately after it, so a single backward and/or forward merge per call
/// is complete — no transitive merging is ever needed.
///
/// Allocation is O(free-list length); deallocation is O(free-list length)
/// for the insertion scan plus O(1) merging.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = [0u8; 4096];
/// let mut blocks = BlockAllocator::new(&mut arena, AllocatorConfig::default())?;
///
/// let a = blocks.allocate(100)?;
/// let b = blocks.allocate(240)?;
/// blocks.deallocate(a)?; // reinserted in address order
/// blocks.deallocate(b)?; // merges with its neighbors
/// ```
pub struct BlockAllocator<'a> {
    /// The managed arena; free-block headers live inside it.
    arena: &'a mut [u8],
    /// Offset of the lowest-addressed free block, or `NIL` when none remain.
    head: usize,
    /// Runtime configuration.
    config: AllocatorConfig,
    /// Optional usage accounting.
    counters: UsageCounters,
}

impl<'a> BlockAllocator<'a> {
    /// Creates a block allocator over `arena` with one free block spanning
    /// the whole region. The arena is zero-filled first.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidArgument`] if the arena cannot hold a single
    /// free-block header (with contracts enforced).
    pub fn new(arena: &'a mut [u8], config: AllocatorConfig) -> AllocResult<Self> {
        if config.enforce_contracts && arena.len() < FREE_HEADER {
            return Err(AllocError::InvalidArgument {
                reason: "block arena must hold at least one free-block header",
            });
        }
        let mut blocks = Self {
            arena,
            head: NIL,
            config,
            counters: UsageCounters::new(config.track_usage),
        };
        blocks.clear();
        Ok(blocks)
    }

    /// Recovers the full block size (header included) stored for a live
    /// allocation, from the caller's offset alone.
    ///
    /// Useful for realloc-style logic layered on top of this allocator.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not within the arena.
    #[inline]
    #[must_use]
    pub fn allocated_size(&self, offset: Offset) -> usize {
        read_word(self.arena, offset.get() - WORD)
    }

    /// Read access to the payload bytes of a live allocation.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not a live allocation within the arena.
    #[inline]
    #[must_use]
    pub fn payload(&self, offset: Offset) -> &[u8] {
        let len = self.allocated_size(offset) - WORD;
        &self.arena[offset.get()..offset.get() + len]
    }

    /// Write access to the payload bytes of a live allocation.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not a live allocation within the arena.
    #[inline]
    pub fn payload_mut(&mut self, offset: Offset) -> &mut [u8] {
        let len = self.allocated_size(offset) - WORD;
        &mut self.arena[offset.get()..offset.get() + len]
    }

    /// Sizes of all free blocks, in address order.
    ///
    /// Diagnostic helper for inspecting fragmentation; the sum of the
    /// returned sizes plus all live block sizes equals the arena capacity.
    #[must_use]
    pub fn free_block_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut cursor = self.head;
        while cursor != NIL {
            sizes.push(self.size_at(cursor));
            cursor = self.next_of(cursor);
        }
        sizes
    }

    fn largest_free(&self) -> usize {
        let mut largest = 0;
        let mut cursor = self.head;
        while cursor != NIL {
            largest = largest.max(self.size_at(cursor));
            cursor = self.next_of(cursor);
        }
        largest
    }

    #[inline]
    fn size_at(&self, block: usize) -> usize {
        read_word(self.arena, block)
    }

    #[inline]
    fn next_of(&self, block: usize) -> usize {
        read_word(self.arena, block + WORD)
    }

    #[inline]
    fn set_size(&mut self, block: usize, size: usize) {
        write_word(self.arena, block, size);
    }

    #[inline]
    fn set_next(&mut self, block: usize, next: usize) {
        write_word(self.arena, block + WORD, next);
    }
}

impl Allocator for BlockAllocator<'_> {
    /// Best-fit allocation.
    ///
    /// The free list is scanned for the smallest block that either matches
    /// `size + word` exactly or leaves a remainder large enough to host a new
    /// free-block header. Blocks whose remainder would be a positive
    /// sub-header fragment are skipped entirely; carving them would leave an
    /// unaddressable sliver. An exact fit is unlinked; any other fit is
    /// split, with the tail becoming the replacement free node.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidArgument`] if `size` is below one word (with
    /// contracts enforced; smaller blocks could not be freed again);
    /// [`AllocError::OutOfMemory`] if no free block qualifies.
    fn allocate(&mut self, size: usize) -> AllocResult<Offset> {
        if self.config.enforce_contracts && size < WORD {
            return Err(AllocError::InvalidArgument {
                reason: "block request must be at least one word",
            });
        }
        // Room for the allocated-block size tag. A size so large the tag
        // pushes it past the address space is plain exhaustion.
        let Some(requested) = size.checked_add(WORD) else {
            tracing::trace!(size, "request size overflows the size tag");
            return Err(AllocError::OutOfMemory {
                requested: size,
                available: self.largest_free().saturating_sub(WORD),
            });
        };

        let mut best = NIL;
        let mut best_prev = NIL;
        let mut best_size = usize::MAX;
        let mut largest = 0;
        let mut prev = NIL;
        let mut cursor = self.head;
        while cursor != NIL {
            let cursor_size = self.size_at(cursor);
            largest = largest.max(cursor_size);

            let remainder_ok = cursor_size >= requested
                && (cursor_size - requested == 0 || cursor_size - requested >= FREE_HEADER);
            if remainder_ok && cursor_size < best_size {
                best = cursor;
                best_prev = prev;
                best_size = cursor_size;
                if cursor_size == requested {
                    // An exact fit cannot be improved on.
                    break;
                }
            }

            prev = cursor;
            cursor = self.next_of(cursor);
        }

        if best == NIL {
            tracing::trace!(size, requested, largest, "no free block fits");
            return Err(AllocError::OutOfMemory {
                requested: size,
                available: largest.saturating_sub(WORD),
            });
        }

        if best_size == requested {
            // Exact fit: unlink the block entirely.
            let next = self.next_of(best);
            if best_prev == NIL {
                self.head = next;
            } else {
                self.set_next(best_prev, next);
            }
        } else {
            // Split: the tail becomes the replacement free node.
            let tail = best + requested;
            let next = self.next_of(best);
            self.set_size(tail, best_size - requested);
            self.set_next(tail, next);
            if best_prev == NIL {
                self.head = tail;
            } else {
                self.set_next(best_prev, tail);
            }
        }

        write_word(self.arena, best, requested);
        self.counters.record_alloc(requested);
        Ok(Offset(best + WORD))
    }

    /// Address-ordered reinsertion with two-way coalescing.
    ///
    /// The free list is walked for the first node at or after the freed
    /// block's end. The block then becomes the new head (nothing precedes
    /// it), grows the previous node (physically adjacent backward), or is
    /// linked in after it. Independently, if the found next node starts
    /// exactly at the freed (possibly already merged) block's end, it is
    /// absorbed and spliced out.
    ///
    /// # Errors
    ///
    /// [`AllocError::ContractViolation`] if the offset or its recorded
    /// header cannot belong to a live allocation (with contracts enforced).
    /// Double frees and foreign offsets are otherwise not detected.
    fn deallocate(&mut self, offset: Offset) -> AllocResult<()> {
        let at = offset.get();
        if self.config.enforce_contracts && (at < WORD || at >= self.arena.len()) {
            return Err(AllocError::ContractViolation {
                reason: "deallocated offset does not lie inside the arena",
            });
        }

        let block = at - WORD;
        let size = self.size_at(block);
        if self.config.enforce_contracts {
            // A forged or stale header can record any size; the bounds check
            // itself must not trip over it.
            let header_ok = size >= FREE_HEADER
                && block
                    .checked_add(size)
                    .is_some_and(|end| end <= self.arena.len());
            if !header_ok {
                tracing::warn!(offset = at, size, "block header is implausible");
                return Err(AllocError::ContractViolation {
                    reason: "recorded header at offset is not a live block header",
                });
            }
        }
        let end = block + size;

        // First free node at or after the freed block's end; its predecessor
        // is the only candidate for a backward merge.
        let mut prev = NIL;
        let mut cursor = self.head;
        while cursor != NIL && cursor < end {
            prev = cursor;
            cursor = self.next_of(cursor);
        }

        let merged;
        if prev == NIL {
            // The freed block sits before every free block (or none exist).
            self.set_size(block, size);
            self.set_next(block, self.head);
            self.head = block;
            merged = block;
        } else if prev + self.size_at(prev) == block {
            // Physically adjacent backward: grow the previous block.
            let grown = self.size_at(prev) + size;
            self.set_size(prev, grown);
            // The freed block's header words are now interior free space.
            write_word(self.arena, block, 0);
            write_word(self.arena, block + WORD, 0);
            merged = prev;
        } else {
            self.set_size(block, size);
            self.set_next(block, self.next_of(prev));
            self.set_next(prev, block);
            merged = block;
        }

        // Physically adjacent forward: absorb the next node and splice it out.
        if cursor != NIL && cursor == end {
            let absorbed = self.size_at(cursor);
            let after = self.next_of(cursor);
            self.set_size(merged, self.size_at(merged) + absorbed);
            self.set_next(merged, after);
            write_word(self.arena, cursor, 0);
            write_word(self.arena, cursor + WORD, 0);
        }

        self.counters.record_free(size);
        Ok(())
    }

    /// Zero-fills the arena and restores the single arena-spanning free
    /// block.
    fn clear(&mut self) {
        self.arena.fill(0);
        if self.arena.len() >= FREE_HEADER {
            self.head = 0;
            let len = self.arena.len();
            self.set_size(0, len);
            self.set_next(0, NIL);
        } else {
            self.head = NIL;
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn block_allocator(arena: &mut [u8]) -> BlockAllocator<'_> {
        BlockAllocator::new(arena, AllocatorConfig::default()).unwrap()
    }

    #[test]
    fn test_block_round_trip_restores_arena() {
        let mut arena = [0u8; 256];
        let mut blocks = block_allocator(&mut arena);
        assert_eq!(blocks.free_block_sizes(), vec![256]);

        let offset = blocks.allocate(40).unwrap();
        assert_eq!(blocks.free_block_sizes(), vec![256 - 48]);

        blocks.deallocate(offset).unwrap();
        assert_eq!(blocks.free_block_sizes(), vec![256]);
    }

    #[test]
    fn test_block_split_tail_replaces_node() {
        let mut arena = [0u8; 256];
        let mut blocks = block_allocator(&mut arena);

        let a = blocks.allocate(40).unwrap();
        let b = blocks.allocate(40).unwrap();
        // Blocks are carved from the front, back to back.
        assert_eq!(a.get(), WORD);
        assert_eq!(b.get(), 48 + WORD);
        assert_eq!(blocks.free_block_sizes(), vec![256 - 96]);
    }

    #[test]
    fn test_block_coalescing_is_order_independent() {
        for free_first_then_second in [true, false] {
            let mut arena = [0u8; 256];
            let mut blocks = block_allocator(&mut arena);

            let a = blocks.allocate(40).unwrap();
            let b = blocks.allocate(40).unwrap();

            let (first, second) = if free_first_then_second { (a, b) } else { (b, a) };
            blocks.deallocate(first).unwrap();
            blocks.deallocate(second).unwrap();

            // Either order collapses to the single arena-spanning block.
            assert_eq!(blocks.free_block_sizes(), vec![256]);
        }
    }

    #[test]
    fn test_block_backward_and_forward_merge_via_middle() {
        let mut arena = [0u8; 256];
        let mut blocks = block_allocator(&mut arena);

        let a = blocks.allocate(40).unwrap();
        let b = blocks.allocate(40).unwrap();
        let c = blocks.allocate(40).unwrap();

        blocks.deallocate(a).unwrap();
        blocks.deallocate(c).unwrap();
        // Freeing the middle block touches free neighbors on both sides.
        blocks.deallocate(b).unwrap();
        assert_eq!(blocks.free_block_sizes(), vec![256]);
    }

    /// Carves the arena so the free list holds blocks of the given total
    /// sizes (in address order), separated by live allocations.
    fn carve_free_blocks(blocks: &mut BlockAllocator<'_>, totals: &[usize]) {
        let mut carved = Vec::new();
        for &total in totals {
            carved.push(blocks.allocate(total - WORD).unwrap());
            // Separator allocations are never freed, so the carved blocks
            // cannot coalesce with each other.
            blocks.allocate(16).unwrap();
        }
        for offset in carved {
            blocks.deallocate(offset).unwrap();
        }
    }

    #[test]
    fn test_block_best_fit_picks_smallest_usable() {
        let mut arena = [0u8; 512];
        let mut blocks = block_allocator(&mut arena);
        carve_free_blocks(&mut blocks, &[108, 48, 72]);
        // Usable payload sizes are {100, 40, 64}.

        let offset = blocks.allocate(48).unwrap();
        // 40 is too small; 64 leaves an exact header-sized remainder and is
        // the smallest fit; 100 must not be chosen.
        assert_eq!(blocks.allocated_size(offset), 56);
        assert!(blocks.free_block_sizes().contains(&16));
        assert!(blocks.free_block_sizes().contains(&108));
    }

    #[test]
    fn test_block_sub_header_remainder_is_skipped() {
        let mut arena = [0u8; 512];
        let mut blocks = block_allocator(&mut arena);
        carve_free_blocks(&mut blocks, &[108, 48, 72]);

        // 50 + header = 58: the 72-byte block would leave a 14-byte sliver,
        // too small to host a free header, so the 108-byte block wins.
        let offset = blocks.allocate(50).unwrap();
        assert_eq!(blocks.allocated_size(offset), 58);
        assert!(blocks.free_block_sizes().contains(&(108 - 58)));
        assert!(blocks.free_block_sizes().contains(&72));
    }

    #[test]
    fn test_block_exact_fit_unlinks_node() {
        let mut arena = [0u8; 64];
        let mut blocks = block_allocator(&mut arena);

        let offset = blocks.allocate(56).unwrap();
        assert!(blocks.free_block_sizes().is_empty());

        blocks.deallocate(offset).unwrap();
        assert_eq!(blocks.free_block_sizes(), vec![64]);
    }

    #[test]
    fn test_block_exhaustion_reports_largest_usable() {
        let mut arena = [0u8; 64];
        let mut blocks = block_allocator(&mut arena);

        assert_eq!(
            blocks.allocate(128),
            Err(AllocError::OutOfMemory {
                requested: 128,
                available: 56,
            })
        );
    }

    #[test]
    fn test_block_huge_request_reports_exhaustion() {
        let mut arena = [0u8; 64];
        let mut blocks = block_allocator(&mut arena);

        // Large enough that even the size tag cannot be added on.
        assert_eq!(
            blocks.allocate(usize::MAX),
            Err(AllocError::OutOfMemory {
                requested: usize::MAX,
                available: 56,
            })
        );
        // The failed request left the free list untouched.
        assert_eq!(blocks.free_block_sizes(), vec![64]);
    }

    #[test]
    fn test_block_allocated_size_recovers_header() {
        let mut arena = [0u8; 256];
        let mut blocks = block_allocator(&mut arena);

        let offset = blocks.allocate(40).unwrap();
        assert_eq!(blocks.allocated_size(offset), 48);
        assert_eq!(blocks.payload(offset).len(), 40);
    }

    #[test]
    fn test_block_payload_survives_neighbor_churn() {
        let mut arena = [0u8; 256];
        let mut blocks = block_allocator(&mut arena);

        let keep = blocks.allocate(40).unwrap();
        let churn = blocks.allocate(40).unwrap();
        blocks.payload_mut(keep).fill(0x5A);

        blocks.deallocate(churn).unwrap();
        blocks.allocate(24).unwrap();
        assert!(blocks.payload(keep).iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_block_clear_restores_and_zeroes() {
        let mut arena = [0u8; 256];
        let mut blocks = block_allocator(&mut arena);

        let offset = blocks.allocate(64).unwrap();
        blocks.payload_mut(offset).fill(0xFF);
        blocks.clear();

        assert_eq!(blocks.free_block_sizes(), vec![256]);
        // Everything beyond the in-place head header reads zero.
        assert!(blocks.memory()[FREE_HEADER..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_block_free_space_is_conserved() {
        let mut arena = [0u8; 1024];
        let mut blocks = block_allocator(&mut arena);

        let mut live = Vec::new();
        for size in [24, 104, 40, 200, 56] {
            live.push((blocks.allocate(size).unwrap(), size));
        }
        blocks.deallocate(live.remove(1).0).unwrap();
        blocks.deallocate(live.remove(2).0).unwrap();
        live.push((blocks.allocate(64).unwrap(), 64));

        let free: usize = blocks.free_block_sizes().iter().sum();
        let held: usize = live
            .iter()
            .map(|&(offset, _)| blocks.allocated_size(offset))
            .sum();
        assert_eq!(free + held, 1024);
    }

    #[test]
    fn test_block_usage_counters() {
        let mut arena = [0u8; 256];
        let mut blocks = BlockAllocator::new(&mut arena, AllocatorConfig::strict()).unwrap();

        let offset = blocks.allocate(40).unwrap();
        assert_eq!(blocks.used_bytes(), Some(48));
        assert_eq!(blocks.allocation_count(), Some(1));

        blocks.deallocate(offset).unwrap();
        assert_eq!(blocks.used_bytes(), Some(0));
        assert_eq!(blocks.allocation_count(), Some(0));
    }

    #[test]
    fn test_block_rejects_tiny_arena_and_request() {
        let mut arena = [0u8; FREE_HEADER - 1];
        assert!(matches!(
            BlockAllocator::new(&mut arena, AllocatorConfig::default()),
            Err(AllocError::InvalidArgument { .. })
        ));

        let mut arena = [0u8; 64];
        let mut blocks = block_allocator(&mut arena);
        assert!(matches!(
            blocks.allocate(WORD - 1),
            Err(AllocError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_block_foreign_offset_rejected() {
        let mut arena = [0u8; 64];
        let mut blocks = block_allocator(&mut arena);
        blocks.allocate(16).unwrap();

        assert!(matches!(
            blocks.deallocate(Offset(5000)),
            Err(AllocError::ContractViolation { .. })
        ));
        // An offset into zeroed payload carries a zero "header".
        assert!(matches!(
            blocks.deallocate(Offset(WORD * 3)),
            Err(AllocError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_block_forged_oversize_header_rejected() {
        let mut arena = [0u8; 64];
        let mut blocks = block_allocator(&mut arena);

        // Plant a huge "size" word inside a live payload, then free an
        // offset right after it so it is read back as the block header.
        let offset = blocks.allocate(24).unwrap();
        blocks.payload_mut(offset)[WORD..2 * WORD].copy_from_slice(&usize::MAX.to_ne_bytes());

        assert!(matches!(
            blocks.deallocate(Offset(offset.get() + 2 * WORD)),
            Err(AllocError::ContractViolation { .. })
        ));
    }
}
