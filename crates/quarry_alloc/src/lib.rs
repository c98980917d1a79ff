//! # QUARRY Fixed-Arena Allocators
//!
//! A small family of allocation strategies over a single caller-supplied
//! contiguous memory region. Designed for latency-sensitive loops where
//! general-purpose allocation is too slow or too unpredictable:
//!
//! - [`PoolAllocator`] - equal-size slots, O(1) allocate/free, LIFO reuse
//! - [`StackAllocator`] - bump pointer with marker checkpoint/restore
//! - [`BlockAllocator`] - variable-size best-fit with two-way coalescing
//!
//! ## Architecture Rules
//!
//! 1. **The arena is caller-supplied** - the crate never asks the OS for
//!    memory; an allocator exclusively borrows a byte slice and manages its
//!    internal layout
//! 2. **Bookkeeping lives in the arena** - free lists and block headers are
//!    stored in-place as offset words; the allocator structs themselves stay
//!    a few words big
//! 3. **No fatal paths** - exhaustion and contract violations surface as
//!    typed [`AllocError`] values, never process termination
//!
//! ## Thread Safety
//!
//! Allocators are single-threaded by construction: every operation takes
//! `&mut self`, so the borrow checker enforces the single-owner rule. Use
//! one allocator per thread, each over a disjoint arena.
//!
//! ## Example
//!
//! ```rust,ignore
//! use quarry_alloc::{Allocator, AllocatorConfig, BlockAllocator};
//!
//! let mut arena = vec![0u8; 64 * 1024];
//! let mut blocks = BlockAllocator::new(&mut arena, AllocatorConfig::default())?;
//!
//! let offset = blocks.allocate(256)?;
//! blocks.payload_mut(offset)[0] = 42;
//! blocks.deallocate(offset)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod allocator;
pub mod block;
pub mod config;
pub mod error;
pub mod pool;
pub mod stack;

pub use allocator::{Allocator, Offset, WORD};
pub use block::{BlockAllocator, FREE_HEADER};
pub use config::AllocatorConfig;
pub use error::{AllocError, AllocResult};
pub use pool::PoolAllocator;
pub use stack::{Marker, StackAllocator};
