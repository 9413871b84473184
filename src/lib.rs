//! # blockalloc - Composable Block Allocators
//!
//! This crate provides a small set of **allocator policies** that share one
//! capability contract ([`Allocator`]) and nest inside each other to build
//! custom allocation strategies, such as "try a stack buffer, fall back to a
//! free list over malloc, and log every event".
//!
//! ## Overview
//!
//! Every policy hands out and takes back [`Block`]s: a size plus an address.
//! A block never owns memory, it only describes it. Failure is signalled by
//! an *empty* block (null address), never by a panic.
//!
//! ```text
//!   Composition:
//!
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ StatsAllocator                                     audit log     │
//!   │  ┌────────────────────────────────────────────────────────────┐  │
//!   │  │ FallbackAllocator                                          │  │
//!   │  │  ┌──────────────────────┐   empty?   ┌──────────────────┐  │  │
//!   │  │  │ StackAllocator<N>    ├──────────► │ FreeListAllocator│  │  │
//!   │  │  │  inline buffer       │            │  ┌─────────────┐ │  │  │
//!   │  │  └──────────────────────┘            │  │ Malloc      │ │  │  │
//!   │  │                                      │  └─────────────┘ │  │  │
//!   │  │                                      └──────────────────┘  │  │
//!   │  └────────────────────────────────────────────────────────────┘  │
//!   └──────────────────────────────────────────────────────────────────┘
//!
//!   allocate   flows inward, each layer adding its own bookkeeping.
//!   deallocate is routed by `owns` to the layer that produced the block.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   blockalloc
//!   ├── align      - align! macro (round sizes up to even)
//!   ├── block      - Block handle
//!   ├── error      - AllocatorError, AllocError
//!   ├── malloc     - MallocAllocator (platform heap)
//!   ├── stack      - StackAllocator (inline buffer, bump cursor)
//!   ├── free_list  - FreeListAllocator (bounded recycling)
//!   ├── fallback   - FallbackAllocator (two-policy chain)
//!   ├── stats      - StatsAllocator (bounded audit log)
//!   ├── shared     - SharedAllocator (process-wide instance)
//!   ├── typed      - TypedAdapterAllocator (count-based typed view)
//!   └── api        - create / allocate / deallocate / owns
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use blockalloc::{
//!   AllocatorError, FallbackAllocator, MallocAllocator, StackAllocator, allocate, create,
//!   deallocate, owns,
//! };
//!
//! type Policy = FallbackAllocator<StackAllocator<16>, MallocAllocator>;
//!
//! let mut policy = create::<Policy>();
//!
//! let mut a = allocate(&mut policy, 8).unwrap();
//! let mut b = allocate(&mut policy, 8).unwrap();
//! let mut c = allocate(&mut policy, 8).unwrap(); // served by malloc
//! assert!(owns(&policy, &c));
//!
//! assert_eq!(allocate(&mut policy, -1), Err(AllocatorError::InvalidSize));
//!
//! for block in [&mut c, &mut b, &mut a] {
//!   deallocate(&mut policy, block);
//!   assert!(block.is_empty());
//! }
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded policies**: no policy locks internally.
//!   [`SharedAllocator`] guards its process-wide slots so the handle is
//!   sound, nothing more.
//! - **Even alignment only**: sizes are padded to even numbers; stronger
//!   alignment depends on the leaf policy.
//! - **Inline storage pins**: a [`StackAllocator`], and any policy storing
//!   into one, must not be moved while its blocks are live. Free lists and
//!   stats logs kept in a moved stack are detected through `owns` and
//!   discarded rather than followed.
//!
//! ## Safety
//!
//! Raw policy methods are safe to call, but every block they hand out is a
//! raw address. Reading or writing through it, and handing it to the right
//! policy exactly once, is the caller's responsibility.

pub mod align;
mod api;
mod block;
mod error;
mod fallback;
mod free_list;
mod malloc;
mod shared;
mod stack;
mod stats;
mod typed;

pub use api::{allocate, create, deallocate, owns};
pub use block::Block;
pub use error::{AllocError, AllocatorError, UnknownTag};
pub use fallback::FallbackAllocator;
pub use free_list::FreeListAllocator;
pub use malloc::MallocAllocator;
pub use shared::SharedAllocator;
pub use stack::StackAllocator;
pub use stats::{Record, Records, StatsAllocator};
pub use typed::TypedAdapterAllocator;

/// The capability contract every policy implements.
///
/// None of these methods may panic. `allocate` signals failure (and answers
/// a zero-size request) with an empty [`Block`]; `deallocate` always leaves
/// the caller's block empty, including when it was empty to begin with.
pub trait Allocator: Default + Clone {
  fn allocate(
    &mut self,
    size: i64,
  ) -> Block;

  fn deallocate(
    &mut self,
    block: &mut Block,
  );

  /// Whether this policy is responsible for reclaiming `block`.
  fn owns(
    &self,
    block: &Block,
  ) -> bool;
}

mod contract {
  use static_assertions::{assert_impl_all, assert_not_impl_any};

  use super::*;

  assert_impl_all!(MallocAllocator: Allocator, Copy, Send, Sync);
  assert_impl_all!(StackAllocator<16>: Allocator, Send);
  assert_impl_all!(FreeListAllocator<MallocAllocator, 8, 64, 4>: Allocator, Send);
  assert_impl_all!(FallbackAllocator<StackAllocator<16>, MallocAllocator>: Allocator, Send);
  assert_impl_all!(StatsAllocator<MallocAllocator, 8>: Allocator, Send);
  assert_impl_all!(SharedAllocator<MallocAllocator>: Allocator, Send, Sync);
  assert_not_impl_any!(Block: Send, Sync);
}
