use std::{cell::UnsafeCell, fmt};

use crate::{Allocator, Block, align};

#[repr(C, align(16))]
struct Buffer<const CAPACITY: usize>([u8; CAPACITY]);

/// Leaf policy carving blocks out of an inline buffer with a bump cursor.
///
/// ```text
///   ┌─────┬─────┬─────┬──────────────────────────┐
///   │ B1  │ B2  │ B3  │        free space        │
///   └─────┴─────┴─────┴──────────────────────────┘
///                     ▲                          ▲
///                   cursor                    CAPACITY
/// ```
///
/// Sizes are padded to the next even number. Only the most recent block
/// (the one ending at the cursor) is reclaimed by `deallocate`; any other
/// block stays unreachable until [`StackAllocator::reset`] or drop.
///
/// Blocks point into the allocator itself, so it must not be moved while
/// any of its blocks are live. A clone starts out empty.
pub struct StackAllocator<const CAPACITY: usize> {
  buffer: UnsafeCell<Buffer<CAPACITY>>,
  cursor: usize,
}

impl<const CAPACITY: usize> StackAllocator<CAPACITY> {
  const VALID_CAPACITY: () = assert!(
    CAPACITY > 1 && CAPACITY % 2 == 0,
    "stack capacity must be even and greater than one"
  );

  pub fn new() -> Self {
    let () = Self::VALID_CAPACITY;

    Self {
      buffer: UnsafeCell::new(Buffer([0; CAPACITY])),
      cursor: 0,
    }
  }

  pub const fn capacity(&self) -> usize {
    CAPACITY
  }

  /// Bytes between the buffer base and the cursor, padding included.
  pub const fn used(&self) -> usize {
    self.cursor
  }

  pub const fn remaining(&self) -> usize {
    CAPACITY - self.cursor
  }

  /// Rewinds the cursor to the buffer base, abandoning every block.
  pub fn reset(&mut self) {
    self.cursor = 0;
  }

  fn base(&self) -> *mut u8 {
    self.buffer.get().cast::<u8>()
  }
}

impl<const CAPACITY: usize> Allocator for StackAllocator<CAPACITY> {
  fn allocate(
    &mut self,
    size: i64,
  ) -> Block {
    if size <= 0 || size > CAPACITY as i64 {
      return Block::empty();
    }

    let aligned = align!(size) as usize;
    if aligned > self.remaining() {
      log::trace!(
        "stack allocator exhausted: requested {aligned} bytes, {} remaining",
        self.remaining()
      );
      return Block::empty();
    }

    let data = unsafe { self.base().add(self.cursor) };
    self.cursor += aligned;

    Block::new(size, data)
  }

  fn deallocate(
    &mut self,
    block: &mut Block,
  ) {
    if self.owns(block) {
      let start = block.data().addr() - self.base().addr();
      let end = block
        .size()
        .checked_add(1)
        .map(|size| size & !1)
        .and_then(|size| usize::try_from(size).ok())
        .and_then(|size| start.checked_add(size));

      if end == Some(self.cursor) {
        self.cursor = start;
      }
    }
    block.clear();
  }

  fn owns(
    &self,
    block: &Block,
  ) -> bool {
    let base = self.base().addr();
    let addr = block.data().addr();

    !block.is_empty() && addr >= base && addr < base + CAPACITY
  }
}

impl<const CAPACITY: usize> Default for StackAllocator<CAPACITY> {
  fn default() -> Self {
    Self::new()
  }
}

impl<const CAPACITY: usize> Clone for StackAllocator<CAPACITY> {
  fn clone(&self) -> Self {
    Self::new()
  }
}

impl<const CAPACITY: usize> fmt::Debug for StackAllocator<CAPACITY> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("StackAllocator")
      .field("capacity", &CAPACITY)
      .field("used", &self.cursor)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_alloc() {
    let mut allocator = StackAllocator::<16>::new();

    let first = allocator.allocate(4);
    let second = allocator.allocate(4);

    assert!(!first.is_empty());
    assert!(!second.is_empty());
    assert_eq!(unsafe { first.data().add(4) }, second.data());
    assert_eq!(allocator.used(), 8);
  }

  #[test]
  fn test_odd_sizes_are_padded() {
    let mut allocator = StackAllocator::<16>::new();

    let first = allocator.allocate(3);
    let second = allocator.allocate(1);

    assert_eq!(first.size(), 3);
    assert_eq!(unsafe { first.data().add(4) }, second.data());
    assert_eq!(allocator.used(), 6);
  }

  #[test]
  fn test_exhaustion() {
    let mut allocator = StackAllocator::<16>::new();

    assert!(!allocator.allocate(10).is_empty());
    assert!(allocator.allocate(8).is_empty());
    assert!(!allocator.allocate(6).is_empty());
    assert!(allocator.allocate(1).is_empty());
    assert!(allocator.allocate(17).is_empty());
    assert!(allocator.allocate(i64::MAX).is_empty());
  }

  #[test]
  fn test_lifo_reclaim() {
    let mut allocator = StackAllocator::<16>::new();

    let _first = allocator.allocate(4);
    let mut second = allocator.allocate(4);
    let address = second.data();

    allocator.deallocate(&mut second);
    assert!(second.is_empty());
    assert_eq!(allocator.used(), 4);

    let third = allocator.allocate(4);
    assert_eq!(third.data(), address);
  }

  #[test]
  fn test_non_lifo_leaks() {
    let mut allocator = StackAllocator::<16>::new();

    let mut first = allocator.allocate(4);
    let _second = allocator.allocate(4);

    allocator.deallocate(&mut first);
    assert!(first.is_empty());
    assert_eq!(allocator.used(), 8);

    assert!(!allocator.allocate(4).is_empty());
    assert!(!allocator.allocate(4).is_empty());
    assert!(allocator.allocate(4).is_empty());
  }

  #[test]
  fn test_owns() {
    let mut allocator = StackAllocator::<16>::new();
    let other = StackAllocator::<16>::new();

    let block = allocator.allocate(16);
    assert!(allocator.owns(&block));
    assert!(!other.owns(&block));
    assert!(!allocator.owns(&Block::empty()));

    let mut byte = 0u8;
    assert!(!allocator.owns(&Block::new(1, &mut byte)));
  }

  #[test]
  fn test_foreign_block_is_not_reclaimed() {
    let mut allocator = StackAllocator::<16>::new();
    let _block = allocator.allocate(4);

    let mut byte = 0u8;
    let mut foreign = Block::new(1, &mut byte);
    allocator.deallocate(&mut foreign);

    assert!(foreign.is_empty());
    assert_eq!(allocator.used(), 4);
  }

  #[test]
  fn test_malformed_sizes_are_ignored() {
    let mut allocator = StackAllocator::<16>::new();
    let block = allocator.allocate(4);

    for size in [i64::MAX, i64::MAX - 1, -4, i64::MIN] {
      let mut malformed = Block::new(size, block.data());
      allocator.deallocate(&mut malformed);

      assert!(malformed.is_empty());
      assert_eq!(allocator.used(), 4);
    }
  }

  #[test]
  fn test_clone_starts_empty() {
    let mut allocator = StackAllocator::<16>::new();
    let block = allocator.allocate(8);

    let copy = allocator.clone();
    assert_eq!(copy.used(), 0);
    assert!(!copy.owns(&block));
  }

  #[test]
  fn test_reset() {
    let mut allocator = StackAllocator::<8>::new();
    let first = allocator.allocate(8);

    allocator.reset();
    assert_eq!(allocator.remaining(), 8);
    assert_eq!(allocator.allocate(8).data(), first.data());
  }
}
