//! Error-checked entry points over any [`Allocator`].

use crate::{Allocator, AllocatorError, Block};

/// Builds a default policy instance.
pub fn create<A: Allocator>() -> A {
  A::default()
}

/// Allocates `size` bytes from `allocator`.
///
/// A zero size succeeds with an empty block and reserves nothing. A negative
/// size fails with [`AllocatorError::InvalidSize`] without touching the
/// policy, and an empty block from the policy becomes
/// [`AllocatorError::Unknown`].
pub fn allocate<A: Allocator>(
  allocator: &mut A,
  size: i64,
) -> Result<Block, AllocatorError> {
  if size < 0 {
    log::debug!("rejected allocation of {size} bytes");
    return Err(AllocatorError::InvalidSize);
  }

  if size == 0 {
    return Ok(Block::empty());
  }

  let block = allocator.allocate(size);
  if block.is_empty() {
    log::debug!("{} could not allocate {size} bytes", std::any::type_name::<A>());
    return Err(AllocatorError::Unknown);
  }

  Ok(block)
}

pub fn deallocate<A: Allocator>(
  allocator: &mut A,
  block: &mut Block,
) {
  allocator.deallocate(block);
}

pub fn owns<A: Allocator>(
  allocator: &A,
  block: &Block,
) -> bool {
  allocator.owns(block)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{MallocAllocator, StackAllocator};

  #[test]
  fn test_negative_size() {
    let mut allocator = create::<StackAllocator<16>>();

    assert_eq!(allocate(&mut allocator, -1), Err(AllocatorError::InvalidSize));
    assert_eq!(allocator.used(), 0);
  }

  #[test]
  fn test_zero_size() {
    let mut allocator = create::<StackAllocator<16>>();

    let block = allocate(&mut allocator, 0).unwrap();
    assert!(block.is_empty());
    assert_eq!(allocator.used(), 0);
  }

  #[test]
  fn test_exhausted_policy() {
    let mut allocator = create::<StackAllocator<16>>();

    assert!(allocate(&mut allocator, 16).is_ok());
    assert_eq!(allocate(&mut allocator, 2), Err(AllocatorError::Unknown));
  }

  #[test]
  fn test_round_trip() {
    let mut allocator = create::<MallocAllocator>();

    let mut block = allocate(&mut allocator, 64).unwrap();
    assert!(owns(&allocator, &block));

    deallocate(&mut allocator, &mut block);
    assert!(block.is_empty());
    assert!(!owns(&allocator, &block));
  }
}
