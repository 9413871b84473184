use libc::{c_void, free, malloc};

use crate::{Allocator, Block};

/// Leaf policy backed by the platform heap.
///
/// `owns` is best effort: any non-empty block is claimed, so this policy
/// belongs at the outermost end of a fallback chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct MallocAllocator;

impl Allocator for MallocAllocator {
  fn allocate(
    &mut self,
    size: i64,
  ) -> Block {
    if size <= 0 {
      return Block::empty();
    }

    let Ok(bytes) = usize::try_from(size) else {
      return Block::empty();
    };

    let data = unsafe { malloc(bytes) }.cast::<u8>();
    if data.is_null() {
      log::trace!("malloc returned null for {size} bytes");
    }

    Block::new(size, data)
  }

  fn deallocate(
    &mut self,
    block: &mut Block,
  ) {
    if !block.is_empty() {
      unsafe { free(block.data().cast::<c_void>()) };
    }
    block.clear();
  }

  fn owns(
    &self,
    block: &Block,
  ) -> bool {
    !block.is_empty()
  }
}
