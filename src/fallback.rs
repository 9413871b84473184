use crate::{Allocator, Block};

/// Composite policy trying `P` first and `F` when `P` comes back empty.
///
/// Deallocation is routed by ownership: blocks `P` claims go back to `P`,
/// everything else to `F`. Put the policy with the stricter `owns` first.
#[derive(Debug, Default, Clone)]
pub struct FallbackAllocator<P, F> {
  primary: P,
  fallback: F,
}

impl<P: Allocator, F: Allocator> FallbackAllocator<P, F> {
  pub fn new(
    primary: P,
    fallback: F,
  ) -> Self {
    Self { primary, fallback }
  }
}

impl<P: Allocator, F: Allocator> Allocator for FallbackAllocator<P, F> {
  fn allocate(
    &mut self,
    size: i64,
  ) -> Block {
    let block = self.primary.allocate(size);
    if !block.is_empty() {
      return block;
    }

    self.fallback.allocate(size)
  }

  fn deallocate(
    &mut self,
    block: &mut Block,
  ) {
    if self.primary.owns(block) {
      self.primary.deallocate(block);
    } else {
      self.fallback.deallocate(block);
    }
  }

  fn owns(
    &self,
    block: &Block,
  ) -> bool {
    self.primary.owns(block) || self.fallback.owns(block)
  }
}
