use std::{fmt, mem, ptr};

use crate::{Allocator, Block};

/// Link written into a parked block.
#[derive(Clone, Copy)]
struct Node {
  next: *mut Node,
}

/// Composite policy recycling blocks whose size lies in
/// `[MIN_SIZE, MAX_SIZE]` through an intrusive free list.
///
/// Every in-range request is served as a `MAX_SIZE` slot from the internal
/// policy, so any parked slot can satisfy any in-range request. At most
/// `MAX_LIST_SIZE` slots are parked; beyond that, blocks go straight back to
/// the internal policy.
///
/// ```text
///   root ──► ┌──────┐    ┌──────┐    ┌──────┐
///            │ next ├──► │ next ├──► │ null │
///            └──────┘    └──────┘    └──────┘
///             parked      parked      parked
/// ```
///
/// `owns` claims every in-range block whether or not this instance produced
/// it. This keeps [`crate::FallbackAllocator`] routing recycled blocks back
/// here, but it is not a strict ownership check.
pub struct FreeListAllocator<
  A: Allocator,
  const MIN_SIZE: i64,
  const MAX_SIZE: i64,
  const MAX_LIST_SIZE: i64,
> {
  internal: A,
  root: *mut Node,
  list_size: i64,
}

unsafe impl<A: Allocator + Send, const MIN_SIZE: i64, const MAX_SIZE: i64, const MAX_LIST_SIZE: i64> Send
  for FreeListAllocator<A, MIN_SIZE, MAX_SIZE, MAX_LIST_SIZE>
{
}

impl<A: Allocator, const MIN_SIZE: i64, const MAX_SIZE: i64, const MAX_LIST_SIZE: i64>
  FreeListAllocator<A, MIN_SIZE, MAX_SIZE, MAX_LIST_SIZE>
{
  const VALID_PARAMS: () = {
    assert!(MIN_SIZE > 1 && MIN_SIZE % 2 == 0, "MIN_SIZE must be even and greater than one");
    assert!(MAX_SIZE > 1 && MAX_SIZE % 2 == 0, "MAX_SIZE must be even and greater than one");
    assert!(MIN_SIZE <= MAX_SIZE, "MIN_SIZE must not exceed MAX_SIZE");
    assert!(
      MAX_SIZE >= mem::size_of::<Node>() as i64,
      "MAX_SIZE must be able to hold a free-list link"
    );
    assert!(MAX_LIST_SIZE > 0, "MAX_LIST_SIZE must be positive");
  };

  pub fn new() -> Self {
    Self::with_internal(A::default())
  }

  /// Wraps an already-built internal policy.
  pub fn with_internal(internal: A) -> Self {
    let () = Self::VALID_PARAMS;

    Self {
      internal,
      root: ptr::null_mut(),
      list_size: 0,
    }
  }

  /// Number of slots currently parked on the list.
  pub const fn list_size(&self) -> i64 {
    self.list_size
  }

  const fn in_range(size: i64) -> bool {
    size >= MIN_SIZE && size <= MAX_SIZE
  }

  /// Unlinks the head slot.
  ///
  /// A head the internal policy no longer owns means the list was built
  /// against storage that has since moved. Such a list is dropped, not
  /// followed.
  fn pop(&mut self) -> Option<*mut u8> {
    if self.list_size == 0 {
      return None;
    }

    let node = self.root;
    if !self.internal.owns(&Block::new(MAX_SIZE, node.cast())) {
      log::debug!("discarding {} stale free-list slots at {node:?}", self.list_size);
      self.root = ptr::null_mut();
      self.list_size = 0;
      return None;
    }

    self.root = unsafe { node.read_unaligned() }.next;
    self.list_size -= 1;
    Some(node.cast())
  }

  fn push(
    &mut self,
    data: *mut u8,
  ) {
    let node = data.cast::<Node>();
    unsafe { node.write_unaligned(Node { next: self.root }) };
    self.root = node;
    self.list_size += 1;
  }
}

impl<A: Allocator, const MIN_SIZE: i64, const MAX_SIZE: i64, const MAX_LIST_SIZE: i64> Allocator
  for FreeListAllocator<A, MIN_SIZE, MAX_SIZE, MAX_LIST_SIZE>
{
  fn allocate(
    &mut self,
    size: i64,
  ) -> Block {
    if Self::in_range(size) {
      if let Some(data) = self.pop() {
        log::trace!("free list hit for {size} bytes, {} parked", self.list_size);
        return Block::new(size, data);
      }
    }

    let request = if Self::in_range(size) { MAX_SIZE } else { size };
    Block::new(size, self.internal.allocate(request).data())
  }

  fn deallocate(
    &mut self,
    block: &mut Block,
  ) {
    if block.is_empty() {
      block.clear();
    } else if !Self::in_range(block.size()) || self.list_size >= MAX_LIST_SIZE {
      let size = if Self::in_range(block.size()) { MAX_SIZE } else { block.size() };
      let mut forwarded = Block::new(size, block.data());
      block.clear();
      self.internal.deallocate(&mut forwarded);
    } else {
      self.push(block.data());
      block.clear();
    }
  }

  fn owns(
    &self,
    block: &Block,
  ) -> bool {
    Self::in_range(block.size()) || self.internal.owns(block)
  }
}

impl<A: Allocator, const MIN_SIZE: i64, const MAX_SIZE: i64, const MAX_LIST_SIZE: i64> Default
  for FreeListAllocator<A, MIN_SIZE, MAX_SIZE, MAX_LIST_SIZE>
{
  fn default() -> Self {
    Self::new()
  }
}

impl<A: Allocator, const MIN_SIZE: i64, const MAX_SIZE: i64, const MAX_LIST_SIZE: i64> Clone
  for FreeListAllocator<A, MIN_SIZE, MAX_SIZE, MAX_LIST_SIZE>
{
  fn clone(&self) -> Self {
    Self::with_internal(self.internal.clone())
  }
}

impl<A: Allocator, const MIN_SIZE: i64, const MAX_SIZE: i64, const MAX_LIST_SIZE: i64> Drop
  for FreeListAllocator<A, MIN_SIZE, MAX_SIZE, MAX_LIST_SIZE>
{
  fn drop(&mut self) {
    if self.list_size > 0 {
      log::debug!("draining {} parked free-list slots", self.list_size);
    }

    while let Some(data) = self.pop() {
      let mut block = Block::new(MAX_SIZE, data);
      self.internal.deallocate(&mut block);
    }
  }
}

impl<A: Allocator + fmt::Debug, const MIN_SIZE: i64, const MAX_SIZE: i64, const MAX_LIST_SIZE: i64> fmt::Debug
  for FreeListAllocator<A, MIN_SIZE, MAX_SIZE, MAX_LIST_SIZE>
{
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("FreeListAllocator")
      .field("internal", &self.internal)
      .field("range", &(MIN_SIZE..=MAX_SIZE))
      .field("list_size", &self.list_size)
      .finish()
  }
}
