use std::{ptr, slice};

/// A handle describing a contiguous memory region.
///
/// A block never owns the memory it points at. Copying a block copies the
/// handle only, and exactly one policy is responsible for reclaiming it.
///
/// A block is *empty* iff its address is null, whatever its size says.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Block {
  size: i64,
  data: *mut u8,
}

impl Block {
  pub const fn new(
    size: i64,
    data: *mut u8,
  ) -> Self {
    Self { size, data }
  }

  pub const fn empty() -> Self {
    Self {
      size: 0,
      data: ptr::null_mut(),
    }
  }

  /// Number of addressable bytes at [`Block::data`].
  pub const fn size(&self) -> i64 {
    self.size
  }

  pub const fn data(&self) -> *mut u8 {
    self.data
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_null()
  }

  /// Resets the handle to the empty block.
  pub fn clear(&mut self) {
    *self = Self::empty();
  }

  /// Views the described region as a byte slice.
  ///
  /// Returns an empty slice for an empty block.
  ///
  /// # Safety
  ///
  /// The block must have been produced by a live policy, must not have been
  /// deallocated, and no other reference to the region may be alive for `'a`.
  pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [u8] {
    if self.is_empty() || self.size <= 0 {
      return &mut [];
    }

    unsafe { slice::from_raw_parts_mut(self.data, self.size as usize) }
  }
}

impl Default for Block {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_iff_null() {
    assert!(Block::empty().is_empty());
    assert!(Block::new(32, ptr::null_mut()).is_empty());
    assert_eq!(Block::default(), Block::empty());

    let mut byte = 0u8;
    let block = Block::new(0, &mut byte);
    assert!(!block.is_empty());
  }

  #[test]
  fn test_clear() {
    let mut bytes = [0u8; 4];
    let mut block = Block::new(4, bytes.as_mut_ptr());
    let copy = block;

    block.clear();

    assert!(block.is_empty());
    assert_eq!(block.size(), 0);
    assert_eq!(copy.data(), bytes.as_mut_ptr());
  }

  #[test]
  fn test_as_mut_slice() {
    let mut bytes = [0u8; 4];
    let block = Block::new(4, bytes.as_mut_ptr());

    unsafe {
      block.as_mut_slice().fill(7);
      assert!(Block::empty().as_mut_slice().is_empty());
    }

    assert_eq!(bytes, [7; 4]);
  }
}
