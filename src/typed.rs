use std::{fmt, marker::PhantomData, mem, ptr::NonNull};

use crate::{AllocError, Allocator, Block};

/// Count-based, typed view over a block policy.
///
/// `allocate(n)` asks the policy for `n * size_of::<T>()` bytes and
/// `deallocate(ptr, n)` rebuilds the same block to hand it back. No standard
/// container allocator trait is implemented; callers drive it directly.
///
/// # Examples
///
/// ```rust
/// use blockalloc::{MallocAllocator, TypedAdapterAllocator};
///
/// let mut adapter = TypedAdapterAllocator::<u64, MallocAllocator>::default();
///
/// let values = adapter.allocate(4).unwrap();
/// unsafe {
///   values.as_ptr().write(42);
///   assert_eq!(values.as_ptr().read(), 42);
///   adapter.deallocate(values, 4);
/// }
/// ```
pub struct TypedAdapterAllocator<T, A> {
  internal: A,
  _element: PhantomData<fn() -> T>,
}

impl<T, A: Allocator> TypedAdapterAllocator<T, A> {
  pub fn new(internal: A) -> Self {
    Self {
      internal,
      _element: PhantomData,
    }
  }

  /// The same adapter shape for another element type.
  ///
  /// No state is carried over: the result wraps a fresh default policy.
  pub fn rebind<U>(&self) -> TypedAdapterAllocator<U, A> {
    TypedAdapterAllocator::default()
  }

  /// Allocates room for `n` values of `T`.
  ///
  /// Zero-byte requests return a dangling, well-aligned pointer without
  /// touching the policy.
  pub fn allocate(
    &mut self,
    n: usize,
  ) -> Result<NonNull<T>, AllocError> {
    let bytes = Self::bytes_for(n).ok_or(AllocError)?;
    if bytes == 0 {
      return Ok(NonNull::dangling());
    }

    let mut block = self.internal.allocate(bytes);
    let Some(data) = NonNull::new(block.data()) else {
      log::debug!("policy could not provide {n} x {}", std::any::type_name::<T>());
      return Err(AllocError);
    };

    let data = data.cast::<T>();
    if !data.is_aligned() {
      log::debug!("policy returned {data:?}, misaligned for {}", std::any::type_name::<T>());
      self.internal.deallocate(&mut block);
      return Err(AllocError);
    }

    Ok(data)
  }

  /// Returns `n` values' worth of memory at `ptr` to the policy.
  ///
  /// # Safety
  ///
  /// `ptr` must come from [`TypedAdapterAllocator::allocate`] on this
  /// adapter (or one sharing its policy) with the same `n`, and must not
  /// have been deallocated already.
  pub unsafe fn deallocate(
    &mut self,
    ptr: NonNull<T>,
    n: usize,
  ) {
    let Some(bytes) = Self::bytes_for(n) else {
      return;
    };
    if bytes == 0 {
      return;
    }

    let mut block = Block::new(bytes, ptr.as_ptr().cast());
    self.internal.deallocate(&mut block);
  }

  fn bytes_for(n: usize) -> Option<i64> {
    n.checked_mul(mem::size_of::<T>())
      .and_then(|bytes| i64::try_from(bytes).ok())
  }
}

impl<T, A: Allocator> Default for TypedAdapterAllocator<T, A> {
  fn default() -> Self {
    Self::new(A::default())
  }
}

impl<T, A: Allocator> Clone for TypedAdapterAllocator<T, A> {
  fn clone(&self) -> Self {
    Self::new(self.internal.clone())
  }
}

impl<T, A: fmt::Debug> fmt::Debug for TypedAdapterAllocator<T, A> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("TypedAdapterAllocator")
      .field("element", &std::any::type_name::<T>())
      .field("internal", &self.internal)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{FallbackAllocator, MallocAllocator, StackAllocator};

  #[test]
  fn test_allocate_values() {
    let mut adapter = TypedAdapterAllocator::<u32, MallocAllocator>::default();

    let values = adapter.allocate(8).unwrap();
    unsafe {
      for i in 0..8 {
        values.as_ptr().add(i).write(i as u32 * 3);
      }
      for i in 0..8 {
        assert_eq!(values.as_ptr().add(i).read(), i as u32 * 3);
      }
      adapter.deallocate(values, 8);
    }
  }

  #[test]
  fn test_exhaustion_is_an_error() {
    let mut adapter = TypedAdapterAllocator::<u16, StackAllocator<8>>::default();

    let values = adapter.allocate(4).unwrap();
    assert_eq!(adapter.allocate(1), Err(AllocError));

    unsafe { adapter.deallocate(values, 4) };
    assert!(adapter.allocate(4).is_ok());
  }

  #[test]
  fn test_overflowing_count() {
    let mut adapter = TypedAdapterAllocator::<u64, MallocAllocator>::default();
    assert_eq!(adapter.allocate(usize::MAX), Err(AllocError));
  }

  #[test]
  fn test_zero_sized_requests() {
    let mut adapter = TypedAdapterAllocator::<(), StackAllocator<2>>::default();

    let unit = adapter.allocate(10).unwrap();
    assert_eq!(unit, NonNull::dangling());
    unsafe { adapter.deallocate(unit, 10) };

    let mut bytes = TypedAdapterAllocator::<u8, StackAllocator<2>>::default();
    assert!(bytes.allocate(0).is_ok());
    assert_eq!(bytes.internal.used(), 0);
  }

  #[test]
  fn test_misaligned_block_is_returned() {
    let mut words = TypedAdapterAllocator::<u64, StackAllocator<32>>::default();
    let _pad = words.internal.allocate(2);
    assert_eq!(words.allocate(1), Err(AllocError));
    assert_eq!(words.internal.used(), 2);
  }

  #[test]
  fn test_rebind() {
    type Policy = FallbackAllocator<StackAllocator<16>, MallocAllocator>;
    let mut bytes = TypedAdapterAllocator::<u8, Policy>::default();
    let _first = bytes.allocate(16).unwrap();

    let mut words = bytes.rebind::<u64>();
    let word = words.allocate(1).unwrap();
    unsafe {
      word.as_ptr().write(u64::MAX);
      assert_eq!(word.as_ptr().read(), u64::MAX);
      words.deallocate(word, 1);
    }
  }
}
