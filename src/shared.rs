use std::{
  any::{Any, TypeId},
  collections::HashMap,
  fmt,
  marker::PhantomData,
  sync::LazyLock,
};

use parking_lot::Mutex;

use crate::{Allocator, Block};

type Slot = &'static (dyn Any + Send + Sync);

/// One slot per `(policy type, id)` pair, created on first use.
static SLOTS: LazyLock<Mutex<HashMap<(TypeId, i64), Slot>>> =
  LazyLock::new(|| Mutex::new(HashMap::new()));

/// Stateless handle to a process-wide instance of `A`.
///
/// Every `SharedAllocator<A, ID>` forwards to the same `A`, so independent
/// call sites can share one pool or one stats log without passing it
/// around. Distinct `ID`s give independent instances of the same policy.
///
/// The shared instance is created lazily and lives until the process exits.
/// Each slot sits behind its own lock, which keeps the handle sound to use
/// from any thread, but the policies themselves make no promises about
/// concurrent use.
pub struct SharedAllocator<A, const ID: i64 = -1> {
  _policy: PhantomData<fn() -> A>,
}

impl<A: Allocator + Send + 'static, const ID: i64> SharedAllocator<A, ID> {
  pub const fn new() -> Self {
    Self {
      _policy: PhantomData,
    }
  }

  /// Runs `f` against the shared instance.
  ///
  /// `f` must not go through this same handle type again, or it deadlocks.
  pub fn with<R>(f: impl FnOnce(&mut A) -> R) -> R {
    f(&mut Self::slot().lock())
  }

  fn slot() -> &'static Mutex<A> {
    let key = (TypeId::of::<A>(), ID);
    let slot = *SLOTS.lock().entry(key).or_insert_with(|| {
      log::debug!("creating shared slot {ID} for {}", std::any::type_name::<A>());
      let slot: &'static Mutex<A> = Box::leak(Box::new(Mutex::new(A::default())));
      slot as Slot
    });

    match slot.downcast_ref::<Mutex<A>>() {
      Some(slot) => slot,
      None => unreachable!("shared slot keyed by a foreign type"),
    }
  }
}

impl<A: Allocator + Send + 'static, const ID: i64> Allocator for SharedAllocator<A, ID> {
  fn allocate(
    &mut self,
    size: i64,
  ) -> Block {
    Self::slot().lock().allocate(size)
  }

  fn deallocate(
    &mut self,
    block: &mut Block,
  ) {
    Self::slot().lock().deallocate(block);
  }

  fn owns(
    &self,
    block: &Block,
  ) -> bool {
    Self::slot().lock().owns(block)
  }
}

impl<A: Allocator + Send + 'static, const ID: i64> Default for SharedAllocator<A, ID> {
  fn default() -> Self {
    Self::new()
  }
}

impl<A, const ID: i64> Clone for SharedAllocator<A, ID> {
  fn clone(&self) -> Self {
    Self {
      _policy: PhantomData,
    }
  }
}

impl<A, const ID: i64> fmt::Debug for SharedAllocator<A, ID> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("SharedAllocator")
      .field("policy", &std::any::type_name::<A>())
      .field("id", &ID)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{MallocAllocator, StackAllocator, StatsAllocator};

  #[test]
  fn test_instances_share_state() {
    let mut first = SharedAllocator::<StackAllocator<64>, 100>::new();
    let mut second = SharedAllocator::<StackAllocator<64>, 100>::new();

    let mut block = first.allocate(32);
    assert!(second.owns(&block));
    assert_eq!(SharedAllocator::<StackAllocator<64>, 100>::with(|s| s.used()), 32);

    second.deallocate(&mut block);
    assert!(block.is_empty());
    assert_eq!(SharedAllocator::<StackAllocator<64>, 100>::with(|s| s.used()), 0);
  }

  #[test]
  fn test_ids_are_independent() {
    let mut left = SharedAllocator::<StackAllocator<16>, 101>::new();
    let right = SharedAllocator::<StackAllocator<16>, 102>::new();

    let block = left.allocate(16);
    assert!(left.owns(&block));
    assert!(!right.owns(&block));
    assert!(left.allocate(2).is_empty());
  }

  #[test]
  fn test_shared_stats_log() {
    type Log = StatsAllocator<MallocAllocator, 16>;
    let mut first = SharedAllocator::<Log, 103>::new();
    let mut second = first.clone();

    let mut a = first.allocate(8);
    let mut b = second.allocate(8);
    first.deallocate(&mut b);
    second.deallocate(&mut a);

    assert_eq!(SharedAllocator::<Log, 103>::with(|log| log.stats_list_size()), 4);
  }
}
