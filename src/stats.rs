//! Allocation statistics logging.
//!
//! [`StatsAllocator`] forwards every operation to the policy it wraps and
//! appends a [`Record`] for each successful allocation and deallocation.
//! Records are stored in memory obtained from the wrapped policy itself, so
//! the log competes with user allocations for the same pool:
//!
//! ```text
//!   root ──► ┌────────┐    ┌────────┐    ┌────────┐ ◄── tail
//!            │ +R+8   ├──► │ +R+16  ├──► │ +R-8   │
//!            └────────┘    └────────┘    └────────┘
//!             oldest                      newest
//! ```
//!
//! Once `MAX_RECORDS` records exist, the oldest slot is unlinked, rewritten
//! and appended at the tail, so a warmed-up log never allocates again.

use std::{fmt, mem, ptr, time::SystemTime};

use crate::{Allocator, Block};

/// One allocation (positive amount) or deallocation (negative amount).
///
/// The amount includes the size of the record itself.
#[derive(Clone, Copy, Debug)]
pub struct Record {
  record_address: *mut u8,
  request_address: *mut u8,
  amount: i64,
  time: SystemTime,
  next: *mut Record,
}

impl Record {
  /// Bookkeeping overhead charged to every record.
  pub const SIZE: i64 = mem::size_of::<Record>() as i64;

  /// Where the record itself is stored.
  pub fn record_address(&self) -> *mut u8 {
    self.record_address
  }

  /// Address of the block the event refers to.
  pub fn request_address(&self) -> *mut u8 {
    self.request_address
  }

  pub fn amount(&self) -> i64 {
    self.amount
  }

  pub fn time(&self) -> SystemTime {
    self.time
  }
}

/// Iterator over a stats log, oldest record first.
///
/// Stops early at a record the wrapped policy no longer owns.
pub struct Records<'a, A> {
  internal: &'a A,
  next: *const Record,
}

impl<A: Allocator> Iterator for Records<'_, A> {
  type Item = Record;

  fn next(&mut self) -> Option<Record> {
    if self.next.is_null() || !holds(self.internal, self.next) {
      return None;
    }

    let record = unsafe { self.next.read_unaligned() };
    self.next = record.next;
    Some(record)
  }
}

/// Composite policy keeping a bounded log of allocation events.
///
/// Cloning replays the source's records into the clone's own log, so the
/// clone starts with the same history backed by its own storage.
pub struct StatsAllocator<A: Allocator, const MAX_RECORDS: i64> {
  internal: A,
  number_of_records: i64,
  total_allocated: i64,
  root: *mut Record,
  tail: *mut Record,
}

unsafe impl<A: Allocator + Send, const MAX_RECORDS: i64> Send for StatsAllocator<A, MAX_RECORDS> {}

impl<A: Allocator, const MAX_RECORDS: i64> StatsAllocator<A, MAX_RECORDS> {
  const VALID_PARAMS: () = assert!(MAX_RECORDS > 0, "MAX_RECORDS must be positive");

  pub fn new() -> Self {
    Self::with_internal(A::default())
  }

  /// Wraps an already-built internal policy.
  pub fn with_internal(internal: A) -> Self {
    let () = Self::VALID_PARAMS;

    Self {
      internal,
      number_of_records: 0,
      total_allocated: 0,
      root: ptr::null_mut(),
      tail: ptr::null_mut(),
    }
  }

  /// The retained records, oldest first.
  pub fn stats_list(&self) -> Records<'_, A> {
    Records {
      internal: &self.internal,
      next: self.root,
    }
  }

  pub fn stats_list_size(&self) -> i64 {
    self.number_of_records
  }

  /// Net bytes accounted by the retained records, overhead included.
  pub fn total_allocated(&self) -> i64 {
    self.total_allocated
  }

  fn add_record(
    &mut self,
    request_address: *mut u8,
    amount: i64,
    time: SystemTime,
  ) {
    self.discard_stale_log();

    if self.number_of_records >= MAX_RECORDS {
      self.recycle_oldest(request_address, amount, time);
      return;
    }

    let slot = self.internal.allocate(Record::SIZE);
    if slot.is_empty() {
      log::trace!("no room for a stats record, event at {request_address:?} dropped");
      return;
    }

    let node = slot.data().cast::<Record>();
    let record = Record {
      record_address: slot.data(),
      request_address,
      amount: slot.size() + amount,
      time,
      next: ptr::null_mut(),
    };
    unsafe { node.write_unaligned(record) };

    if self.root.is_null() {
      self.root = node;
    } else {
      unsafe { set_next(self.tail, node) };
    }
    self.tail = node;

    self.total_allocated += record.amount;
    self.number_of_records += 1;
  }

  fn recycle_oldest(
    &mut self,
    request_address: *mut u8,
    amount: i64,
    time: SystemTime,
  ) {
    let node = self.root;
    let mut record = unsafe { node.read_unaligned() };
    let evicted = record.amount;

    if node != self.tail {
      self.root = record.next;
      unsafe { set_next(self.tail, node) };
      self.tail = node;
    }

    record.request_address = request_address;
    record.amount = Record::SIZE + amount;
    record.time = time;
    record.next = ptr::null_mut();
    unsafe { node.write_unaligned(record) };

    log::trace!("stats log full, recycled slot at {node:?}");
    self.total_allocated += record.amount - evicted;
  }

  /// Forgets a log whose ends the wrapped policy no longer owns, which
  /// happens when the policy's storage moved after the records were written.
  fn discard_stale_log(&mut self) {
    if self.root.is_null() {
      return;
    }
    if holds(&self.internal, self.root) && holds(&self.internal, self.tail) {
      return;
    }

    log::debug!(
      "discarding {} stale stats records at {:?}",
      self.number_of_records,
      self.root
    );
    self.root = ptr::null_mut();
    self.tail = ptr::null_mut();
    self.number_of_records = 0;
    self.total_allocated = 0;
  }
}

fn holds<A: Allocator>(
  internal: &A,
  node: *const Record,
) -> bool {
  internal.owns(&Block::new(Record::SIZE, node.cast_mut().cast()))
}

unsafe fn set_next(
  node: *mut Record,
  next: *mut Record,
) {
  unsafe {
    let mut record = node.read_unaligned();
    record.next = next;
    node.write_unaligned(record);
  }
}

impl<A: Allocator, const MAX_RECORDS: i64> Allocator for StatsAllocator<A, MAX_RECORDS> {
  fn allocate(
    &mut self,
    size: i64,
  ) -> Block {
    let block = self.internal.allocate(size);
    if !block.is_empty() {
      self.add_record(block.data(), block.size(), SystemTime::now());
    }
    block
  }

  fn deallocate(
    &mut self,
    block: &mut Block,
  ) {
    let released = *block;
    self.internal.deallocate(block);
    if !released.is_empty() && block.is_empty() {
      self.add_record(released.data(), -released.size(), SystemTime::now());
    }
  }

  fn owns(
    &self,
    block: &Block,
  ) -> bool {
    self.internal.owns(block)
  }
}

impl<A: Allocator, const MAX_RECORDS: i64> Default for StatsAllocator<A, MAX_RECORDS> {
  fn default() -> Self {
    Self::new()
  }
}

impl<A: Allocator, const MAX_RECORDS: i64> Clone for StatsAllocator<A, MAX_RECORDS> {
  fn clone(&self) -> Self {
    let mut copy = Self::with_internal(self.internal.clone());
    for record in self.stats_list() {
      copy.add_record(
        record.request_address,
        record.amount - Record::SIZE,
        record.time,
      );
    }
    copy
  }
}

impl<A: Allocator, const MAX_RECORDS: i64> Drop for StatsAllocator<A, MAX_RECORDS> {
  fn drop(&mut self) {
    self.discard_stale_log();
    log::debug!("releasing {} stats records", self.number_of_records);

    let mut current = self.root;
    while !current.is_null() && holds(&self.internal, current) {
      let record = unsafe { current.read_unaligned() };
      let mut slot = Block::new(Record::SIZE, record.record_address);
      self.internal.deallocate(&mut slot);
      current = record.next;
    }
  }
}

impl<A: Allocator + fmt::Debug, const MAX_RECORDS: i64> fmt::Debug
  for StatsAllocator<A, MAX_RECORDS>
{
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("StatsAllocator")
      .field("internal", &self.internal)
      .field("records", &self.number_of_records)
      .field("total_allocated", &self.total_allocated)
      .finish()
  }
}
