use blockalloc::{
  FallbackAllocator, FreeListAllocator, MallocAllocator, StackAllocator, StatsAllocator,
  TypedAdapterAllocator, allocate, create, deallocate, owns,
};

/// A 64-byte stack first, then recycled 16..=64 byte slots over malloc.
type Pool = FreeListAllocator<MallocAllocator, 16, 64, 8>;
type Policy = StatsAllocator<FallbackAllocator<StackAllocator<64>, Pool>, 16>;

fn print_stats(
  label: &str,
  policy: &Policy,
) {
  println!(
    "[{}] records = {}, total allocated = {} bytes",
    label,
    policy.stats_list_size(),
    policy.total_allocated(),
  );
  for record in policy.stats_list() {
    println!(
      "    {:>+6} bytes  request = {:?}  record = {:?}",
      record.amount(),
      record.request_address(),
      record.record_address(),
    );
  }
}

fn main() {
  env_logger::init();

  let mut policy = create::<Policy>();

  // --------------------------------------------------------------------
  // 1) Small requests land in the stack buffer.
  // --------------------------------------------------------------------
  let mut small = allocate(&mut policy, 6).expect("stack has room");
  println!("\n[1] 6 bytes at {:?}", small.data());
  unsafe { small.as_mut_slice().copy_from_slice(b"block!") };

  // --------------------------------------------------------------------
  // 2) Requests the stack can't hold fall through to the free list.
  // --------------------------------------------------------------------
  let mut medium = allocate(&mut policy, 48).expect("pool has room");
  let mut large = allocate(&mut policy, 4096).expect("malloc has room");
  println!("[2] 48 bytes at {:?}, 4096 bytes at {:?}", medium.data(), large.data());
  print_stats("2", &policy);

  // --------------------------------------------------------------------
  // 3) Releasing a pooled block parks it; the next request reuses it.
  // --------------------------------------------------------------------
  let parked = medium.data();
  deallocate(&mut policy, &mut medium);
  deallocate(&mut policy, &mut large);
  let mut reused = allocate(&mut policy, 32).expect("pool has room");
  println!(
    "\n[3] reused parked slot? {}",
    if reused.data() == parked { "yes" } else { "no, a stats record took it" }
  );

  // --------------------------------------------------------------------
  // 4) Negative sizes are rejected before the policy sees them.
  // --------------------------------------------------------------------
  match allocate(&mut policy, -1) {
    Ok(_) => println!("[4] unexpected success"),
    Err(err) => println!("[4] allocate(-1) -> {} ({err})", err.name()),
  }

  deallocate(&mut policy, &mut reused);
  deallocate(&mut policy, &mut small);
  assert!(!owns(&policy, &small));
  print_stats("4", &policy);

  // --------------------------------------------------------------------
  // 5) The same kind of policy behind a typed, count-based view.
  // --------------------------------------------------------------------
  let mut words = TypedAdapterAllocator::<u32, Pool>::default();
  let values = words.allocate(12).expect("pool has room");
  unsafe {
    for i in 0..12 {
      values.as_ptr().add(i).write(i as u32 * i as u32);
    }
    println!("\n[5] last square = {}", values.as_ptr().add(11).read());
    words.deallocate(values, 12);
  }
}
