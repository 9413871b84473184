/// Rounds a signed block size up to the next even number.
///
/// Every policy that carves blocks out of a contiguous region keeps its
/// cursor on an even offset, so block sizes are padded with this macro
/// before the cursor is advanced.
///
/// # Examples
///
/// ```rust
/// use blockalloc::align;
///
/// assert_eq!(align!(7_i64), 8);
/// assert_eq!(align!(8_i64), 8);
/// assert_eq!(align!(1_i64), 2);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    (($value) + 1) & !1
  };
}
