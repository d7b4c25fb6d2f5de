/// Size in bytes of one arena word. Every header occupies exactly one word,
/// every payload size is a multiple of it and every pointer handed out by the
/// arena is aligned to it. Fixed regardless of the host's `usize` width.
pub const WORD_SIZE: usize = 8;

/// Rounds the given size up to the next multiple of [`WORD_SIZE`].
///
/// # Examples
///
/// ```rust
/// use vsalloc::align;
///
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(0), 0);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::WORD_SIZE - 1) & !($crate::align::WORD_SIZE - 1)
  };
}

/// Rounds the given size down to the previous multiple of [`WORD_SIZE`].
///
/// ```rust
/// use vsalloc::align_down;
///
/// assert_eq!(align_down!(13), 8);
/// assert_eq!(align_down!(7), 0);
/// ```
#[macro_export]
macro_rules! align_down {
  ($value:expr) => {
    $value & !($crate::align::WORD_SIZE - 1)
  };
}

/// Payload size the arena reserves for a request of `bytes`: rounded up to a
/// whole word, with an empty request taking one word. `None` when rounding
/// would overflow.
pub fn request_size(bytes: usize) -> Option<usize> {
  if bytes == 0 {
    return Some(WORD_SIZE);
  }

  bytes
    .checked_add(WORD_SIZE - 1)
    .map(|rounded| align_down!(rounded))
}

/// Whether `address` sits on a word boundary.
#[inline]
pub fn is_aligned(address: usize) -> bool {
  address & (WORD_SIZE - 1) == 0
}
