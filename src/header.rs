//! One-word block header codec.
//!
//! ```text
//!   bit 63   bits 62..0
//!  ┌──────┬──────────────────────────────┐
//!  │status│        payload size          │
//!  └──────┴──────────────────────────────┘
//! ```
//!
//! A zeroed word decodes as a free block of size 0, which is exactly the
//! sentinel that terminates every arena.

use std::fmt;

/// Raw representation of a header in arena memory.
pub(crate) type Word = u64;

const STATUS_SHIFT: u32 = Word::BITS - 1;

const TAKEN_BIT: Word = 1 << STATUS_SHIFT;

/// Largest payload size a header can encode.
pub const MAX_BLOCK_SIZE: usize = if TAKEN_BIT - 1 > usize::MAX as Word {
  usize::MAX
} else {
  (TAKEN_BIT - 1) as usize
};

/// Whether a block is available to the allocator or owned by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Free,
  Taken,
}

impl fmt::Display for Status {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Status::Free => f.write_str("free"),
      Status::Taken => f.write_str("taken"),
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct Header(Word);

impl Header {
  pub const SENTINEL: Header = Header(0);

  /// Packs `size` and `status` into one word. `size` must not exceed
  /// [`MAX_BLOCK_SIZE`].
  #[inline]
  pub const fn encode(
    size: usize,
    status: Status,
  ) -> Self {
    debug_assert!(size <= MAX_BLOCK_SIZE);
    let status_bit = match status {
      Status::Free => 0,
      Status::Taken => TAKEN_BIT,
    };

    Header(status_bit | size as Word)
  }

  #[inline]
  pub const fn from_word(word: Word) -> Self {
    Header(word)
  }

  #[inline]
  pub const fn word(self) -> Word {
    self.0
  }

  #[inline]
  pub const fn size(self) -> usize {
    (self.0 & !TAKEN_BIT) as usize
  }

  #[inline]
  pub const fn status(self) -> Status {
    if self.0 & TAKEN_BIT == 0 {
      Status::Free
    } else {
      Status::Taken
    }
  }

  #[inline]
  pub const fn is_free(self) -> bool {
    self.0 & TAKEN_BIT == 0
  }

  #[inline]
  pub const fn is_sentinel(self) -> bool {
    self.size() == 0
  }

  #[inline]
  pub const fn with_status(
    self,
    status: Status,
  ) -> Self {
    Header::encode(self.size(), status)
  }

  #[inline]
  pub const fn with_size(
    self,
    size: usize,
  ) -> Self {
    Header::encode(size, self.status())
  }
}

impl fmt::Debug for Header {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Header")
      .field("size", &self.size())
      .field("status", &self.status())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zeroed_word_is_free_sentinel() {
    let header = Header::from_word(0);

    assert!(header.is_free());
    assert!(header.is_sentinel());
    assert_eq!(header, Header::SENTINEL);
  }

  #[test]
  fn status_lives_in_top_bit() {
    let taken = Header::encode(48, Status::Taken);

    assert_eq!(taken.word(), (1 << 63) | 48);
    assert_eq!(taken.size(), 48);
    assert_eq!(taken.status(), Status::Taken);

    let free = taken.with_status(Status::Free);
    assert_eq!(free.word(), 48);
    assert!(free.is_free());
  }

  #[test]
  #[cfg(target_pointer_width = "64")]
  fn max_block_size_round_trips() {
    let header = Header::encode(MAX_BLOCK_SIZE, Status::Taken);

    assert_eq!(header.size(), MAX_BLOCK_SIZE);
    assert!(!header.is_free());
    assert_eq!(MAX_BLOCK_SIZE as u64, (1u64 << 63) - 1);
  }

  #[test]
  fn resize_keeps_status() {
    let header = Header::encode(64, Status::Taken).with_size(16);

    assert_eq!(header.size(), 16);
    assert_eq!(header.status(), Status::Taken);
  }
}
