use std::ptr::NonNull;

use crate::{
  align::WORD_SIZE,
  header::{Header, Status, Word},
};

/// Cursor over a single block of an arena.
///
/// Blocks carry no links: the next header always starts right after this
/// block's payload, so the chain is walked with pure address arithmetic.
///
/// ```text
///   ┌────────┬───────────────┬────────┬─────────┬────────┐
///   │ header │  payload (N)  │ header │ payload │ 0      │
///   └────────┴───────────────┴────────┴─────────┴────────┘
///   ▲        ▲               ▲                  ▲
///   block    payload()       next()             sentinel
/// ```
///
/// Every method is `unsafe`: the cursor must point at a valid header inside
/// a live arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
  header: NonNull<Word>,
}

impl Block {
  #[inline]
  pub unsafe fn at(address: NonNull<u8>) -> Self {
    Self {
      header: address.cast(),
    }
  }

  /// Block owning the payload that starts at `payload`.
  #[inline]
  pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
    unsafe { Self::at(payload.sub(WORD_SIZE)) }
  }

  #[inline]
  pub fn address(self) -> usize {
    self.header.as_ptr() as usize
  }

  #[inline]
  pub unsafe fn header(self) -> Header {
    unsafe { Header::from_word(self.header.as_ptr().read()) }
  }

  #[inline]
  pub unsafe fn set_header(
    self,
    header: Header,
  ) {
    unsafe { self.header.as_ptr().write(header.word()) }
  }

  #[inline]
  pub unsafe fn set_status(
    self,
    status: Status,
  ) {
    unsafe { self.set_header(self.header().with_status(status)) }
  }

  #[inline]
  pub unsafe fn payload(self) -> NonNull<u8> {
    unsafe { self.header.cast::<u8>().add(WORD_SIZE) }
  }

  #[inline]
  pub unsafe fn next(self) -> Block {
    unsafe {
      let size = self.header().size();
      Block::at(self.header.cast::<u8>().add(WORD_SIZE + size))
    }
  }

  /// Absorbs every free block that directly follows this one, stopping at
  /// the first taken block or at the sentinel. Does nothing unless this block
  /// is itself free and not the sentinel. Returns how many headers were
  /// absorbed; their bytes become part of this block's payload.
  pub unsafe fn try_coalesce(self) -> usize {
    unsafe {
      let mut header = self.header();

      if !header.is_free() || header.is_sentinel() {
        return 0;
      }

      let mut absorbed = 0;

      loop {
        let next = self.next().header();

        if !next.is_free() || next.is_sentinel() {
          break;
        }

        header = header.with_size(header.size() + next.size() + WORD_SIZE);
        self.set_header(header);
        absorbed += 1;
      }

      absorbed
    }
  }

  /// Shrinks this block to `size` bytes and carves a free block out of the
  /// remainder, as long as that remainder can hold a header plus at least
  /// one word. Otherwise the block keeps its whole payload. `size` must be
  /// word aligned and not larger than the current payload.
  pub unsafe fn split(
    self,
    size: usize,
  ) -> bool {
    unsafe {
      let header = self.header();

      let remainder = match header.size().checked_sub(size + WORD_SIZE) {
        Some(remainder) if remainder >= WORD_SIZE => remainder,
        _ => return false,
      };

      self.set_header(header.with_size(size));
      self
        .next()
        .set_header(Header::encode(remainder, Status::Free));

      true
    }
  }
}
