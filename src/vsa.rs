use std::{fmt, marker::PhantomData, ptr, ptr::NonNull};

use log::{debug, info, trace, warn};

use crate::{
  align::{self, WORD_SIZE},
  align_down,
  block::Block,
  error::VsaError,
  header::{Header, MAX_BLOCK_SIZE, Status},
};

/// Smallest aligned arena: one header with a one word payload plus the
/// sentinel.
pub const MIN_ARENA_SIZE: usize = 3 * WORD_SIZE;

/// Variable size allocator over a caller supplied memory region.
///
/// The handle is nothing more than the aligned base address and the usable
/// capacity; all other state lives in the block headers inside the region.
/// The region itself is never allocated nor released by [`Vsa`].
///
/// Not thread safe: a [`Vsa`] must be used from one thread at a time, and
/// pointers obtained from one arena must never be passed to another.
pub struct Vsa<'a> {
  base: NonNull<u8>,
  capacity: usize,
  _memory: PhantomData<&'a mut [u8]>,
}

/// One block of the chain as seen by [`Vsa::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the payload, i.e. what `alloc` returned for this block.
  pub address: NonNull<u8>,
  /// Payload size in bytes.
  pub size: usize,
  pub status: Status,
}

impl BlockInfo {
  pub fn is_free(&self) -> bool {
    self.status == Status::Free
  }

  /// Header plus payload.
  pub fn total_size(&self) -> usize {
    WORD_SIZE + self.size
  }
}

/// Iterator over the blocks of an arena, from the base up to (excluding) the
/// sentinel.
pub struct Blocks<'v> {
  current: Block,
  _vsa: PhantomData<&'v ()>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    unsafe {
      let header = self.current.header();

      if header.is_sentinel() {
        return None;
      }

      let info = BlockInfo {
        address: self.current.payload(),
        size: header.size(),
        status: header.status(),
      };
      self.current = self.current.next();

      Some(info)
    }
  }
}

impl<'a> Vsa<'a> {
  /// Builds an arena inside `memory`. The buffer stays borrowed for as long
  /// as the arena lives.
  pub fn new(memory: &'a mut [u8]) -> Result<Self, VsaError> {
    unsafe { Self::from_raw_parts(memory.as_mut_ptr(), memory.len()) }
  }

  /// Builds an arena inside the region of `len` bytes starting at `memory`.
  ///
  /// The base is rounded up to the next word boundary and the length shrunk
  /// accordingly, then rounded down to a whole number of words. A single free
  /// block spanning everything but the sentinel is written at the base.
  ///
  /// # Safety
  ///
  /// `memory` must be valid for reads and writes of `len` bytes for the whole
  /// lifetime `'a`, and nothing else may access it while the arena is alive
  /// except through pointers handed out by the arena.
  pub unsafe fn from_raw_parts(
    memory: *mut u8,
    len: usize,
  ) -> Result<Self, VsaError> {
    let too_small = VsaError::InvalidArenaSize {
      size: len,
      min: MIN_ARENA_SIZE,
    };

    let Some(memory) = NonNull::new(memory) else {
      return Err(too_small);
    };

    let offset = memory.as_ptr().align_offset(WORD_SIZE);
    if offset >= len {
      return Err(too_small);
    }

    let capacity = align_down!(len - offset);
    if capacity < MIN_ARENA_SIZE {
      return Err(too_small);
    }
    let capacity = capacity.min(align_down!(MAX_BLOCK_SIZE) + 2 * WORD_SIZE);

    unsafe {
      let base = memory.add(offset);
      let first = Block::at(base);

      first.set_header(Header::encode(capacity - 2 * WORD_SIZE, Status::Free));
      first.next().set_header(Header::SENTINEL);

      debug!(
        "arena at {:p}: {} usable bytes ({} supplied)",
        base, capacity, len
      );

      Ok(Self {
        base,
        capacity,
        _memory: PhantomData,
      })
    }
  }

  /// Aligned base address of the arena.
  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  /// Aligned usable length of the arena, headers and sentinel included.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Whether `address` lies inside the arena region.
  pub fn contains(
    &self,
    address: *const u8,
  ) -> bool {
    let base = self.base.as_ptr() as usize;
    let address = address as usize;

    address >= base && address < base + self.capacity
  }

  #[inline]
  fn first(&self) -> Block {
    unsafe { Block::at(self.base) }
  }

  /// Walks the chain in address order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      current: self.first(),
      _vsa: PhantomData,
    }
  }

  /// First fit search. Every visited free block first swallows the free
  /// blocks right after it, which is the only place where merging happens.
  unsafe fn find_free_block(
    &mut self,
    size: usize,
  ) -> Option<Block> {
    unsafe {
      let mut current = self.first();

      loop {
        let absorbed = current.try_coalesce();
        if absorbed > 0 {
          debug!(
            "coalesced {} blocks into {:#x}, size = {}",
            absorbed,
            current.address(),
            current.header().size()
          );
        }

        let header = current.header();

        if header.is_sentinel() {
          return None;
        }

        if header.is_free() && header.size() >= size {
          return Some(current);
        }

        current = current.next();
      }
    }
  }

  /// Allocates at least `bytes` bytes, rounded up to a whole word (an empty
  /// request takes one word). The returned pointer is word aligned.
  pub fn alloc(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>, VsaError> {
    let out_of_memory = VsaError::OutOfMemory { requested: bytes };

    let size = align::request_size(bytes)
      .filter(|&size| size <= MAX_BLOCK_SIZE)
      .ok_or(out_of_memory)?;

    unsafe {
      let Some(block) = self.find_free_block(size) else {
        trace!("alloc({}) -> out of memory", bytes);
        return Err(out_of_memory);
      };

      if block.split(size) {
        debug!(
          "split {:#x}: {} bytes, {} left in {:#x}",
          block.address(),
          size,
          block.next().header().size(),
          block.next().address()
        );
      }

      block.set_status(Status::Taken);
      let payload = block.payload();

      trace!(
        "alloc({}) -> {:p}, size = {}",
        bytes,
        payload,
        block.header().size()
      );

      Ok(payload)
    }
  }

  /// Allocates room for `count` elements of `elem_size` bytes and zeroes the
  /// whole block.
  pub fn calloc(
    &mut self,
    count: usize,
    elem_size: usize,
  ) -> Result<NonNull<u8>, VsaError> {
    let bytes = count.checked_mul(elem_size).ok_or(VsaError::Overflow {
      count,
      size: elem_size,
    })?;

    let payload = self.alloc(bytes)?;

    unsafe {
      let size = Block::from_payload(payload).header().size();
      ptr::write_bytes(payload.as_ptr(), 0, size);
    }

    Ok(payload)
  }

  /// Moves the allocation at `ptr` into a fresh block of at least
  /// `new_bytes` bytes, keeping the first `min(old size, new_bytes)` bytes.
  ///
  /// - `new_bytes == 0` frees `ptr` and returns `Ok(None)`.
  /// - `ptr == None` behaves like [`Vsa::alloc`].
  /// - On failure the old block is left untouched.
  ///
  /// Growing never happens in place, even when the neighbouring blocks are
  /// free.
  ///
  /// # Safety
  ///
  /// `ptr` must have been returned by this arena. Pointers outside the
  /// arena and blocks that are already free are rejected, but a pointer into
  /// the middle of a payload cannot be told apart from a block start.
  pub unsafe fn realloc(
    &mut self,
    ptr: Option<NonNull<u8>>,
    new_bytes: usize,
  ) -> Result<Option<NonNull<u8>>, VsaError> {
    unsafe {
      if new_bytes == 0 {
        self.free(ptr)?;
        return Ok(None);
      }

      let Some(ptr) = ptr else {
        return self.alloc(new_bytes).map(Some);
      };

      let block = self.live_block(ptr)?;
      let old_size = block.header().size();

      let fresh = self.alloc(new_bytes)?;
      ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), old_size.min(new_bytes));
      block.set_status(Status::Free);

      trace!(
        "realloc({:p}, {}) -> {:p}, moved {} bytes",
        ptr,
        new_bytes,
        fresh,
        old_size.min(new_bytes)
      );

      Ok(Some(fresh))
    }
  }

  /// Releases the block at `ptr`. `None` is a no-op. Neighbours are not
  /// merged here; that is left to the next allocation that walks past.
  ///
  /// # Safety
  ///
  /// Same contract as [`Vsa::realloc`].
  pub unsafe fn free(
    &mut self,
    ptr: Option<NonNull<u8>>,
  ) -> Result<(), VsaError> {
    let Some(ptr) = ptr else {
      return Ok(());
    };

    unsafe {
      let block = self.live_block(ptr)?;
      block.set_status(Status::Free);
    }

    trace!("free({:p})", ptr);

    Ok(())
  }

  /// Recorded payload size of the live block at `ptr`.
  ///
  /// # Safety
  ///
  /// Same contract as [`Vsa::realloc`].
  pub unsafe fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> Result<usize, VsaError> {
    unsafe { Ok(self.live_block(ptr)?.header().size()) }
  }

  /// Resolves `ptr` to its block, rejecting addresses that cannot be a
  /// payload of this arena and blocks that are not taken.
  unsafe fn live_block(
    &self,
    ptr: NonNull<u8>,
  ) -> Result<Block, VsaError> {
    let address = ptr.as_ptr() as usize;
    let base = self.base.as_ptr() as usize;
    let sentinel = base + self.capacity - WORD_SIZE;

    // Inside the region and word aligned, every address but the first header
    // and the sentinel can start a payload.
    if !self.contains(ptr.as_ptr())
      || !align::is_aligned(address)
      || address == base
      || address == sentinel
    {
      warn!("{:p} does not belong to the arena at {:p}", ptr, self.base);
      return Err(VsaError::ForeignPointer { address });
    }

    unsafe {
      let block = Block::from_payload(ptr);

      if block.header().is_free() {
        warn!("{:p} is not an allocated block", ptr);
        return Err(VsaError::NotAllocated { address });
      }

      Ok(block)
    }
  }

  /// Reports every block from the base up to the sentinel through `sink`,
  /// preceded by a `"{label} DUMP"` line. The first argument passed to the
  /// sink names the reporting component.
  pub fn dump<F>(
    &self,
    mut sink: F,
    label: &str,
  ) where
    F: FnMut(&str, fmt::Arguments<'_>),
  {
    sink("VSA", format_args!("{} DUMP", label));

    for block in self.blocks() {
      sink(
        "VSA",
        format_args!(
          "block ({})\t[{:p}], size: {}",
          block.status, block.address, block.size
        ),
      );
    }
  }
}

impl fmt::Debug for Vsa<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Vsa")
      .field("base", &self.base)
      .field("capacity", &self.capacity)
      .finish()
  }
}

/// Releases the block at `ptr` using nothing but the header in front of it.
/// `None` is a no-op; a block that is not taken is rejected.
///
/// # Safety
///
/// `ptr` must have been returned by a live arena. Unlike [`Vsa::free`] there
/// is no handle to check the address range against.
pub unsafe fn free(ptr: Option<NonNull<u8>>) -> Result<(), VsaError> {
  let Some(ptr) = ptr else {
    return Ok(());
  };

  let address = ptr.as_ptr() as usize;
  if !align::is_aligned(address) {
    return Err(VsaError::ForeignPointer { address });
  }

  unsafe {
    let block = Block::from_payload(ptr);

    if block.header().is_free() {
      warn!("{:p} is not an allocated block", ptr);
      return Err(VsaError::NotAllocated { address });
    }

    block.set_status(Status::Free);
  }

  trace!("free({:p})", ptr);

  Ok(())
}

/// [`Vsa::dump`] sink that forwards every line to the `log` facade.
pub fn log_sink(
  caller: &str,
  args: fmt::Arguments<'_>,
) {
  info!("[{}] {}", caller, args);
}

/// Same as [`log_sink`], at trace level.
pub fn trace_sink(
  caller: &str,
  args: fmt::Arguments<'_>,
) {
  trace!("[{}] {}", caller, args);
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Word aligned backing storage for test arenas.
  struct Memory {
    words: Vec<u64>,
  }

  impl Memory {
    fn new(bytes: usize) -> Self {
      Self {
        words: vec![0; bytes / WORD_SIZE],
      }
    }

    fn bytes(&mut self) -> &mut [u8] {
      let len = self.words.len() * WORD_SIZE;
      unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast(), len) }
    }
  }

  fn chain(vsa: &Vsa<'_>) -> Vec<(usize, Status)> {
    vsa.blocks().map(|block| (block.size, block.status)).collect()
  }

  fn used(vsa: &Vsa<'_>) -> usize {
    vsa.blocks().map(|block| block.total_size()).sum::<usize>() + WORD_SIZE
  }

  #[test]
  fn init_lays_one_free_block_and_sentinel() {
    let mut memory = Memory::new(1024);
    let vsa = Vsa::new(memory.bytes()).unwrap();

    assert_eq!(vsa.capacity(), 1024);
    assert_eq!(chain(&vsa), vec![(1024 - 2 * WORD_SIZE, Status::Free)]);
    assert_eq!(used(&vsa), vsa.capacity());
  }

  #[test]
  fn init_aligns_base_and_length() {
    let mut memory = Memory::new(1024);
    let bytes = memory.bytes();

    // Start one byte in and leave a ragged tail.
    let vsa = Vsa::new(&mut bytes[1..1020]).unwrap();

    assert!(align::is_aligned(vsa.base().as_ptr() as usize));
    assert_eq!(vsa.capacity(), 1008);
    assert_eq!(used(&vsa), vsa.capacity());
  }

  #[test]
  fn init_rejects_undersized_buffers() {
    let mut memory = Memory::new(64);
    let bytes = memory.bytes();

    assert_eq!(
      Vsa::new(&mut bytes[..2 * WORD_SIZE]).unwrap_err(),
      VsaError::InvalidArenaSize {
        size: 2 * WORD_SIZE,
        min: MIN_ARENA_SIZE
      }
    );
    assert!(Vsa::new(&mut bytes[1..MIN_ARENA_SIZE + 1]).is_err());
    assert!(Vsa::new(&mut []).is_err());
    assert!(Vsa::new(&mut bytes[..MIN_ARENA_SIZE]).is_ok());
  }

  #[test]
  fn alloc_rounds_up_to_words() {
    let mut memory = Memory::new(1024);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    let empty = vsa.alloc(0).unwrap();
    let odd = vsa.alloc(13).unwrap();

    unsafe {
      assert_eq!(vsa.usable_size(empty), Ok(WORD_SIZE));
      assert_eq!(vsa.usable_size(odd), Ok(16));
    }
    assert_eq!(used(&vsa), vsa.capacity());
  }

  #[test]
  fn alloc_free_reuses_region() {
    let mut memory = Memory::new(1024);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    let p1 = vsa.alloc(8).unwrap();
    let p2 = vsa.alloc(16).unwrap();

    assert_ne!(p1, p2);
    assert!(p1.as_ptr() as usize + 8 <= p2.as_ptr() as usize);

    unsafe { vsa.free(Some(p1)).unwrap() };

    let p3 = vsa.alloc(8).unwrap();
    assert_eq!(p1, p3);
  }

  #[test]
  fn exact_capacity_boundary() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();
    let largest = vsa.capacity() - 2 * WORD_SIZE;

    assert_eq!(
      vsa.alloc(largest + 1),
      Err(VsaError::OutOfMemory {
        requested: largest + 1
      })
    );

    let ptr = vsa.alloc(largest).unwrap();
    assert_eq!(chain(&vsa), vec![(largest, Status::Taken)]);
    assert!(vsa.alloc(1).is_err());

    unsafe { vsa.free(Some(ptr)).unwrap() };
    assert!(vsa.alloc(largest).is_ok());
  }

  #[test]
  fn small_remainder_stays_with_block() {
    let mut memory = Memory::new(64);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    // 48 byte payload; asking for 40 would leave 8 bytes, one header and
    // no room for a payload word.
    vsa.alloc(40).unwrap();

    assert_eq!(chain(&vsa), vec![(48, Status::Taken)]);
    assert_eq!(used(&vsa), vsa.capacity());
  }

  #[test]
  fn huge_requests_fail_cleanly() {
    let mut memory = Memory::new(64);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    assert!(vsa.alloc(usize::MAX).is_err());
    assert!(vsa.alloc(MAX_BLOCK_SIZE).is_err());
  }

  #[test]
  fn free_does_not_merge_until_next_scan() {
    let mut memory = Memory::new(1024);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    let ptrs: Vec<_> = (0..4).map(|_| vsa.alloc(16).unwrap()).collect();
    for &ptr in &ptrs {
      unsafe { vsa.free(Some(ptr)).unwrap() };
    }

    // Four free blocks of 16 plus the tail, still separate.
    assert_eq!(vsa.blocks().count(), 5);
    assert!(vsa.blocks().all(|block| block.is_free()));

    // The next scan folds them into one block before splitting it again.
    let merged = vsa.alloc(4 * 16 + 3 * WORD_SIZE).unwrap();
    assert_eq!(merged, ptrs[0]);
    assert_eq!(vsa.blocks().count(), 2);
    assert_eq!(used(&vsa), vsa.capacity());
  }

  #[test]
  fn coalescing_skips_taken_blocks() {
    let mut memory = Memory::new(1024);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    let a = vsa.alloc(16).unwrap();
    let b = vsa.alloc(16).unwrap();
    let c = vsa.alloc(16).unwrap();

    unsafe {
      vsa.free(Some(a)).unwrap();
      vsa.free(Some(c)).unwrap();
    }

    // `a` is too small for 40 bytes and cannot absorb `b`.
    let d = vsa.alloc(40).unwrap();
    assert_eq!(d, c);
  }

  #[test]
  fn calloc_zeroes_block() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    let dirty = vsa.alloc(40).unwrap();
    unsafe {
      ptr::write_bytes(dirty.as_ptr(), 0xAB, 40);
      vsa.free(Some(dirty)).unwrap();
    }

    let clean = vsa.calloc(5, 4).unwrap();
    assert_eq!(clean, dirty);

    let bytes = unsafe { std::slice::from_raw_parts(clean.as_ptr(), 24) };
    assert!(bytes.iter().all(|&byte| byte == 0));
  }

  #[test]
  fn calloc_overflow_is_reported() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    assert_eq!(
      vsa.calloc(usize::MAX, 2),
      Err(VsaError::Overflow {
        count: usize::MAX,
        size: 2
      })
    );
    assert_eq!(used(&vsa), vsa.capacity());
  }

  #[test]
  fn realloc_grows_and_preserves_content() {
    let mut memory = Memory::new(1024);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    unsafe {
      let old = vsa.alloc(16).unwrap();
      for i in 0..16 {
        old.as_ptr().add(i).write(i as u8);
      }

      let new = vsa.realloc(Some(old), 64).unwrap().unwrap();
      assert_ne!(old, new);

      for i in 0..16 {
        assert_eq!(new.as_ptr().add(i).read(), i as u8);
      }

      assert_eq!(vsa.free(Some(old)), Err(VsaError::NotAllocated {
        address: old.as_ptr() as usize
      }));
    }
  }

  #[test]
  fn realloc_shrink_copies_only_new_size() {
    let mut memory = Memory::new(1024);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    unsafe {
      let old = vsa.alloc(64).unwrap();
      ptr::write_bytes(old.as_ptr(), 0x5A, 64);

      // The block after the shrunk copy must keep its header intact.
      let new = vsa.realloc(Some(old), 8).unwrap().unwrap();
      assert_eq!(new.as_ptr().read(), 0x5A);
      assert_eq!(vsa.usable_size(new), Ok(8));
      assert_eq!(used(&vsa), vsa.capacity());
    }
  }

  #[test]
  fn realloc_to_zero_frees() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    unsafe {
      let ptr = vsa.alloc(32).unwrap();

      assert_eq!(vsa.realloc(Some(ptr), 0), Ok(None));
      assert!(vsa.blocks().all(|block| block.is_free()));
      assert_eq!(used(&vsa), vsa.capacity());

      assert_eq!(vsa.realloc(None, 0), Ok(None));
    }
  }

  #[test]
  fn realloc_of_none_allocates() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    let ptr = unsafe { vsa.realloc(None, 24) }.unwrap().unwrap();
    assert_eq!(unsafe { vsa.usable_size(ptr) }, Ok(24));
  }

  #[test]
  fn realloc_failure_keeps_old_block() {
    let mut memory = Memory::new(128);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    unsafe {
      let ptr = vsa.alloc(32).unwrap();
      ptr.as_ptr().write(7);

      assert!(matches!(
        vsa.realloc(Some(ptr), 512),
        Err(VsaError::OutOfMemory { .. })
      ));
      assert_eq!(ptr.as_ptr().read(), 7);
      assert_eq!(vsa.usable_size(ptr), Ok(32));
    }
  }

  #[test]
  fn double_free_is_rejected() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    unsafe {
      let ptr = vsa.alloc(8).unwrap();

      assert_eq!(vsa.free(Some(ptr)), Ok(()));
      assert_eq!(
        vsa.free(Some(ptr)),
        Err(VsaError::NotAllocated {
          address: ptr.as_ptr() as usize
        })
      );
      assert_eq!(vsa.free(None), Ok(()));
    }
  }

  #[test]
  fn foreign_pointers_are_rejected() {
    let mut memory = Memory::new(256);
    let mut other = Memory::new(64);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();
    let ptr = vsa.alloc(16).unwrap();

    unsafe {
      let outside = NonNull::new(other.bytes().as_mut_ptr()).unwrap();
      assert!(matches!(
        vsa.free(Some(outside)),
        Err(VsaError::ForeignPointer { .. })
      ));

      let misaligned = ptr.add(1);
      assert!(matches!(
        vsa.realloc(Some(misaligned), 8),
        Err(VsaError::ForeignPointer { .. })
      ));

      assert!(matches!(
        vsa.free(Some(vsa.base())),
        Err(VsaError::ForeignPointer { .. })
      ));
    }
  }

  #[test]
  fn contains_covers_exactly_the_region() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();
    let base = vsa.base().as_ptr();

    assert!(vsa.contains(base));
    assert!(vsa.contains(base.wrapping_add(255)));
    assert!(!vsa.contains(base.wrapping_add(256)));
    assert!(!vsa.contains(base.wrapping_sub(1)));

    let ptr = vsa.alloc(16).unwrap();
    assert!(vsa.contains(ptr.as_ptr()));

    // The sentinel word is inside the region but never a payload.
    let sentinel = NonNull::new(base.wrapping_add(256 - WORD_SIZE)).unwrap();
    assert!(vsa.contains(sentinel.as_ptr()));
    assert!(matches!(
      unsafe { vsa.free(Some(sentinel)) },
      Err(VsaError::ForeignPointer { .. })
    ));
  }

  #[test]
  fn handle_free_checks_status() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();
    let ptr = vsa.alloc(16).unwrap();

    unsafe {
      assert_eq!(free(Some(ptr)), Ok(()));
      assert!(matches!(free(Some(ptr)), Err(VsaError::NotAllocated { .. })));
      assert_eq!(free(None), Ok(()));
    }

    assert!(vsa.blocks().all(|block| block.is_free()));
  }

  #[test]
  fn dump_reports_every_block() {
    let mut memory = Memory::new(256);
    let mut vsa = Vsa::new(memory.bytes()).unwrap();

    let ptr = vsa.alloc(16).unwrap();

    let mut lines = Vec::new();
    vsa.dump(
      |caller, args| lines.push(format!("[{}] {}", caller, args)),
      "test",
    );

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "[VSA] test DUMP");
    assert_eq!(lines[1], format!("[VSA] block (taken)\t[{:p}], size: 16", ptr));
    assert!(lines[2].starts_with("[VSA] block (free)"));
    assert!(lines[2].ends_with(&format!("size: {}", 256 - 16 - 3 * WORD_SIZE)));
  }
}
