//! Growable array stored in the process-wide arena.

use std::{
  fmt,
  mem,
  ops::{Deref, DerefMut},
  ptr::{self, NonNull},
  slice,
};

use log::{debug, warn};

use crate::{align::WORD_SIZE, allocator, error::VsaError};

/// Capacity reserved by [`ArenaVec::new`].
pub const INITIAL_CAPACITY: usize = 8;

/// Factor applied to the capacity every time the vector runs out of room.
pub const GROW_FACTOR: usize = 2;

/// Contiguous growable array of `Copy` values whose storage comes from
/// [`crate::allocator`].
///
/// Growth goes through `reallocate`, so the elements move to a new block
/// every time the capacity doubles. A failed growth leaves the vector as it
/// was. The vector must be dropped before the allocator is finalized.
pub struct ArenaVec<T: Copy> {
  ptr: NonNull<T>,
  len: usize,
  capacity: usize,
}

impl<T: Copy> ArenaVec<T> {
  const FITS_WORD_ALIGNMENT: () = assert!(mem::align_of::<T>() <= WORD_SIZE);

  pub fn new() -> Result<Self, VsaError> {
    Self::with_capacity(INITIAL_CAPACITY)
  }

  /// Reserves room for exactly `capacity` elements. Zero is rejected.
  pub fn with_capacity(capacity: usize) -> Result<Self, VsaError> {
    let () = Self::FITS_WORD_ALIGNMENT;

    if capacity == 0 {
      return Err(VsaError::ZeroCapacity);
    }

    let ptr = allocator::allocate(Self::bytes_for(capacity)?)?;

    Ok(Self {
      ptr: ptr.cast(),
      len: 0,
      capacity,
    })
  }

  fn bytes_for(capacity: usize) -> Result<usize, VsaError> {
    capacity
      .checked_mul(mem::size_of::<T>())
      .ok_or(VsaError::Overflow {
        count: capacity,
        size: mem::size_of::<T>(),
      })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Makes room for at least `additional` more elements, doubling the
  /// capacity as many times as needed.
  pub fn reserve(
    &mut self,
    additional: usize,
  ) -> Result<(), VsaError> {
    let overflow = VsaError::Overflow {
      count: self.len,
      size: additional,
    };
    let required = self.len.checked_add(additional).ok_or(overflow)?;

    if required <= self.capacity {
      return Ok(());
    }

    let mut capacity = self.capacity;
    while capacity < required {
      capacity = capacity.checked_mul(GROW_FACTOR).ok_or(overflow)?;
    }

    let bytes = Self::bytes_for(capacity)?.max(1);
    let moved = unsafe { allocator::reallocate(Some(self.ptr.cast()), bytes)? };
    let ptr = moved.ok_or(VsaError::OutOfMemory { requested: bytes })?;

    debug!(
      "vector grew from {} to {} elements, now at {:p}",
      self.capacity, capacity, ptr
    );

    self.ptr = ptr.cast();
    self.capacity = capacity;

    Ok(())
  }

  pub fn push(
    &mut self,
    value: T,
  ) -> Result<(), VsaError> {
    self.reserve(1)?;

    unsafe { self.ptr.add(self.len).write(value) };
    self.len += 1;

    Ok(())
  }

  pub fn pop(&mut self) -> Option<T> {
    if self.len == 0 {
      return None;
    }

    self.len -= 1;
    Some(unsafe { self.ptr.add(self.len).read() })
  }

  /// Appends every element of `values`. Either all of them are appended or,
  /// if the vector cannot grow, none.
  pub fn extend_from_slice(
    &mut self,
    values: &[T],
  ) -> Result<(), VsaError> {
    self.reserve(values.len())?;

    unsafe {
      ptr::copy_nonoverlapping(values.as_ptr(), self.ptr.add(self.len).as_ptr(), values.len());
    }
    self.len += values.len();

    Ok(())
  }

  pub fn clear(&mut self) {
    self.len = 0;
  }

  pub fn as_slice(&self) -> &[T] {
    unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
  }

  pub fn as_mut_slice(&mut self) -> &mut [T] {
    unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
  }
}

impl<T: Copy> Deref for ArenaVec<T> {
  type Target = [T];

  fn deref(&self) -> &[T] {
    self.as_slice()
  }
}

impl<T: Copy> DerefMut for ArenaVec<T> {
  fn deref_mut(&mut self) -> &mut [T] {
    self.as_mut_slice()
  }
}

impl<T: Copy> Drop for ArenaVec<T> {
  fn drop(&mut self) {
    if let Err(err) = unsafe { allocator::free(Some(self.ptr.cast())) } {
      warn!("vector storage at {:p} not released: {}", self.ptr, err);
    }
  }
}

impl<T: Copy + fmt::Debug> fmt::Debug for ArenaVec<T> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_list().entries(self.iter()).finish()
  }
}
