//! NUL-terminated string builder backed by [`ArenaVec`].

use std::{
  ffi::{CStr, FromBytesWithNulError},
  fmt, str,
};

use crate::{error::VsaError, vec::ArenaVec};

/// Growable UTF-8 string kept NUL-terminated at all times, so its contents
/// can be handed to C as-is through [`StringBuilder::as_c_str`].
pub struct StringBuilder {
  data: ArenaVec<u8>,
}

impl StringBuilder {
  pub fn new() -> Result<Self, VsaError> {
    Self::from_vec(ArenaVec::new()?)
  }

  /// Room for `capacity` bytes of text before the first reallocation.
  pub fn with_capacity(capacity: usize) -> Result<Self, VsaError> {
    let capacity = capacity.checked_add(1).ok_or(VsaError::Overflow {
      count: capacity,
      size: 1,
    })?;

    Self::from_vec(ArenaVec::with_capacity(capacity)?)
  }

  fn from_vec(mut data: ArenaVec<u8>) -> Result<Self, VsaError> {
    data.push(0)?;
    Ok(Self { data })
  }

  /// Length in bytes, terminator excluded.
  pub fn len(&self) -> usize {
    self.data.len() - 1
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn push(
    &mut self,
    ch: char,
  ) -> Result<(), VsaError> {
    self.push_str(ch.encode_utf8(&mut [0; 4]))
  }

  /// Appends `text`. On failure the builder is left unchanged.
  pub fn push_str(
    &mut self,
    text: &str,
  ) -> Result<(), VsaError> {
    self.data.pop();
    let appended = self.data.extend_from_slice(text.as_bytes());

    // The terminator's slot is still reserved, this never reallocates.
    self.data.push(0)?;

    appended
  }

  pub fn as_str(&self) -> &str {
    // Only whole `&str`s are ever appended.
    unsafe { str::from_utf8_unchecked(&self.data[..self.len()]) }
  }

  /// The contents as a C string. Fails if the text itself contains a NUL.
  pub fn as_c_str(&self) -> Result<&CStr, FromBytesWithNulError> {
    CStr::from_bytes_with_nul(&self.data)
  }

  pub fn clear(&mut self) {
    self.data.clear();
    // Capacity is at least one, so the terminator always fits.
    let _ = self.data.push(0);
  }
}

impl fmt::Write for StringBuilder {
  fn write_str(
    &mut self,
    s: &str,
  ) -> fmt::Result {
    self.push_str(s).map_err(|_| fmt::Error)
  }
}

impl fmt::Display for StringBuilder {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Debug for StringBuilder {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    fmt::Debug::fmt(self.as_str(), f)
  }
}
