//! Allocator error types.

use thiserror::Error;

/// Errors reported by the arena and the clients built on top of it.
///
/// Exhaustion is an ordinary result: nothing in this crate panics or aborts
/// when memory runs out, and no operation retries or grows the arena.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsaError {
  /// The buffer cannot hold one block plus the sentinel once aligned.
  #[error("arena of {size} bytes is too small, at least {min} aligned bytes are required")]
  InvalidArenaSize {
    /// Length of the buffer as supplied by the caller.
    size: usize,
    /// Minimum aligned length an arena needs.
    min: usize,
  },

  /// No free block is large enough for the request.
  #[error("out of memory: no free block can hold {requested} bytes")]
  OutOfMemory {
    /// Number of bytes requested by the caller.
    requested: usize,
  },

  /// `count * size` does not fit in a `usize`.
  #[error("allocation size overflow: {count} elements of {size} bytes")]
  Overflow {
    /// Number of elements requested.
    count: usize,
    /// Size of one element in bytes.
    size: usize,
  },

  /// The pointer is outside the arena or not on a word boundary.
  #[error("pointer {address:#x} does not belong to this arena")]
  ForeignPointer {
    /// Offending address.
    address: usize,
  },

  /// The pointer's block is not taken: a double free, or a pointer that was
  /// never handed out.
  #[error("pointer {address:#x} is not an allocated block")]
  NotAllocated {
    /// Offending address.
    address: usize,
  },

  /// The process-wide allocator has not been initialized.
  #[error("allocator is not initialized")]
  Uninitialized,

  /// A container was reserved with zero capacity.
  #[error("capacity must be greater than zero")]
  ZeroCapacity,
}
