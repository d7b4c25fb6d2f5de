//! Process-wide allocator.
//!
//! Owns a single [`Vsa`] for the lifetime of the process (or until
//! [`finalize`]). The backing region is requested from the system once with
//! `calloc(3)` and handed back with `free(3)`; every allocation in between is
//! served from that region only.
//!
//! All calls are serialized behind one lock, so the allocator can be reached
//! from any thread even though [`Vsa`] itself is single threaded.

use std::ptr::NonNull;

use libc::c_void;
use log::{error, info, trace, warn};
use parking_lot::Mutex;

use crate::{
  config::AllocatorConfig,
  error::VsaError,
  vsa::{BlockInfo, Vsa, log_sink, trace_sink},
};

/// Allocation counters kept for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
  /// Successful `allocate`/`callocate` calls plus reallocations that moved
  /// to a new block.
  pub allocations: usize,
  /// Successful `free` calls plus blocks released by `reallocate`.
  pub frees: usize,
}

struct GlobalArena {
  memory: NonNull<u8>,
  vsa: Vsa<'static>,
  stats: AllocatorStats,
  dump_on_finalize: bool,
}

// The region behind `memory` is only ever touched while holding `ARENA`.
unsafe impl Send for GlobalArena {}

static ARENA: Mutex<Option<GlobalArena>> = Mutex::new(None);

/// Initializes the allocator with an arena of `size` bytes. See
/// [`init_with`].
pub fn init(size: usize) -> bool {
  init_with(AllocatorConfig::new(size))
}

/// Initializes the allocator. Returns `false` if it is already initialized,
/// if the system refuses the memory, or if the region is too small to hold
/// an arena.
pub fn init_with(config: AllocatorConfig) -> bool {
  let mut arena = ARENA.lock();

  if arena.is_some() {
    warn!("already initialized! Finalize before initializing again.");
    return false;
  }

  let memory = unsafe { libc::calloc(1, config.arena_size) }.cast::<u8>();
  let Some(memory) = NonNull::new(memory) else {
    error!("cannot initialize with size of memory {}", config.arena_size);
    return false;
  };

  let vsa = match unsafe { Vsa::from_raw_parts(memory.as_ptr(), config.arena_size) } {
    Ok(vsa) => vsa,
    Err(err) => {
      error!("cannot initialize: {}", err);
      unsafe { libc::free(memory.as_ptr().cast::<c_void>()) };
      return false;
    }
  };

  info!(
    "initialized arena of {} bytes at {:p}",
    vsa.capacity(),
    vsa.base()
  );

  *arena = Some(GlobalArena {
    memory,
    vsa,
    stats: AllocatorStats::default(),
    dump_on_finalize: config.dump_on_finalize,
  });

  true
}

/// Releases the arena. Every pointer handed out so far becomes dangling.
/// Does nothing if the allocator is not initialized.
pub fn finalize() {
  let Some(arena) = ARENA.lock().take() else {
    return;
  };

  if arena.dump_on_finalize {
    arena.vsa.dump(trace_sink, "VSA_ALLOCATOR");
    trace!(
      "number of allocations/frees: {} / {}",
      arena.stats.allocations, arena.stats.frees
    );
  }

  unsafe { libc::free(arena.memory.as_ptr().cast::<c_void>()) };
}

pub fn is_initialized() -> bool {
  ARENA.lock().is_some()
}

/// Counters since the last [`init`], or `None` when not initialized.
pub fn stats() -> Option<AllocatorStats> {
  ARENA.lock().as_ref().map(|arena| arena.stats)
}

fn with_arena<T>(f: impl FnOnce(&mut GlobalArena) -> Result<T, VsaError>) -> Result<T, VsaError> {
  let mut guard = ARENA.lock();
  let arena = guard.as_mut().ok_or(VsaError::Uninitialized)?;
  f(arena)
}

/// See [`Vsa::alloc`].
pub fn allocate(bytes: usize) -> Result<NonNull<u8>, VsaError> {
  with_arena(|arena| {
    let ptr = arena.vsa.alloc(bytes)?;
    arena.stats.allocations += 1;
    Ok(ptr)
  })
}

/// See [`Vsa::calloc`].
pub fn callocate(
  count: usize,
  size: usize,
) -> Result<NonNull<u8>, VsaError> {
  with_arena(|arena| {
    let ptr = arena.vsa.calloc(count, size)?;
    arena.stats.allocations += 1;
    Ok(ptr)
  })
}

/// See [`Vsa::realloc`].
///
/// # Safety
///
/// `ptr` must come from this allocator and the allocator must not have been
/// finalized since.
pub unsafe fn reallocate(
  ptr: Option<NonNull<u8>>,
  new_bytes: usize,
) -> Result<Option<NonNull<u8>>, VsaError> {
  with_arena(|arena| {
    let moved = unsafe { arena.vsa.realloc(ptr, new_bytes)? };

    match (ptr, moved) {
      (Some(old), Some(new)) if old != new => {
        arena.stats.allocations += 1;
        arena.stats.frees += 1;
      }
      (Some(_), None) => arena.stats.frees += 1,
      (None, Some(_)) => arena.stats.allocations += 1,
      _ => {}
    }

    Ok(moved)
  })
}

/// See [`Vsa::free`].
///
/// # Safety
///
/// Same contract as [`reallocate`].
pub unsafe fn free(ptr: Option<NonNull<u8>>) -> Result<(), VsaError> {
  with_arena(|arena| {
    unsafe { arena.vsa.free(ptr)? };

    if ptr.is_some() {
      arena.stats.frees += 1;
    }

    Ok(())
  })
}

/// See [`Vsa::usable_size`].
///
/// # Safety
///
/// Same contract as [`reallocate`].
pub unsafe fn usable_size(ptr: NonNull<u8>) -> Result<usize, VsaError> {
  with_arena(|arena| unsafe { arena.vsa.usable_size(ptr) })
}

/// Aligned usable capacity of the arena.
pub fn capacity() -> Result<usize, VsaError> {
  with_arena(|arena| Ok(arena.vsa.capacity()))
}

/// Snapshot of the block chain.
pub fn blocks() -> Result<Vec<BlockInfo>, VsaError> {
  with_arena(|arena| Ok(arena.vsa.blocks().collect()))
}

/// Dumps the arena through the `log` facade.
pub fn dump(label: &str) -> Result<(), VsaError> {
  with_arena(|arena| {
    arena.vsa.dump(log_sink, label);
    Ok(())
  })
}

/// Makes sure the shared arena used by unit tests exists. Tests in this
/// binary never finalize it.
#[cfg(test)]
pub(crate) fn ensure_test_arena() {
  if !is_initialized() {
    init(16 * 1024 * 1024);
  }
}
