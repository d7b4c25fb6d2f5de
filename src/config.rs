//! Configuration of the process-wide allocator.

/// Parameters for [`crate::allocator::init_with`].
///
/// Read once at initialization; changing a config afterwards has no effect
/// on a running allocator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
  /// Number of bytes obtained from the system for the arena.
  ///
  /// Default: 4 MiB. The usable capacity may be a few bytes smaller once
  /// the region is word aligned.
  pub arena_size: usize,

  /// Whether [`crate::allocator::finalize`] dumps every block and the
  /// allocation/free counters through `log` before releasing the arena.
  ///
  /// Default: enabled when the crate is built with the `dump-on-finalize`
  /// feature.
  pub dump_on_finalize: bool,
}

impl AllocatorConfig {
  /// Default arena size: 4 MiB.
  pub const DEFAULT_ARENA_SIZE: usize = 4 * 1024 * 1024;

  /// Config for an arena of `arena_size` bytes, everything else default.
  pub fn new(arena_size: usize) -> Self {
    Self {
      arena_size,
      dump_on_finalize: cfg!(feature = "dump-on-finalize"),
    }
  }

  pub fn with_dump_on_finalize(
    mut self,
    dump_on_finalize: bool,
  ) -> Self {
    self.dump_on_finalize = dump_on_finalize;
    self
  }
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self::new(Self::DEFAULT_ARENA_SIZE)
  }
}
