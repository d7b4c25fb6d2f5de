//! Open addressing hash table stored in the process-wide arena.
//!
//! Linear probing over a power-of-two array of slots. Removing an entry
//! leaves a tombstone so that probe sequences running through it stay
//! intact; tombstones count against the load factor and are dropped the next
//! time the table is resized.

use std::{
  borrow::Borrow,
  fmt,
  hash::{BuildHasher, Hash},
  mem,
  ptr::{self, NonNull},
  slice,
};

pub use fnv::FnvBuildHasher;
use log::{debug, warn};

use crate::{align::WORD_SIZE, allocator, error::VsaError};

/// Smallest slot array a table allocates.
pub const MIN_CAPACITY: usize = 8;

/// Factor applied to the slot count when the table grows.
pub const GROW_FACTOR: usize = 2;

/// The table grows once live entries plus tombstones reach 3/4 of the slots.
const MAX_LOAD_NUMERATOR: usize = 3;
const MAX_LOAD_DENOMINATOR: usize = 4;

enum Slot<K, V> {
  Empty,
  Tombstone,
  Occupied(K, V),
}

/// Hash map with tombstone deletion whose slots live in
/// [`crate::allocator`]. No memory is taken until the first insert. The
/// table must be dropped before the allocator is finalized.
pub struct Table<K, V, S = FnvBuildHasher> {
  slots: Option<NonNull<Slot<K, V>>>,
  capacity: usize,
  len: usize,
  tombstones: usize,
  hasher: S,
}

impl<K, V> Table<K, V, FnvBuildHasher> {
  pub fn new() -> Self {
    Self::with_hasher(FnvBuildHasher::default())
  }
}

impl<K, V> Default for Table<K, V, FnvBuildHasher> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V, S> Table<K, V, S> {
  const FITS_WORD_ALIGNMENT: () = assert!(mem::align_of::<Slot<K, V>>() <= WORD_SIZE);

  pub fn with_hasher(hasher: S) -> Self {
    Self {
      slots: None,
      capacity: 0,
      len: 0,
      tombstones: 0,
      hasher,
    }
  }

  /// Number of live entries.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Number of slots, zero before the first insert.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn tombstones(&self) -> usize {
    self.tombstones
  }

  fn slots(&self) -> &[Slot<K, V>] {
    match self.slots {
      Some(slots) => unsafe { slice::from_raw_parts(slots.as_ptr(), self.capacity) },
      None => &[],
    }
  }

  fn slots_mut(&mut self) -> &mut [Slot<K, V>] {
    match self.slots {
      Some(slots) => unsafe { slice::from_raw_parts_mut(slots.as_ptr(), self.capacity) },
      None => &mut [],
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
    self.slots().iter().filter_map(|slot| match slot {
      Slot::Occupied(key, value) => Some((key, value)),
      _ => None,
    })
  }

  /// Drops every entry and gives the slots back to the allocator.
  pub fn clear(&mut self) {
    let Some(slots) = self.slots.take() else {
      return;
    };

    unsafe {
      ptr::drop_in_place(ptr::slice_from_raw_parts_mut(slots.as_ptr(), self.capacity));

      if let Err(err) = allocator::free(Some(slots.cast())) {
        warn!("table storage at {:p} not released: {}", slots, err);
      }
    }

    self.capacity = 0;
    self.len = 0;
    self.tombstones = 0;
  }

  /// Allocates `capacity` empty slots.
  fn allocate_slots(capacity: usize) -> Result<NonNull<Slot<K, V>>, VsaError> {
    let () = Self::FITS_WORD_ALIGNMENT;

    let slots = allocator::callocate(capacity, mem::size_of::<Slot<K, V>>())?.cast::<Slot<K, V>>();

    for index in 0..capacity {
      unsafe { slots.add(index).write(Slot::Empty) };
    }

    Ok(slots)
  }
}

impl<K, V, S> Table<K, V, S>
where
  K: Hash + Eq,
  S: BuildHasher,
{
  fn hash<Q>(
    &self,
    key: &Q,
  ) -> usize
  where
    Q: Hash + ?Sized,
  {
    self.hasher.hash_one(key) as usize
  }

  /// Index of the slot holding `key`, if any.
  fn find<Q>(
    &self,
    key: &Q,
  ) -> Option<usize>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let slots = self.slots();
    if self.len == 0 {
      return None;
    }

    let mask = self.capacity - 1;
    let mut index = self.hash(key) & mask;

    loop {
      match &slots[index] {
        Slot::Empty => return None,
        Slot::Occupied(candidate, _) if <K as Borrow<Q>>::borrow(candidate) == key => {
          return Some(index);
        }
        _ => {}
      }

      index = (index + 1) & mask;
    }
  }

  /// Index where `key` lives, or where it should be inserted: the first
  /// tombstone on its probe sequence, else the empty slot ending it.
  fn probe(
    slots: &[Slot<K, V>],
    hash: usize,
    key: &K,
  ) -> usize {
    let mask = slots.len() - 1;
    let mut index = hash & mask;
    let mut tombstone = None;

    loop {
      match &slots[index] {
        Slot::Empty => return tombstone.unwrap_or(index),
        Slot::Tombstone => {
          tombstone.get_or_insert(index);
        }
        Slot::Occupied(candidate, _) if candidate == key => return index,
        Slot::Occupied(..) => {}
      }

      index = (index + 1) & mask;
    }
  }

  fn needs_growth(&self) -> bool {
    (self.len + self.tombstones + 1) * MAX_LOAD_DENOMINATOR > self.capacity * MAX_LOAD_NUMERATOR
  }

  /// Moves every live entry into a fresh slot array of `capacity` slots.
  fn resize(
    &mut self,
    capacity: usize,
  ) -> Result<(), VsaError> {
    let fresh = Self::allocate_slots(capacity)?;
    let new_slots = unsafe { slice::from_raw_parts_mut(fresh.as_ptr(), capacity) };

    if let Some(old) = self.slots {
      for index in 0..self.capacity {
        let slot = unsafe { old.add(index).read() };

        if let Slot::Occupied(key, value) = slot {
          let target = Self::probe(new_slots, self.hash(&key), &key);
          new_slots[target] = Slot::Occupied(key, value);
        }
      }

      if let Err(err) = unsafe { allocator::free(Some(old.cast())) } {
        warn!("table storage at {:p} not released: {}", old, err);
      }
    }

    debug!(
      "table resized from {} to {} slots, {} tombstones dropped",
      self.capacity, capacity, self.tombstones
    );

    self.slots = Some(fresh);
    self.capacity = capacity;
    self.tombstones = 0;

    Ok(())
  }

  /// Inserts `value` under `key`. Returns `true` when the key is new. For a
  /// key already present only the value is replaced.
  pub fn insert(
    &mut self,
    key: K,
    value: V,
  ) -> Result<bool, VsaError> {
    if self.needs_growth() {
      let capacity = if self.capacity < MIN_CAPACITY {
        MIN_CAPACITY
      } else {
        self.capacity.checked_mul(GROW_FACTOR).ok_or(VsaError::Overflow {
          count: self.capacity,
          size: GROW_FACTOR,
        })?
      };
      self.resize(capacity)?;
    }

    let hash = self.hash(&key);
    let index = Self::probe(self.slots(), hash, &key);

    let reuses_tombstone = match &mut self.slots_mut()[index] {
      Slot::Occupied(_, existing) => {
        *existing = value;
        return Ok(false);
      }
      Slot::Tombstone => true,
      Slot::Empty => false,
    };

    self.slots_mut()[index] = Slot::Occupied(key, value);
    self.len += 1;
    if reuses_tombstone {
      self.tombstones -= 1;
    }

    Ok(true)
  }

  pub fn get<Q>(
    &self,
    key: &Q,
  ) -> Option<&V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let index = self.find(key)?;

    match &self.slots()[index] {
      Slot::Occupied(_, value) => Some(value),
      _ => None,
    }
  }

  pub fn get_mut<Q>(
    &mut self,
    key: &Q,
  ) -> Option<&mut V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let index = self.find(key)?;

    match &mut self.slots_mut()[index] {
      Slot::Occupied(_, value) => Some(value),
      _ => None,
    }
  }

  pub fn contains_key<Q>(
    &self,
    key: &Q,
  ) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.find(key).is_some()
  }

  /// Removes `key`, leaving a tombstone in its slot.
  pub fn remove<Q>(
    &mut self,
    key: &Q,
  ) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let index = self.find(key)?;
    let slot = mem::replace(&mut self.slots_mut()[index], Slot::Tombstone);

    self.len -= 1;
    self.tombstones += 1;

    match slot {
      Slot::Occupied(_, value) => Some(value),
      _ => None,
    }
  }

  /// Inserts a copy of every entry of `other`.
  pub fn extend_from<S2>(
    &mut self,
    other: &Table<K, V, S2>,
  ) -> Result<(), VsaError>
  where
    K: Clone,
    V: Clone,
  {
    for (key, value) in other.iter() {
      self.insert(key.clone(), value.clone())?;
    }

    Ok(())
  }
}

impl<K, V, S> Drop for Table<K, V, S> {
  fn drop(&mut self) {
    self.clear();
  }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Table<K, V, S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_map().entries(self.iter()).finish()
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::Cell, rc::Rc};

  use super::*;
  use crate::allocator::ensure_test_arena;

  #[test]
  fn default_hasher_is_deterministic() {
    ensure_test_arena();

    // Same keys, same insertion order: two default tables lay their slots
    // out identically.
    let mut left = Table::new();
    let mut right: Table<&str, usize> = Table::default();
    for (at, key) in ["alpha", "beta", "gamma", "delta", "epsilon"].into_iter().enumerate() {
      left.insert(key, at).unwrap();
      right.insert(key, at).unwrap();
    }

    let left: Vec<_> = left.iter().collect();
    let right: Vec<_> = right.iter().collect();
    assert_eq!(left, right);
    assert_eq!(left.len(), 5);
  }

  #[test]
  fn insert_get_overwrite() {
    ensure_test_arena();

    let mut table: Table<&str, i32> = Table::new();
    assert_eq!(table.capacity(), 0);
    assert_eq!(table.get("missing"), None);

    assert_eq!(table.insert("one", 1), Ok(true));
    assert_eq!(table.insert("two", 2), Ok(true));
    assert_eq!(table.insert("one", 11), Ok(false));

    assert_eq!(table.len(), 2);
    assert_eq!(table.capacity(), MIN_CAPACITY);
    assert_eq!(table.get("one"), Some(&11));
    assert_eq!(table.get("two"), Some(&2));
    assert!(!table.contains_key("three"));

    *table.get_mut("two").unwrap() += 40;
    assert_eq!(table.get("two"), Some(&42));
  }

  #[test]
  fn grows_at_three_quarters_load() {
    ensure_test_arena();

    let mut table = Table::new();
    for key in 0..6u32 {
      table.insert(key, key * 2).unwrap();
    }
    assert_eq!(table.capacity(), 8);

    table.insert(6, 12).unwrap();
    assert_eq!(table.capacity(), 16);

    for key in 7..1000u32 {
      table.insert(key, key * 2).unwrap();
    }

    assert_eq!(table.len(), 1000);
    for key in 0..1000u32 {
      assert_eq!(table.get(&key), Some(&(key * 2)));
    }
  }

  #[test]
  fn remove_leaves_probe_chains_intact() {
    ensure_test_arena();

    let mut table = Table::new();
    for key in 0..5u64 {
      table.insert(key, key).unwrap();
    }

    assert_eq!(table.remove(&2), Some(2));
    assert_eq!(table.remove(&2), None);
    assert_eq!(table.len(), 4);
    assert_eq!(table.tombstones(), 1);

    for key in [0u64, 1, 3, 4] {
      assert_eq!(table.get(&key), Some(&key));
    }

    // A new key may land on the tombstone.
    assert_eq!(table.insert(2, 20), Ok(true));
    assert_eq!(table.get(&2), Some(&20));
  }

  #[test]
  fn resize_drops_tombstones() {
    ensure_test_arena();

    let mut table = Table::new();
    for key in 0..5u32 {
      table.insert(key, ()).unwrap();
    }
    for key in 0..4u32 {
      table.remove(&key);
    }
    assert_eq!(table.tombstones(), 4);

    for key in 10..20u32 {
      table.insert(key, ()).unwrap();
    }

    assert!(table.tombstones() < 4);
    assert_eq!(table.len(), 11);
    assert!(table.contains_key(&4));
  }

  #[test]
  fn owned_keys_and_borrowed_lookups() {
    ensure_test_arena();

    let mut table: Table<String, usize> = Table::new();
    for word in ["alpha", "beta", "gamma"] {
      table.insert(word.to_string(), word.len()).unwrap();
    }

    assert_eq!(table.get("beta"), Some(&4));
    assert_eq!(table.remove("gamma"), Some(5));
    assert_eq!(table.iter().count(), 2);
  }

  #[test]
  fn extend_from_copies_entries() {
    ensure_test_arena();

    let mut src = Table::new();
    src.insert(1, "a").unwrap();
    src.insert(2, "b").unwrap();

    let mut dest = Table::new();
    dest.insert(2, "z").unwrap();
    dest.insert(3, "c").unwrap();

    dest.extend_from(&src).unwrap();

    assert_eq!(dest.len(), 3);
    assert_eq!(dest.get(&1), Some(&"a"));
    assert_eq!(dest.get(&2), Some(&"b"));
    assert_eq!(src.len(), 2);
  }

  #[derive(Clone)]
  struct DropCounter(Rc<Cell<usize>>);

  impl Drop for DropCounter {
    fn drop(&mut self) {
      self.0.set(self.0.get() + 1);
    }
  }

  #[test]
  fn values_are_dropped_exactly_once() {
    ensure_test_arena();

    let drops = Rc::new(Cell::new(0));

    {
      let mut table = Table::new();
      for key in 0..20u32 {
        table.insert(key, DropCounter(drops.clone())).unwrap();
      }

      // Overwriting drops the old value, removing hands the value back.
      table.insert(0, DropCounter(drops.clone())).unwrap();
      assert_eq!(drops.get(), 1);

      drop(table.remove(&1));
      assert_eq!(drops.get(), 2);
    }

    assert_eq!(drops.get(), 21);
  }

  #[test]
  fn clear_releases_storage() {
    ensure_test_arena();

    let mut table = Table::new();
    table.insert(1u8, 1u8).unwrap();
    table.clear();

    assert!(table.is_empty());
    assert_eq!(table.capacity(), 0);
    assert_eq!(table.get(&1), None);

    table.insert(2, 2).unwrap();
    assert_eq!(table.get(&2), Some(&2));
  }
}
