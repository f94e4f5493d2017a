use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::DefaultHashBuilder;
use crate::probe::probe;
use crate::slot_array::Item;
use crate::slot_array::SLOTS_PER_ITEM;
use crate::slot_array::SlotArray;
use crate::slot_array::SlotState;

/// Folds a 64-bit digest into the 32-bit hash driving the probe sequence.
#[inline(always)]
fn fold_hash(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// Yields `(slot_index, value)` for every occupied slot, in slot order.
fn occupied_slots<T, const N: usize>(
    array: &SlotArray<T, N>,
) -> impl Iterator<Item = (usize, &T)> {
    array
        .items()
        .iter()
        .enumerate()
        .flat_map(|(item_index, item)| {
            (0..SLOTS_PER_ITEM).filter_map(move |offset| {
                item.value(offset)
                    .map(|value| (item_index * SLOTS_PER_ITEM + offset, value))
            })
        })
}

/// Outcome of probing for a value that may be inserted.
enum Slot {
    Present,
    Vacant(usize, usize),
}

/// An open-addressing hash set storing its values in groups of four slots.
///
/// `HashSet<T, S, N>` stores unique values of type `T` where `T` implements
/// `Hash + Eq`, hashing them with the builder `S`. Up to `N` items (four slots
/// each) are kept inline, so small sets never touch the heap.
///
/// Removal leaves a tombstone in place of the value so that probe chains
/// running through the slot stay intact. The set grows once occupied plus
/// tombstoned slots reach half of its slots; growing rebuilds the storage and
/// drops every tombstone.
///
/// Iteration order is unspecified and changes whenever the set is rebuilt.
///
/// # Examples
///
/// ```rust
/// # #[cfg(any(feature = "std", feature = "foldhash"))]
/// # {
/// use quad_set::HashSet;
///
/// let mut set: HashSet<&str> = HashSet::new();
/// assert!(set.insert("apple"));
/// assert!(!set.insert("apple"));
/// assert!(set.contains(&"apple"));
///
/// set.remove(&"apple");
/// assert!(set.is_empty());
/// # }
/// ```
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder, const N: usize = 1> {
    array: SlotArray<T, N>,
    hash_builder: S,
}

impl<T, S, const N: usize> PartialEq for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, const N: usize> Eq for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S, const N: usize> Debug for HashSet<T, S, N>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S, const N: usize> HashSet<T, S, N> {
    /// Returns the number of values in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    #[inline]
    pub fn len(&self) -> usize {
        self.array.slots_set()
    }

    /// Returns `true` if the set contains no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of values the set can hold before an insertion
    /// rebuilds it, assuming no tombstones are present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::with_capacity(100);
    /// assert!(set.capacity() >= 100);
    /// # }
    /// ```
    #[inline]
    pub fn capacity(&self) -> usize {
        self.array.slots_total() / 2
    }

    /// Returns `true` while the values are stored in the inline buffer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let mut set: HashSet<u32> = HashSet::new();
    /// set.insert(1);
    /// assert!(set.is_inline());
    ///
    /// set.extend(0..100);
    /// assert!(!set.is_inline());
    /// # }
    /// ```
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.array.is_inline()
    }

    /// Removes every value and returns the set to its initial inline state.
    ///
    /// Unlike most hash sets this releases heap storage.
    pub fn clear(&mut self) {
        self.array = SlotArray::default();
    }

    /// Returns an iterator over the values of the set in slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let set: HashSet<i32> = [1, 2, 3].into();
    /// let mut values: Vec<i32> = set.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, [1, 2, 3]);
    /// # }
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            items: self.array.items(),
            slot: 0,
            remaining: self.len(),
        }
    }

    /// Copies every value into a freshly allocated `Vec`, in slot order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut values = Vec::with_capacity(self.len());
        values.extend(self.iter().cloned());
        values
    }
}

impl<T, S, const N: usize> HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty set with an inline buffer of `N` items, using the
    /// given hasher builder.
    ///
    /// [`with_hasher`](HashSet::with_hasher) is the same constructor for the
    /// default single-item buffer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use quad_set::HashSet;
    ///
    /// let mut set: HashSet<u32, _, 4> = HashSet::with_inline_hasher(RandomState::new());
    /// set.extend(0..7);
    /// assert!(set.is_inline());
    /// # }
    /// ```
    pub fn with_inline_hasher(hash_builder: S) -> Self {
        Self {
            array: SlotArray::default(),
            hash_builder,
        }
    }

    /// Creates an empty set with an inline buffer of `N` items, able to hold
    /// at least `capacity` values before it has to grow.
    ///
    /// Capacities the default array already covers keep the set inline.
    pub fn with_inline_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let array = if capacity <= SLOTS_PER_ITEM / 2 {
            SlotArray::default()
        } else {
            SlotArray::reserved_for(capacity)
        };

        Self {
            array,
            hash_builder,
        }
    }

    #[inline(always)]
    fn hash(&self, value: &T) -> u32 {
        fold_hash(self.hash_builder.hash_one(value))
    }

    /// Grows the set so that at least `min_usable_slots` values fit without
    /// another rebuild. Never shrinks the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.reserve(64);
    /// assert!(set.capacity() >= 64);
    /// # }
    /// ```
    pub fn reserve(&mut self, min_usable_slots: usize) {
        if SlotArray::<T, N>::exponent_for(min_usable_slots) > self.array.item_exponent() {
            self.grow(min_usable_slots);
        }
    }

    /// Adds a value to the set.
    ///
    /// Returns `true` if the value was newly inserted and `false` if an equal
    /// value was already present, in which case the set is left unchanged and
    /// `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.insert(37), true);
    /// assert_eq!(set.insert(37), false);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        self.ensure_can_add();

        let hash = self.hash(&value);
        let slot = probe(&self.array, hash, |item, (item_index, offset)| {
            match item.state(offset) {
                SlotState::Empty => Some(Slot::Vacant(item_index, offset)),
                SlotState::Occupied if item.has_value(offset, &value) => Some(Slot::Present),
                _ => None,
            }
        });

        match slot {
            Slot::Present => false,
            Slot::Vacant(item_index, offset) => {
                self.array.item_mut(item_index).insert(offset, value);
                self.array.empty_to_set();
                true
            }
        }
    }

    /// Adds a value that is known not to be in the set, skipping the
    /// duplicate check.
    ///
    /// The value goes into the first empty or tombstoned slot on its probe
    /// chain. Adding a value that is already present is checked in debug
    /// builds only; in release builds it may leave a duplicate in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.add_new(5);
    /// assert!(set.contains(&5));
    /// # }
    /// ```
    pub fn add_new(&mut self, value: T) {
        debug_assert!(!self.contains(&value), "add_new called with a present value");
        self.ensure_can_add();

        let hash = self.hash(&value);
        let (item_index, offset, state) = probe(&self.array, hash, |item, (item_index, offset)| {
            match item.state(offset) {
                SlotState::Occupied => None,
                state => Some((item_index, offset, state)),
            }
        });

        self.array.item_mut(item_index).insert(offset, value);
        if state == SlotState::Tombstone {
            self.array.dummy_to_set();
        } else {
            self.array.empty_to_set();
        }
    }

    /// Inserts every value yielded by `values`.
    pub fn add_multiple(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.insert(value);
        }
    }

    /// Adds every value yielded by `values` with [`add_new`](Self::add_new).
    /// The values must be distinct and absent from the set.
    pub fn add_multiple_new(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.add_new(value);
        }
    }

    /// Returns `true` if the set contains a value equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let set: HashSet<i32> = [1, 2].into();
    /// assert!(set.contains(&1));
    /// assert!(!set.contains(&3));
    /// # }
    /// ```
    pub fn contains(&self, value: &T) -> bool {
        let hash = self.hash(value);
        probe(&self.array, hash, |item, (_, offset)| match item.state(offset) {
            SlotState::Empty => Some(false),
            SlotState::Occupied if item.has_value(offset, value) => Some(true),
            _ => None,
        })
    }

    /// Removes a value that is known to be in the set, leaving a tombstone.
    ///
    /// Removing an absent value is checked in debug builds only; in release
    /// builds it does nothing. Use [`take`](Self::take) when the value may be
    /// missing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = [1, 2].into();
    /// set.remove(&1);
    /// assert!(!set.contains(&1));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn remove(&mut self, value: &T) {
        debug_assert!(self.contains(value), "remove called with an absent value");
        self.take(value);
    }

    /// Removes and returns the value equal to `value`, if present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let mut set: HashSet<String> = HashSet::new();
    /// set.insert("a".to_string());
    /// assert_eq!(set.take(&"a".to_string()), Some("a".to_string()));
    /// assert_eq!(set.take(&"a".to_string()), None);
    /// # }
    /// ```
    pub fn take(&mut self, value: &T) -> Option<T> {
        let hash = self.hash(value);
        let (item_index, offset) =
            probe(&self.array, hash, |item, pos| match item.state(pos.1) {
                SlotState::Empty => Some(None),
                SlotState::Occupied if item.has_value(pos.1, value) => Some(Some(pos)),
                _ => None,
            })?;

        let taken = self.array.item_mut(item_index).take_as_tombstone(offset);
        if taken.is_some() {
            self.array.set_to_dummy();
        }
        taken
    }

    /// Returns `true` if `a` and `b` share at least one value.
    ///
    /// Iterates the smaller set and probes the larger one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2, 3].into();
    /// let b: HashSet<i32> = [3, 4, 5].into();
    /// assert!(HashSet::intersects(&a, &b));
    /// # }
    /// ```
    pub fn intersects<S2, const M: usize>(a: &Self, b: &HashSet<T, S2, M>) -> bool
    where
        S2: BuildHasher,
    {
        if a.len() <= b.len() {
            a.iter().any(|v| b.contains(v))
        } else {
            b.iter().any(|v| a.contains(v))
        }
    }

    /// Returns `true` if `a` and `b` have no value in common.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into();
    /// let b: HashSet<i32> = [3, 4].into();
    /// assert!(HashSet::disjoint(&a, &b));
    /// # }
    /// ```
    pub fn disjoint<S2, const M: usize>(a: &Self, b: &HashSet<T, S2, M>) -> bool
    where
        S2: BuildHasher,
    {
        !Self::intersects(a, b)
    }

    #[inline(always)]
    fn ensure_can_add(&mut self) {
        if self.array.should_grow() {
            self.grow(self.len() + 1);
        }
    }

    /// Rebuilds the set into an array reserved for `min_usable_slots`,
    /// discarding all tombstones.
    ///
    /// Hashes are computed up front so that a panicking hasher leaves the
    /// current array untouched. Relocation runs no user code.
    #[cold]
    #[inline(never)]
    fn grow(&mut self, min_usable_slots: usize) {
        let mut new_array = SlotArray::reserved_for(min_usable_slots);

        let mut moves = Vec::with_capacity(self.len());
        moves.extend(occupied_slots(&self.array).map(|(slot, value)| (slot, self.hash(value))));

        for (slot, hash) in moves {
            let item = self.array.item_mut(slot / SLOTS_PER_ITEM);
            if let Some(value) = item.relocate_out(slot % SLOTS_PER_ITEM) {
                Self::add_after_grow(&mut new_array, hash, value);
            }
        }

        self.array = new_array;
    }

    /// Places a value into a freshly built array, which holds no tombstones
    /// and no value equal to `value`.
    #[inline]
    fn add_after_grow(array: &mut SlotArray<T, N>, hash: u32, value: T) {
        let (item_index, offset) = probe(array, hash, |item, pos| {
            (item.state(pos.1) == SlotState::Empty).then_some(pos)
        });
        array.item_mut(item_index).insert(offset, value);
        array.empty_to_set();
    }
}

#[cfg(feature = "stats")]
impl<T, S, const N: usize> HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Returns the number of slots probed past before reaching `value`, or
    /// the empty slot proving it absent.
    ///
    /// Only available with the `stats` feature.
    pub fn collisions(&self, value: &T) -> usize {
        let hash = self.hash(value);
        let mut collisions = 0;
        probe(&self.array, hash, |item, (_, offset)| {
            if item.state(offset) == SlotState::Empty || item.has_value(offset, value) {
                Some(collisions)
            } else {
                collisions += 1;
                None
            }
        })
    }

    /// Computes a histogram of collisions over the values in the set:
    /// `histogram[n]` is the number of values found after probing past `n`
    /// other slots.
    ///
    /// Only available with the `stats` feature.
    pub fn probe_histogram(&self) -> Vec<usize> {
        let mut histogram = Vec::new();
        for value in self.iter() {
            let collisions = self.collisions(value);
            if histogram.len() <= collisions {
                histogram.resize(collisions + 1, 0);
            }
            histogram[collisions] += 1;
        }
        histogram
    }

    /// Returns a snapshot of the set's load statistics.
    ///
    /// Only available with the `stats` feature.
    pub fn debug_stats(&self) -> DebugStats {
        let slots_total = self.array.slots_total();
        DebugStats {
            len: self.len(),
            slots_total,
            slots_set_or_dummy: self.array.slots_set_or_dummy(),
            tombstones: self.array.slots_dummy(),
            item_exponent: self.array.item_exponent(),
            inline: self.array.is_inline(),
            load_factor: self.array.slots_set_or_dummy() as f64 / slots_total as f64,
        }
    }
}

/// Load statistics for a [`HashSet`].
///
/// Only available with the `stats` feature.
#[cfg(feature = "stats")]
#[derive(Debug, Clone, PartialEq)]
pub struct DebugStats {
    /// Number of values in the set
    pub len: usize,
    /// Total number of slots
    pub slots_total: usize,
    /// Occupied plus tombstoned slots
    pub slots_set_or_dummy: usize,
    /// Tombstoned slots
    pub tombstones: usize,
    /// The set holds `2^item_exponent` items of four slots
    pub item_exponent: u8,
    /// Whether the items live in the inline buffer
    pub inline: bool,
    /// Occupied plus tombstoned slots over total slots
    pub load_factor: f64,
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty set using the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use quad_set::HashSet;
    ///
    /// let mut set = HashSet::with_hasher(RandomState::new());
    /// set.insert(1);
    /// assert!(set.is_inline());
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_inline_hasher(hash_builder)
    }

    /// Creates an empty set able to hold at least `capacity` values before
    /// it has to grow.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_inline_capacity_and_hasher(capacity, hash_builder)
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty set using the default hasher builder. Does not
    /// allocate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use quad_set::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty set able to hold at least `capacity` values before it
    /// has to grow, using the default hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S, const N: usize> Default for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_inline_hasher(S::default())
    }
}

/// An iterator over the values of a [`HashSet`], in slot order.
pub struct Iter<'a, T> {
    items: &'a [Item<T>],
    slot: usize,
    remaining: usize,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items,
            slot: self.slot,
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let items = self.items;
        while self.slot < items.len() * SLOTS_PER_ITEM {
            let item = &items[self.slot / SLOTS_PER_ITEM];
            let offset = self.slot % SLOTS_PER_ITEM;
            self.slot += 1;

            if let Some(value) = item.value(offset) {
                self.remaining -= 1;
                return Some(value);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// A consuming iterator over the values of a [`HashSet`], in slot order.
pub struct IntoIter<T, const N: usize = 1> {
    array: SlotArray<T, N>,
    slot: usize,
    remaining: usize,
}

impl<T, const N: usize> Iterator for IntoIter<T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        while self.slot < self.array.slots_total() {
            let item = self.array.item_mut(self.slot / SLOTS_PER_ITEM);
            let offset = self.slot % SLOTS_PER_ITEM;
            self.slot += 1;

            if let Some(value) = item.relocate_out(offset) {
                self.remaining -= 1;
                return Some(value);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, const N: usize> ExactSizeIterator for IntoIter<T, N> {}

impl<T, const N: usize> FusedIterator for IntoIter<T, N> {}

impl<T, S, const N: usize> IntoIterator for HashSet<T, S, N> {
    type IntoIter = IntoIter<T, N>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        let remaining = self.len();
        IntoIter {
            array: self.array,
            slot: 0,
            remaining,
        }
    }
}

impl<'a, T, S, const N: usize> IntoIterator for &'a HashSet<T, S, N> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S, const N: usize> FromIterator<T> for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.add_multiple(iter);
        set
    }
}

impl<T, S, const N: usize, const K: usize> From<[T; K]> for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from(values: [T; K]) -> Self {
        let mut set = Self::default();
        set.add_multiple(values);
        set
    }
}

impl<T, S, const N: usize> Extend<T> for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_multiple(iter);
    }
}

impl<'a, T, S, const N: usize> Extend<&'a T> for HashSet<T, S, N>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.add_multiple(iter.into_iter().copied());
    }
}
