//! Grouped slot storage backing [`HashSet`](crate::HashSet).
//!
//! Slots are packed four to an [`Item`], with the four state tags stored
//! apart from the four value regions. A [`SlotArray`] owns `2^item_exponent`
//! items, keeping them in an inline buffer of `N` items when they fit and on
//! the heap otherwise, and tracks the aggregate counters used to decide when
//! the set must grow.

use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::fmt::Debug;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

/// Number of slots grouped in a single [`Item`].
pub const SLOTS_PER_ITEM: usize = 4;

/// Largest supported item exponent. Keeps `slots_total - 1` addressable by
/// the 32-bit probe hash.
pub const MAX_ITEM_EXPONENT: u8 = 29;

/// State of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Never held a value since the array was built. Ends probe chains.
    Empty,
    /// Holds a live value.
    Occupied,
    /// Held a value that was removed. Probe chains continue past it.
    Tombstone,
}

/// A group of four slots.
///
/// Value storage is uninitialized for every position whose state is not
/// [`SlotState::Occupied`]; only occupied positions are ever read or dropped.
pub struct Item<T> {
    states: [SlotState; SLOTS_PER_ITEM],
    values: [MaybeUninit<T>; SLOTS_PER_ITEM],
}

impl<T> Item<T> {
    /// Creates an item with all four slots empty.
    #[inline]
    pub fn new() -> Self {
        Self {
            states: [SlotState::Empty; SLOTS_PER_ITEM],
            values: [const { MaybeUninit::uninit() }; SLOTS_PER_ITEM],
        }
    }

    /// Returns the state of the slot at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset >= SLOTS_PER_ITEM`.
    #[inline(always)]
    pub fn state(&self, offset: usize) -> SlotState {
        self.states[offset]
    }

    /// Returns the value stored at `offset`, if the slot is occupied.
    #[inline(always)]
    pub fn value(&self, offset: usize) -> Option<&T> {
        if self.states[offset] == SlotState::Occupied {
            // SAFETY: Occupied slots always hold an initialized value.
            Some(unsafe { self.values.get_unchecked(offset).assume_init_ref() })
        } else {
            None
        }
    }

    /// Returns `true` if the slot at `offset` is occupied by a value equal to
    /// `value`.
    #[inline(always)]
    pub fn has_value(&self, offset: usize, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.value(offset).is_some_and(|v| v == value)
    }

    /// Stores `value` at `offset` and marks the slot occupied.
    ///
    /// The slot must not already be occupied.
    #[inline(always)]
    pub(crate) fn insert(&mut self, offset: usize, value: T) {
        debug_assert!(self.states[offset] != SlotState::Occupied);
        self.values[offset] = MaybeUninit::new(value);
        self.states[offset] = SlotState::Occupied;
    }

    /// Moves the value out of `offset` and leaves a tombstone behind.
    #[inline]
    pub(crate) fn take_as_tombstone(&mut self, offset: usize) -> Option<T> {
        self.take(offset, SlotState::Tombstone)
    }

    /// Moves the value out of `offset` and leaves the slot empty. Used when
    /// relocating values out of an array that is about to be discarded.
    #[inline]
    pub(crate) fn relocate_out(&mut self, offset: usize) -> Option<T> {
        self.take(offset, SlotState::Empty)
    }

    #[inline(always)]
    fn take(&mut self, offset: usize, leave: SlotState) -> Option<T> {
        if self.states[offset] != SlotState::Occupied {
            return None;
        }
        self.states[offset] = leave;
        // SAFETY: The slot was occupied, so the value is initialized. Its state
        // no longer says occupied, so the value is never read or dropped again
        // through this item.
        Some(unsafe { self.values.get_unchecked(offset).assume_init_read() })
    }
}

impl<T> Default for Item<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Item<T> {
    fn drop(&mut self) {
        if !core::mem::needs_drop::<T>() {
            return;
        }
        for (state, value) in self.states.iter().zip(self.values.iter_mut()) {
            if *state == SlotState::Occupied {
                // SAFETY: Occupied slots always hold an initialized value, and
                // each one is dropped exactly once here.
                unsafe { value.assume_init_drop() };
            }
        }
    }
}

impl<T: Clone> Clone for Item<T> {
    fn clone(&self) -> Self {
        let mut item = Self::new();
        for offset in 0..SLOTS_PER_ITEM {
            match self.states[offset] {
                SlotState::Empty => {}
                SlotState::Tombstone => item.states[offset] = SlotState::Tombstone,
                SlotState::Occupied => {
                    if let Some(value) = self.value(offset) {
                        item.insert(offset, value.clone());
                    }
                }
            }
        }
        item
    }
}

impl<T: Debug> Debug for Item<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut list = f.debug_list();
        for offset in 0..SLOTS_PER_ITEM {
            match self.value(offset) {
                Some(value) => list.entry(value),
                None => list.entry(&self.states[offset]),
            };
        }
        list.finish()
    }
}

/// Heap allocated run of items.
struct HeapItems<T> {
    alloc: NonNull<Item<T>>,
    len: usize,
}

// SAFETY: `HeapItems` uniquely owns its items, the same as a `Box<[Item<T>]>`.
unsafe impl<T: Send> Send for HeapItems<T> {}
// SAFETY: Shared access only hands out shared references to the items.
unsafe impl<T: Sync> Sync for HeapItems<T> {}

impl<T> HeapItems<T> {
    fn new(len: usize) -> Self {
        let layout = Layout::array::<Item<T>>(len).expect("allocation size overflow");
        debug_assert!(layout.size() != 0);

        // SAFETY: `Item<T>` always carries its state tags, so the layout has a
        // non-zero size for any `len > 0`. Allocation failure is routed to
        // `handle_alloc_error`, and every item is written before the pointer
        // escapes.
        unsafe {
            let raw_alloc = alloc::alloc::alloc(layout).cast::<Item<T>>();
            if raw_alloc.is_null() {
                handle_alloc_error(layout);
            }
            for index in 0..len {
                raw_alloc.add(index).write(Item::new());
            }

            Self {
                alloc: NonNull::new_unchecked(raw_alloc),
                len,
            }
        }
    }

    #[inline(always)]
    fn as_slice(&self) -> &[Item<T>] {
        // SAFETY: `alloc` points to `len` initialized items owned by `self`.
        unsafe { core::slice::from_raw_parts(self.alloc.as_ptr(), self.len) }
    }

    #[inline(always)]
    fn as_mut_slice(&mut self) -> &mut [Item<T>] {
        // SAFETY: `alloc` points to `len` initialized items uniquely owned by
        // `self`.
        unsafe { core::slice::from_raw_parts_mut(self.alloc.as_ptr(), self.len) }
    }
}

impl<T> Drop for HeapItems<T> {
    fn drop(&mut self) {
        // SAFETY: The items are initialized and dropped exactly once, after
        // which the allocation is released with the layout it was created
        // with.
        unsafe {
            core::ptr::drop_in_place(self.as_mut_slice() as *mut [Item<T>]);
            let layout = Layout::array::<Item<T>>(self.len).expect("allocation size overflow");
            alloc::alloc::dealloc(self.alloc.as_ptr().cast(), layout);
        }
    }
}

impl<T: Clone> Clone for HeapItems<T> {
    fn clone(&self) -> Self {
        let mut items = Self::new(self.len);
        for (dst, src) in items.as_mut_slice().iter_mut().zip(self.as_slice()) {
            *dst = src.clone();
        }
        items
    }
}

#[derive(Clone)]
enum Storage<T, const N: usize> {
    Inline([Item<T>; N]),
    Heap(HeapItems<T>),
}

/// Owning array of `2^item_exponent` [`Item`]s plus the load bookkeeping used
/// by the set.
///
/// Up to `N` items live in an inline buffer; larger arrays are heap
/// allocated. The counters are updated only through the explicit transition
/// functions, and it is the caller's job to pair each one with the matching
/// slot state change.
pub struct SlotArray<T, const N: usize = 1> {
    items: Storage<T, N>,
    item_count: usize,
    item_exponent: u8,
    slots_total: usize,
    slots_set_or_dummy: usize,
    slots_dummy: usize,
    slot_mask: u32,
}

impl<T, const N: usize> SlotArray<T, N> {
    /// Creates an array of `2^item_exponent` empty items.
    ///
    /// # Panics
    ///
    /// Panics if `item_exponent` exceeds [`MAX_ITEM_EXPONENT`]. Allocation
    /// failure aborts through [`handle_alloc_error`].
    pub fn new(item_exponent: u8) -> Self {
        assert!(item_exponent <= MAX_ITEM_EXPONENT, "capacity overflow");

        let item_count = 1usize << item_exponent;
        let slots_total = item_count * SLOTS_PER_ITEM;
        let items = if item_count <= N {
            Storage::Inline(core::array::from_fn(|_| Item::new()))
        } else {
            Storage::Heap(HeapItems::new(item_count))
        };

        Self {
            items,
            item_count,
            item_exponent,
            slots_total,
            slots_set_or_dummy: 0,
            slots_dummy: 0,
            slot_mask: (slots_total - 1) as u32,
        }
    }

    /// Creates an empty array large enough that `min_usable_slots` values
    /// keep the load below one half, with at least one extra doubling of
    /// headroom.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quad_set::slot_array::SlotArray;
    ///
    /// let array = SlotArray::<u32>::reserved_for(10);
    /// assert_eq!(array.item_exponent(), 3);
    /// assert_eq!(array.slots_total(), 32);
    /// ```
    pub fn reserved_for(min_usable_slots: usize) -> Self {
        Self::new(Self::exponent_for(min_usable_slots))
    }

    /// The item exponent chosen by [`reserved_for`](Self::reserved_for):
    /// `ceil(log2(min_usable_slots / 4 + 1)) + 1`.
    pub fn exponent_for(min_usable_slots: usize) -> u8 {
        let items_needed = min_usable_slots / SLOTS_PER_ITEM + 1;
        let log2_ceil = usize::BITS - (items_needed - 1).leading_zeros();
        (log2_ceil + 1) as u8
    }

    /// Capacity class: the array holds `2^item_exponent` items.
    #[inline(always)]
    pub fn item_exponent(&self) -> u8 {
        self.item_exponent
    }

    /// Number of items in the array.
    #[inline(always)]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Total slots, `item_count * 4`.
    #[inline(always)]
    pub fn slots_total(&self) -> usize {
        self.slots_total
    }

    /// Slots that are either occupied or tombstones.
    #[inline(always)]
    pub fn slots_set_or_dummy(&self) -> usize {
        self.slots_set_or_dummy
    }

    /// Tombstoned slots.
    #[inline(always)]
    pub fn slots_dummy(&self) -> usize {
        self.slots_dummy
    }

    /// Occupied slots.
    #[inline(always)]
    pub fn slots_set(&self) -> usize {
        self.slots_set_or_dummy - self.slots_dummy
    }

    /// `slots_total - 1`.
    #[inline(always)]
    pub fn slot_mask(&self) -> u32 {
        self.slot_mask
    }

    /// Returns `true` while the items live in the inline buffer.
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.items, Storage::Inline(_))
    }

    /// Returns `true` once occupied plus tombstoned slots reach half of the
    /// total, so tombstone build-up alone also forces a rebuild.
    #[inline(always)]
    pub fn should_grow(&self) -> bool {
        self.slots_set_or_dummy >= self.slots_total / 2
    }

    /// Records an empty slot becoming occupied.
    #[inline(always)]
    pub(crate) fn empty_to_set(&mut self) {
        self.slots_set_or_dummy += 1;
    }

    /// Records a tombstone becoming occupied.
    #[inline(always)]
    pub(crate) fn dummy_to_set(&mut self) {
        debug_assert!(self.slots_dummy > 0);
        self.slots_dummy -= 1;
    }

    /// Records an occupied slot becoming a tombstone.
    #[inline(always)]
    pub(crate) fn set_to_dummy(&mut self) {
        self.slots_dummy += 1;
        debug_assert!(self.slots_dummy <= self.slots_set_or_dummy);
    }

    /// All items in slot order.
    #[inline(always)]
    pub fn items(&self) -> &[Item<T>] {
        match &self.items {
            Storage::Inline(items) => &items[..self.item_count],
            Storage::Heap(items) => items.as_slice(),
        }
    }

    #[inline(always)]
    pub(crate) fn items_mut(&mut self) -> &mut [Item<T>] {
        match &mut self.items {
            Storage::Inline(items) => &mut items[..self.item_count],
            Storage::Heap(items) => items.as_mut_slice(),
        }
    }

    /// Returns the item at `item_index`.
    ///
    /// # Panics
    ///
    /// Panics if `item_index >= item_count`.
    #[inline(always)]
    pub fn item(&self, item_index: usize) -> &Item<T> {
        &self.items()[item_index]
    }

    #[inline(always)]
    pub(crate) fn item_mut(&mut self, item_index: usize) -> &mut Item<T> {
        &mut self.items_mut()[item_index]
    }
}

impl<T, const N: usize> Default for SlotArray<T, N> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Clone, const N: usize> Clone for SlotArray<T, N> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            item_count: self.item_count,
            item_exponent: self.item_exponent,
            slots_total: self.slots_total,
            slots_set_or_dummy: self.slots_set_or_dummy,
            slots_dummy: self.slots_dummy,
            slot_mask: self.slot_mask,
        }
    }
}

impl<T, const N: usize> Debug for SlotArray<T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlotArray")
            .field("item_exponent", &self.item_exponent)
            .field("slots_total", &self.slots_total)
            .field("slots_set_or_dummy", &self.slots_set_or_dummy)
            .field("slots_dummy", &self.slots_dummy)
            .field("inline", &self.is_inline())
            .finish()
    }
}
