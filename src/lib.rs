#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// An open-addressing hash set over grouped slot storage.
///
/// This module provides a `HashSet` that drives the shared probe sequence
/// over a `SlotArray`, with tombstone deletion and a configurable hasher.
pub mod hash_set;

mod probe;

pub mod slot_array;

pub use hash_set::HashSet;
pub use slot_array::SlotArray;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`HashSet`] unless another is given.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`HashSet`] unless another is given.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    } else {
        /// Placeholder when neither `foldhash` nor `std` is enabled. It does
        /// not implement `BuildHasher`, so a hasher must be passed explicitly.
        pub enum DefaultHashBuilder {}
    }
}
