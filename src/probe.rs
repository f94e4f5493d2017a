//! The probe sequence shared by every set operation.
//!
//! A hash selects an item with its masked bits and a starting offset inside
//! that item with its low two bits. All four offsets of the item are visited
//! circularly before the sequence jumps to the next item using the perturbed
//! recurrence `perturb >>= 5; hash = hash * 5 + 1 + perturb`.
//!
//! Once `perturb` is exhausted the recurrence is a full-period linear
//! congruential generator modulo any power of two, so every item of the
//! array is eventually visited.

use crate::slot_array::Item;
use crate::slot_array::SLOTS_PER_ITEM;
use crate::slot_array::SlotArray;

const OFFSET_MASK: u32 = SLOTS_PER_ITEM as u32 - 1;
const PERTURB_SHIFT: u32 = 5;

/// A position in a slot array: `(item_index, offset)`.
pub(crate) type SlotPos = (usize, usize);

/// Lazy, unbounded cursor over slot positions in probe order.
#[derive(Debug, Clone)]
pub(crate) struct ProbeSeq {
    hash: u32,
    perturb: u32,
    slot_mask: u32,
    item_index: usize,
    initial_offset: u32,
    offset: u32,
}

impl ProbeSeq {
    #[inline(always)]
    pub(crate) fn new(hash: u32, slot_mask: u32) -> Self {
        let offset = hash & OFFSET_MASK;
        Self {
            hash,
            perturb: hash,
            slot_mask,
            item_index: ((hash & slot_mask) >> 2) as usize,
            initial_offset: offset,
            offset,
        }
    }

    /// Returns the next slot position. Never runs out.
    #[inline(always)]
    pub(crate) fn next_slot(&mut self) -> SlotPos {
        let pos = (self.item_index, self.offset as usize);

        self.offset = (self.offset + 1) & OFFSET_MASK;
        if self.offset == self.initial_offset {
            self.jump();
        }

        pos
    }

    #[inline(always)]
    fn jump(&mut self) {
        self.perturb >>= PERTURB_SHIFT;
        self.hash = self
            .hash
            .wrapping_mul(5)
            .wrapping_add(1)
            .wrapping_add(self.perturb);

        self.item_index = ((self.hash & self.slot_mask) >> 2) as usize;
        self.initial_offset = self.hash & OFFSET_MASK;
        self.offset = self.initial_offset;
    }
}

/// Walks the probe sequence of `hash` over `array`, handing each slot to
/// `decide` until it returns a result.
///
/// Terminates as long as `decide` accepts some slot state present in the
/// array; every caller accepts `Empty`, and the load policy guarantees empty
/// slots exist.
#[inline(always)]
pub(crate) fn probe<T, const N: usize, R>(
    array: &SlotArray<T, N>,
    hash: u32,
    mut decide: impl FnMut(&Item<T>, SlotPos) -> Option<R>,
) -> R {
    let mut seq = ProbeSeq::new(hash, array.slot_mask());
    loop {
        let pos = seq.next_slot();
        if let Some(result) = decide(array.item(pos.0), pos) {
            return result;
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn scans_item_circularly_from_low_bits() {
        // slot_mask 15 => 4 items, hash 6 => item 1, offset 2
        let mut seq = ProbeSeq::new(6, 15);
        let positions: Vec<SlotPos> = (0..4).map(|_| seq.next_slot()).collect();
        assert_eq!(positions, vec![(1, 2), (1, 3), (1, 0), (1, 1)]);
    }

    #[test]
    fn jumps_with_perturbed_recurrence() {
        let hash: u32 = 0xDEAD_BEEF;
        let mask: u32 = 63;
        let mut seq = ProbeSeq::new(hash, mask);
        for _ in 0..4 {
            seq.next_slot();
        }

        let perturb = hash >> 5;
        let next = hash.wrapping_mul(5).wrapping_add(1).wrapping_add(perturb);
        assert_eq!(
            seq.next_slot(),
            (((next & mask) >> 2) as usize, (next & 3) as usize)
        );
    }

    #[test]
    fn visits_every_slot_of_the_array() {
        for exponent in 0..8u32 {
            let slots_total = 4u32 << exponent;
            let mask = slots_total - 1;
            for hash in [0u32, 1, 7, 0x1234_5678, u32::MAX] {
                let mut seen = vec![false; slots_total as usize];
                // 32 / 5 jumps drain any perturb, then one full LCG period.
                let bound = (slots_total as usize + 8) * 4;
                let mut seq = ProbeSeq::new(hash, mask);
                for _ in 0..bound {
                    let (item, offset) = seq.next_slot();
                    seen[item * 4 + offset] = true;
                }
                assert!(
                    seen.iter().all(|&s| s),
                    "exponent {exponent}, hash {hash:#x}"
                );
            }
        }
    }
}
