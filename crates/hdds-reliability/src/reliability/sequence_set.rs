// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SequenceNumberSet: the 256-slot bitmap carried by ACKNACK and GAP.
//!
//! A set is anchored at `base` and can only represent `base + offset` with
//! `offset < 256`. Bit order follows RTPS: offset 0 is the MSB of word 0.

use std::fmt;

use super::SequenceNumber;

/// Maximum number of bitmap bits (RTPS limit).
pub const MAX_BITMAP_BITS: u32 = 256;
/// Bits per bitmap word.
pub const WORD_BITS: u32 = 32;
/// Number of 32-bit words backing the bitmap.
pub const BITMAP_WORDS: usize = 8;

/// Fixed-window sequence number set (`SequenceNumberSet_t`).
///
/// Membership, insertion and removal are O(1). Equality and hashing are
/// value-based on `(base, bitmap)`; the encoded `num_bits` is derived from
/// the contents and does not participate.
///
/// # Example
///
/// ```rust
/// use hdds_reliability::{SequenceNumber, SequenceNumberSet};
///
/// let base = SequenceNumber::from(10);
/// let mut set = SequenceNumberSet::new(base);
/// assert!(set.add(base + 3));
/// assert!(!set.add(base + 256)); // outside the window, set unchanged
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec![base + 3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceNumberSet {
    base: SequenceNumber,
    bitmap: [u32; BITMAP_WORDS],
}

impl SequenceNumberSet {
    /// Maximum number of bitmap bits (RTPS limit).
    pub const MAX_BITS: u32 = MAX_BITMAP_BITS;

    /// Empty set anchored at `base`.
    #[must_use]
    pub const fn new(base: SequenceNumber) -> Self {
        Self {
            base,
            bitmap: [0; BITMAP_WORDS],
        }
    }

    /// Build from explicit sequence numbers; `None` if any falls outside
    /// `[base, base + 256)`.
    #[must_use]
    pub fn from_sequences(base: SequenceNumber, sequences: &[SequenceNumber]) -> Option<Self> {
        let mut set = Self::new(base);
        for &sn in sequences {
            if !set.add(sn) {
                return None;
            }
        }
        Some(set)
    }

    /// Construct from wire fields. Bits past `num_bits` are ignored.
    #[must_use]
    pub fn from_raw(base: SequenceNumber, num_bits: u32, words: &[u32]) -> Option<Self> {
        if num_bits > MAX_BITMAP_BITS || words.len() < Self::word_count_for_bits(num_bits) {
            return None;
        }

        let mut set = Self::new(base);
        for (idx, word) in words
            .iter()
            .take(Self::word_count_for_bits(num_bits))
            .enumerate()
        {
            set.bitmap[idx] = *word;
        }

        let tail_bits = num_bits % WORD_BITS;
        if tail_bits != 0 {
            let last = Self::word_count_for_bits(num_bits) - 1;
            set.bitmap[last] &= !(u32::MAX >> tail_bits);
        }
        Some(set)
    }

    #[must_use]
    pub fn base(&self) -> SequenceNumber {
        self.base
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bitmap.iter().all(|&w| w == 0)
    }

    /// Number of sequence numbers in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bitmap.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Offset of `sn` inside the window, `None` when not representable.
    fn offset_of(&self, sn: SequenceNumber) -> Option<u32> {
        if sn < self.base {
            return None;
        }
        let diff = sn - self.base;
        if diff.high != 0 || diff.low >= MAX_BITMAP_BITS {
            return None;
        }
        Some(diff.low)
    }

    #[inline]
    fn locate(offset: u32) -> (usize, u32) {
        let word = (offset / WORD_BITS) as usize;
        let mask = 1u32 << (31 - offset % WORD_BITS);
        (word, mask)
    }

    /// Insert `sn`. Returns `false` (set unchanged) when `sn` lies outside
    /// the 256-slot window; callers must re-base rather than truncate.
    pub fn add(&mut self, sn: SequenceNumber) -> bool {
        match self.offset_of(sn) {
            Some(offset) => {
                let (word, mask) = Self::locate(offset);
                self.bitmap[word] |= mask;
                true
            }
            None => false,
        }
    }

    /// Insert every number in `[from, to)` that fits the window.
    pub fn add_range(&mut self, from: SequenceNumber, to: SequenceNumber) {
        let mut sn = from.max(self.base);
        while sn < to {
            if !self.add(sn) {
                break;
            }
            sn.increment();
        }
    }

    #[must_use]
    pub fn contains(&self, sn: SequenceNumber) -> bool {
        self.offset_of(sn).is_some_and(|offset| {
            let (word, mask) = Self::locate(offset);
            self.bitmap[word] & mask != 0
        })
    }

    /// Remove `sn`; returns whether it was present.
    pub fn remove(&mut self, sn: SequenceNumber) -> bool {
        let Some(offset) = self.offset_of(sn) else {
            return false;
        };
        let (word, mask) = Self::locate(offset);
        let present = self.bitmap[word] & mask != 0;
        self.bitmap[word] &= !mask;
        present
    }

    /// Drop all members, keeping the base.
    pub fn clear(&mut self) {
        self.bitmap = [0; BITMAP_WORDS];
    }

    /// Smallest member.
    #[must_use]
    pub fn min(&self) -> Option<SequenceNumber> {
        self.iter().next()
    }

    /// Largest member.
    #[must_use]
    pub fn max(&self) -> Option<SequenceNumber> {
        self.highest_offset().map(|offset| self.base + offset)
    }

    fn highest_offset(&self) -> Option<u32> {
        self.bitmap
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| **w != 0)
            .map(|(idx, w)| idx as u32 * WORD_BITS + (31 - w.trailing_zeros()))
    }

    /// Move the window to `new_base`, keeping members that still fit.
    pub fn base_update(&mut self, new_base: SequenceNumber) {
        if new_base == self.base {
            return;
        }
        let old = *self;
        *self = Self::new(new_base);
        for sn in old.iter() {
            self.add(sn);
        }
    }

    /// Bits to put on the wire: highest member offset + 1, 0 when empty.
    #[must_use]
    pub fn num_bits(&self) -> u32 {
        self.highest_offset().map_or(0, |offset| offset + 1)
    }

    /// Number of bitmap words that need to be transmitted.
    #[must_use]
    pub fn word_count(&self) -> usize {
        Self::word_count_for_bits(self.num_bits())
    }

    /// Compute number of words required for a given bit count.
    #[must_use]
    pub fn word_count_for_bits(bits: u32) -> usize {
        bits.div_ceil(WORD_BITS) as usize
    }

    /// Bitmap words to encode (`word_count()` of them).
    #[must_use]
    pub fn bitmap_words(&self) -> &[u32] {
        &self.bitmap[..self.word_count()]
    }

    /// Ascending iteration over members. Each call restarts from the base.
    #[must_use]
    pub fn iter(&self) -> SequenceNumberIter {
        SequenceNumberIter {
            base: self.base,
            bitmap: self.bitmap,
            word: 0,
        }
    }

    /// Visit members in ascending order.
    pub fn for_each<F: FnMut(SequenceNumber)>(&self, f: F) {
        self.iter().for_each(f);
    }
}

/// Iterator over sequences contained in a `SequenceNumberSet`.
#[derive(Debug, Clone)]
pub struct SequenceNumberIter {
    base: SequenceNumber,
    bitmap: [u32; BITMAP_WORDS],
    word: usize,
}

impl Iterator for SequenceNumberIter {
    type Item = SequenceNumber;

    fn next(&mut self) -> Option<Self::Item> {
        while self.word < BITMAP_WORDS {
            let bits = self.bitmap[self.word];
            if bits == 0 {
                self.word += 1;
                continue;
            }
            let bit = bits.leading_zeros();
            self.bitmap[self.word] &= !(1u32 << (31 - bit));
            return Some(self.base + (self.word as u32 * WORD_BITS + bit));
        }
        None
    }
}

impl IntoIterator for &SequenceNumberSet {
    type Item = SequenceNumber;
    type IntoIter = SequenceNumberIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for SequenceNumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.base)?;
        for (i, sn) in self.iter().enumerate() {
            if i > 0 {
                write!(f, "-")?;
            }
            write!(f, "{}", sn)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sn(v: u64) -> SequenceNumber {
        SequenceNumber::from_u64(v)
    }

    #[test]
    fn test_containment_every_offset() {
        let base = SequenceNumber::new(0, u32::MAX - 100);
        for offset in 0..MAX_BITMAP_BITS {
            let mut set = SequenceNumberSet::new(base);
            assert!(set.add(base + offset), "offset {} must fit", offset);
            assert!(set.contains(base + offset));
            for other in (0..MAX_BITMAP_BITS).filter(|&o| o != offset) {
                assert!(!set.contains(base + other));
            }
            assert_eq!(set.len(), 1);
        }
    }

    #[test]
    fn test_out_of_window_rejected_and_unchanged() {
        let base = sn(1000);
        let mut set = SequenceNumberSet::new(base);
        set.add(base + 5);
        let before = set;

        assert!(!set.add(base + MAX_BITMAP_BITS));
        assert!(!set.add(base - 1));
        assert!(!set.add(SequenceNumber::new(1, 1000)));
        assert_eq!(set, before);
        assert!(!set.contains(base - 1));
    }

    #[test]
    fn test_iteration_ascending_and_restartable() {
        let base = sn(1);
        let mut set = SequenceNumberSet::new(base);
        for v in [200u64, 3, 33, 64, 1, 255] {
            assert!(set.add(sn(v)));
        }
        let first: Vec<_> = set.iter().collect();
        let second: Vec<_> = (&set).into_iter().collect();
        assert_eq!(first, vec![sn(1), sn(3), sn(33), sn(64), sn(200), sn(255)]);
        assert_eq!(first, second);

        let mut visited = Vec::new();
        set.for_each(|s| visited.push(s));
        assert_eq!(visited, first);
    }

    #[test]
    fn test_value_equality_and_hash() {
        let mut a = SequenceNumberSet::new(sn(10));
        let mut b = SequenceNumberSet::new(sn(10));
        a.add(sn(12));
        a.add(sn(40));
        b.add(sn(40));
        b.add(sn(12));
        assert_eq!(a, b);

        let mut seen = HashSet::new();
        seen.insert(a);
        assert!(seen.contains(&b));

        let c = SequenceNumberSet::from_sequences(sn(11), &[sn(12), sn(40)]).expect("fits");
        assert_ne!(a, c, "different base is a different set");
    }

    #[test]
    fn test_remove_and_min_max() {
        let mut set = SequenceNumberSet::from_sequences(sn(100), &[sn(101), sn(150), sn(355)])
            .expect("fits");
        assert_eq!(set.min(), Some(sn(101)));
        assert_eq!(set.max(), Some(sn(355)));
        assert!(set.remove(sn(355)));
        assert!(!set.remove(sn(355)));
        assert_eq!(set.max(), Some(sn(150)));
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.min(), None);
        assert_eq!(set.max(), None);
    }

    #[test]
    fn test_add_range_clips_to_window() {
        let mut set = SequenceNumberSet::new(sn(10));
        set.add_range(sn(5), sn(13));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![sn(10), sn(11), sn(12)]);

        set.add_range(sn(260), sn(400));
        assert_eq!(set.max(), Some(sn(265)));
        assert_eq!(set.len(), 3 + 6);
    }

    #[test]
    fn test_base_update_shifts_both_ways() {
        let mut set = SequenceNumberSet::from_sequences(sn(10), &[sn(10), sn(20), sn(200)])
            .expect("fits");
        set.base_update(sn(15));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![sn(20), sn(200)]);

        set.base_update(sn(0));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![sn(20), sn(200)]);

        set.base_update(sn(100));
        set.add(sn(355));
        set.base_update(sn(0));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![sn(200)]);
    }

    #[test]
    fn test_wire_words_msb_first() {
        let set = SequenceNumberSet::from_sequences(sn(1), &[sn(1), sn(33)]).expect("fits");
        assert_eq!(set.num_bits(), 33);
        assert_eq!(set.word_count(), 2);
        assert_eq!(set.bitmap_words(), &[0x8000_0000, 0x8000_0000]);

        let decoded = SequenceNumberSet::from_raw(sn(1), 33, set.bitmap_words()).expect("valid");
        assert_eq!(decoded, set);
        assert_eq!(SequenceNumberSet::new(sn(1)).num_bits(), 0);
    }

    #[test]
    fn test_from_raw_masks_and_validates() {
        let set = SequenceNumberSet::from_raw(sn(1), 4, &[u32::MAX]).expect("valid");
        assert_eq!(set.len(), 4);
        assert!(SequenceNumberSet::from_raw(sn(1), 257, &[0; 9]).is_none());
        assert!(SequenceNumberSet::from_raw(sn(1), 64, &[0]).is_none());
    }

    #[test]
    fn test_display() {
        let set = SequenceNumberSet::from_sequences(sn(5), &[sn(6), sn(8)]).expect("fits");
        assert_eq!(set.to_string(), "5:6-8");
        assert_eq!(SequenceNumberSet::new(sn(3)).to_string(), "3:");
    }
}
