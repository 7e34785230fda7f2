// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! A fixed-width bit vector backed by a `Vec<u64>` word array. Every domain
//! module in this crate's test fixtures (and, downstream, every real
//! evaluator) uses this as its substrate: the engine's own dirty/empty/
//! unmapped tracking, interval packing into VRAM, subset-to-bitset mapping,
//! all of it.
//!
//! Width is fixed at construction. Combining two `BitSet`s of differing
//! widths is a programmer error: every combining operation reports it as
//! `Err(BitSetError::WidthMismatch)` rather than silently truncating or
//! panicking outright, leaving the choice of how fatal to treat it to the
//! caller.

use crate::BitSetError;

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
    num_bits: usize,
}

impl BitSet {
    /// Creates a new, all-clear `BitSet` of exactly `num_bits` bits.
    pub fn new(num_bits: usize) -> Self {
        let num_words = num_bits.div_ceil(WORD_BITS).max(1);
        BitSet { words: vec![0u64; num_words], num_bits }
    }

    pub fn width(&self) -> usize {
        self.num_bits
    }

    #[inline]
    fn check_same_width(&self, other: &BitSet) -> Result<(), BitSetError> {
        if self.num_bits != other.num_bits {
            Err(BitSetError::WidthMismatch { lhs: self.num_bits, rhs: other.num_bits })
        } else {
            Ok(())
        }
    }

    /// Mask of the valid bits in the last word (bits beyond `num_bits` are
    /// always kept clear so `count_set`/`all_set`/etc. don't see padding).
    #[inline]
    fn tail_mask(&self) -> u64 {
        if self.num_bits == 0 {
            return 0;
        }
        let rem = self.num_bits % WORD_BITS;
        if rem == 0 {
            u64::MAX
        } else {
            (1u64 << rem) - 1
        }
    }

    #[inline]
    fn clear_padding(&mut self) {
        if let Some(last) = self.words.last_mut() {
            let mask = self.tail_mask();
            *last &= mask;
        }
    }

    pub fn is_set(&self, idx: usize) -> bool {
        assert!(idx < self.num_bits, "bit index {idx} out of range for width {}", self.num_bits);
        (self.words[idx / WORD_BITS] & (1u64 << (idx % WORD_BITS))) != 0
    }

    pub fn set(&mut self, idx: usize) {
        assert!(idx < self.num_bits, "bit index {idx} out of range for width {}", self.num_bits);
        self.words[idx / WORD_BITS] |= 1u64 << (idx % WORD_BITS);
    }

    pub fn clear(&mut self, idx: usize) {
        assert!(idx < self.num_bits, "bit index {idx} out of range for width {}", self.num_bits);
        self.words[idx / WORD_BITS] &= !(1u64 << (idx % WORD_BITS));
    }

    pub fn set_all(&mut self) {
        for w in self.words.iter_mut() {
            *w = u64::MAX;
        }
        self.clear_padding();
    }

    pub fn clear_all(&mut self) {
        for w in self.words.iter_mut() {
            *w = 0;
        }
    }

    /// Smallest index >= `start` that is set, or `None`.
    pub fn next_set(&self, start: usize) -> Option<usize> {
        self.next_matching(start, false)
    }

    /// Smallest index >= `start` that is unset, or `None`.
    pub fn next_unset(&self, start: usize) -> Option<usize> {
        self.next_matching(start, true)
    }

    fn next_matching(&self, start: usize, want_unset: bool) -> Option<usize> {
        if start >= self.num_bits {
            return None;
        }
        let mut word_idx = start / WORD_BITS;
        let bit_in_word = start % WORD_BITS;
        let is_last_word = |idx: usize| idx == self.words.len() - 1;

        let mut word = if want_unset { !self.words[word_idx] } else { self.words[word_idx] };
        word &= u64::MAX << bit_in_word;
        if want_unset && is_last_word(word_idx) {
            word &= self.tail_mask();
        }
        if word != 0 {
            let idx = word_idx * WORD_BITS + word.trailing_zeros() as usize;
            return (idx < self.num_bits).then_some(idx);
        }

        word_idx += 1;
        while word_idx < self.words.len() {
            let mut word = if want_unset { !self.words[word_idx] } else { self.words[word_idx] };
            if want_unset && is_last_word(word_idx) {
                word &= self.tail_mask();
            }
            if word != 0 {
                let idx = word_idx * WORD_BITS + word.trailing_zeros() as usize;
                return (idx < self.num_bits).then_some(idx);
            }
            word_idx += 1;
        }
        None
    }

    /// Largest index <= `start` that is set, or `None`.
    pub fn prev_set(&self, start: usize) -> Option<usize> {
        self.prev_matching(start, false)
    }

    /// Largest index <= `start` that is unset, or `None`.
    pub fn prev_unset(&self, start: usize) -> Option<usize> {
        self.prev_matching(start, true)
    }

    fn prev_matching(&self, start: usize, want_unset: bool) -> Option<usize> {
        if self.num_bits == 0 {
            return None;
        }
        let start = start.min(self.num_bits - 1);
        let mut word_idx = start / WORD_BITS;
        let bit_in_word = start % WORD_BITS;

        let top_mask = if bit_in_word == WORD_BITS - 1 { u64::MAX } else { (1u64 << (bit_in_word + 1)) - 1 };
        let word = if want_unset { !self.words[word_idx] } else { self.words[word_idx] };
        let masked = word & top_mask;
        if masked != 0 {
            return Some(word_idx * WORD_BITS + (WORD_BITS - 1 - masked.leading_zeros() as usize));
        }

        loop {
            if word_idx == 0 {
                return None;
            }
            word_idx -= 1;
            let word = if want_unset { !self.words[word_idx] } else { self.words[word_idx] };
            if word != 0 {
                return Some(word_idx * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros() as usize));
            }
        }
    }

    pub fn count_set(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn all_set(&self) -> bool {
        if self.num_bits == 0 {
            return true;
        }
        let (last, rest) = self.words.split_last().unwrap();
        rest.iter().all(|w| *w == u64::MAX) && (*last & self.tail_mask()) == self.tail_mask()
    }

    pub fn all_clear(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn union(&self, other: &BitSet) -> Result<BitSet, BitSetError> {
        self.check_same_width(other)?;
        let words = self.words.iter().zip(&other.words).map(|(a, b)| a | b).collect();
        Ok(BitSet { words, num_bits: self.num_bits })
    }

    pub fn union_with(&mut self, other: &BitSet) -> Result<(), BitSetError> {
        self.check_same_width(other)?;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
        Ok(())
    }

    pub fn intersect(&self, other: &BitSet) -> Result<BitSet, BitSetError> {
        self.check_same_width(other)?;
        let words = self.words.iter().zip(&other.words).map(|(a, b)| a & b).collect();
        Ok(BitSet { words, num_bits: self.num_bits })
    }

    pub fn intersect_with(&mut self, other: &BitSet) -> Result<(), BitSetError> {
        self.check_same_width(other)?;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
        Ok(())
    }

    /// Symmetric difference (XOR) of the two bitsets.
    pub fn difference(&self, other: &BitSet) -> Result<BitSet, BitSetError> {
        self.check_same_width(other)?;
        let words = self.words.iter().zip(&other.words).map(|(a, b)| a ^ b).collect();
        Ok(BitSet { words, num_bits: self.num_bits })
    }

    pub fn difference_with(&mut self, other: &BitSet) -> Result<(), BitSetError> {
        self.check_same_width(other)?;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a ^= *b;
        }
        Ok(())
    }

    /// An iterator over the indices of the set bits, in ascending order.
    pub fn iter_set(&self) -> BitSetIter<'_> {
        BitSetIter { bitset: self, next: 0 }
    }
}

pub struct BitSetIter<'a> {
    bitset: &'a BitSet,
    next: usize,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let found = self.bitset.next_set(self.next)?;
        self.next = found + 1;
        Some(found)
    }
}

#[cfg(test)]
mod test_bitset {
    use super::*;

    #[test]
    fn set_clear_and_is_set_roundtrip() {
        let mut bs = BitSet::new(10);
        assert!(!bs.is_set(3));
        bs.set(3);
        assert!(bs.is_set(3));
        bs.clear(3);
        assert!(!bs.is_set(3));
    }

    #[test]
    fn set_all_and_clear_all_respect_width() {
        let mut bs = BitSet::new(5);
        bs.set_all();
        assert!(bs.all_set());
        assert_eq!(bs.count_set(), 5);
        bs.clear_all();
        assert!(bs.all_clear());
    }

    #[test]
    fn set_all_does_not_leak_into_padding_bits() {
        let mut bs = BitSet::new(3);
        bs.set_all();
        // Width spans a single word; padding bits above index 2 must stay clear
        // so a width-70 BitSet built later via union never sees stray bits.
        assert_eq!(bs.count_set(), 3);
    }

    #[test]
    fn next_set_and_next_unset_cross_word_boundaries() {
        let mut bs = BitSet::new(130);
        bs.set(0);
        bs.set(64);
        bs.set(129);
        assert_eq!(bs.next_set(0), Some(0));
        assert_eq!(bs.next_set(1), Some(64));
        assert_eq!(bs.next_set(65), Some(129));
        assert_eq!(bs.next_set(130.min(129) + 1), None);

        assert_eq!(bs.next_unset(0), Some(1));
        assert_eq!(bs.next_unset(64), Some(65));
    }

    #[test]
    fn prev_set_and_prev_unset_cross_word_boundaries() {
        let mut bs = BitSet::new(130);
        bs.set(0);
        bs.set(64);
        bs.set(129);
        assert_eq!(bs.prev_set(129), Some(129));
        assert_eq!(bs.prev_set(128), Some(64));
        assert_eq!(bs.prev_set(63), Some(0));
        assert_eq!(bs.prev_set(0), Some(0));

        let mut bs2 = BitSet::new(5);
        bs2.set_all();
        bs2.clear(2);
        assert_eq!(bs2.prev_unset(4), Some(2));
    }

    #[test]
    fn combining_ops_compute_expected_bits() {
        let mut a = BitSet::new(8);
        a.set(0);
        a.set(1);
        let mut b = BitSet::new(8);
        b.set(1);
        b.set(2);

        let u = a.union(&b).unwrap();
        assert_eq!(u.iter_set().collect::<Vec<_>>(), vec![0, 1, 2]);

        let i = a.intersect(&b).unwrap();
        assert_eq!(i.iter_set().collect::<Vec<_>>(), vec![1]);

        let d = a.difference(&b).unwrap();
        assert_eq!(d.iter_set().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn mismatched_widths_error_on_every_combining_op() {
        let a = BitSet::new(8);
        let b = BitSet::new(9);
        assert!(matches!(a.union(&b), Err(BitSetError::WidthMismatch { lhs: 8, rhs: 9 })));
        assert!(matches!(a.intersect(&b), Err(BitSetError::WidthMismatch { .. })));
        assert!(matches!(a.difference(&b), Err(BitSetError::WidthMismatch { .. })));
    }

    #[test]
    fn iter_set_yields_ascending_indices() {
        let mut bs = BitSet::new(20);
        for i in [2, 5, 19, 0] {
            bs.set(i);
        }
        assert_eq!(bs.iter_set().collect::<Vec<_>>(), vec![0, 2, 5, 19]);
    }
}
