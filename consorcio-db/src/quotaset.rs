//! Fixed-capacity bitset over the dense quota domain `1..=capacity`.
//!
//! Quota ids are small, dense integers, so membership is one bit per id:
//! `contains` is O(1) and a 2 500-quota group fits in 40 words.

use crate::models::QuotaId;

const WORD_BITS: u32 = u64::BITS;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuotaSet {
    words: Vec<u64>,
    capacity: QuotaId,
    len: usize,
}

impl QuotaSet {
    /// Empty set able to hold ids `1..=capacity`.
    pub fn with_capacity(capacity: QuotaId) -> Self {
        let words = (capacity as usize).div_ceil(WORD_BITS as usize);
        Self {
            words: vec![0; words],
            capacity,
            len: 0,
        }
    }

    /// Builds a set from `ids`, ignoring ids outside `1..=capacity`.
    pub fn from_ids<I: IntoIterator<Item = QuotaId>>(capacity: QuotaId, ids: I) -> Self {
        let mut set = Self::with_capacity(capacity);
        for id in ids {
            set.insert(id);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, id: QuotaId) -> Option<(usize, u64)> {
        if id == 0 || id > self.capacity {
            return None;
        }
        let bit = id - 1;
        Some(((bit / WORD_BITS) as usize, 1u64 << (bit % WORD_BITS)))
    }

    pub fn contains(&self, id: QuotaId) -> bool {
        match self.slot(id) {
            Some((word, mask)) => self.words[word] & mask != 0,
            None => false,
        }
    }

    /// Returns `true` when `id` was not yet present. Out-of-range ids are
    /// never stored and return `false`.
    pub fn insert(&mut self, id: QuotaId) -> bool {
        let Some((word, mask)) = self.slot(id) else {
            return false;
        };
        if self.words[word] & mask != 0 {
            return false;
        }
        self.words[word] |= mask;
        self.len += 1;
        true
    }

    pub fn remove(&mut self, id: QuotaId) -> bool {
        let Some((word, mask)) = self.slot(id) else {
            return false;
        };
        if self.words[word] & mask == 0 {
            return false;
        }
        self.words[word] &= !mask;
        self.len -= 1;
        true
    }

    /// Union of two sets; the capacity is the larger of both.
    pub fn union(&self, other: &QuotaSet) -> QuotaSet {
        let (long, short) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut words = long.words.clone();
        for (w, o) in words.iter_mut().zip(&short.words) {
            *w |= *o;
        }
        let len = words.iter().map(|w| w.count_ones() as usize).sum();
        QuotaSet {
            words,
            capacity: self.capacity.max(other.capacity),
            len,
        }
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = QuotaId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| Bits {
            word,
            base: i as QuotaId * WORD_BITS,
        })
    }

    /// Largest member strictly below `id`.
    pub fn predecessor(&self, id: QuotaId) -> Option<QuotaId> {
        let upper = id.saturating_sub(1).min(self.capacity);
        (1..=upper).rev().find(|&q| self.contains(q))
    }

    /// Smallest member strictly above `id`.
    pub fn successor(&self, id: QuotaId) -> Option<QuotaId> {
        let lower = id.saturating_add(1).max(1);
        (lower..=self.capacity).find(|&q| self.contains(q))
    }
}

struct Bits {
    word: u64,
    base: QuotaId,
}

impl Iterator for Bits {
    type Item = QuotaId;

    fn next(&mut self) -> Option<QuotaId> {
        if self.word == 0 {
            return None;
        }
        let offset = self.word.trailing_zeros();
        self.word &= self.word - 1;
        Some(self.base + offset + 1)
    }
}
