//! Fixed-universe bit sets backing the assignment analysis.
//!
//! One bit per local-variable slot. Operations are O(n/64) over `u64` words.
//! Bits above the capacity are kept zero so word-wise equality is exact.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl BitSet {
    /// Empty set over a universe of `capacity` elements.
    pub(crate) fn new(capacity: usize) -> Self {
        let num_words = (capacity + 63) / 64;
        Self {
            words: vec![0; num_words],
            capacity,
        }
    }

    /// Add every element of the universe.
    pub(crate) fn fill(&mut self) {
        for w in &mut self.words {
            *w = !0;
        }
        let tail = self.capacity % 64;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }

    #[inline]
    pub(crate) fn insert(&mut self, elem: usize) {
        if elem >= self.capacity {
            return;
        }
        self.words[elem / 64] |= 1u64 << (elem % 64);
    }

    #[inline]
    pub(crate) fn remove(&mut self, elem: usize) {
        if elem >= self.capacity {
            return;
        }
        self.words[elem / 64] &= !(1u64 << (elem % 64));
    }

    #[inline]
    pub(crate) fn contains(&self, elem: usize) -> bool {
        if elem >= self.capacity {
            return false;
        }
        (self.words[elem / 64] & (1u64 << (elem % 64))) != 0
    }

    /// Intersection: self = self & other.
    #[inline]
    pub(crate) fn intersect_with(&mut self, other: &BitSet) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a &= *b;
        }
    }

    /// Union: self = self | other.
    #[inline]
    pub(crate) fn union_with(&mut self, other: &BitSet) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= *b;
        }
    }
}
