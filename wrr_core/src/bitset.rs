//! Compact "already tried" index set for one request attempt.
//!
//! Mirrors nginx's `rrp->tried` bitmap: inline storage for up to one machine
//! word of peers, heap storage beyond that, so the common small-pool case
//! never touches the allocator.

const WORD_BITS: usize = usize::BITS as usize;

#[derive(Debug, Clone)]
enum Storage {
    Inline(usize),
    Heap(Vec<usize>),
}

/// Bitset of peer indices already tried within one request.
#[derive(Debug, Clone)]
pub struct TriedSet {
    storage: Storage,
    capacity: usize,
}

impl TriedSet {
    /// Allocate a set able to track `capacity` indices (rounded up to a
    /// whole machine word).
    pub fn new(capacity: usize) -> Self {
        let storage = if capacity <= WORD_BITS {
            Storage::Inline(0)
        } else {
            let words = capacity.div_ceil(WORD_BITS);
            Storage::Heap(vec![0; words])
        };
        Self { storage, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_set(&self, index: usize) -> bool {
        debug_assert!(index < self.capacity);
        match &self.storage {
            Storage::Inline(word) => word & (1usize << index) != 0,
            Storage::Heap(words) => {
                let (w, b) = (index / WORD_BITS, index % WORD_BITS);
                words[w] & (1usize << b) != 0
            }
        }
    }

    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.capacity);
        match &mut self.storage {
            Storage::Inline(word) => *word |= 1usize << index,
            Storage::Heap(words) => {
                let (w, b) = (index / WORD_BITS, index % WORD_BITS);
                words[w] |= 1usize << b;
            }
        }
    }

    /// Clear every bit without shrinking the backing storage, so a tier
    /// switch can reuse the same allocation for the backup pool's indices.
    pub fn clear(&mut self) {
        match &mut self.storage {
            Storage::Inline(word) => *word = 0,
            Storage::Heap(words) => words.iter_mut().for_each(|w| *w = 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_path_for_small_pools() {
        let mut t = TriedSet::new(4);
        assert!(!t.is_set(0));
        t.set(2);
        assert!(t.is_set(2));
        assert!(!t.is_set(1));
        t.clear();
        assert!(!t.is_set(2));
    }

    #[test]
    fn heap_path_at_word_boundary() {
        let n = WORD_BITS + 1;
        let mut t = TriedSet::new(n);
        for i in 0..n {
            assert!(!t.is_set(i), "index {i} should start clear");
            t.set(i);
            assert!(t.is_set(i));
        }
        t.clear();
        for i in 0..n {
            assert!(!t.is_set(i));
        }
    }
}
