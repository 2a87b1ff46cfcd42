//! Bounded per-worker top-K stores and their k-way merge.

use crate::align::coords::StoredMatch;
use std::{cmp::Ordering, collections::BinaryHeap};

/// A bounded store keeping the K best matches seen by one worker. Backed by
/// a min-heap so that a full store evicts its worst entry in O(log K).
pub struct BoundedBest {
    heap:     BinaryHeap<std::cmp::Reverse<StoredMatch>>,
    capacity: usize,
}

impl BoundedBest {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            heap: BinaryHeap::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn add(&mut self, candidate: StoredMatch) {
        if self.heap.len() < self.capacity {
            self.heap.push(std::cmp::Reverse(candidate));
        } else if let Some(std::cmp::Reverse(worst)) = self.heap.peek()
            && candidate > *worst
        {
            self.heap.pop();
            self.heap.push(std::cmp::Reverse(candidate));
        }
    }

    /// Drains the store into a best-first vector.
    #[must_use]
    pub fn into_sorted(self) -> Vec<StoredMatch> {
        let mut entries: Vec<StoredMatch> = self.heap.into_iter().map(|r| r.0).collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries
    }
}

/// A cursor into one worker's sorted result vector, ordered by its current
/// head so a heap of cursors yields a global merge.
struct MergeCursor {
    entries: Vec<StoredMatch>,
    idx:     usize,
}

impl MergeCursor {
    fn head(&self) -> &StoredMatch {
        &self.entries[self.idx]
    }
}

impl PartialEq for MergeCursor {
    fn eq(&self, other: &Self) -> bool {
        self.head() == other.head()
    }
}

impl Eq for MergeCursor {}

impl PartialOrd for MergeCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.head().cmp(other.head())
    }
}

/// Merges the per-worker sorted vectors into the global best-first list of
/// at most `best` matches.
#[must_use]
pub fn multiway_merge(per_thread: Vec<Vec<StoredMatch>>, best: usize) -> Vec<StoredMatch> {
    let mut cursors: BinaryHeap<MergeCursor> = per_thread
        .into_iter()
        .filter(|entries| !entries.is_empty())
        .map(|entries| MergeCursor { entries, idx: 0 })
        .collect();

    let mut merged = Vec::with_capacity(best);
    while merged.len() < best
        && let Some(mut cursor) = cursors.pop()
    {
        merged.push(*cursor.head());
        cursor.idx += 1;
        if cursor.idx < cursor.entries.len() {
            cursors.push(cursor);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::coords::LocalAlignmentCoordinates;

    fn stored(raw_score: u32, i: usize, j: usize) -> StoredMatch {
        StoredMatch::new(
            LocalAlignmentCoordinates {
                ustart: 0,
                usubstringlength: 4,
                vstart: 0,
                vsubstringlength: 4,
                raw_score,
                forward_strand: true,
            },
            i,
            j,
        )
    }

    #[test]
    fn bounded_store_keeps_only_the_best() {
        let mut store = BoundedBest::new(3);
        for (score, j) in [(5, 0), (9, 1), (1, 2), (7, 3), (3, 4)] {
            store.add(stored(score, 0, j));
        }
        let sorted = store.into_sorted();
        let scores: Vec<u32> = sorted.iter().map(|m| m.coords.raw_score).collect();
        assert_eq!(scores, vec![9, 7, 5]);
    }

    #[test]
    fn merge_is_globally_sorted() {
        let a = vec![stored(9, 0, 0), stored(5, 0, 1), stored(1, 0, 2)];
        let b = vec![stored(8, 1, 0), stored(6, 1, 1)];
        let merged = multiway_merge(vec![a, b], 4);
        let scores: Vec<u32> = merged.iter().map(|m| m.coords.raw_score).collect();
        assert_eq!(scores, vec![9, 8, 6, 5]);
    }

    #[test]
    fn top_k_is_independent_of_the_worker_partitioning() {
        let all: Vec<StoredMatch> = (0..30usize).map(|j| stored((j as u32 * 7) % 13, 0, j)).collect();

        let single = {
            let mut store = BoundedBest::new(5);
            all.iter().for_each(|m| store.add(*m));
            multiway_merge(vec![store.into_sorted()], 5)
        };

        for num_workers in [2, 3, 8] {
            let mut stores: Vec<BoundedBest> = (0..num_workers).map(|_| BoundedBest::new(5)).collect();
            for (idx, m) in all.iter().enumerate() {
                stores[idx % num_workers].add(*m);
            }
            let merged = multiway_merge(stores.into_iter().map(BoundedBest::into_sorted).collect(), 5);
            assert_eq!(merged, single, "num_workers={num_workers}");
        }
    }
}
