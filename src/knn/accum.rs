//! Bounded accumulator for top-K score selection.

use std::collections::BinaryHeap;

use ordered_float::NotNan;

/// Accumulate (item, score) pairs, keeping only the `limit` largest scores.
///
/// Entries buffer in a plain vector until the limit is reached, then promote
/// to a min-heap so each further insertion evicts the current minimum.
#[derive(Debug, Clone)]
pub enum ScoreAccumulator {
    Empty,
    Partial(Vec<AccEntry>),
    Full(BinaryHeap<AccEntry>),
}

impl ScoreAccumulator {
    pub fn new() -> ScoreAccumulator {
        ScoreAccumulator::Empty
    }

    pub fn len(&self) -> usize {
        match self {
            ScoreAccumulator::Empty => 0,
            ScoreAccumulator::Partial(v) => v.len(),
            ScoreAccumulator::Full(h) => h.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn heap_mut(&mut self) -> &mut BinaryHeap<AccEntry> {
        match self {
            ScoreAccumulator::Full(h) => h,
            ScoreAccumulator::Empty => {
                *self = ScoreAccumulator::Full(BinaryHeap::new());
                self.heap_mut()
            }
            ScoreAccumulator::Partial(vec) => {
                let mut heap = BinaryHeap::with_capacity(vec.len() + 1);
                while let Some(v) = vec.pop() {
                    heap.push(v);
                }
                *self = ScoreAccumulator::Full(heap);
                self.heap_mut()
            }
        }
    }

    fn vector_mut(&mut self, limit: usize) -> Option<&mut Vec<AccEntry>> {
        match self {
            ScoreAccumulator::Empty => {
                *self = ScoreAccumulator::Partial(Vec::with_capacity(limit));
                self.vector_mut(limit)
            }
            ScoreAccumulator::Partial(vec) if vec.len() < limit => Some(vec),
            _ => None,
        }
    }

    /// Record a score, keeping at most `limit` entries.
    ///
    /// NaN scores are ignored. Boundary ties keep the earliest-inserted
    /// entry, so results are deterministic for identical input order.
    pub fn add_value(&mut self, limit: usize, item: i32, score: f32) {
        let Ok(weight) = NotNan::new(score) else {
            debug_assert!(false, "NaN score for item {}", item);
            return;
        };
        if limit == 0 {
            return;
        }
        let entry = AccEntry { weight, item };
        if let Some(vec) = self.vector_mut(limit) {
            vec.push(entry);
        } else {
            let heap = self.heap_mut();
            if let Some(min) = heap.peek() {
                if entry.weight > min.weight {
                    heap.push(entry);
                    while heap.len() > limit {
                        heap.pop();
                    }
                }
            } else {
                heap.push(entry);
            }
        }
    }

    /// Drain into (item, score) pairs, descending score, ascending item on ties.
    pub fn into_sorted(self) -> Vec<(i32, f32)> {
        let mut entries: Vec<AccEntry> = match self {
            ScoreAccumulator::Empty => Vec::new(),
            ScoreAccumulator::Partial(v) => v,
            ScoreAccumulator::Full(h) => h.into_vec(),
        };
        entries.sort_by_key(|e| (std::cmp::Reverse(e.weight), e.item));
        entries
            .into_iter()
            .map(|e| (e.item, e.weight.into_inner()))
            .collect()
    }
}

impl Default for ScoreAccumulator {
    fn default() -> Self {
        ScoreAccumulator::new()
    }
}

/// Entries in the accumulator heaps.
#[derive(Debug, Clone, Copy)]
pub struct AccEntry {
    weight: NotNan<f32>,
    item: i32,
}

impl PartialEq for AccEntry {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.item == other.item
    }
}

impl Eq for AccEntry {}

impl PartialOrd for AccEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // reverse the score ordering to make a min-heap; on equal scores the
        // higher item index surfaces (and is evicted) first
        other
            .weight
            .cmp(&self.weight)
            .then(self.item.cmp(&other.item))
    }
}

/// Select the `k` highest finite scores from a dense score vector.
///
/// Entries at `f32::NEG_INFINITY` (masked) are never returned; ties order
/// by ascending index.
pub fn top_k_items(scores: &[f32], k: usize) -> Vec<(i32, f32)> {
    let mut acc = ScoreAccumulator::new();
    for (i, s) in scores.iter().enumerate() {
        if *s > f32::NEG_INFINITY {
            acc.add_value(k, i as i32, *s);
        }
    }
    acc.into_sorted()
}
