use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An injective mapping from external IDs to dense zero-based indices.
///
/// Unknown IDs look up to `None`: cold entities are an expected path at
/// recommendation time, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdIndex {
    forward: FxHashMap<i64, i32>,
    ids: Vec<i64>,
}

impl IdIndex {
    pub fn new() -> IdIndex {
        IdIndex::default()
    }

    /// Build an index from IDs in first-appearance order.
    pub fn from_ids<I: IntoIterator<Item = i64>>(iter: I) -> IdIndex {
        let mut idx = IdIndex::new();
        for id in iter {
            idx.intern(id);
        }
        idx
    }

    /// Insert an ID if absent, returning its index either way.
    pub fn intern(&mut self, id: i64) -> i32 {
        if let Some(i) = self.forward.get(&id) {
            *i
        } else {
            let i = self.ids.len() as i32;
            self.forward.insert(id, i);
            self.ids.push(id);
            i
        }
    }

    /// Look up the index for an external ID.
    pub fn index(&self, id: i64) -> Option<i32> {
        self.forward.get(&id).copied()
    }

    /// Look up the external ID at an index.
    pub fn id(&self, index: i32) -> Option<i64> {
        self.ids.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All known IDs, in index order.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }
}

/// The user and item indices backing one training matrix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdMappings {
    pub users: IdIndex,
    pub items: IdIndex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_dense_and_stable() {
        let idx = IdIndex::from_ids([50, 7, 50, 12]);
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.index(50), Some(0));
        assert_eq!(idx.index(7), Some(1));
        assert_eq!(idx.index(12), Some(2));
        assert_eq!(idx.id(1), Some(7));
    }

    #[test]
    fn unknown_lookups_are_none() {
        let idx = IdIndex::from_ids([1, 2]);
        assert_eq!(idx.index(99), None);
        assert_eq!(idx.id(5), None);
    }

    #[test]
    fn round_trips_through_serde() {
        let idx = IdIndex::from_ids([10, 20, 30]);
        let json = serde_json::to_string(&idx).unwrap();
        let back: IdIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index(20), Some(1));
        assert_eq!(back.ids(), idx.ids());
    }
}
