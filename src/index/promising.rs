use crate::model::{Dataset, ItemId, Pattern};
use bit_set::BitSet;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-item SWU table, promising-item set, and inverted bitset index.
///
/// SWU(item) = sum of the utilities of every sequence containing the item; an
/// admissible upper bound on the utility of any pattern requiring the item.
/// Raising the threshold strictly shrinks the promising set; the set is always
/// re-derived from the SWU table, never decremented in place.
#[derive(Debug)]
pub struct PromisingItemIndex {
    dataset: Arc<Dataset>,
    swu: HashMap<ItemId, u64>,
    promising: Vec<ItemId>,
    inverted: HashMap<ItemId, BitSet>,
    intersection_cache: RwLock<HashMap<String, BitSet>>,
}

impl PromisingItemIndex {
    pub fn build(dataset: Arc<Dataset>, min_util: u64) -> Self {
        let mut index = Self {
            dataset,
            swu: HashMap::new(),
            promising: Vec::new(),
            inverted: HashMap::new(),
            intersection_cache: RwLock::new(HashMap::new()),
        };
        index.build_swu();
        index.filter_promising(min_util);
        index.build_inverted();
        index
    }

    fn build_swu(&mut self) {
        for seq in self.dataset.sequences() {
            let utility = seq.utility();
            for id in seq.distinct_items() {
                *self.swu.entry(id).or_insert(0) += utility;
            }
        }
    }

    fn filter_promising(&mut self, min_util: u64) {
        self.promising = self
            .swu
            .iter()
            .filter(|&(_, &swu)| swu >= min_util)
            .map(|(&id, _)| id)
            .collect();
        self.promising.sort_unstable();
    }

    fn build_inverted(&mut self) {
        self.inverted.clear();
        let n = self.dataset.len();
        for &id in &self.promising {
            self.inverted.insert(id, BitSet::with_capacity(n));
        }
        for (seq_idx, seq) in self.dataset.sequences().iter().enumerate() {
            for id in seq.distinct_items() {
                if let Some(bits) = self.inverted.get_mut(&id) {
                    bits.insert(seq_idx);
                }
            }
        }
    }

    /// Re-derives the promising set against the new threshold, rebuilds the
    /// inverted index and drops the intersection cache. Callers must treat
    /// items no longer promising as removed and invalidate downstream caches
    /// keyed on signatures containing them.
    pub fn update_threshold(&mut self, new_min_util: u64) {
        self.filter_promising(new_min_util);
        self.build_inverted();
        self.intersection_cache.write().unwrap().clear();
    }

    /// Promising item ids, sorted ascending.
    pub fn promising_items(&self) -> &[ItemId] {
        &self.promising
    }

    pub fn is_promising(&self, id: ItemId) -> bool {
        self.promising.binary_search(&id).is_ok()
    }

    /// SWU of an item; unknown ids report 0.
    pub fn swu(&self, id: ItemId) -> u64 {
        self.swu.get(&id).copied().unwrap_or(0)
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Sequences containing every distinct item of the pattern, as the cached
    /// intersection of per-item bitsets. An empty pattern item set yields an
    /// empty bitset; an item with no inverted entry empties the result
    /// immediately (unknown ids contribute no bits, they are not an error).
    pub fn candidate_sequences(&self, pattern: &Pattern) -> BitSet {
        let ids = pattern.distinct_items();
        if ids.is_empty() {
            return BitSet::new();
        }

        let key = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        if let Some(hit) = self.intersection_cache.read().unwrap().get(&key) {
            return hit.clone();
        }

        let mut result = match self.inverted.get(&ids[0]) {
            Some(bits) => bits.clone(),
            None => BitSet::new(),
        };
        for id in &ids[1..] {
            if result.is_empty() {
                break;
            }
            match self.inverted.get(id) {
                Some(bits) => result.intersect_with(bits),
                None => {
                    result = BitSet::new();
                    break;
                }
            }
        }

        self.intersection_cache
            .write()
            .unwrap()
            .insert(key, result.clone());
        result
    }

    /// Utility of each singleton pattern `<{item}>`: the sum over containing
    /// sequences of the maximum occurrence utility of the item in that
    /// sequence (the best single matching instance).
    pub fn singleton_utilities(&self, items: &[ItemId]) -> HashMap<ItemId, u64> {
        let mut result = HashMap::with_capacity(items.len());
        for &id in items {
            let Some(bits) = self.inverted.get(&id) else {
                result.insert(id, 0);
                continue;
            };
            let mut total = 0u64;
            for seq_idx in bits.iter() {
                let best = self
                    .dataset
                    .get(seq_idx)
                    .itemsets()
                    .iter()
                    .filter_map(|s| s.utility_of(id))
                    .max()
                    .unwrap_or(0);
                total += best;
            }
            result.insert(id, total);
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn intersection_cache_len(&self) -> usize {
        self.intersection_cache.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataSequence, Item, Itemset};

    // R1 = <{1[5],2[3]}, {3[2]}> (u=10), R2 = <{1[4]}, {2[1],3[6]}> (u=11)
    fn two_record_dataset() -> Arc<Dataset> {
        let r1 = DataSequence::new(vec![
            Itemset::new(vec![Item::new(1, 5), Item::new(2, 3)]),
            Itemset::new(vec![Item::new(3, 2)]),
        ]);
        let r2 = DataSequence::new(vec![
            Itemset::new(vec![Item::new(1, 4)]),
            Itemset::new(vec![Item::new(2, 1), Item::new(3, 6)]),
        ]);
        Arc::new(Dataset::new(vec![r1, r2]))
    }

    #[test]
    fn swu_sums_containing_sequence_utilities() {
        let index = PromisingItemIndex::build(two_record_dataset(), 0);
        assert_eq!(index.swu(1), 21);
        assert_eq!(index.swu(2), 21);
        assert_eq!(index.swu(3), 21);
        assert_eq!(index.swu(99), 0);
    }

    #[test]
    fn singleton_utilities_take_best_occurrence_per_sequence() {
        let index = PromisingItemIndex::build(two_record_dataset(), 0);
        let utils = index.singleton_utilities(&[1, 2, 3]);
        assert_eq!(utils[&1], 9);
        assert_eq!(utils[&2], 4);
        assert_eq!(utils[&3], 8);
    }

    #[test]
    fn threshold_rise_shrinks_promising_set() {
        let r1 = DataSequence::new(vec![Itemset::new(vec![Item::new(1, 5)])]);
        let r2 = DataSequence::new(vec![Itemset::new(vec![
            Item::new(1, 2),
            Item::new(2, 7),
        ])]);
        let dataset = Arc::new(Dataset::new(vec![r1, r2]));
        let mut index = PromisingItemIndex::build(dataset, 0);
        assert_eq!(index.promising_items(), &[1, 2]);

        // SWU(1) = 5 + 9 = 14, SWU(2) = 9
        index.update_threshold(10);
        assert_eq!(index.promising_items(), &[1]);
        assert!(!index.is_promising(2));
        assert_eq!(index.intersection_cache_len(), 0);
    }

    #[test]
    fn candidate_sequences_intersect_and_cache() {
        let index = PromisingItemIndex::build(two_record_dataset(), 0);
        let both = index.candidate_sequences(&Pattern::from_itemsets([vec![1], vec![3]]));
        assert_eq!(both.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(index.intersection_cache_len(), 1);

        // second lookup with the same distinct-id set hits the cache
        let again = index.candidate_sequences(&Pattern::from_itemsets([vec![1, 3]]));
        assert_eq!(again.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(index.intersection_cache_len(), 1);
    }

    #[test]
    fn unknown_item_empties_the_candidate_set() {
        let index = PromisingItemIndex::build(two_record_dataset(), 0);
        let empty = index.candidate_sequences(&Pattern::from_itemsets([vec![1, 99]]));
        assert!(empty.is_empty());
        assert!(index
            .candidate_sequences(&Pattern::new())
            .is_empty());
    }
}
