use super::{Dataset, ItemId};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Derived statistics over a dataset: the empirical itemset-size distribution
/// drives itemset-size draws during sampling.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    distinct_items: HashSet<ItemId>,
    size_distribution: HashMap<usize, usize>,
    itemset_sizes: Vec<usize>,
    max_sequence_length: usize,
}

impl DatasetStats {
    pub fn new(dataset: &Dataset) -> Self {
        let mut distinct_items = HashSet::new();
        let mut size_distribution: HashMap<usize, usize> = HashMap::new();
        let mut itemset_sizes = Vec::new();
        let mut max_len = 0;

        for seq in dataset.sequences() {
            max_len = max_len.max(seq.len());
            for itemset in seq.itemsets() {
                for item in itemset.items() {
                    distinct_items.insert(item.id);
                }
                let size = itemset.len();
                *size_distribution.entry(size).or_insert(0) += 1;
                itemset_sizes.push(size);
            }
        }

        Self {
            distinct_items,
            size_distribution,
            itemset_sizes,
            max_sequence_length: max_len,
        }
    }

    pub fn distinct_item_count(&self) -> usize {
        self.distinct_items.len()
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    pub fn size_distribution(&self) -> &HashMap<usize, usize> {
        &self.size_distribution
    }

    /// Draws an itemset size from the empirical distribution: a uniform pick
    /// over all observed sizes. Falls back to 1 on an empty pool.
    pub fn sample_itemset_size(&self, rng: &mut StdRng) -> usize {
        if self.itemset_sizes.is_empty() {
            return 1;
        }
        self.itemset_sizes[rng.gen_range(0..self.itemset_sizes.len())]
    }
}
