use super::{EvalStats, UtilityCache, UtilityEvaluator};
use crate::index::PromisingItemIndex;
use crate::model::{DataSequence, ItemId, Itemset, Pattern};
use std::collections::HashSet;
use std::sync::Arc;

/// Reference evaluator implementing the maximal-instance semantics: every
/// order-valid embedding where each pattern itemset is contained in one
/// database itemset is considered, and each sequence contributes its
/// best-scoring instance. Exhaustive where the greedy matcher is first-fit;
/// the two can disagree on sequences with overlapping occurrences.
#[derive(Debug)]
pub struct ExactEvaluator {
    dataset: Arc<crate::model::Dataset>,
    flat: UtilityCache,
}

impl ExactEvaluator {
    pub fn new(dataset: Arc<crate::model::Dataset>) -> Self {
        Self {
            dataset,
            flat: UtilityCache::new(),
        }
    }

    /// Maximum instance utility of the pattern within one sequence, by dynamic
    /// programming over database itemset positions: an instance matches
    /// pattern itemsets to strictly increasing database itemsets, each under
    /// containment.
    fn maximal_utility(pattern: &Pattern, seq: &DataSequence) -> u64 {
        let n = seq.len();
        if pattern.len() > n {
            return 0;
        }

        // best[j] = best utility matching the pattern prefix processed so far
        // with its last itemset placed exactly at database itemset j
        let mut best: Vec<Option<u64>> = vec![None; n];
        for (i, pattern_set) in pattern.itemsets().iter().enumerate() {
            let mut next: Vec<Option<u64>> = vec![None; n];
            let mut best_before: Option<u64> = None;
            for j in 0..n {
                if i > 0 {
                    // carry the best placement of the previous itemset at < j
                    if j > 0 {
                        best_before = max_opt(best_before, best[j - 1]);
                    }
                }
                let placeable = i == 0 || best_before.is_some();
                if placeable {
                    if let Some(utility) = contained_utility(pattern_set, &seq.itemsets()[j]) {
                        let base = if i == 0 { 0 } else { best_before.unwrap() };
                        next[j] = max_opt(next[j], Some(base + utility));
                    }
                }
            }
            best = next;
        }

        best.into_iter().flatten().max().unwrap_or(0)
    }
}

/// Utility of a pattern itemset inside one database itemset, or `None` when
/// containment fails.
fn contained_utility(pattern_set: &[ItemId], db_set: &Itemset) -> Option<u64> {
    let mut utility = 0u64;
    for &id in pattern_set {
        utility += db_set.utility_of(id)?;
    }
    Some(utility)
}

fn max_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

impl UtilityEvaluator for ExactEvaluator {
    fn evaluate(&self, pattern: &Pattern, index: &PromisingItemIndex) -> u64 {
        let signature = pattern.signature();
        if let Some(utility) = self.flat.get(signature) {
            return utility;
        }

        let candidates = index.candidate_sequences(pattern);
        let utility = candidates
            .iter()
            .map(|seq_idx| Self::maximal_utility(pattern, self.dataset.get(seq_idx)))
            .sum();

        self.flat
            .put(signature.to_string(), utility, pattern.distinct_items().to_vec());
        utility
    }

    fn invalidate(&self, removed: &HashSet<ItemId>) {
        self.flat.invalidate(removed);
    }

    fn clear(&self) {
        self.flat.clear();
    }

    fn cache_len(&self) -> usize {
        self.flat.len()
    }

    fn stats(&self) -> EvalStats {
        EvalStats {
            hits: self.flat.hits(),
            misses: self.flat.misses(),
            ..EvalStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dataset, Item};

    fn dataset() -> Arc<Dataset> {
        // <{1[2]}, {1[9],2[1]}, {2[4]}>
        let r = DataSequence::new(vec![
            Itemset::new(vec![Item::new(1, 2)]),
            Itemset::new(vec![Item::new(1, 9), Item::new(2, 1)]),
            Itemset::new(vec![Item::new(2, 4)]),
        ]);
        Arc::new(Dataset::new(vec![r]))
    }

    #[test]
    fn picks_the_maximal_instance() {
        let dataset = dataset();
        let index = PromisingItemIndex::build(Arc::clone(&dataset), 0);
        let evaluator = ExactEvaluator::new(dataset);

        // greedy first-fit would take 1@pos0 then 2@itemset1 (2+1=3); the
        // maximal instance is 1@itemset1, 2@itemset2 (9+4=13)
        let pattern = Pattern::from_itemsets([vec![1], vec![2]]);
        assert_eq!(evaluator.evaluate(&pattern, &index), 13);
    }

    #[test]
    fn requires_itemset_containment() {
        let dataset = dataset();
        let index = PromisingItemIndex::build(Arc::clone(&dataset), 0);
        let evaluator = ExactEvaluator::new(dataset);

        // {1,2} together only in the middle itemset
        let pattern = Pattern::from_itemsets([vec![1, 2]]);
        assert_eq!(evaluator.evaluate(&pattern, &index), 10);

        // no itemset contains 1 after an itemset containing {1,2}
        let longer = Pattern::from_itemsets([vec![1, 2], vec![1]]);
        assert_eq!(evaluator.evaluate(&longer, &index), 0);
    }

    #[test]
    fn too_long_patterns_score_zero() {
        let dataset = dataset();
        let index = PromisingItemIndex::build(Arc::clone(&dataset), 0);
        let evaluator = ExactEvaluator::new(dataset);
        let pattern = Pattern::from_itemsets([vec![1], vec![1], vec![2], vec![2]]);
        assert_eq!(evaluator.evaluate(&pattern, &index), 0);
    }
}
