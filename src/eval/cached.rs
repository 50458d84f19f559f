use super::{EvalStats, ProjectionCache, UtilityCache, UtilityEvaluator};
use crate::index::{CompactMatchIndex, PromisingItemIndex, Projection};
use crate::model::{ItemId, Pattern};
use bit_set::BitSet;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Production evaluator: greedy matching over the compact index, a flat
/// signature-keyed utility cache, and an optional incremental projection cache
/// that extends a cached prefix's match state instead of rematching the whole
/// pattern.
#[derive(Debug)]
pub struct CachedEvaluator {
    compact: CompactMatchIndex,
    flat: UtilityCache,
    projections: ProjectionCache,
    incremental: bool,
    incremental_matches: AtomicU64,
    full_matches: AtomicU64,
}

impl CachedEvaluator {
    pub fn new(compact: CompactMatchIndex) -> Self {
        Self::with_projection_capacity(compact, true, 10_000)
    }

    pub fn with_projection_capacity(
        compact: CompactMatchIndex,
        incremental: bool,
        capacity: usize,
    ) -> Self {
        Self {
            compact,
            flat: UtilityCache::new(),
            projections: ProjectionCache::with_capacity(capacity),
            incremental,
            incremental_matches: AtomicU64::new(0),
            full_matches: AtomicU64::new(0),
        }
    }

    pub fn compact_index(&self) -> &CompactMatchIndex {
        &self.compact
    }

    fn full_projection(&self, pattern: &Pattern, candidates: &BitSet) -> u64 {
        self.full_matches.fetch_add(1, Ordering::Relaxed);
        let projection = self.compact.build_projection(pattern, candidates);
        let utility = projection.total_utility();
        self.projections
            .put(pattern.signature().to_string(), projection);
        utility
    }

    /// Extends the longest cached proper prefix itemset-by-itemset, storing
    /// each intermediate projection so deeper extensions stay cheap. A dead
    /// extension falls back to a full rebuild.
    fn incremental_projection(&self, pattern: &Pattern, candidates: &BitSet) -> u64 {
        let Some((prefix_len, mut projection)) = self.projections.find_longest_prefix(pattern)
        else {
            return self.full_projection(pattern, candidates);
        };

        for len in prefix_len..pattern.len() {
            match projection.extend(pattern.itemset(len), true, &self.compact) {
                Some(next) => {
                    projection = next;
                    self.projections
                        .put(projection.pattern().signature().to_string(), projection.clone());
                }
                None => return self.full_projection(pattern, candidates),
            }
        }

        self.incremental_matches.fetch_add(1, Ordering::Relaxed);
        projection.total_utility()
    }
}

impl UtilityEvaluator for CachedEvaluator {
    fn evaluate(&self, pattern: &Pattern, index: &PromisingItemIndex) -> u64 {
        let signature = pattern.signature();
        if let Some(utility) = self.flat.get(signature) {
            return utility;
        }

        let candidates = index.candidate_sequences(pattern);
        if candidates.is_empty() {
            self.flat
                .put(signature.to_string(), 0, pattern.distinct_items().to_vec());
            self.projections
                .put(signature.to_string(), Projection::new(pattern.clone()));
            return 0;
        }

        let utility = if self.incremental && pattern.len() > 1 {
            self.incremental_projection(pattern, &candidates)
        } else {
            self.full_projection(pattern, &candidates)
        };

        self.flat
            .put(signature.to_string(), utility, pattern.distinct_items().to_vec());
        utility
    }

    fn invalidate(&self, removed: &HashSet<ItemId>) {
        self.flat.invalidate(removed);
        self.projections.invalidate(removed);
    }

    fn clear(&self) {
        self.flat.clear();
        self.projections.clear();
        self.incremental_matches.store(0, Ordering::Relaxed);
        self.full_matches.store(0, Ordering::Relaxed);
    }

    fn cache_len(&self) -> usize {
        self.flat.len()
    }

    fn stats(&self) -> EvalStats {
        EvalStats {
            hits: self.flat.hits(),
            misses: self.flat.misses(),
            incremental_matches: self.incremental_matches.load(Ordering::Relaxed),
            full_matches: self.full_matches.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataSequence, Dataset, Item, Itemset};
    use std::sync::Arc;

    // R1 = <{1[5],2[3]}, {3[2]}>, R2 = <{1[4]}, {2[1],3[6]}>
    fn fixtures() -> (Arc<Dataset>, PromisingItemIndex, CachedEvaluator) {
        let r1 = DataSequence::new(vec![
            Itemset::new(vec![Item::new(1, 5), Item::new(2, 3)]),
            Itemset::new(vec![Item::new(3, 2)]),
        ]);
        let r2 = DataSequence::new(vec![
            Itemset::new(vec![Item::new(1, 4)]),
            Itemset::new(vec![Item::new(2, 1), Item::new(3, 6)]),
        ]);
        let dataset = Arc::new(Dataset::new(vec![r1, r2]));
        let index = PromisingItemIndex::build(Arc::clone(&dataset), 0);
        let evaluator = CachedEvaluator::new(CompactMatchIndex::build(&dataset));
        (dataset, index, evaluator)
    }

    #[test]
    fn evaluates_and_serves_repeats_from_cache() {
        let (_, index, evaluator) = fixtures();
        let pattern = Pattern::from_itemsets([vec![1], vec![3]]);

        let first = evaluator.evaluate(&pattern, &index);
        assert_eq!(first, 17);
        let size_after_first = evaluator.cache_len();

        let second = evaluator.evaluate(&pattern, &index);
        assert_eq!(second, first);
        assert_eq!(evaluator.cache_len(), size_after_first);
        assert_eq!(evaluator.stats().hits, 1);
    }

    #[test]
    fn empty_candidate_set_scores_zero() {
        let (_, index, evaluator) = fixtures();
        let pattern = Pattern::from_itemsets([vec![1, 99]]);
        assert_eq!(evaluator.evaluate(&pattern, &index), 0);
        // the zero is cached too
        assert_eq!(evaluator.evaluate(&pattern, &index), 0);
        assert_eq!(evaluator.stats().hits, 1);
    }

    #[test]
    fn incremental_extension_matches_cold_evaluation() {
        let (dataset, index, evaluator) = fixtures();
        let prefix = Pattern::singleton(1);
        let pattern = Pattern::from_itemsets([vec![1], vec![3]]);

        evaluator.evaluate(&prefix, &index);
        let incremental = evaluator.evaluate(&pattern, &index);
        assert_eq!(evaluator.stats().incremental_matches, 1);

        let cold = CachedEvaluator::new(CompactMatchIndex::build(&dataset));
        assert_eq!(incremental, cold.evaluate(&pattern, &index));
    }

    #[test]
    fn invalidation_forces_fresh_evaluation() {
        let (_, index, evaluator) = fixtures();
        let with_two = Pattern::from_itemsets([vec![1, 2]]);
        let without_two = Pattern::from_itemsets([vec![1], vec![3]]);
        evaluator.evaluate(&with_two, &index);
        evaluator.evaluate(&without_two, &index);

        let removed: HashSet<ItemId> = [2].into_iter().collect();
        evaluator.invalidate(&removed);

        // the untouched pattern still answers identically to a cold cache
        assert_eq!(evaluator.evaluate(&without_two, &index), 17);
        // the invalidated pattern is recomputed, not served stale
        let misses_before = evaluator.stats().misses;
        evaluator.evaluate(&with_two, &index);
        assert_eq!(evaluator.stats().misses, misses_before + 1);
    }

    #[test]
    fn clear_wipes_both_caches() {
        let (_, index, evaluator) = fixtures();
        evaluator.evaluate(&Pattern::singleton(1), &index);
        assert!(evaluator.cache_len() > 0);
        evaluator.clear();
        assert_eq!(evaluator.cache_len(), 0);
        assert_eq!(evaluator.stats().hits, 0);
    }
}
