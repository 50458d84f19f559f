use super::{Projection, SeqMatch};
use crate::model::{Dataset, ItemId, Pattern};
use bit_set::BitSet;
use std::collections::HashMap;

/// Compact per-sequence array form enabling greedy matching in
/// O(pattern length x average occurrences) instead of full dynamic-programming
/// enumeration. Built once from the dataset; never rebuilt on pruning.
#[derive(Debug)]
pub struct CompactMatchIndex {
    seqs: Vec<CompactSeq>,
}

/// One flattened database sequence.
#[derive(Debug)]
struct CompactSeq {
    items: Vec<ItemId>,
    utilities: Vec<u64>,
    /// remaining[i] = sum of utilities strictly after position i.
    remaining: Vec<u64>,
    /// Flat positions where a new itemset begins.
    itemset_starts: BitSet,
    /// Itemset index of each flat position, derived from `itemset_starts`.
    itemset_of: Vec<u32>,
    /// Sorted occurrence positions of each item id.
    positions: HashMap<ItemId, Vec<u32>>,
}

impl CompactSeq {
    fn new(seq: &crate::model::DataSequence) -> Self {
        let total: usize = seq.itemsets().iter().map(|s| s.len()).sum();
        let mut items = Vec::with_capacity(total);
        let mut utilities = Vec::with_capacity(total);
        let mut itemset_starts = BitSet::with_capacity(total);
        let mut itemset_of = Vec::with_capacity(total);
        let mut positions: HashMap<ItemId, Vec<u32>> = HashMap::new();

        for (set_idx, itemset) in seq.itemsets().iter().enumerate() {
            itemset_starts.insert(items.len());
            for item in itemset.items() {
                positions.entry(item.id).or_default().push(items.len() as u32);
                items.push(item.id);
                utilities.push(item.utility);
                itemset_of.push(set_idx as u32);
            }
        }

        let mut remaining = vec![0u64; total];
        let mut sum = 0u64;
        for i in (0..total).rev() {
            remaining[i] = sum;
            sum += utilities[i];
        }

        Self {
            items,
            utilities,
            remaining,
            itemset_starts,
            itemset_of,
            positions,
        }
    }

    /// Greedily matches one pattern itemset after `last_pos`.
    ///
    /// Ordering rule: the itemset's first item must land in a strictly later
    /// sequence itemset than the previous pattern itemset's match when
    /// `new_time_step` holds (S-concatenation); every further item of the same
    /// pattern itemset must land after the previously matched position in a
    /// sequence itemset no earlier than the first item's (I-concatenation).
    /// Returns the last matched position and the matched utility, or `None`
    /// when any item cannot be placed.
    fn match_itemset(
        &self,
        itemset: &[ItemId],
        last_pos: Option<u32>,
        new_time_step: bool,
    ) -> Option<(u32, u64)> {
        let prev_set = last_pos.map(|p| self.itemset_of[p as usize]);
        let mut cursor = last_pos;
        let mut anchor = 0u32;
        let mut utility = 0u64;

        for (i, &id) in itemset.iter().enumerate() {
            let occurrences = self.positions.get(&id)?;
            let min_pos = cursor.map_or(0, |c| c + 1);
            let start = occurrences.partition_point(|&p| p < min_pos);

            let mut matched = None;
            for &p in &occurrences[start..] {
                let set_idx = self.itemset_of[p as usize];
                let ordered = if i == 0 {
                    match prev_set {
                        None => true,
                        Some(prev) if new_time_step => set_idx > prev,
                        Some(prev) => set_idx >= prev,
                    }
                } else {
                    set_idx >= anchor
                };
                if ordered {
                    matched = Some(p);
                    break;
                }
            }

            let p = matched?;
            if i == 0 {
                anchor = self.itemset_of[p as usize];
            }
            utility += self.utilities[p as usize];
            cursor = Some(p);
        }

        cursor.map(|last| (last, utility))
    }

    /// Matches the whole pattern itemset-by-itemset; any unmatched itemset
    /// zeroes the sequence's contribution.
    fn greedy_match(&self, pattern: &Pattern) -> Option<(Vec<u32>, u64)> {
        let mut last: Option<u32> = None;
        let mut positions = Vec::with_capacity(pattern.len());
        let mut total = 0u64;
        for (i, itemset) in pattern.itemsets().iter().enumerate() {
            let (pos, utility) = self.match_itemset(itemset, last, i > 0)?;
            positions.push(pos);
            total += utility;
            last = Some(pos);
        }
        Some((positions, total))
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

impl CompactMatchIndex {
    pub fn build(dataset: &Dataset) -> Self {
        Self {
            seqs: dataset.sequences().iter().map(CompactSeq::new).collect(),
        }
    }

    pub fn sequence_count(&self) -> usize {
        self.seqs.len()
    }

    /// Total pattern utility over the candidate sequences under the greedy
    /// matching semantics. A deliberate heuristic: it finds one good instance
    /// per sequence quickly instead of enumerating all instances.
    pub fn match_utility(&self, pattern: &Pattern, candidates: &BitSet) -> u64 {
        candidates
            .iter()
            .filter_map(|seq_idx| self.seqs[seq_idx].greedy_match(pattern))
            .map(|(_, utility)| utility)
            .sum()
    }

    /// Same greedy matching, additionally recording per-sequence match state
    /// for future incremental extension.
    pub fn build_projection(&self, pattern: &Pattern, candidates: &BitSet) -> Projection {
        let mut projection = Projection::new(pattern.clone());
        for seq_idx in candidates.iter() {
            if let Some((positions, utility)) = self.seqs[seq_idx].greedy_match(pattern) {
                projection.push(SeqMatch {
                    seq_index: seq_idx,
                    positions,
                    utility,
                });
            }
        }
        projection
    }

    /// Extends a prior match by one itemset, searching only forward from its
    /// last matched position. `None` means the prefix is dead for this
    /// sequence.
    pub fn extend_match(
        &self,
        m: &SeqMatch,
        itemset: &[ItemId],
        new_time_step: bool,
    ) -> Option<SeqMatch> {
        let cs = &self.seqs[m.seq_index];
        let (pos, utility) = cs.match_itemset(itemset, Some(m.last_position()), new_time_step)?;
        Some(m.extended(pos, utility))
    }

    /// Cheap admissible upper bound: first-occurrence utilities of the
    /// pattern's items plus the remaining utility after the earliest of them.
    pub fn remaining_upper_bound(&self, pattern: &Pattern, candidates: &BitSet) -> u64 {
        let mut bound = 0u64;
        for seq_idx in candidates.iter() {
            let cs = &self.seqs[seq_idx];
            let mut seq_bound = 0u64;
            let mut min_pos = usize::MAX;
            for itemset in pattern.itemsets() {
                for id in itemset {
                    if let Some(occurrences) = cs.positions.get(id) {
                        let first = occurrences[0] as usize;
                        min_pos = min_pos.min(first);
                        seq_bound += cs.utilities[first];
                    }
                }
            }
            if min_pos < cs.len() {
                seq_bound += cs.remaining[min_pos];
            }
            bound += seq_bound;
        }
        bound
    }
}
