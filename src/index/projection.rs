use super::CompactMatchIndex;
use crate::model::{ItemId, Pattern};

/// Greedy match state for one database sequence: the last matched flat
/// position of each pattern itemset and the running utility.
#[derive(Debug, Clone)]
pub struct SeqMatch {
    pub seq_index: usize,
    pub positions: Vec<u32>,
    pub utility: u64,
}

impl SeqMatch {
    pub fn last_position(&self) -> u32 {
        *self.positions.last().expect("a match covers at least one itemset")
    }

    /// New state with one more matched itemset appended.
    pub fn extended(&self, position: u32, added_utility: u64) -> SeqMatch {
        let mut positions = Vec::with_capacity(self.positions.len() + 1);
        positions.extend_from_slice(&self.positions);
        positions.push(position);
        SeqMatch {
            seq_index: self.seq_index,
            positions,
            utility: self.utility + added_utility,
        }
    }
}

/// Projected database for one pattern: the per-sequence match states needed to
/// extend the pattern by one itemset without rematching from scratch.
#[derive(Debug, Clone)]
pub struct Projection {
    pattern: Pattern,
    matches: Vec<SeqMatch>,
    total_utility: u64,
}

impl Projection {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            matches: Vec::new(),
            total_utility: 0,
        }
    }

    pub fn push(&mut self, m: SeqMatch) {
        self.total_utility += m.utility;
        self.matches.push(m);
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn matches(&self) -> &[SeqMatch] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn total_utility(&self) -> u64 {
        self.total_utility
    }

    /// Extends every match by the new itemset, searching only forward from each
    /// match's last position. Returns `None` when no sequence survives; the
    /// caller falls back to a full rebuild (which will confirm the zero).
    pub fn extend(
        &self,
        itemset: &[ItemId],
        new_time_step: bool,
        index: &CompactMatchIndex,
    ) -> Option<Projection> {
        let mut pattern = self.pattern.clone();
        pattern.push_itemset(itemset.to_vec());

        let mut extended = Projection::new(pattern);
        for m in &self.matches {
            if let Some(next) = index.extend_match(m, itemset, new_time_step) {
                extended.push(next);
            }
        }
        if extended.matches.is_empty() {
            None
        } else {
            Some(extended)
        }
    }
}
