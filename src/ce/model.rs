use super::Scored;
use crate::model::{DatasetStats, ItemId, Pattern};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// The learned sampling state: the item-by-position probability matrix (PM),
/// the pattern-length distribution, and a per-position cumulative table for
/// weighted draws, rebuilt lazily after every PM change.
///
/// Rows map to promising items through a stable id->row table; pruning copies
/// surviving rows by item identity, never by position.
#[derive(Debug)]
pub struct GenerativeModel {
    items: Vec<ItemId>,
    row_of: HashMap<ItemId, usize>,
    pm: Array2<f64>,
    lengths: Vec<f64>,
    max_len: usize,
    cdf: Option<Array2<f64>>,
}

const INITIAL_PROBABILITY: f64 = 0.5;

impl GenerativeModel {
    pub fn new(items: &[ItemId], max_len: usize) -> Self {
        let items = items.to_vec();
        let row_of = items.iter().enumerate().map(|(row, &id)| (id, row)).collect();
        Self {
            pm: Array2::from_elem((items.len(), max_len), INITIAL_PROBABILITY),
            lengths: vec![1.0 / max_len as f64; max_len],
            items,
            row_of,
            max_len,
            cdf: None,
        }
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn max_pattern_length(&self) -> usize {
        self.max_len
    }

    pub fn length_distribution(&self) -> &[f64] {
        &self.lengths
    }

    /// PM row for an item, by identity.
    pub fn row_for(&self, id: ItemId) -> Option<Vec<f64>> {
        self.row_of
            .get(&id)
            .map(|&row| self.pm.row(row).to_vec())
    }

    /// True iff every PM entry has been driven to exactly 0 or 1.
    pub fn is_converged(&self) -> bool {
        self.pm.iter().all(|&p| p == 0.0 || p == 1.0)
    }

    /// Rebuilds the PM over the surviving items only, copying each survivor's
    /// row from the old matrix by item identity. The promising set only
    /// shrinks, so every survivor already has a row.
    pub fn prune_items(&mut self, surviving: &[ItemId]) {
        let mut pm = Array2::from_elem((surviving.len(), self.max_len), INITIAL_PROBABILITY);
        for (new_row, id) in surviving.iter().enumerate() {
            if let Some(&old_row) = self.row_of.get(id) {
                pm.row_mut(new_row).assign(&self.pm.row(old_row));
            }
        }
        self.items = surviving.to_vec();
        self.row_of = self
            .items
            .iter()
            .enumerate()
            .map(|(row, &id)| (id, row))
            .collect();
        self.pm = pm;
        self.cdf = None;
    }

    /// Blends the PM toward the elite's item-per-position frequencies at
    /// `rate`, decaying positions the elite never reaches. One pass over the
    /// elite tallies counts; the base variant is this update at rate 1.0.
    /// Returns the maximum absolute entry change, the stabilization signal.
    pub fn update_from_elite(&mut self, elite: &[Scored], rate: f64) -> f64 {
        if elite.is_empty() || self.items.is_empty() {
            return 0.0;
        }

        let mut counts = Array2::<u64>::zeros((self.items.len(), self.max_len));
        let mut totals = vec![0u64; self.max_len];
        for scored in elite {
            let len = scored.pattern.len().min(self.max_len);
            for pos in 0..len {
                totals[pos] += 1;
                for id in scored.pattern.itemset(pos) {
                    if let Some(&row) = self.row_of.get(id) {
                        counts[[row, pos]] += 1;
                    }
                }
            }
        }

        let mut max_delta = 0.0f64;
        for row in 0..self.items.len() {
            for pos in 0..self.max_len {
                let old = self.pm[[row, pos]];
                let new = if totals[pos] > 0 {
                    let freq = counts[[row, pos]] as f64 / totals[pos] as f64;
                    (1.0 - rate) * old + rate * freq
                } else {
                    (1.0 - rate) * old
                };
                max_delta = max_delta.max((new - old).abs());
                self.pm[[row, pos]] = new;
            }
        }
        self.cdf = None;
        max_delta
    }

    /// Laplace-smoothed elite length frequencies blended at `rate`, floored
    /// per entry, then renormalized to sum 1.
    pub fn update_lengths(&mut self, elite: &[Scored], rate: f64, floor: f64) {
        if elite.is_empty() {
            return;
        }
        let mut occurrences = vec![0usize; self.max_len];
        for scored in elite {
            let len = scored.pattern.len();
            if (1..=self.max_len).contains(&len) {
                occurrences[len - 1] += 1;
            }
        }

        let denominator = (elite.len() + self.max_len) as f64;
        for (i, prob) in self.lengths.iter_mut().enumerate() {
            let frequency = (occurrences[i] + 1) as f64 / denominator;
            *prob = ((1.0 - rate) * *prob + rate * frequency).max(floor);
        }
        let sum: f64 = self.lengths.iter().sum();
        for prob in &mut self.lengths {
            *prob /= sum;
        }
    }

    pub fn sample_length_uniform(&self, rng: &mut StdRng) -> usize {
        1 + rng.gen_range(0..self.max_len)
    }

    /// Length draw from the learned distribution.
    pub fn sample_length(&self, rng: &mut StdRng) -> usize {
        let r: f64 = rng.gen();
        let mut cumulative = 0.0;
        for (i, &p) in self.lengths.iter().enumerate() {
            cumulative += p;
            if r <= cumulative {
                return i + 1;
            }
        }
        self.max_len
    }

    /// Base-variant pattern draw: uniform length; per position, independent
    /// Bernoulli inclusion per PM entry, reduced to the empirically drawn
    /// target size by a partial Fisher-Yates shuffle.
    pub fn sample_pattern(&self, rng: &mut StdRng, stats: &DatasetStats) -> Pattern {
        let len = self.sample_length_uniform(rng);
        let mut pattern = Pattern::new();
        for pos in 0..len {
            pattern.push_itemset(self.bernoulli_itemset(rng, stats, pos));
        }
        pattern
    }

    fn bernoulli_itemset(&self, rng: &mut StdRng, stats: &DatasetStats, pos: usize) -> Vec<ItemId> {
        let mut chosen: Vec<ItemId> = Vec::new();
        for (row, &id) in self.items.iter().enumerate() {
            if rng.gen::<f64>() < self.pm[[row, pos]] {
                chosen.push(id);
            }
        }

        let target = stats.sample_itemset_size(rng).max(1);
        if chosen.len() > target {
            // partial Fisher-Yates: only the first `target` slots are settled
            let n = chosen.len();
            for i in 0..target {
                let j = i + rng.gen_range(0..n - i);
                chosen.swap(i, j);
            }
            chosen.truncate(target);
        }

        if chosen.is_empty() {
            chosen.push(self.fallback_item(rng, pos));
        }
        chosen
    }

    /// Enhanced-variant pattern draw: length from the learned distribution;
    /// per position, `target` distinct items via repeated weighted draws with
    /// binary search over the cumulative PM column. Retries are bounded so a
    /// degenerate column cannot loop forever.
    pub fn sample_pattern_weighted(&mut self, rng: &mut StdRng, stats: &DatasetStats) -> Pattern {
        self.ensure_cdf();
        let len = self.sample_length(rng);
        let mut pattern = Pattern::new();
        for pos in 0..len {
            pattern.push_itemset(self.weighted_itemset(rng, stats, pos));
        }
        pattern
    }

    fn weighted_itemset(&self, rng: &mut StdRng, stats: &DatasetStats, pos: usize) -> Vec<ItemId> {
        let cdf = self.cdf.as_ref().expect("cdf built by ensure_cdf");
        let n = self.items.len();
        let total = cdf[[pos, n - 1]];

        let target = stats.sample_itemset_size(rng).max(1);
        let mut chosen: Vec<ItemId> = Vec::new();
        let mut seen: HashSet<ItemId> = HashSet::new();

        if total > 0.0 {
            let mut attempts = 0;
            while chosen.len() < target && attempts < target * 3 {
                attempts += 1;
                let r = rng.gen::<f64>() * total;
                let row = binary_search_cdf(cdf, pos, r, n);
                let id = self.items[row];
                if seen.insert(id) {
                    chosen.push(id);
                }
            }
        }

        if chosen.is_empty() {
            chosen.push(self.fallback_item(rng, pos));
        }
        chosen
    }

    /// Pure-exploration draw: uniform length, uniform random distinct
    /// promising items per position, PM ignored.
    pub fn sample_exploration(&self, rng: &mut StdRng, stats: &DatasetStats) -> Pattern {
        let len = self.sample_length_uniform(rng);
        let mut pattern = Pattern::new();
        for _ in 0..len {
            let target = stats.sample_itemset_size(rng).max(1);
            let attempts = target.min(self.items.len());
            let mut chosen: Vec<ItemId> = Vec::new();
            let mut seen: HashSet<ItemId> = HashSet::new();
            for _ in 0..attempts {
                let id = self.items[rng.gen_range(0..self.items.len())];
                if seen.insert(id) {
                    chosen.push(id);
                }
            }
            pattern.push_itemset(chosen);
        }
        pattern
    }

    /// Crossover draw: concatenates pairs of short elite patterns in both
    /// orders, deduplicating by signature. Returns at most `want` patterns.
    pub fn sample_fusion(
        &self,
        rng: &mut StdRng,
        elite: &[Scored],
        want: usize,
        max_len: usize,
    ) -> Vec<Pattern> {
        let candidates: Vec<&Pattern> = elite
            .iter()
            .map(|s| &s.pattern)
            .filter(|p| !p.is_empty() && p.len() <= max_len / 2)
            .collect();
        if candidates.len() < 2 || want == 0 {
            return Vec::new();
        }

        let mut fused = Vec::new();
        let mut signatures: HashSet<String> = HashSet::new();
        let mut attempts = 0;
        while fused.len() < want && attempts < want * 3 {
            attempts += 1;
            let i = rng.gen_range(0..candidates.len());
            let j = rng.gen_range(0..candidates.len());
            if i == j {
                continue;
            }
            if candidates[i].len() + candidates[j].len() > max_len {
                continue;
            }

            for pattern in [
                Pattern::concat(candidates[i], candidates[j]),
                Pattern::concat(candidates[j], candidates[i]),
            ] {
                if fused.len() >= want {
                    break;
                }
                if signatures.insert(pattern.signature().to_string()) {
                    fused.push(pattern);
                }
            }
        }
        fused
    }

    /// One item drawn proportionally to the PM column, or uniformly when the
    /// whole column is zero.
    fn fallback_item(&self, rng: &mut StdRng, pos: usize) -> ItemId {
        let sum: f64 = (0..self.items.len()).map(|row| self.pm[[row, pos]]).sum();
        if sum == 0.0 {
            return self.items[rng.gen_range(0..self.items.len())];
        }
        let r = rng.gen::<f64>() * sum;
        let mut cumulative = 0.0;
        for (row, &id) in self.items.iter().enumerate() {
            cumulative += self.pm[[row, pos]];
            if cumulative >= r {
                return id;
            }
        }
        self.items[0]
    }

    fn ensure_cdf(&mut self) {
        if self.cdf.is_some() {
            return;
        }
        let n = self.items.len();
        let mut cdf = Array2::<f64>::zeros((self.max_len, n));
        for pos in 0..self.max_len {
            let mut sum = 0.0;
            for row in 0..n {
                sum += self.pm[[row, pos]];
                cdf[[pos, row]] = sum;
            }
        }
        self.cdf = Some(cdf);
    }

    #[cfg(test)]
    pub(crate) fn set_probability(&mut self, id: ItemId, pos: usize, p: f64) {
        let row = self.row_of[&id];
        self.pm[[row, pos]] = p;
        self.cdf = None;
    }
}

fn binary_search_cdf(cdf: &Array2<f64>, pos: usize, target: f64, n: usize) -> usize {
    let mut left = 0;
    let mut right = n - 1;
    while left < right {
        let mid = (left + right) / 2;
        if cdf[[pos, mid]] < target {
            left = mid + 1;
        } else {
            right = mid;
        }
    }
    left
}
