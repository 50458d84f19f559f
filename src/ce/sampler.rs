use super::{smoothing_factor, GenerativeModel, Scored};
use crate::model::{DatasetStats, Pattern};
use rand::rngs::StdRng;

/// Per-round sampling inputs.
pub struct RoundContext<'a> {
    pub sample_size: usize,
    pub rho: f64,
    /// Elite of the previous round, sorted by utility descending; empty on the
    /// first round.
    pub previous_elite: &'a [Scored],
    pub stats: &'a DatasetStats,
}

/// Candidate-generation strategy, selected at construction time.
pub trait PatternSampler: Send {
    fn sample_round(
        &mut self,
        model: &mut GenerativeModel,
        ctx: &RoundContext<'_>,
        rng: &mut StdRng,
    ) -> Vec<Pattern>;
}

/// Base variant: pure exploitation of the PM with uniformly drawn lengths.
#[derive(Debug, Default)]
pub struct ModelSampler;

impl PatternSampler for ModelSampler {
    fn sample_round(
        &mut self,
        model: &mut GenerativeModel,
        ctx: &RoundContext<'_>,
        rng: &mut StdRng,
    ) -> Vec<Pattern> {
        if model.item_count() == 0 {
            return Vec::new();
        }
        (0..ctx.sample_size)
            .map(|_| model.sample_pattern(rng, ctx.stats))
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Enhanced variant: splits each round into a fixed fusion share, an
/// exploration share sized by the smoothing factor of the previous elite, and
/// a weighted-exploitation remainder drawn from the learned model.
#[derive(Debug)]
pub struct AdaptiveSampler {
    fusion_ratio: f64,
}

impl AdaptiveSampler {
    pub fn new(fusion_ratio: f64) -> Self {
        Self { fusion_ratio }
    }
}

impl Default for AdaptiveSampler {
    fn default() -> Self {
        Self::new(0.10)
    }
}

impl PatternSampler for AdaptiveSampler {
    fn sample_round(
        &mut self,
        model: &mut GenerativeModel,
        ctx: &RoundContext<'_>,
        rng: &mut StdRng,
    ) -> Vec<Pattern> {
        if model.item_count() == 0 {
            return Vec::new();
        }

        let n = ctx.sample_size;
        let alpha = smoothing_factor(ctx.previous_elite, ctx.rho);
        let num_fusion = (n as f64 * self.fusion_ratio).floor() as usize;
        let num_random = (n as f64 * alpha).floor() as usize;
        let num_model = n.saturating_sub(num_fusion + num_random);

        let mut sample = Vec::with_capacity(n);

        if num_fusion > 0 && !ctx.previous_elite.is_empty() {
            sample.extend(model.sample_fusion(
                rng,
                ctx.previous_elite,
                num_fusion,
                model.max_pattern_length(),
            ));
        }
        for _ in 0..num_random {
            sample.push(model.sample_exploration(rng, ctx.stats));
        }
        for _ in 0..num_model {
            sample.push(model.sample_pattern_weighted(rng, ctx.stats));
        }

        sample.retain(|p| !p.is_empty());
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataSequence, Dataset, Item, Itemset};
    use rand::SeedableRng;

    fn stats() -> DatasetStats {
        let r = DataSequence::new(vec![
            Itemset::new(vec![Item::new(1, 1), Item::new(2, 1)]),
            Itemset::new(vec![Item::new(3, 1)]),
        ]);
        DatasetStats::new(&Dataset::new(vec![r]))
    }

    #[test]
    fn base_sampler_fills_the_round() {
        let mut model = GenerativeModel::new(&[1, 2, 3], 3);
        let stats = stats();
        let mut rng = StdRng::seed_from_u64(5);
        let ctx = RoundContext {
            sample_size: 30,
            rho: 0.3,
            previous_elite: &[],
            stats: &stats,
        };
        let sample = ModelSampler.sample_round(&mut model, &ctx, &mut rng);
        assert_eq!(sample.len(), 30);
    }

    #[test]
    fn adaptive_sampler_mixes_shares() {
        let mut model = GenerativeModel::new(&[1, 2, 3], 4);
        let stats = stats();
        let mut rng = StdRng::seed_from_u64(5);
        let elite = vec![
            Scored {
                pattern: Pattern::from_itemsets([vec![1]]),
                utility: 20,
            },
            Scored {
                pattern: Pattern::from_itemsets([vec![2]]),
                utility: 5,
            },
        ];
        let ctx = RoundContext {
            sample_size: 40,
            rho: 0.5,
            previous_elite: &elite,
            stats: &stats,
        };
        let sample = AdaptiveSampler::default().sample_round(&mut model, &ctx, &mut rng);
        assert!(!sample.is_empty());
        assert!(sample.len() <= 40);
        assert!(sample.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn empty_item_set_yields_an_empty_sample() {
        let mut model = GenerativeModel::new(&[], 3);
        let stats = stats();
        let mut rng = StdRng::seed_from_u64(5);
        let ctx = RoundContext {
            sample_size: 10,
            rho: 0.3,
            previous_elite: &[],
            stats: &stats,
        };
        assert!(ModelSampler
            .sample_round(&mut model, &ctx, &mut rng)
            .is_empty());
        assert!(AdaptiveSampler::default()
            .sample_round(&mut model, &ctx, &mut rng)
            .is_empty());
    }
}
