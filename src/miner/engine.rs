use super::config::{MatcherKind, MinerConfig, SamplerKind};
use super::diversity::combined_diversity;
use super::topk::TopK;
use crate::ce::{
    AdaptiveSampler, GenerativeModel, ModelSampler, PatternSampler, RoundContext, Scored,
};
use crate::eval::{CachedEvaluator, EvalStats, ExactEvaluator, UtilityEvaluator};
use crate::index::{CompactMatchIndex, PromisingItemIndex};
use crate::model::{Dataset, DatasetStats, ItemId, Pattern};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every PM entry reached exactly 0 or 1.
    Converged,
    MaxIterations,
    /// The k-th utility stalled for the configured number of rounds.
    Stagnated,
    /// The PM stopped moving for the configured number of rounds.
    Stabilized,
    /// The promising item set emptied out; the established top-k stands.
    Exhausted,
    /// An external caller requested a stop between rounds.
    Stopped,
}

/// Result of one mining run.
#[derive(Debug)]
pub struct MiningOutcome {
    /// Patterns with their utilities, ordered by descending utility.
    pub top_k: Vec<(Pattern, u64)>,
    pub termination: Termination,
    pub iterations: usize,
    pub elapsed: Duration,
    /// Peak-memory growth over the run in MiB, where the platform exposes it.
    pub peak_memory_mb: Option<f64>,
    pub eval_stats: EvalStats,
}

/// The cross-entropy optimization loop. Owns all cross-round mutable state
/// (PM, length distribution, frontier, caches) for the duration of one run;
/// no two concurrent runs share an evaluator.
#[derive(Debug)]
pub struct Miner {
    config: MinerConfig,
    stop: Arc<AtomicBool>,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Cooperative cancellation flag, checked once at the top of each round.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn run(&self, dataset: Arc<Dataset>) -> MiningOutcome {
        let started = Instant::now();
        let memory_before = peak_memory_mb();
        let config = &self.config;

        let stats = DatasetStats::new(&dataset);
        info!(
            "mining top-{} over {} sequences ({} distinct items, total utility {})",
            config.k,
            dataset.len(),
            stats.distinct_item_count(),
            dataset.total_utility()
        );

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut sampler: Box<dyn PatternSampler> = match config.sampler {
            SamplerKind::Model => Box::new(ModelSampler),
            SamplerKind::Adaptive => Box::new(AdaptiveSampler::new(config.fusion_ratio)),
        };
        let evaluator: Box<dyn UtilityEvaluator> = match config.matcher {
            MatcherKind::Greedy { incremental } => Box::new(CachedEvaluator::with_projection_capacity(
                CompactMatchIndex::build(&dataset),
                incremental,
                config.projection_cache_capacity,
            )),
            MatcherKind::Exact => Box::new(ExactEvaluator::new(Arc::clone(&dataset))),
        };

        let mut index = PromisingItemIndex::build(Arc::clone(&dataset), 0);
        let mut topk = TopK::new(config.k);
        evaluator.clear();

        // seed the frontier with the k best singleton patterns
        let all_items = index.promising_items().to_vec();
        if dataset.is_empty() || all_items.is_empty() {
            return self.finish(topk, Termination::Exhausted, 0, started, memory_before, &*evaluator);
        }
        let singleton_utils = index.singleton_utilities(&all_items);
        let mut singles: Vec<(ItemId, u64)> = singleton_utils.into_iter().collect();
        singles.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for &(id, utility) in singles.iter().take(config.k) {
            topk.insert(Scored {
                pattern: Pattern::singleton(id),
                utility,
            });
        }

        let mut threshold = topk.threshold_utility().unwrap_or(0);
        index.update_threshold(threshold);
        evaluator.clear();

        let mut model = GenerativeModel::new(index.promising_items(), config.max_pattern_length);
        debug!(
            "initial threshold {} with {} promising items",
            threshold,
            model.item_count()
        );

        let mut previous_elite: Vec<Scored> = Vec::new();
        let mut effective_n = config.sample_size;
        let mut sample_reduced = false;
        let mut last_kth = threshold;
        let mut stagnant_rounds = 0usize;
        let mut stable_rounds = 0usize;
        let mut iteration = 0usize;
        let mut termination = Termination::MaxIterations;

        while iteration < config.max_iterations {
            if self.stop.load(Ordering::Relaxed) {
                termination = Termination::Stopped;
                break;
            }
            if index.promising_items().is_empty() {
                termination = Termination::Exhausted;
                break;
            }
            if model.is_converged() {
                termination = Termination::Converged;
                break;
            }

            let ctx = RoundContext {
                sample_size: effective_n,
                rho: config.rho,
                previous_elite: &previous_elite,
                stats: &stats,
            };
            let patterns = sampler.sample_round(&mut model, &ctx, &mut rng);
            if patterns.is_empty() {
                termination = Termination::Exhausted;
                break;
            }

            // evaluation is the round's parallel section; sampling stays on
            // the single seeded generator
            let mut sample: Vec<Scored> = patterns
                .into_par_iter()
                .map(|pattern| {
                    let utility = evaluator.evaluate(&pattern, &index);
                    Scored { pattern, utility }
                })
                .collect();

            sample.sort_by(|a, b| {
                b.utility
                    .cmp(&a.utility)
                    .then_with(|| a.pattern.signature().cmp(b.pattern.signature()))
            });

            let elite_size = ((config.rho * sample.len() as f64).ceil() as usize)
                .max(1)
                .min(sample.len());
            let mut elite: Vec<Scored> = sample[..elite_size].to_vec();

            for scored in &sample {
                topk.insert(scored.clone());
            }

            let kth = topk.threshold_utility().unwrap_or(0);
            if kth > threshold {
                debug!("threshold raised {} -> {}", threshold, kth);
                threshold = kth;

                let before: HashSet<ItemId> = index.promising_items().iter().copied().collect();
                index.update_threshold(threshold);
                let surviving = index.promising_items().to_vec();
                let removed: HashSet<ItemId> = before
                    .into_iter()
                    .filter(|id| surviving.binary_search(id).is_err())
                    .collect();

                if !removed.is_empty() {
                    evaluator.invalidate(&removed);
                    model.prune_items(&surviving);
                    let keep: HashSet<ItemId> = surviving.iter().copied().collect();
                    elite = elite
                        .into_iter()
                        .filter_map(|scored| {
                            scored.pattern.retain_items(&keep).map(|pattern| Scored {
                                pattern,
                                utility: scored.utility,
                            })
                        })
                        .collect();
                }
            }

            let pm_delta = model.update_from_elite(&elite, config.learning_rate);
            if config.sampler == SamplerKind::Adaptive {
                model.update_lengths(&elite, config.learning_rate, config.length_floor);
            }

            if config.stagnation_rounds > 0 {
                if kth > last_kth {
                    stagnant_rounds = 0;
                } else {
                    stagnant_rounds += 1;
                }
                if stagnant_rounds >= config.stagnation_rounds {
                    termination = Termination::Stagnated;
                    iteration += 1;
                    break;
                }
            }
            last_kth = kth;
            if config.stabilization_rounds > 0 {
                if pm_delta < config.pm_epsilon {
                    stable_rounds += 1;
                } else {
                    stable_rounds = 0;
                }
                if stable_rounds >= config.stabilization_rounds {
                    termination = Termination::Stabilized;
                    iteration += 1;
                    break;
                }
            }

            if config.adaptive_sampling && !sample_reduced && iteration >= config.warmup_rounds {
                let diversity = combined_diversity(&sample);
                if diversity < config.min_diversity {
                    effective_n = ((effective_n as f64 * config.sample_reduction) as usize).max(1);
                    sample_reduced = true;
                    debug!(
                        "sample diversity {:.3} below {:.3}; sample size reduced to {}",
                        diversity, config.min_diversity, effective_n
                    );
                }
            }

            debug!(
                "round {}: sampled {}, best {}, k-th {}, pm delta {:.4}",
                iteration + 1,
                sample.len(),
                sample.first().map_or(0, |s| s.utility),
                kth,
                pm_delta
            );

            previous_elite = elite;
            iteration += 1;
        }

        if termination == Termination::MaxIterations
            && model.item_count() > 0
            && model.is_converged()
        {
            termination = Termination::Converged;
        }

        self.finish(topk, termination, iteration, started, memory_before, &*evaluator)
    }

    fn finish(
        &self,
        topk: TopK,
        termination: Termination,
        iterations: usize,
        started: Instant,
        memory_before: Option<f64>,
        evaluator: &dyn UtilityEvaluator,
    ) -> MiningOutcome {
        let elapsed = started.elapsed();
        let eval_stats = evaluator.stats();
        let peak_memory_mb = match (memory_before, peak_memory_mb()) {
            (Some(before), Some(after)) => Some((after - before).max(0.0)),
            _ => None,
        };
        info!(
            "finished after {} iterations ({:?}): {:?}, cache hit rate {:.1}%",
            iterations,
            elapsed,
            termination,
            eval_stats.hit_rate() * 100.0
        );
        MiningOutcome {
            top_k: topk
                .ranked()
                .into_iter()
                .map(|s| (s.pattern, s.utility))
                .collect(),
            termination,
            iterations,
            elapsed,
            peak_memory_mb,
            eval_stats,
        }
    }
}

#[cfg(target_os = "linux")]
fn peak_memory_mb() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            let kb: f64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
            return Some(kb / 1024.0);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn peak_memory_mb() -> Option<f64> {
    None
}
