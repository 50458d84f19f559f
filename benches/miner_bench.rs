use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use sequtil::{
    CachedEvaluator, CompactMatchIndex, DataSequence, Dataset, ExactEvaluator, Item, Itemset,
    Miner, MinerConfig, Pattern, PromisingItemIndex, UtilityEvaluator,
};

/// Generate a synthetic sequence database.
///
/// Parameters:
/// - num_sequences: number of database records
/// - num_items: size of the item alphabet
/// - avg_itemsets: average itemsets per sequence
/// - avg_items: average items per itemset
fn generate_dataset(
    num_sequences: usize,
    num_items: u32,
    avg_itemsets: usize,
    avg_items: usize,
) -> Arc<Dataset> {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut sequences = Vec::with_capacity(num_sequences);

    for _ in 0..num_sequences {
        let num_sets = 1 + rng.gen_range(0..avg_itemsets * 2);
        let mut itemsets = Vec::with_capacity(num_sets);
        for _ in 0..num_sets {
            let size = 1 + rng.gen_range(0..avg_items * 2);
            let items: Vec<Item> = (0..size)
                .map(|_| Item::new(1 + rng.gen_range(0..num_items), 1 + rng.gen_range(0..20)))
                .collect();
            itemsets.push(Itemset::new(items));
        }
        sequences.push(DataSequence::new(itemsets));
    }

    Arc::new(Dataset::new(sequences))
}

fn sample_patterns(num_items: u32, count: usize) -> Vec<Pattern> {
    let mut rng = StdRng::seed_from_u64(17);
    (0..count)
        .map(|_| {
            let len = 1 + rng.gen_range(0..3);
            Pattern::from_itemsets((0..len).map(|_| {
                let size = 1 + rng.gen_range(0..2);
                (0..size)
                    .map(|_| 1 + rng.gen_range(0..num_items))
                    .collect::<Vec<_>>()
            }))
        })
        .filter(|p| !p.is_empty())
        .collect()
}

fn bench_full_run_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run_scaling");
    group.sample_size(10);

    let configs = vec![
        ("small_100seq", 100, 30u32),
        ("medium_500seq", 500, 60u32),
        ("large_2000seq", 2000, 100u32),
    ];

    for (name, num_sequences, num_items) in configs {
        let dataset = generate_dataset(num_sequences, num_items, 4, 2);

        group.bench_with_input(BenchmarkId::from_parameter(name), &dataset, |b, data| {
            b.iter(|| {
                let config = MinerConfig::new(10, 200, 0.3, 10, 5)
                    .unwrap()
                    .with_seed(42);
                Miner::new(config).run(black_box(Arc::clone(data)))
            });
        });
    }

    group.finish();
}

fn bench_evaluator_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluator_strategies");

    let dataset = generate_dataset(500, 50, 4, 2);
    let index = PromisingItemIndex::build(Arc::clone(&dataset), 0);
    let patterns = sample_patterns(50, 200);

    group.bench_function("greedy_cached", |b| {
        b.iter(|| {
            let evaluator = CachedEvaluator::new(CompactMatchIndex::build(&dataset));
            let total: u64 = patterns
                .iter()
                .map(|p| evaluator.evaluate(black_box(p), &index))
                .sum();
            total
        });
    });

    group.bench_function("exact_dp", |b| {
        b.iter(|| {
            let evaluator = ExactEvaluator::new(Arc::clone(&dataset));
            let total: u64 = patterns
                .iter()
                .map(|p| evaluator.evaluate(black_box(p), &index))
                .sum();
            total
        });
    });

    group.finish();
}

fn bench_incremental_extension(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_extension");

    let dataset = generate_dataset(1000, 40, 5, 2);
    let index = PromisingItemIndex::build(Arc::clone(&dataset), 0);

    // nested prefixes: a, ab, abc, ... where the incremental cache shines
    let chains: Vec<Vec<Pattern>> = (1u32..=10)
        .map(|base| {
            (1u32..=4)
                .map(|len| Pattern::from_itemsets((0..len).map(|i| vec![base + i])))
                .collect()
        })
        .collect();

    for (name, incremental) in [("with_projection_cache", true), ("full_rematch", false)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &incremental,
            |b, &inc| {
                b.iter(|| {
                    let evaluator = CachedEvaluator::with_projection_capacity(
                        CompactMatchIndex::build(&dataset),
                        inc,
                        10_000,
                    );
                    let mut total = 0u64;
                    for chain in &chains {
                        for pattern in chain {
                            total += evaluator.evaluate(black_box(pattern), &index);
                        }
                    }
                    total
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_run_scaling,
    bench_evaluator_strategies,
    bench_incremental_extension
);
criterion_main!(benches);
