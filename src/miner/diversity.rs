use crate::ce::Scored;
use std::collections::{HashMap, HashSet};

/// Fraction of distinct signatures in the sample: 0 when all candidates are
/// identical, 1 when all are unique.
pub fn signature_diversity(sample: &[Scored]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&str> = sample.iter().map(|s| s.pattern.signature()).collect();
    unique.len() as f64 / sample.len() as f64
}

/// Coefficient of variation of the utilities, squashed into [0, 1] by tanh.
pub fn utility_diversity(sample: &[Scored]) -> f64 {
    if sample.len() < 2 {
        return 0.0;
    }
    let n = sample.len() as f64;
    let mut sum = 0.0;
    let mut sum_squares = 0.0;
    for scored in sample {
        let u = scored.utility as f64;
        sum += u;
        sum_squares += u * u;
    }
    let mean = sum / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = (sum_squares / n - mean * mean).max(0.0);
    (variance.sqrt() / mean).tanh()
}

/// Normalized Shannon entropy of the pattern-length histogram.
pub fn length_diversity(sample: &[Scored]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for scored in sample {
        *counts.entry(scored.pattern.len()).or_insert(0) += 1;
    }
    let total = sample.len() as f64;
    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.ln()
        })
        .sum();
    let max_entropy = (counts.len() as f64).ln();
    if max_entropy > 0.0 {
        entropy / max_entropy
    } else {
        0.0
    }
}

/// Weighted combination of the three diversity signals.
pub fn combined_diversity_weighted(
    sample: &[Scored],
    w_signature: f64,
    w_utility: f64,
    w_length: f64,
) -> f64 {
    w_signature * signature_diversity(sample)
        + w_utility * utility_diversity(sample)
        + w_length * length_diversity(sample)
}

/// Default weighting: signatures dominate, utilities next, lengths last.
pub fn combined_diversity(sample: &[Scored]) -> f64 {
    combined_diversity_weighted(sample, 0.5, 0.3, 0.2)
}
