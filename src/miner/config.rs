use std::fmt;

/// Candidate-generation strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerKind {
    /// Base variant: PM exploitation with uniformly drawn lengths.
    Model,
    /// Enhanced variant: smoothing-factor exploration split, fusion crossover,
    /// learned length distribution.
    Adaptive,
}

/// Utility-evaluation strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// Greedy compact-index matching with caching; `incremental` enables the
    /// projected-database prefix-extension cache.
    Greedy { incremental: bool },
    /// Exhaustive maximal-instance matching; slower, used as a reference.
    Exact,
}

/// Immutable run configuration. Degenerate values are rejected at
/// construction; the loop never revalidates.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub k: usize,
    pub sample_size: usize,
    pub rho: f64,
    pub max_iterations: usize,
    pub max_pattern_length: usize,
    pub learning_rate: f64,
    /// Rounds without k-th-utility improvement before stopping; 0 disables.
    pub stagnation_rounds: usize,
    /// Consecutive rounds with max PM change below `pm_epsilon` before
    /// stopping; 0 disables.
    pub stabilization_rounds: usize,
    pub pm_epsilon: f64,
    pub length_floor: f64,
    pub fusion_ratio: f64,
    pub projection_cache_capacity: usize,
    /// Halve the sample size once when diversity collapses after the warmup.
    pub adaptive_sampling: bool,
    pub min_diversity: f64,
    pub sample_reduction: f64,
    pub warmup_rounds: usize,
    pub sampler: SamplerKind,
    pub matcher: MatcherKind,
    pub seed: Option<u64>,
}

impl MinerConfig {
    pub fn new(
        k: usize,
        sample_size: usize,
        rho: f64,
        max_iterations: usize,
        max_pattern_length: usize,
    ) -> Result<Self, ConfigError> {
        if k == 0 {
            return Err(ConfigError::InvalidK(k));
        }
        if sample_size == 0 {
            return Err(ConfigError::InvalidSampleSize(sample_size));
        }
        if !(rho > 0.0 && rho <= 1.0) {
            return Err(ConfigError::InvalidEliteRatio(rho));
        }
        if max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(max_iterations));
        }
        if max_pattern_length == 0 {
            return Err(ConfigError::InvalidMaxLength(max_pattern_length));
        }
        Ok(Self {
            k,
            sample_size,
            rho,
            max_iterations,
            max_pattern_length,
            learning_rate: 0.2,
            stagnation_rounds: 15,
            stabilization_rounds: 10,
            pm_epsilon: 0.005,
            length_floor: 0.05,
            fusion_ratio: 0.10,
            projection_cache_capacity: 10_000,
            adaptive_sampling: true,
            min_diversity: 0.7,
            sample_reduction: 0.5,
            warmup_rounds: 10,
            sampler: SamplerKind::Adaptive,
            matcher: MatcherKind::Greedy { incremental: true },
            seed: None,
        })
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&learning_rate) {
            return Err(ConfigError::InvalidLearningRate(learning_rate));
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerKind) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_matcher(mut self, matcher: MatcherKind) -> Self {
        self.matcher = matcher;
        self
    }

    /// The base algorithm variant: plain PM sampling, full-strength updates,
    /// no stopping detectors beyond convergence and the iteration cap.
    pub fn base_variant(mut self) -> Self {
        self.sampler = SamplerKind::Model;
        self.learning_rate = 1.0;
        self.stagnation_rounds = 0;
        self.stabilization_rounds = 0;
        self.adaptive_sampling = false;
        self
    }
}

/// Rejected configuration, reported before any iteration runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidK(usize),
    InvalidSampleSize(usize),
    InvalidEliteRatio(f64),
    InvalidMaxIterations(usize),
    InvalidMaxLength(usize),
    InvalidLearningRate(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidK(k) => write!(f, "k must be positive, got {}", k),
            ConfigError::InvalidSampleSize(n) => {
                write!(f, "sample size must be positive, got {}", n)
            }
            ConfigError::InvalidEliteRatio(rho) => {
                write!(f, "elite ratio must be in (0, 1], got {}", rho)
            }
            ConfigError::InvalidMaxIterations(n) => {
                write!(f, "max iterations must be positive, got {}", n)
            }
            ConfigError::InvalidMaxLength(n) => {
                write!(f, "max pattern length must be positive, got {}", n)
            }
            ConfigError::InvalidLearningRate(rate) => {
                write!(f, "learning rate must be in [0, 1], got {}", rate)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
