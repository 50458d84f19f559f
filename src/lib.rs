//! Top-k high-utility sequential pattern mining by cross-entropy optimization.
//!
//! Instead of enumerating the pattern lattice, the miner learns a
//! position-wise item-probability model over successive rounds: sample N
//! candidate patterns, score them against the database, take the elite
//! fraction, update the model, raise the top-k utility threshold and prune.
//! A promising-item index (SWU bounds + inverted bitsets), a compact
//! per-sequence array form with greedy matching, and signature-keyed utility
//! caches with incremental prefix extension keep the thousands of evaluations
//! per round tractable.
//!
//! ```no_run
//! use sequtil::io::read_dataset;
//! use sequtil::miner::{Miner, MinerConfig};
//! use std::sync::Arc;
//!
//! let dataset = Arc::new(read_dataset("data/sequences.txt")?);
//! let config = MinerConfig::new(10, 2000, 0.3, 100, 8)?.with_seed(42);
//! let outcome = Miner::new(config).run(dataset);
//! for (rank, (pattern, utility)) in outcome.top_k.iter().enumerate() {
//!     println!("[{}] {} = {}", rank + 1, pattern, utility);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ce;
pub mod eval;
pub mod index;
pub mod io;
pub mod miner;
pub mod model;

pub use ce::{GenerativeModel, PatternSampler, Scored};
pub use eval::{CachedEvaluator, ExactEvaluator, UtilityEvaluator};
pub use index::{CompactMatchIndex, PromisingItemIndex};
pub use miner::{
    ConfigError, MatcherKind, Miner, MinerConfig, MiningOutcome, SamplerKind, Termination,
};
pub use model::{DataSequence, Dataset, DatasetStats, Item, ItemId, Itemset, Pattern};
