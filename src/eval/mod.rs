mod cache;
mod cached;
mod exact;
mod incremental;

pub use cache::UtilityCache;
pub use cached::CachedEvaluator;
pub use exact::ExactEvaluator;
pub use incremental::ProjectionCache;

use crate::index::PromisingItemIndex;
use crate::model::{ItemId, Pattern};
use std::collections::HashSet;

/// Scores candidate patterns against the database.
///
/// Utilities are non-negative by construction, so 0 doubles as "no matching
/// sequence" without a sentinel. Implementations cache by canonical signature
/// and must support concurrent evaluation within one generation round.
pub trait UtilityEvaluator: Send + Sync {
    /// Total utility of the pattern over the candidate sequences the index
    /// admits. Cached by signature; a cache hit returns immediately.
    fn evaluate(&self, pattern: &Pattern, index: &PromisingItemIndex) -> u64;

    /// Drops every cache entry whose recorded item set intersects `removed`.
    /// Called on every threshold rise, before any further evaluation.
    fn invalidate(&self, removed: &HashSet<ItemId>);

    /// Wipes all cached state.
    fn clear(&self);

    /// Entries currently held in the flat cache.
    fn cache_len(&self) -> usize;

    fn stats(&self) -> EvalStats;
}

/// Cache and matching counters for end-of-run diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalStats {
    pub hits: u64,
    pub misses: u64,
    pub incremental_matches: u64,
    pub full_matches: u64,
}

impl EvalStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn incremental_rate(&self) -> f64 {
        let total = self.incremental_matches + self.full_matches;
        if total == 0 {
            0.0
        } else {
            self.incremental_matches as f64 / total as f64
        }
    }
}
