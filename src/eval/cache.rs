use crate::model::ItemId;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Flat utility cache: canonical signature -> (utility, distinct item ids).
/// The recorded ids drive selective invalidation when items are pruned.
/// Concurrent lookups share the read lock; inserts take the write lock.
#[derive(Debug, Default)]
pub struct UtilityCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug)]
struct CacheEntry {
    utility: u64,
    item_ids: Vec<ItemId>,
}

impl UtilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signature: &str) -> Option<u64> {
        match self.entries.read().unwrap().get(signature) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.utility)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, signature: String, utility: u64, item_ids: Vec<ItemId>) {
        self.entries
            .write()
            .unwrap()
            .insert(signature, CacheEntry { utility, item_ids });
    }

    /// Removes every entry whose recorded item set intersects `removed`.
    pub fn invalidate(&self, removed: &HashSet<ItemId>) {
        if removed.is_empty() {
            return;
        }
        self.entries
            .write()
            .unwrap()
            .retain(|_, entry| !entry.item_ids.iter().any(|id| removed.contains(id)));
    }

    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
