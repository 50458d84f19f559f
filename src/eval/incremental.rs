use crate::index::Projection;
use crate::model::{ItemId, Pattern};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 10_000;

/// Bounded cache of projected databases keyed by pattern signature, with
/// least-recently-used eviction. One lock covers the map and the LRU
/// bookkeeping; projection lookups are rare relative to matching work.
#[derive(Debug)]
pub struct ProjectionCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    tick: u64,
}

#[derive(Debug)]
struct Slot {
    projection: Projection,
    last_used: u64,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, signature: &str) -> Option<Projection> {
        let mut inner = self.inner.lock().unwrap();
        inner.tick += 1;
        let tick = inner.tick;
        let slot = inner.slots.get_mut(signature)?;
        slot.last_used = tick;
        Some(slot.projection.clone())
    }

    pub fn put(&self, signature: String, projection: Projection) {
        let mut inner = self.inner.lock().unwrap();
        if inner.slots.len() >= self.capacity && !inner.slots.contains_key(&signature) {
            evict_least_recent(&mut inner);
        }
        inner.tick += 1;
        let tick = inner.tick;
        inner.slots.insert(
            signature,
            Slot {
                projection,
                last_used: tick,
            },
        );
    }

    /// Longest cached proper prefix of `pattern`, searched from length
    /// `pattern.len() - 1` downward. Returns the prefix length alongside the
    /// projection so the caller knows where extension starts.
    pub fn find_longest_prefix(&self, pattern: &Pattern) -> Option<(usize, Projection)> {
        let mut inner = self.inner.lock().unwrap();
        inner.tick += 1;
        let tick = inner.tick;
        for len in (1..pattern.len()).rev() {
            let signature = prefix_signature(pattern, len);
            if let Some(slot) = inner.slots.get_mut(&signature) {
                slot.last_used = tick;
                return Some((len, slot.projection.clone()));
            }
        }
        None
    }

    /// Drops every projection whose pattern references a removed item.
    pub fn invalidate(&self, removed: &HashSet<ItemId>) {
        if removed.is_empty() {
            return;
        }
        self.inner.lock().unwrap().slots.retain(|_, slot| {
            !slot
                .projection
                .pattern()
                .distinct_items()
                .iter()
                .any(|id| removed.contains(id))
        });
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.slots.clear();
        inner.tick = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new()
    }
}

fn evict_least_recent(inner: &mut Inner) {
    let Some(oldest) = inner
        .slots
        .iter()
        .min_by_key(|(_, slot)| slot.last_used)
        .map(|(signature, _)| signature.clone())
    else {
        return;
    };
    inner.slots.remove(&oldest);
}

/// Signature of the first `len` itemsets of a pattern.
pub(crate) fn prefix_signature(pattern: &Pattern, len: usize) -> String {
    let mut out = String::new();
    for (i, itemset) in pattern.itemsets()[..len].iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        for (j, id) in itemset.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            out.push_str(&id.to_string());
        }
    }
    out
}
