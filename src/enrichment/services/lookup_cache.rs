use crate::enrichment::domain::Identifier;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Concurrent map from identifier to an immutable lookup result.
///
/// Values are stored behind `Arc` so readers share one copy and a stored
/// result never changes. Sharded locks are held only for the map access
/// itself. There is no eviction: the map lives as long as its owner, which
/// is one run or a set of runs that share it explicitly.
pub struct LookupCache<V, K = Identifier>
where
    K: Eq + Hash,
{
    entries: DashMap<K, Arc<V>>,
}

impl<V, K> LookupCache<V, K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Stores `value` under `key`; a later `set` for the same key replaces
    /// the whole entry at once.
    pub fn set(&self, key: K, value: Arc<V>) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V, K> Default for LookupCache<V, K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
