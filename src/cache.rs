use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{LocalKey, Registry};
use crate::node::{Dataset, NameUsageNode, VernacularName};
use crate::record::VernacularRecord;
use crate::scorer::ScoreIndex;

pub struct KeyedCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
    gates: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K, V> Default for KeyedCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn values(&self) -> Vec<V> {
        self.entries.lock().values().cloned().collect()
    }

    pub fn insert_if_absent(&self, key: K, value: V) -> V {
        self.entries.lock().entry(key).or_insert(value).clone()
    }

    pub fn get_or_insert_with<F>(&self, key: K, make: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.entries.lock().entry(key).or_insert_with(make).clone()
    }

    pub fn single_flight<R, F>(&self, key: &K, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let gate = Arc::clone(self.gates.lock().entry(key.clone()).or_default());
        let result = {
            let _guard = gate.lock();
            work()
        };
        drop(gate);
        // Clones are only taken under the gates lock, so a count of one means idle.
        let mut gates = self.gates.lock();
        if gates
            .get(key)
            .is_some_and(|current| Arc::strong_count(current) == 1)
        {
            gates.remove(key);
        }
        result
    }

    /// `Ok(None)` from `fetch` is not cached.
    pub fn get_or_fetch<E, F>(&self, key: K, fetch: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(Some(value));
        }
        self.single_flight(&key, || {
            if let Some(value) = self.get(&key) {
                return Ok(Some(value));
            }
            Ok(fetch()?.map(|value| self.insert_if_absent(key.clone(), value)))
        })
    }

    pub fn drain(&self) -> Vec<V> {
        self.gates.lock().clear();
        self.entries.lock().drain().map(|(_, value)| value).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSizes {
    pub nodes: usize,
    pub vernaculars: usize,
    pub datasets: usize,
    pub scores: usize,
}

pub struct RecordCache {
    registry: Registry,
    nodes: KeyedCache<LocalKey, Arc<NameUsageNode>>,
    vernaculars: KeyedCache<u64, Arc<VernacularName>>,
    datasets: KeyedCache<Uuid, Arc<Dataset>>,
    scores: ScoreIndex,
}

impl RecordCache {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            nodes: KeyedCache::new(),
            vernaculars: KeyedCache::new(),
            datasets: KeyedCache::new(),
            scores: ScoreIndex::default(),
        }
    }

    pub fn registry(&self) -> Registry {
        self.registry
    }

    pub fn node(&self, key: LocalKey) -> Option<Arc<NameUsageNode>> {
        self.nodes.get(&key)
    }

    pub fn nominal(&self, key: LocalKey) -> Arc<NameUsageNode> {
        let registry = self.registry;
        self.nodes
            .get_or_insert_with(key, || Arc::new(NameUsageNode::nominal(registry, key)))
    }

    pub fn nodes(&self) -> &KeyedCache<LocalKey, Arc<NameUsageNode>> {
        &self.nodes
    }

    pub fn vernacular(&self, record: &VernacularRecord) -> Arc<VernacularName> {
        self.vernaculars
            .get_or_insert_with(VernacularName::content_hash(record), || {
                Arc::new(VernacularName::from_record(record))
            })
    }

    pub fn datasets(&self) -> &KeyedCache<Uuid, Arc<Dataset>> {
        &self.datasets
    }

    pub fn scores(&self) -> &ScoreIndex {
        &self.scores
    }

    pub fn sizes(&self) -> CacheSizes {
        CacheSizes {
            nodes: self.nodes.len(),
            vernaculars: self.vernaculars.len(),
            datasets: self.datasets.len(),
            scores: self.scores.len(),
        }
    }

    pub fn clear(&self) {
        let nodes = self.nodes.drain();
        for node in &nodes {
            node.release();
        }
        for name in self.vernaculars.drain() {
            name.release();
        }
        self.datasets.drain();
        self.scores.clear();
        tracing::debug!(registry = %self.registry, nodes = nodes.len(), "cleared record cache");
    }
}

impl Drop for RecordCache {
    fn drop(&mut self) {
        self.clear();
    }
}
