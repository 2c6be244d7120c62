//! Bounded least-recently-used cache.
//!
//! Entries are kept in a `HashMap` for lookup and a `BTreeMap` ordered by a
//! monotonically increasing use counter, so the oldest entry is always the
//! first key of the tree.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    last_used: u64,
}

/// A fixed-capacity map that evicts the least-recently-used entry on overflow.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    clock: u64,
    entries: HashMap<K, Entry<V>>,
    recency: BTreeMap<u64, K>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty cache. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            clock: 0,
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check for a key without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a key and mark it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.last_used);
        entry.last_used = now;
        self.recency.insert(now, key.clone());
        Some(&entry.value)
    }

    /// Insert or replace a value, evicting the oldest entry if the cache is full.
    ///
    /// Returns the evicted key/value pair, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let now = self.tick();

        if let Some(entry) = self.entries.get_mut(&key) {
            self.recency.remove(&entry.last_used);
            entry.value = value;
            entry.last_used = now;
            self.recency.insert(now, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        self.recency.insert(now, key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                last_used: now,
            },
        );
        evicted
    }

    fn evict_oldest(&mut self) -> Option<(K, V)> {
        let (_, key) = self.recency.pop_first()?;
        let entry = self.entries.remove(&key)?;
        Some((key, entry.value))
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}
