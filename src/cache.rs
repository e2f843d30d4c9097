//! Keyed cache with staged change tracking
//!
//! [`DiffCache`] is the state the transform pipeline trusts: one entry per
//! present key, plus an ordered staging area of the mutations applied since
//! the last capture. Draining the staging area yields exactly the change
//! set a downstream needs to catch up.

use crate::changes::{Change, ChangeSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// One cached item: the key, the source value it came from, and the value
/// derived from it.
///
/// Entries are owned exclusively by the cache that stores them; everything
/// handed outward is a clone, so no external holder can mutate cache state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<K, S, D> {
    key: K,
    source: S,
    derived: D,
}

impl<K, S, D> CacheEntry<K, S, D> {
    /// Creates an entry pairing a source value with what was derived from it.
    #[must_use]
    pub fn new(key: K, source: S, derived: D) -> Self {
        Self { key, source, derived }
    }

    /// Returns the key this entry is stored under.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the source value the derived value was computed from.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the derived value.
    #[must_use]
    pub fn derived(&self) -> &D {
        &self.derived
    }

    /// Consumes the entry and returns only the derived value.
    #[must_use]
    pub fn into_derived(self) -> D {
        self.derived
    }
}

/// Keyed store that records every mutation it applies.
///
/// Mutations stage one [`Change`] each, in application order, until
/// [`capture_changes`](DiffCache::capture_changes) drains them. At any
/// quiescent point the key set is exactly the keys with a net applied add
/// and no later remove.
///
/// The cache does no locking of its own. It is built to be owned by a
/// single worker; callers provide the mutual exclusion.
#[derive(Debug)]
pub struct DiffCache<K, S, D> {
    entries: HashMap<K, CacheEntry<K, S, D>>,
    staged: Vec<Change<K, CacheEntry<K, S, D>>>,
}

impl<K, S, D> DiffCache<K, S, D>
where
    K: Eq + Hash + Clone,
    S: Clone,
    D: Clone,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            staged: Vec::new(),
        }
    }

    /// Inserts or replaces the entry for its key.
    ///
    /// Stages an `Add` when the key was absent, or an `Update` carrying the
    /// replaced entry as the previous value when it was present.
    pub fn add_or_update(&mut self, entry: CacheEntry<K, S, D>) {
        let key = entry.key().clone();
        let change = match self.entries.insert(key.clone(), entry.clone()) {
            Some(replaced) => Change::update(key, entry, replaced),
            None => Change::add(key, entry),
        };
        self.staged.push(change);
    }

    /// Deletes the entry for `key` when present.
    ///
    /// Stages a `Remove` carrying the deleted entry. Absent keys are a
    /// silent no-op here; the engine decides whether that is an error
    /// before the cache ever sees the remove.
    pub fn remove(&mut self, key: &K) {
        if let Some(removed) = self.entries.remove(key) {
            self.staged
                .push(Change::remove(key.clone(), removed.clone(), Some(removed)));
        }
    }

    /// Stages an `Evaluate` re-announcing the unchanged entry for `key`.
    ///
    /// No data changes. Absent keys are a silent no-op, mirroring
    /// [`remove`](DiffCache::remove).
    pub fn evaluate(&mut self, key: &K) {
        if let Some(entry) = self.entries.get(key) {
            self.staged.push(Change::evaluate(key.clone(), entry.clone()));
        }
    }

    /// Returns the entry for `key`, if present. Pure read, nothing staged.
    #[must_use]
    pub fn lookup(&self, key: &K) -> Option<&CacheEntry<K, S, D>> {
        self.entries.get(key)
    }

    /// Whether the cache currently holds `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Drains the staged mutations into a change set, in application order.
    ///
    /// Clears the staging area, so two consecutive captures yield the second
    /// one empty. Call once per processed batch, after every mutation of the
    /// batch has been applied.
    #[must_use]
    pub fn capture_changes(&mut self) -> ChangeSet<K, CacheEntry<K, S, D>> {
        ChangeSet::from(std::mem::take(&mut self.staged))
    }

    /// Returns the number of present keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the present keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Iterates the present entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry<K, S, D>> {
        self.entries.values()
    }
}

impl<K, S, D> Default for DiffCache<K, S, D>
where
    K: Eq + Hash + Clone,
    S: Clone,
    D: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeReason;

    fn entry(key: &str, source: i32) -> CacheEntry<String, i32, String> {
        CacheEntry::new(key.to_string(), source, format!("d{}", source))
    }

    #[test]
    fn test_insert_then_replace_stages_add_and_update() {
        let mut cache = DiffCache::new();
        cache.add_or_update(entry("k1", 1));
        cache.add_or_update(entry("k1", 2));

        let set = cache.capture_changes();
        assert_eq!(set.len(), 2);

        let changes: Vec<_> = set.iter().collect();
        assert_eq!(changes[0].reason(), ChangeReason::Add);
        assert_eq!(changes[0].previous(), None);
        assert_eq!(changes[1].reason(), ChangeReason::Update);
        assert_eq!(changes[1].current().derived(), "d2");
        assert_eq!(changes[1].previous().map(|e| e.derived().as_str()), Some("d1"));

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_stages_removed_entry() {
        let mut cache = DiffCache::new();
        cache.add_or_update(entry("k1", 1));
        let _ = cache.capture_changes();

        cache.remove(&"k1".to_string());
        let set = cache.capture_changes();

        assert_eq!(set.len(), 1);
        let change = set.iter().next().unwrap();
        assert_eq!(change.reason(), ChangeReason::Remove);
        assert_eq!(change.current().derived(), "d1");
        assert_eq!(change.previous().map(|e| e.derived().as_str()), Some("d1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let mut cache: DiffCache<String, i32, String> = DiffCache::new();
        cache.remove(&"missing".to_string());
        assert!(cache.capture_changes().is_empty());
    }

    #[test]
    fn test_evaluate_stages_without_data_change() {
        let mut cache = DiffCache::new();
        cache.add_or_update(entry("k1", 1));
        let _ = cache.capture_changes();

        cache.evaluate(&"k1".to_string());
        let set = cache.capture_changes();

        assert_eq!(set.len(), 1);
        let change = set.iter().next().unwrap();
        assert_eq!(change.reason(), ChangeReason::Evaluate);
        assert_eq!(change.previous(), None);
        assert_eq!(cache.lookup(&"k1".to_string()).map(|e| e.derived().as_str()), Some("d1"));
    }

    #[test]
    fn test_evaluate_absent_key_is_noop() {
        let mut cache: DiffCache<String, i32, String> = DiffCache::new();
        cache.evaluate(&"missing".to_string());
        assert!(cache.capture_changes().is_empty());
    }

    #[test]
    fn test_capture_drains_staging() {
        let mut cache = DiffCache::new();
        cache.add_or_update(entry("k1", 1));

        let first = cache.capture_changes();
        let second = cache.capture_changes();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_lookup_stages_nothing() {
        let mut cache = DiffCache::new();
        cache.add_or_update(entry("k1", 1));
        let _ = cache.capture_changes();

        assert!(cache.lookup(&"k1".to_string()).is_some());
        assert!(cache.lookup(&"k2".to_string()).is_none());
        assert!(cache.capture_changes().is_empty());
    }

    #[test]
    fn test_capture_order_matches_application_order() {
        let mut cache = DiffCache::new();
        cache.add_or_update(entry("k1", 1));
        cache.add_or_update(entry("k2", 2));
        cache.remove(&"k1".to_string());

        let set = cache.capture_changes();
        let observed: Vec<_> = set
            .iter()
            .map(|c| (c.reason(), c.key().clone()))
            .collect();
        assert_eq!(
            observed,
            vec![
                (ChangeReason::Add, "k1".to_string()),
                (ChangeReason::Add, "k2".to_string()),
                (ChangeReason::Remove, "k1".to_string()),
            ]
        );
    }

    #[test]
    fn test_keys_reflect_net_applied_changes() {
        let mut cache = DiffCache::new();
        cache.add_or_update(entry("k1", 1));
        cache.add_or_update(entry("k2", 2));
        cache.add_or_update(entry("k3", 3));
        cache.remove(&"k2".to_string());
        let _ = cache.capture_changes();

        let mut keys: Vec<&String> = cache.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["k1", "k3"]);
    }
}
