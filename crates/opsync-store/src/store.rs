//! ---
//! opsync_section: "02-configuration-store"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Lock-guarded configuration store and merge algorithm."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::bootstrap::load_bootstrap;
use crate::delta::ConfigurationDelta;

#[derive(Debug, Default)]
struct StoreInner {
    entries: BTreeMap<String, Value>,
    revision: u64,
}

/// Process-wide configuration shared between the polling loops.
///
/// The map is only reachable through [`ConfigStore::merge`] and the read
/// helpers, each of which takes the lock exactly once.
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: Mutex<StoreInner>,
}

/// How a merge treated the incoming delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// The store was empty; every key of the delta was inserted.
    Seeded,
    /// The store already had keys; only those were overwritten.
    Updated,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Seeded => "seeded",
            MergeMode::Updated => "updated",
        }
    }
}

/// Report produced by a single [`ConfigStore::merge`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub mode: MergeMode,
    /// Keys written by this merge, in key order.
    pub applied: Vec<String>,
    /// Keys present in the delta but unknown to the store, in key order.
    pub dropped: Vec<String>,
    /// Store revision after the merge; strictly increasing per merge.
    pub revision: u64,
}

impl MergeOutcome {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Immutable, key-ordered copy of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    revision: u64,
    entries: BTreeMap<String, Value>,
}

impl ConfigSnapshot {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn into_entries(self) -> BTreeMap<String, Value> {
        self.entries
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store seeded from a fixed literal.
    pub fn from_delta(delta: ConfigurationDelta) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                entries: delta.into_iter().collect(),
                revision: 0,
            }),
        }
    }

    /// Build a store from the optional bootstrap file.
    ///
    /// A missing, unreadable, or malformed file is reported and yields an
    /// empty store, so the first remote delta seeds it instead.
    pub fn bootstrap(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("no bootstrap file configured; starting with an empty configuration");
            return Self::new();
        };
        match load_bootstrap(path) {
            Ok(delta) => {
                info!(path = %path.display(), keys = delta.len(), "bootstrap configuration loaded");
                Self::from_delta(delta)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "bootstrap configuration unavailable; starting empty");
                Self::new()
            }
        }
    }

    /// Merge a delta into the store.
    ///
    /// An empty store takes every key of the delta. A non-empty store only
    /// overwrites keys it already holds; the rest are dropped and reported.
    pub fn merge(&self, delta: ConfigurationDelta) -> MergeOutcome {
        let mut inner = self.inner.lock();
        let mode = if inner.entries.is_empty() {
            MergeMode::Seeded
        } else {
            MergeMode::Updated
        };

        let mut applied = Vec::with_capacity(delta.len());
        let mut dropped = Vec::new();
        for (key, value) in delta {
            match mode {
                MergeMode::Seeded => {
                    applied.push(key.clone());
                    inner.entries.insert(key, value);
                }
                MergeMode::Updated => match inner.entries.get_mut(&key) {
                    Some(slot) => {
                        *slot = value;
                        applied.push(key);
                    }
                    None => dropped.push(key),
                },
            }
        }
        inner.revision += 1;

        MergeOutcome {
            mode,
            applied,
            dropped,
            revision: inner.revision,
        }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        let inner = self.inner.lock();
        ConfigSnapshot {
            revision: inner.revision,
            entries: inner.entries.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Number of merges applied since construction.
    pub fn revision(&self) -> u64 {
        self.inner.lock().revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delta(value: Value) -> ConfigurationDelta {
        serde_json::from_value(value).unwrap()
    }

    fn entries(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_store_takes_every_key() {
        let store = ConfigStore::new();
        let outcome = store.merge(delta(json!({"a": 1, "b": 2})));

        assert_eq!(outcome.mode, MergeMode::Seeded);
        assert_eq!(outcome.applied, vec!["a", "b"]);
        assert!(outcome.dropped.is_empty());
        assert_eq!(outcome.revision, 1);
        assert_eq!(store.snapshot().into_entries(), entries(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn populated_store_only_updates_known_keys() {
        let store = ConfigStore::from_delta(delta(json!({"a": 1, "b": 2})));
        let outcome = store.merge(delta(json!({"a": 9, "c": 3})));

        assert_eq!(outcome.mode, MergeMode::Updated);
        assert_eq!(outcome.applied, vec!["a"]);
        assert_eq!(outcome.dropped, vec!["c"]);
        assert_eq!(store.get("a"), Some(json!(9)));
        assert_eq!(store.get("b"), Some(json!(2)));
        assert_eq!(store.get("c"), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn repeated_merge_is_idempotent() {
        let store = ConfigStore::from_delta(delta(json!({"a": 1, "b": {"x": [1, 2]}})));
        let update = delta(json!({"b": {"x": [3]}, "z": false}));

        store.merge(update.clone());
        let once = store.snapshot().into_entries();
        store.merge(update);
        let twice = store.snapshot().into_entries();

        assert_eq!(once, twice);
    }

    #[test]
    fn empty_delta_on_populated_store_is_noop() {
        let store = ConfigStore::from_delta(delta(json!({"a": 1})));
        let before = store.snapshot().into_entries();
        let outcome = store.merge(ConfigurationDelta::new());

        assert!(outcome.is_noop());
        assert_eq!(store.snapshot().into_entries(), before);
    }

    #[test]
    fn values_of_any_json_shape_are_replaced_wholesale() {
        let store = ConfigStore::from_delta(delta(json!({"nested": {"keep": 1, "drop": 2}})));
        store.merge(delta(json!({"nested": {"keep": 5}})));
        assert_eq!(store.get("nested"), Some(json!({"keep": 5})));
    }

    #[test]
    fn snapshot_is_key_ordered_and_detached() {
        let store = ConfigStore::new();
        store.merge(delta(json!({"zeta": 1, "alpha": 2, "mid": 3})));
        let snapshot = store.snapshot();
        store.merge(delta(json!({"alpha": 20})));

        assert_eq!(
            snapshot.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["alpha", "mid", "zeta"]
        );
        assert_eq!(snapshot.get("alpha"), Some(&json!(2)));
        assert_eq!(snapshot.revision(), 1);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn missing_bootstrap_path_yields_empty_store() {
        let store = ConfigStore::bootstrap(Some(Path::new("/definitely/not/here.json")));
        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
    }
}
