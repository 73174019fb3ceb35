//! ---
//! opsync_section: "02-configuration-store"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Transient configuration payloads."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A configuration payload waiting to be merged into a [`crate::ConfigStore`].
///
/// Deltas are consumed by value, so each one is applied at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationDelta(BTreeMap<String, Value>);

impl ConfigurationDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl IntoIterator for ConfigurationDelta {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, Value)> for ConfigurationDelta {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for ConfigurationDelta {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self(entries)
    }
}

impl From<Map<String, Value>> for ConfigurationDelta {
    fn from(entries: Map<String, Value>) -> Self {
        entries.into_iter().collect()
    }
}
