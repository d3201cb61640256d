//! String-keyed custom data with per-key modification times.

use crate::time::{self, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One custom data value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDataItem {
    /// The stored value.
    pub value: String,
    /// When the value last changed, if known.
    pub last_modified: Option<Timestamp>,
}

/// Plugin and application data attached to a group, entry or database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomData {
    items: BTreeMap<String, CustomDataItem>,
}

impl CustomData {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(|item| item.value.as_str())
    }

    /// Returns the modification time of `key`, if any is recorded.
    #[must_use]
    pub fn last_modified(&self, key: &str) -> Option<Timestamp> {
        self.items.get(key).and_then(|item| item.last_modified)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Stores `value` under `key` with the given modification time.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        last_modified: Option<Timestamp>,
    ) {
        self.items.insert(
            key.into(),
            CustomDataItem {
                value: value.into(),
                last_modified,
            },
        );
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.items.remove(key).is_some()
    }

    /// Iterates over `(key, item)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CustomDataItem)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Compares keys, values and modification times (to the second).
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self.items.iter().all(|(key, a)| {
                other.items.get(key).is_some_and(|b| {
                    a.value == b.value
                        && match (a.last_modified, b.last_modified) {
                            (Some(ta), Some(tb)) => time::equals_floor(ta, tb),
                            (None, None) => true,
                            _ => false,
                        }
                })
            })
    }
}
