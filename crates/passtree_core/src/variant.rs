//! Typed key/value dictionary for public database properties.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value stored in a [`VariantDictionary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// Boolean.
    Bool(bool),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

/// Ordered map from names to typed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDictionary {
    items: BTreeMap<String, Variant>,
}

impl VariantDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Variant> {
        self.items.get(key)
    }

    /// Stores a value, replacing any previous one regardless of type.
    pub fn set(&mut self, key: impl Into<String>, value: Variant) {
        self.items.insert(key.into(), value);
    }

    /// Removes a value; returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.items.remove(key).is_some()
    }

    /// Iterates over the items in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variant)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copies every item of `self` into `target`, overwriting collisions.
    pub fn copy_to(&self, target: &mut VariantDictionary) {
        for (k, v) in &self.items {
            target.items.insert(k.clone(), v.clone());
        }
    }
}
