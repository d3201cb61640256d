//! Normalized tag sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sorted set of trimmed, non-empty tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    /// Creates an empty tag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag; returns `false` if it was blank or already present.
    pub fn add(&mut self, tag: &str) -> bool {
        let tag = normalize(tag);
        !tag.is_empty() && self.0.insert(tag)
    }

    /// Removes a tag; returns whether it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(&normalize(tag))
    }

    /// Returns `true` if the tag is present.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(&normalize(tag))
    }

    /// Iterates over the tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for Tags {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.add(tag);
        }
        tags
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().to_string()
}
