//! Options for structural comparison of groups and entries.

use super::fields;
use crate::protected::{ProtectedBinary, ProtectedString};
use std::collections::BTreeMap;

/// Relaxations applied by `equals` on groups and entries.
///
/// The default compares everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Skip parent, location-changed time and previous parent.
    pub ignore_parent_group: bool,
    /// Skip last-modification times (and location-changed times).
    pub ignore_last_mod: bool,
    /// Skip last-access times and usage counters.
    pub ignore_last_access: bool,
    /// Skip entry history entirely.
    pub ignore_history: bool,
    /// Expect `self` to hold exactly one more history item than the other
    /// side and ignore that most recent item.
    pub ignore_last_backup: bool,
    /// A missing standard field equals an empty one.
    pub null_empty_equiv_std: bool,
    /// Compare group properties only, not child lists.
    pub properties_only: bool,
}

impl CompareOptions {
    /// Compares everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `ignore_parent_group`.
    #[must_use]
    pub fn ignore_parent_group(mut self) -> Self {
        self.ignore_parent_group = true;
        self
    }

    /// Sets `ignore_last_mod`.
    #[must_use]
    pub fn ignore_last_mod(mut self) -> Self {
        self.ignore_last_mod = true;
        self
    }

    /// Sets `ignore_last_access`.
    #[must_use]
    pub fn ignore_last_access(mut self) -> Self {
        self.ignore_last_access = true;
        self
    }

    /// Sets `ignore_history`.
    #[must_use]
    pub fn ignore_history(mut self) -> Self {
        self.ignore_history = true;
        self
    }

    /// Sets `ignore_last_backup`.
    #[must_use]
    pub fn ignore_last_backup(mut self) -> Self {
        self.ignore_last_backup = true;
        self
    }

    /// Sets `null_empty_equiv_std`.
    #[must_use]
    pub fn null_empty_equiv_std(mut self) -> Self {
        self.null_empty_equiv_std = true;
        self
    }

    /// Sets `properties_only`.
    #[must_use]
    pub fn properties_only(mut self) -> Self {
        self.properties_only = true;
        self
    }
}

/// How string protection flags take part in a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProtectionCompareMode {
    /// Compare values only.
    #[default]
    None,
    /// Also compare protection flags of custom fields.
    CustomOnly,
    /// Also compare protection flags of every field.
    Full,
}

impl ProtectionCompareMode {
    fn checks(self, field: &str) -> bool {
        match self {
            Self::None => false,
            Self::CustomOnly => !fields::is_standard(field),
            Self::Full => true,
        }
    }
}

pub(crate) fn strings_equal(
    a: &BTreeMap<String, ProtectedString>,
    b: &BTreeMap<String, ProtectedString>,
    options: CompareOptions,
    mode: ProtectionCompareMode,
) -> bool {
    let missing_ok = |key: &str, value: &ProtectedString| {
        options.null_empty_equiv_std && fields::is_standard(key) && value.is_empty()
    };

    for (key, va) in a {
        match b.get(key) {
            Some(vb) => {
                if !va.equals(vb, mode.checks(key)) {
                    return false;
                }
            }
            None if missing_ok(key.as_str(), va) => {}
            None => return false,
        }
    }

    b.iter()
        .filter(|(key, _)| !a.contains_key(key.as_str()))
        .all(|(key, vb)| missing_ok(key.as_str(), vb))
}

pub(crate) fn binaries_equal(
    a: &BTreeMap<String, ProtectedBinary>,
    b: &BTreeMap<String, ProtectedBinary>,
) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, va)| b.get(key).is_some_and(|vb| va.equals(vb, true)))
}
