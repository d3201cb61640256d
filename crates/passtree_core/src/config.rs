//! Database-level configuration.

use crate::tree::fields;
use serde::{Deserialize, Serialize};

/// Default maximum number of history items per entry.
pub const DEFAULT_HISTORY_MAX_ITEMS: usize = 10;

/// Default maximum total history size per entry, in bytes.
pub const DEFAULT_HISTORY_MAX_SIZE: u64 = 6 * 1024 * 1024;

/// Limits applied when pruning entry history.
///
/// `None` disables the corresponding limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPolicy {
    /// Maximum number of history items kept per entry.
    pub max_items: Option<usize>,
    /// Maximum approximate size of all history items of one entry.
    pub max_size: Option<u64>,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            max_items: Some(DEFAULT_HISTORY_MAX_ITEMS),
            max_size: Some(DEFAULT_HISTORY_MAX_SIZE),
        }
    }
}

impl HistoryPolicy {
    /// Creates a policy with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that never prunes.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_items: None,
            max_size: None,
        }
    }

    /// Sets the maximum number of history items.
    #[must_use]
    pub const fn max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items;
        self
    }

    /// Sets the maximum total history size in bytes.
    #[must_use]
    pub const fn max_size(mut self, max_size: Option<u64>) -> Self {
        self.max_size = max_size;
        self
    }
}

/// Which standard string fields are stored protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryProtectionConfig {
    /// Protect the title field.
    pub title: bool,
    /// Protect the user name field.
    pub user_name: bool,
    /// Protect the password field.
    pub password: bool,
    /// Protect the URL field.
    pub url: bool,
    /// Protect the notes field.
    pub notes: bool,
}

impl Default for MemoryProtectionConfig {
    fn default() -> Self {
        Self {
            title: false,
            user_name: false,
            password: true,
            url: false,
            notes: false,
        }
    }
}

impl MemoryProtectionConfig {
    /// Returns whether the named field should be protected.
    ///
    /// Custom fields are not covered and return `None`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<bool> {
        match field {
            fields::TITLE => Some(self.title),
            fields::USER_NAME => Some(self.user_name),
            fields::PASSWORD => Some(self.password),
            fields::URL => Some(self.url),
            fields::NOTES => Some(self.notes),
            _ => None,
        }
    }

    /// Sets the protection flag of a standard field.
    ///
    /// Returns `false` if `field` is not a standard field.
    pub fn set(&mut self, field: &str, protect: bool) -> bool {
        let slot = match field {
            fields::TITLE => &mut self.title,
            fields::USER_NAME => &mut self.user_name,
            fields::PASSWORD => &mut self.password,
            fields::URL => &mut self.url,
            fields::NOTES => &mut self.notes,
            _ => return false,
        };
        *slot = protect;
        true
    }
}
