//! Per-object timestamps.

use crate::time::{self, Timestamp};
use serde::{Deserialize, Serialize};

/// Timestamps and counters every group and entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Times {
    /// When the object was created.
    pub creation: Timestamp,
    /// When the object's data last changed.
    pub last_modification: Timestamp,
    /// When the object was last read or used.
    pub last_access: Timestamp,
    /// When the object expires, if `expires` is set.
    pub expiry: Timestamp,
    /// Whether `expiry` is in effect.
    pub expires: bool,
    /// Number of times the object was used.
    pub usage_count: u64,
    /// When the object's parent or sibling position last changed.
    pub location_changed: Timestamp,
}

impl Times {
    /// Creates timestamps that all read `at`.
    #[must_use]
    pub fn new(at: Timestamp) -> Self {
        Self {
            creation: at,
            last_modification: at,
            last_access: at,
            expiry: at,
            expires: false,
            usage_count: 0,
            location_changed: at,
        }
    }

    /// Records an access, and a modification if `modified`.
    pub fn touch(&mut self, modified: bool, at: Timestamp) {
        self.last_access = at;
        self.usage_count = self.usage_count.saturating_add(1);
        if modified {
            self.last_modification = at;
        }
    }

    /// Returns `true` if the object has expired at `at`.
    #[must_use]
    pub fn is_expired(&self, at: Timestamp) -> bool {
        self.expires && self.expiry <= at
    }
}

impl Default for Times {
    fn default() -> Self {
        Self::new(time::now())
    }
}
