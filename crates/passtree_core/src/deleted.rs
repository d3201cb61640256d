//! Tombstones for deleted objects.

use crate::id::UniqueId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Record that an object with this identifier was deleted.
///
/// Tombstones are what carry a deletion to other replicas; they are kept
/// after the object itself is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedObject {
    /// Identifier of the deleted group, entry or custom icon.
    pub uuid: UniqueId,
    /// When the deletion happened.
    pub deletion_time: Timestamp,
}

impl DeletedObject {
    /// Creates a tombstone.
    #[must_use]
    pub fn new(uuid: UniqueId, deletion_time: Timestamp) -> Self {
        Self {
            uuid,
            deletion_time,
        }
    }
}
