//! Custom icons stored in the database.

use crate::id::UniqueId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// A user-supplied icon referenced by groups and entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomIcon {
    /// Identifier referenced from `custom_icon` fields.
    pub uuid: UniqueId,
    /// Encoded image data (PNG in practice; not interpreted here).
    pub data: Vec<u8>,
    /// Display name.
    pub name: String,
    /// Last change, if known.
    pub last_modified: Option<Timestamp>,
}

impl CustomIcon {
    /// Creates an icon with a fresh identifier.
    #[must_use]
    pub fn new(data: Vec<u8>, name: impl Into<String>, last_modified: Option<Timestamp>) -> Self {
        Self::with_uuid(UniqueId::new(), data, name, last_modified)
    }

    /// Creates an icon with the given identifier.
    #[must_use]
    pub fn with_uuid(
        uuid: UniqueId,
        data: Vec<u8>,
        name: impl Into<String>,
        last_modified: Option<Timestamp>,
    ) -> Self {
        Self {
            uuid,
            data,
            name: name.into(),
            last_modified,
        }
    }
}
