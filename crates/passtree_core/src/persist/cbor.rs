//! CBOR snapshot encoding.

use super::TreePersistence;
use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::debug;

/// Version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    database: &'a Database,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    database: Database,
}

/// Plain (unencrypted) CBOR snapshots of a database.
///
/// Protected values are unmasked while encoding; the output is meant for
/// replica exchange in tests and tools, not for storage at rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborPersistence;

impl CborPersistence {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TreePersistence for CborPersistence {
    fn load(&self, reader: &mut dyn Read) -> CoreResult<Database> {
        let snapshot: Snapshot = ciborium::from_reader(reader).map_err(|e| match e {
            ciborium::de::Error::Io(io) => CoreError::Io(io),
            other => CoreError::codec(format!("{other:?}")),
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CoreError::codec(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        let mut database = snapshot.database;
        database.check_invariants()?;
        database.collapse_deleted_objects();
        let (groups, entries) = database.tree.counts();
        debug!(groups, entries, "loaded snapshot");
        Ok(database)
    }

    fn save(&self, database: &Database, writer: &mut dyn Write) -> CoreResult<()> {
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            database,
        };
        ciborium::into_writer(&snapshot, writer).map_err(|e| match e {
            ciborium::ser::Error::Io(io) => CoreError::Io(io),
            other => CoreError::codec(format!("{other:?}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;
    use crate::tree::{fields, CompareOptions, Entry, Group, ProtectionCompareMode};

    #[test]
    fn roundtrip_keeps_structure_and_protection() {
        let now = time::now();
        let mut db = Database::new("db", now);
        let root = db.tree.root_id();
        let g = db.tree.add_group(root, Group::new("g", now)).unwrap();
        let mut e = Entry::new(now);
        e.set_text(fields::PASSWORD, true, "secret");
        e.create_backup(None);
        let e = db.tree.add_entry(g, e).unwrap();

        let codec = CborPersistence::new();
        let bytes = codec.save_bytes(&db).unwrap();
        let loaded = codec.load_bytes(&bytes).unwrap();

        assert_eq!(loaded.tree.root_id(), root);
        assert!(db.tree.equals_group(
            root,
            &loaded.tree,
            root,
            CompareOptions::new(),
            ProtectionCompareMode::Full
        ));
        let entry = loaded.tree.entry(e).unwrap();
        assert_eq!(entry.parent(), Some(g));
        assert!(entry.get_string(fields::PASSWORD).unwrap().is_protected());
    }

    #[test]
    fn garbage_is_a_codec_error() {
        let err = CborPersistence::new().load_bytes(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, CoreError::Codec { .. } | CoreError::Io(_)));
    }
}
