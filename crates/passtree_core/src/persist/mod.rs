//! Byte-stream persistence of whole databases.
//!
//! The merge engine only needs "bytes in, database out" and the reverse;
//! concrete encodings implement [`TreePersistence`].

mod cbor;

pub use cbor::{CborPersistence, SNAPSHOT_VERSION};

use crate::database::Database;
use crate::error::CoreResult;
use std::io::{Read, Write};

/// Loads and saves databases over byte streams.
///
/// # Invariants
///
/// - `load` never returns a database that fails
///   [`Database::check_invariants`]
/// - `load` returns tombstones collapsed to one per object
/// - `save` followed by `load` yields an equal tree, equal tombstones,
///   metadata and custom icons
pub trait TreePersistence: Send + Sync {
    /// Reads a database.
    ///
    /// # Errors
    ///
    /// `Io` for read failures, `Codec` for malformed input and any
    /// invariant error of the decoded database.
    fn load(&self, reader: &mut dyn Read) -> CoreResult<Database>;

    /// Writes a database.
    ///
    /// # Errors
    ///
    /// `Io` for write failures, `Codec` if encoding fails.
    fn save(&self, database: &Database, writer: &mut dyn Write) -> CoreResult<()>;

    /// Reads a database from a byte slice.
    ///
    /// # Errors
    ///
    /// See [`TreePersistence::load`].
    fn load_bytes(&self, mut bytes: &[u8]) -> CoreResult<Database> {
        self.load(&mut bytes)
    }

    /// Writes a database into a new buffer.
    ///
    /// # Errors
    ///
    /// See [`TreePersistence::save`].
    fn save_bytes(&self, database: &Database) -> CoreResult<Vec<u8>> {
        let mut out = Vec::new();
        self.save(database, &mut out)?;
        Ok(out)
    }
}
