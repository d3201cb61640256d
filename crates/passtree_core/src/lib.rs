//! # passtree core
//!
//! In-memory model of a password database.
//!
//! This crate provides:
//! - Unique identifiers and timestamp helpers
//! - Memory-protected strings and byte values
//! - The group/entry tree with history, ordering and depth limits
//! - Tombstones, custom icons and database metadata
//! - Maintenance operations (duplicate, empty-group and icon cleanup)
//! - Progress reporting with cooperative cancellation
//! - A byte-stream persistence contract with a CBOR snapshot codec
//!
//! Replica merging lives in `passtree_sync`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod deleted;
mod error;
mod icon;
mod id;
mod meta;
pub mod persist;
pub mod protected;
mod status;
pub mod time;
pub mod tree;
mod variant;

pub use config::{
    HistoryPolicy, MemoryProtectionConfig, DEFAULT_HISTORY_MAX_ITEMS, DEFAULT_HISTORY_MAX_SIZE,
};
pub use database::Database;
pub use deleted::DeletedObject;
pub use error::{CoreError, CoreResult};
pub use icon::CustomIcon;
pub use id::UniqueId;
pub use meta::{DatabaseMeta, DEFAULT_MAINTENANCE_HISTORY_DAYS};
pub use persist::{CborPersistence, TreePersistence};
pub use protected::{ProtectedBinary, ProtectedString};
pub use status::{NullStatusLogger, RecordingStatusLogger, StatusLogger, StatusType};
pub use time::Timestamp;
pub use tree::{
    fields, Color, CompareOptions, CustomData, Entry, Group, NodeKind, NodeRef,
    ProtectionCompareMode, Tags, Times, Tree, TreeVisitor, MAX_DEPTH,
};
pub use variant::{Variant, VariantDictionary};
