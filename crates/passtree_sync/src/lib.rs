//! # passtree sync
//!
//! Merging of passtree databases.
//!
//! This crate provides:
//! - Merge methods from plain import to full two-replica synchronization
//! - Position snapshots used to carry moves and sibling order across
//! - Tombstone, entry history, custom icon and settings reconciliation
//! - Cooperative cancellation through a status logger
//!
//! ## Guarantees
//!
//! - Identifiers stay unique in the merged tree
//! - Synchronizing the same replica twice changes nothing the second time
//! - Deletion times of tombstones never decrease
//! - The group depth limit holds; offending objects are skipped and
//!   reported in [`MergeOutcome::skipped`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod deletions;
mod engine;
mod error;
mod icons;
mod method;
mod outcome;
mod pool;
mod position;
mod properties;
mod relocate;
mod reorder;
mod upsert;

pub use config::MergeConfig;
pub use engine::MergeEngine;
pub use error::{MergeError, MergeResult};
pub use method::MergeMethod;
pub use outcome::{MergeOutcome, SkipReason, SkippedObject};
pub use pool::{ObjectPool, PoolItem, ROOT_POOL_ID};

use passtree_core::{Database, StatusLogger};

/// Merges `source` into `local` with the default configuration.
///
/// # Errors
///
/// See [`MergeEngine::merge_in`].
pub fn merge_in(
    local: &mut Database,
    source: &mut Database,
    method: MergeMethod,
    logger: Option<&dyn StatusLogger>,
) -> MergeResult<MergeOutcome> {
    MergeEngine::default().merge_in(local, source, method, logger)
}

/// Synchronizes `local` with a replica.
///
/// The replica is cloned first, so it is left exactly as passed in.
///
/// # Errors
///
/// See [`MergeEngine::merge_in`].
pub fn synchronize(
    local: &mut Database,
    replica: &Database,
    logger: Option<&dyn StatusLogger>,
) -> MergeResult<MergeOutcome> {
    let mut source = replica.clone();
    merge_in(local, &mut source, MergeMethod::Synchronize, logger)
}
