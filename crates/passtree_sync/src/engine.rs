//! Merge driver.
//!
//! A merge runs as a fixed sequence of passes over the local database:
//!
//! 1. upsert every source group and entry (pre-order)
//! 2. `Synchronize` only: relocate groups, relocate entries, reorder
//!    sibling lists, settle location-changed times
//! 3. apply tombstones (both sides' with `Synchronize`)
//! 4. merge database settings and custom icons
//! 5. prune history
//!
//! Passes poll the status logger; once it asks to stop, the remaining
//! passes are skipped and the merge returns with
//! [`MergeOutcome::cancelled`] set. Changes made up to that point stay.

use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::method::MergeMethod;
use crate::outcome::{MergeOutcome, SkipReason};
use crate::pool::{ObjectPool, PoolItem};
use passtree_core::time::{Timestamp, MIN_TIME};
use passtree_core::{Database, NodeKind, StatusLogger, TreePersistence, UniqueId};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Merges one database into another.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    config: MergeConfig,
}

impl MergeEngine {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merges `source` into `local`.
    ///
    /// `source` is modified as well: `CreateNewUuids` re-keys it, and when
    /// the local copy of an entry is newer the source entry receives a
    /// backup of its own state so that the history merge keeps it.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if either database fails its invariant check; the
    /// local database is untouched then. `Core` or `InvariantViolation` if
    /// a tree operation fails mid-merge or the result is inconsistent.
    pub fn merge_in(
        &self,
        local: &mut Database,
        source: &mut Database,
        method: MergeMethod,
        logger: Option<&dyn StatusLogger>,
    ) -> MergeResult<MergeOutcome> {
        local
            .check_invariants()
            .map_err(|e| MergeError::invalid_argument(format!("local database: {e}")))?;
        source
            .check_invariants()
            .map_err(|e| MergeError::invalid_argument(format!("source database: {e}")))?;

        let started = Instant::now();
        if let Some(logger) = logger {
            logger.start_logging("merge");
        }
        info!(%method, "merging database");

        if method == MergeMethod::CreateNewUuids {
            source.tree.create_new_item_uuids(true, true, true);
        }
        let result = Merge::new(local, source, method, logger).run(&self.config);

        if let Some(logger) = logger {
            logger.end_logging();
        }
        let mut outcome = result?;
        outcome.duration = started.elapsed();
        info!(
            created = outcome.groups_created + outcome.entries_created,
            updated = outcome.groups_updated + outcome.entries_updated,
            relocated = outcome.groups_relocated + outcome.entries_relocated,
            reordered = outcome.lists_reordered,
            deleted = outcome.objects_deleted,
            skipped = outcome.skipped.len(),
            cancelled = outcome.cancelled,
            duration_ms = outcome.duration.as_millis() as u64,
            "merge finished"
        );
        Ok(outcome)
    }

    /// Decodes a replica with `persistence` and synchronizes it into
    /// `local`.
    ///
    /// # Errors
    ///
    /// `Core` if the bytes cannot be decoded, otherwise see
    /// [`MergeEngine::merge_in`].
    pub fn synchronize_bytes(
        &self,
        local: &mut Database,
        bytes: &[u8],
        persistence: &dyn TreePersistence,
        logger: Option<&dyn StatusLogger>,
    ) -> MergeResult<MergeOutcome> {
        let mut source = persistence.load_bytes(bytes)?;
        self.merge_in(local, &mut source, MergeMethod::Synchronize, logger)
    }
}

/// State of one running merge.
pub(crate) struct Merge<'a> {
    pub(crate) local: &'a mut Database,
    pub(crate) source: &'a mut Database,
    pub(crate) method: MergeMethod,
    logger: Option<&'a dyn StatusLogger>,
    /// Local tree before the merge.
    pub(crate) org: ObjectPool,
    /// Source tree.
    pub(crate) src: ObjectPool,
    pub(crate) outcome: MergeOutcome,
    /// Source groups left out, with the reason inherited by their content.
    pub(crate) skipped_groups: HashMap<UniqueId, SkipReason>,
}

impl<'a> Merge<'a> {
    pub(crate) fn new(
        local: &'a mut Database,
        source: &'a mut Database,
        method: MergeMethod,
        logger: Option<&'a dyn StatusLogger>,
    ) -> Self {
        let org = ObjectPool::from_tree(&local.tree);
        let src = ObjectPool::from_tree(&source.tree);
        Self {
            local,
            source,
            method,
            logger,
            org,
            src,
            outcome: MergeOutcome::default(),
            skipped_groups: HashMap::new(),
        }
    }

    fn run(mut self, config: &MergeConfig) -> MergeResult<MergeOutcome> {
        self.upsert_all()?;

        if self.method == MergeMethod::Synchronize && !self.outcome.cancelled {
            self.relocate_groups()?;
            self.relocate_entries()?;
            let root = self.local.tree.root_id();
            self.reorder_objects(root)?;
            if !self.outcome.cancelled {
                self.merge_location_changed();
            }
        }

        if !self.outcome.cancelled {
            let mut deletions = self.deleted_objects_pool();
            if self.method == MergeMethod::Synchronize {
                self.merge_deletion_info(&mut deletions);
            }
            let root = self.local.tree.root_id();
            self.apply_deletions(root, &mut deletions)?;

            if !self.outcome.cancelled {
                self.merge_db_properties();
                self.merge_custom_icons(&mut deletions);
                if config.maintain_backups {
                    self.maintain_backups(config);
                }
            }
        }

        self.local
            .check_invariants()
            .map_err(|e| MergeError::invariant(e.to_string()))?;
        Ok(self.outcome)
    }

    fn maintain_backups(&mut self, config: &MergeConfig) {
        let policy = config
            .history_policy
            .unwrap_or(self.local.meta.history_policy);
        let pruned = self
            .local
            .tree
            .all_entries_mut()
            .map(|e| e.maintain_backups(&policy))
            .filter(|p| *p)
            .count();
        debug!(pruned, "pruned entry history");
    }

    fn upsert_all(&mut self) -> MergeResult<()> {
        let order: Vec<(UniqueId, NodeKind)> = self
            .source
            .tree
            .pre_order()
            .map(|(node, _)| (node.uuid(), node.kind()))
            .collect();

        for (id, kind) in order {
            match kind {
                NodeKind::Group => self.upsert_group(id)?,
                NodeKind::Entry => self.upsert_entry(id)?,
            }
            if !self.keep_going() {
                break;
            }
        }
        debug!(
            groups_created = self.outcome.groups_created,
            entries_created = self.outcome.entries_created,
            "upserted source objects"
        );
        Ok(())
    }

    /// Polls the status logger. Once it says stop, every later call
    /// returns `false` without polling again.
    pub(crate) fn keep_going(&mut self) -> bool {
        if self.outcome.cancelled {
            return false;
        }
        if let Some(logger) = self.logger {
            if !logger.continue_work() {
                warn!("merge cancelled by status logger");
                self.outcome.cancelled = true;
                return false;
            }
        }
        true
    }

    /// Snapshot that saw the most recent move of `uuid`.
    ///
    /// Ties go to the local side; `None` if neither snapshot holds the
    /// node with a real location-changed time.
    pub(crate) fn best_pool(&self, uuid: UniqueId) -> Option<(PoolSide, BestLocation)> {
        let mut latest = MIN_TIME;
        let mut best = None;
        if let Some(item) = self.org.item_of(uuid) {
            latest = item.location_changed;
            best = Some((PoolSide::Local, BestLocation::of(item)));
        }
        if let Some(item) = self.src.item_of(uuid) {
            if item.location_changed > latest {
                best = Some((PoolSide::Source, BestLocation::of(item)));
            }
        }
        best
    }

    pub(crate) fn pool(&self, side: PoolSide) -> &ObjectPool {
        match side {
            PoolSide::Local => &self.org,
            PoolSide::Source => &self.src,
        }
    }
}

/// Which snapshot a position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PoolSide {
    Local,
    Source,
}

/// Location data taken from the winning snapshot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BestLocation {
    pub(crate) location_changed: Timestamp,
    pub(crate) previous_parent: UniqueId,
}

impl BestLocation {
    fn of(item: &PoolItem) -> Self {
        Self {
            location_changed: item.location_changed,
            previous_parent: item.previous_parent,
        }
    }
}
