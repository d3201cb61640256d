//! Tombstone merging and application.

use crate::engine::Merge;
use crate::error::MergeResult;
use passtree_core::time::{self, Timestamp};
use passtree_core::{NodeKind, UniqueId};
use std::collections::HashMap;
use tracing::debug;

/// Tombstones that still have to be applied, by object id.
pub(crate) type DeletionMap = HashMap<UniqueId, Timestamp>;

impl Merge<'_> {
    /// Indexes the local tombstones. Repeated tombstones of one object
    /// are collapsed first, keeping the later deletion time.
    pub(crate) fn deleted_objects_pool(&mut self) -> DeletionMap {
        self.local.collapse_deleted_objects();
        self.local
            .deleted_objects
            .iter()
            .map(|d| (d.uuid, d.deletion_time))
            .collect()
    }

    /// Adds the source tombstones; for ids known on both sides the later
    /// deletion time wins.
    pub(crate) fn merge_deletion_info(&mut self, deletions: &mut DeletionMap) {
        for d in &self.source.deleted_objects {
            match deletions.get_mut(&d.uuid) {
                Some(at) => {
                    if d.deletion_time > *at {
                        *at = d.deletion_time;
                        if let Some(local) = self
                            .local
                            .deleted_objects
                            .iter_mut()
                            .find(|l| l.uuid == d.uuid)
                        {
                            local.deletion_time = d.deletion_time;
                        }
                    }
                }
                None => {
                    deletions.insert(d.uuid, d.deletion_time);
                    self.local.deleted_objects.push(*d);
                }
            }
        }
    }

    /// Applies tombstones below `container`, children first.
    ///
    /// An object is removed if it was last modified before its deletion
    /// (to the second); a group only once it is empty. A tombstone whose
    /// object was modified later is dropped, since the object was revived.
    pub(crate) fn apply_deletions(
        &mut self,
        container: UniqueId,
        deletions: &mut DeletionMap,
    ) -> MergeResult<()> {
        let Some(group) = self.local.tree.group(container) else {
            return Ok(());
        };
        let groups = group.groups().to_vec();
        let entries = group.entries().to_vec();

        for &sub in &groups {
            self.apply_deletions(sub, deletions)?;
            if self.outcome.cancelled {
                return Ok(());
            }
        }

        for &id in groups.iter().rev() {
            if !self.keep_going() {
                return Ok(());
            }
            self.apply_deletion(id, NodeKind::Group, deletions)?;
        }
        for &id in entries.iter().rev() {
            if !self.keep_going() {
                return Ok(());
            }
            self.apply_deletion(id, NodeKind::Entry, deletions)?;
        }
        Ok(())
    }

    fn apply_deletion(
        &mut self,
        id: UniqueId,
        kind: NodeKind,
        deletions: &mut DeletionMap,
    ) -> MergeResult<()> {
        let Some(&deleted_at) = deletions.get(&id) else {
            return Ok(());
        };
        let (last_modified, removable) = match kind {
            NodeKind::Group => match self.local.tree.group(id) {
                Some(g) => (g.times.last_modification, g.is_empty()),
                None => return Ok(()),
            },
            NodeKind::Entry => match self.local.tree.entry(id) {
                Some(e) => (e.times.last_modification, true),
                None => return Ok(()),
            },
        };

        deletions.remove(&id);
        if removable && time::compare(last_modified, deleted_at, true).is_lt() {
            match kind {
                NodeKind::Group => {
                    self.local.tree.detach_group(id)?;
                }
                NodeKind::Entry => {
                    self.local.tree.detach_entry(id)?;
                }
            }
            self.outcome.objects_deleted += 1;
            debug!(%id, ?kind, "applied tombstone");
        } else {
            self.local.deleted_objects.retain(|d| d.uuid != id);
            debug!(%id, ?kind, "dropped tombstone of revived object");
        }
        Ok(())
    }
}
