//! Creating and updating local objects from the source.

use crate::engine::Merge;
use crate::error::MergeResult;
use crate::method::MergeMethod;
use crate::outcome::SkipReason;
use crate::position::best_index;
use passtree_core::{
    time, CompareOptions, Entry, Group, NodeKind, ProtectionCompareMode, UniqueId,
};
use std::collections::btree_map::{BTreeMap, Entry as Slot};
use tracing::{debug, warn};

impl Merge<'_> {
    /// Local group that receives a new object whose source parent is
    /// `source_parent`.
    fn container_for(&self, source_parent: Option<UniqueId>) -> UniqueId {
        let root = self.local.tree.root_id();
        match source_parent {
            Some(p) if p != self.source.tree.root_id() && self.local.tree.group(p).is_some() => p,
            _ => root,
        }
    }

    /// Reason to leave out a new object whose source parent was left out.
    fn inherited_skip(&self, source_parent: Option<UniqueId>) -> Option<SkipReason> {
        source_parent.and_then(|p| self.skipped_groups.get(&p).copied())
    }

    fn skip_group(&mut self, id: UniqueId, reason: SkipReason) {
        self.skipped_groups.insert(id, reason);
        self.outcome.skip(id, NodeKind::Group, reason);
    }

    pub(crate) fn upsert_group(&mut self, id: UniqueId) -> MergeResult<()> {
        match self.local.tree.kind_of(id) {
            Some(NodeKind::Group) => {
                self.update_group(id);
                Ok(())
            }
            Some(NodeKind::Entry) => {
                warn!(%id, "source group collides with a local entry, skipped");
                self.skip_group(id, SkipReason::KindConflict);
                Ok(())
            }
            None => self.create_group(id),
        }
    }

    fn create_group(&mut self, id: UniqueId) -> MergeResult<()> {
        let Some(src) = self.source.tree.group(id) else {
            return Ok(());
        };
        if let Some(reason) = self.inherited_skip(src.parent()) {
            debug!(%id, ?reason, "parent group was skipped, skipping subgroup");
            self.skip_group(id, reason);
            return Ok(());
        }
        let container = self.container_for(src.parent());

        let mut group = Group::with_uuid(id, src.name.clone(), src.times.creation);
        group.assign_properties(src, false, true);
        let index = self
            .local
            .tree
            .group(container)
            .and_then(|c| best_index(c.groups(), id, &self.src));

        match self.local.tree.add_group_at(container, group, index) {
            Ok(_) => {
                self.outcome.groups_created += 1;
                Ok(())
            }
            Err(e) if e.is_structural_limit() => {
                warn!(%id, error = %e, "source group too deep, skipped");
                self.skip_group(id, SkipReason::DepthLimit);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update_group(&mut self, id: UniqueId) {
        let only_if_newer = match self.method {
            MergeMethod::OverwriteExisting => false,
            MergeMethod::OverwriteIfNewer | MergeMethod::Synchronize => true,
            _ => return,
        };
        let (Some(local), Some(src)) = (self.local.tree.group_mut(id), self.source.tree.group(id))
        else {
            return;
        };

        let differs =
            !local.equals_properties(src, CompareOptions::new().ignore_parent_group());
        let applies = !only_if_newer
            || !time::compare(src.times.last_modification, local.times.last_modification, true)
                .is_lt();
        local.assign_properties(src, only_if_newer, false);
        if differs && applies {
            self.outcome.groups_updated += 1;
        }
    }

    pub(crate) fn upsert_entry(&mut self, id: UniqueId) -> MergeResult<()> {
        let existed = self.org.item_of(id).map(|item| item.kind);
        match existed {
            Some(NodeKind::Entry) => {
                self.update_entry(id);
                Ok(())
            }
            Some(NodeKind::Group) => {
                warn!(%id, "source entry collides with a local group, skipped");
                self.outcome.skip(id, NodeKind::Entry, SkipReason::KindConflict);
                Ok(())
            }
            None if self.local.tree.contains(id) => {
                warn!(%id, "source entry collides with a merged group, skipped");
                self.outcome.skip(id, NodeKind::Entry, SkipReason::KindConflict);
                Ok(())
            }
            None => self.create_entry(id),
        }
    }

    fn create_entry(&mut self, id: UniqueId) -> MergeResult<()> {
        let Some(src) = self.source.tree.entry(id) else {
            return Ok(());
        };
        if let Some(reason) = self.inherited_skip(src.parent()) {
            debug!(%id, ?reason, "parent group was skipped, skipping entry");
            self.outcome.skip(id, NodeKind::Entry, reason);
            return Ok(());
        }
        let container = self.container_for(src.parent());

        let mut entry = Entry::with_uuid(id, src.times.creation);
        entry.assign_properties(src, false, true, true);
        let index = self
            .local
            .tree
            .group(container)
            .and_then(|c| best_index(c.entries(), id, &self.src));

        self.local.tree.add_entry_at(container, entry, index)?;
        self.outcome.entries_created += 1;
        Ok(())
    }

    fn update_entry(&mut self, id: UniqueId) {
        let overwrite = self.method == MergeMethod::OverwriteExisting;
        let (Some(local), Some(src)) = (self.local.tree.entry_mut(id), self.source.tree.entry_mut(id))
        else {
            return;
        };

        let options = CompareOptions::new()
            .ignore_parent_group()
            .ignore_last_access()
            .ignore_history()
            .null_empty_equiv_std();
        let equal = local.equals(src, options, ProtectionCompareMode::None);
        let src_vs_local =
            time::compare(src.times.last_modification, local.times.last_modification, true);

        if !equal {
            let keep_local = (overwrite || src_vs_local.is_gt())
                && !src.has_backup_of_data(local, false, true);
            if keep_local {
                local.create_backup(None);
                self.outcome.backups_created += 1;
            }

            let keep_source = !overwrite
                && src_vs_local.is_lt()
                && !local.has_backup_of_data(src, false, true);
            if keep_source {
                src.create_backup(None);
                self.outcome.backups_created += 1;
            }
        }

        let applied = match self.method {
            MergeMethod::OverwriteExisting => {
                local.assign_properties(src, false, false, false);
                true
            }
            MergeMethod::OverwriteIfNewer | MergeMethod::Synchronize => {
                local.assign_properties(src, true, false, false);
                !src_vs_local.is_lt()
            }
            _ => false,
        };
        if applied && !equal {
            self.outcome.entries_updated += 1;
        }

        self.merge_entry_history(id);
    }

    /// Unions the history of the local and source copies of entry `id`,
    /// keyed and sorted by modification time. On equal times the local
    /// item stays, except with `OverwriteExisting`.
    fn merge_entry_history(&mut self, id: UniqueId) {
        let (Some(local), Some(src)) = (self.local.tree.entry(id), self.source.tree.entry(id))
        else {
            return;
        };
        let (a, b) = (local.history(), src.history());
        let aligned = a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| x.times.last_modification == y.times.last_modification);
        if aligned {
            return;
        }
        if !self.keep_going() {
            return;
        }

        let overwrite = self.method == MergeMethod::OverwriteExisting;
        let (Some(local), Some(src)) = (self.local.tree.entry_mut(id), self.source.tree.entry(id))
        else {
            return;
        };
        let mut merged: BTreeMap<_, Entry> = local
            .history()
            .iter()
            .map(|item| (item.times.last_modification, item.clone_deep()))
            .collect();
        for item in src.history() {
            match merged.entry(item.times.last_modification) {
                Slot::Occupied(mut slot) => {
                    if overwrite {
                        slot.insert(item.clone_deep());
                    }
                }
                Slot::Vacant(slot) => {
                    slot.insert(item.clone_deep());
                }
            }
        }
        debug!(%id, items = merged.len(), "merged entry history");
        local.set_history(merged.into_values().collect());
    }
}
