//! Moving objects to the parent chosen by the most recent move.

use crate::engine::Merge;
use crate::error::MergeResult;
use crate::outcome::SkipReason;
use crate::position::best_index;
use passtree_core::{NodeKind, UniqueId};
use tracing::{debug, warn};

impl Merge<'_> {
    /// Moves every local group whose source copy was moved more recently
    /// to the source parent.
    ///
    /// Moves that would create a cycle, target a missing group or exceed
    /// the depth limit are left out.
    pub(crate) fn relocate_groups(&mut self) -> MergeResult<()> {
        let root = self.local.tree.root_id();
        for id in self.local.tree.groups_recursive(root) {
            if !self.keep_going() {
                break;
            }
            let Some(target) = self.relocation_target(id, NodeKind::Group) else {
                continue;
            };
            if self.local.tree.group(target).is_none()
                || target == id
                || self.local.tree.is_contained_in(target, id)
            {
                continue;
            }
            if !self.local.tree.can_add_group(target, self.local.tree.height(id)) {
                warn!(%id, %target, "relocation would exceed the depth limit, skipped");
                self.outcome.skip(id, NodeKind::Group, SkipReason::DepthLimit);
                continue;
            }

            let index = self
                .local
                .tree
                .group(target)
                .and_then(|g| best_index(g.groups(), id, &self.src));
            self.local.tree.move_group(id, target, index)?;
            self.outcome.groups_relocated += 1;
        }
        debug!(relocated = self.outcome.groups_relocated, "relocated groups");
        Ok(())
    }

    /// Entry counterpart of [`Merge::relocate_groups`].
    pub(crate) fn relocate_entries(&mut self) -> MergeResult<()> {
        let root = self.local.tree.root_id();
        for id in self.local.tree.entries_recursive(root) {
            if !self.keep_going() {
                break;
            }
            let Some(target) = self.relocation_target(id, NodeKind::Entry) else {
                continue;
            };
            if self.local.tree.group(target).is_none() {
                continue;
            }

            let index = self
                .local
                .tree
                .group(target)
                .and_then(|g| best_index(g.entries(), id, &self.src));
            self.local.tree.move_entry(id, target, index)?;
            self.outcome.entries_relocated += 1;
        }
        debug!(relocated = self.outcome.entries_relocated, "relocated entries");
        Ok(())
    }

    /// Source parent of `id` if the source moved it more recently than the
    /// local side and to a different parent.
    fn relocation_target(&self, id: UniqueId, kind: NodeKind) -> Option<UniqueId> {
        let org = self.org.item_of_kind(id, kind)?;
        let src = self.src.item_of_kind(id, kind)?;
        let src_parent = src.parent?;
        if self.local.tree.parent_of(id) == Some(src_parent) {
            return None;
        }
        (src.location_changed > org.location_changed).then_some(src_parent)
    }
}
