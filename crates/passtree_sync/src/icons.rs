//! Custom icon merge.

use crate::deletions::DeletionMap;
use crate::engine::Merge;
use passtree_core::UniqueId;
use std::collections::{HashMap, HashSet};
use tracing::debug;

impl Merge<'_> {
    /// Adds source icons the local side lacks, replaces local icons the
    /// source changed more recently, then applies icon tombstones. An icon
    /// changed after its tombstone survives and the tombstone is dropped.
    pub(crate) fn merge_custom_icons(&mut self, deletions: &mut DeletionMap) {
        let mut index: HashMap<UniqueId, usize> = self
            .local
            .custom_icons
            .iter()
            .enumerate()
            .map(|(i, icon)| (icon.uuid, i))
            .collect();

        for icon in &self.source.custom_icons {
            match index.get(&icon.uuid) {
                Some(&i) => {
                    let local = &mut self.local.custom_icons[i];
                    let replace = match (local.last_modified, icon.last_modified) {
                        (Some(l), Some(s)) => s > l,
                        (None, Some(_)) => true,
                        (Some(_), None) | (None, None) => false,
                    };
                    if replace {
                        *local = icon.clone();
                        self.outcome.icons_merged += 1;
                    }
                }
                None => {
                    index.insert(icon.uuid, self.local.custom_icons.len());
                    self.local.custom_icons.push(icon.clone());
                    self.outcome.icons_merged += 1;
                }
            }
        }

        let mut removed = HashSet::new();
        let mut revived = Vec::new();
        for (&id, &deleted_at) in deletions.iter() {
            let Some(&i) = index.get(&id) else {
                continue;
            };
            let icon = &self.local.custom_icons[i];
            if icon.last_modified.is_some_and(|t| t > deleted_at) {
                revived.push(id);
            } else {
                removed.insert(id);
            }
        }

        self.local.custom_icons.retain(|icon| !removed.contains(&icon.uuid));
        for id in revived {
            deletions.remove(&id);
            self.local.deleted_objects.retain(|d| d.uuid != id);
        }
        self.outcome.icons_deleted += removed.len();

        let cleared = self.local.fix_custom_icon_refs();
        debug!(
            merged = self.outcome.icons_merged,
            deleted = removed.len(),
            cleared,
            "merged custom icons"
        );
    }
}
