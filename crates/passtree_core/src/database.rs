//! The database: a tree plus tombstones, metadata and custom icons.

use crate::deleted::DeletedObject;
use crate::error::{CoreError, CoreResult};
use crate::icon::CustomIcon;
use crate::id::UniqueId;
use crate::meta::DatabaseMeta;
use crate::status::StatusLogger;
use crate::time::{self, Timestamp};
use crate::tree::{fields, Entry, Group, Tree};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// A password database held in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// Groups and entries.
    pub tree: Tree,
    /// Tombstones of deleted groups, entries and custom icons.
    pub deleted_objects: Vec<DeletedObject>,
    /// Database-wide settings.
    pub meta: DatabaseMeta,
    /// Custom icons in display order.
    pub custom_icons: Vec<CustomIcon>,
}

impl Database {
    /// Creates an empty database whose root group is named like the
    /// database.
    #[must_use]
    pub fn new(name: impl Into<String>, at: Timestamp) -> Self {
        let name = name.into();
        Self {
            tree: Tree::with_root_name(name.clone(), at),
            deleted_objects: Vec::new(),
            meta: DatabaseMeta::new(name, at),
            custom_icons: Vec::new(),
        }
    }

    /// Wraps an existing tree.
    #[must_use]
    pub fn from_tree(tree: Tree, meta: DatabaseMeta) -> Self {
        Self {
            tree,
            deleted_objects: Vec::new(),
            meta,
            custom_icons: Vec::new(),
        }
    }

    /// Records a tombstone; an existing tombstone for the same id keeps
    /// the later deletion time.
    pub fn add_deleted_object(&mut self, uuid: UniqueId, at: Timestamp) {
        match self.deleted_objects.iter_mut().find(|d| d.uuid == uuid) {
            Some(existing) => {
                if at > existing.deletion_time {
                    existing.deletion_time = at;
                }
            }
            None => self.deleted_objects.push(DeletedObject::new(uuid, at)),
        }
    }

    /// Merges repeated tombstones of one object into its first occurrence,
    /// keeping the latest deletion time. Returns the number of removed
    /// duplicates.
    pub fn collapse_deleted_objects(&mut self) -> usize {
        let before = self.deleted_objects.len();
        let mut first: HashMap<UniqueId, usize> = HashMap::with_capacity(before);
        let mut kept: Vec<DeletedObject> = Vec::with_capacity(before);
        for d in self.deleted_objects.drain(..) {
            match first.get(&d.uuid) {
                Some(&i) => {
                    if d.deletion_time > kept[i].deletion_time {
                        kept[i].deletion_time = d.deletion_time;
                    }
                }
                None => {
                    first.insert(d.uuid, kept.len());
                    kept.push(d);
                }
            }
        }
        self.deleted_objects = kept;
        let collapsed = before - self.deleted_objects.len();
        if collapsed > 0 {
            debug!(collapsed, "collapsed repeated tombstones");
        }
        collapsed
    }

    /// Removes a group with everything below it and records tombstones for
    /// every removed object.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group, `InvalidArgument` for the root.
    pub fn delete_group(&mut self, id: UniqueId, at: Timestamp) -> CoreResult<()> {
        let removed = self.tree.detach_group(id)?;
        let ids: Vec<UniqueId> = removed.pre_order().map(|(node, _)| node.uuid()).collect();
        for uuid in &ids {
            self.add_deleted_object(*uuid, at);
        }
        debug!(group = %id, objects = ids.len(), "deleted group");
        Ok(())
    }

    /// Removes an entry and records a tombstone.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown entry.
    pub fn delete_entry(&mut self, id: UniqueId, at: Timestamp) -> CoreResult<()> {
        self.tree.detach_entry(id)?;
        self.add_deleted_object(id, at);
        Ok(())
    }

    /// The recycle bin group, if it is enabled and exists.
    #[must_use]
    pub fn recycle_bin(&self) -> Option<&Group> {
        if !self.meta.recycle_bin_enabled || self.meta.recycle_bin.is_zero() {
            return None;
        }
        self.tree
            .find_group(self.tree.root_id(), self.meta.recycle_bin, true)
    }

    /// Deletes entries whose visible content duplicates another entry.
    ///
    /// Of each duplicate pair the entry modified less recently is deleted,
    /// unless exactly one of them sits in the recycle bin; then that one
    /// goes. The scan stops early when `logger` declines progress. Returns
    /// the number of deleted entries.
    pub fn delete_duplicate_entries(&mut self, logger: Option<&dyn StatusLogger>) -> usize {
        let bin = self.recycle_bin().map(Group::uuid);
        let now = time::now();
        let mut list = self.tree.entries_recursive(self.tree.root_id());
        let mut deleted = 0;

        let mut i = 0;
        while i + 1 < list.len() {
            if let Some(logger) = logger {
                if !logger.set_progress(scan_progress(i, list.len())) {
                    break;
                }
            }

            let mut removed_a = false;
            for j in (i + 1)..list.len() {
                let (Some(a), Some(b)) = (self.tree.entry(list[i]), self.tree.entry(list[j])) else {
                    continue;
                };
                if !entries_duplicate(a, b) {
                    continue;
                }

                let mut delete_a = time::compare(
                    a.times.last_modification,
                    b.times.last_modification,
                    true,
                )
                .is_le();
                if let Some(bin) = bin {
                    let a_in_bin = self.tree.is_contained_in(list[i], bin);
                    let b_in_bin = self.tree.is_contained_in(list[j], bin);
                    if a_in_bin && !b_in_bin {
                        delete_a = true;
                    } else if b_in_bin && !a_in_bin {
                        delete_a = false;
                    }
                }

                let victim = if delete_a { list.remove(i) } else { list.remove(j) };
                if self.tree.detach_entry(victim).is_ok() {
                    self.add_deleted_object(victim, now);
                }
                removed_a = delete_a;
                deleted += 1;
                break;
            }

            if !removed_a {
                i += 1;
            }
        }

        if deleted > 0 {
            info!(deleted, "deleted duplicate entries");
        }
        deleted
    }

    /// Deletes every group that has neither subgroups nor entries, deepest
    /// first, so that groups emptied by the pass are removed too. The root
    /// is never deleted. Returns the number of deleted groups.
    pub fn delete_empty_groups(&mut self) -> usize {
        let list = self.tree.groups_recursive(self.tree.root_id());
        let now = time::now();
        let mut deleted = 0;

        for id in list.into_iter().rev() {
            if !self.tree.group(id).is_some_and(Group::is_empty) {
                continue;
            }
            if self.tree.detach_group(id).is_ok() {
                self.add_deleted_object(id, now);
                deleted += 1;
            }
        }
        deleted
    }

    fn used_custom_icons(&self) -> HashSet<UniqueId> {
        let mut used = HashSet::new();
        for g in self.tree.all_groups() {
            if !g.custom_icon.is_zero() {
                used.insert(g.custom_icon);
            }
        }
        for e in self.tree.all_entries() {
            e.collect_custom_icons(&mut used);
        }
        used
    }

    /// Deletes custom icons that no group, entry or history item uses.
    /// Returns the number of deleted icons.
    pub fn delete_unused_custom_icons(&mut self) -> usize {
        let used = self.used_custom_icons();
        let unused: Vec<UniqueId> = self
            .custom_icons
            .iter()
            .map(|icon| icon.uuid)
            .filter(|id| !used.contains(id))
            .collect();
        self.delete_custom_icons(&unused)
    }

    /// Deletes the given custom icons, records tombstones for them and
    /// clears references that now dangle. Returns the number of deleted
    /// icons.
    pub fn delete_custom_icons(&mut self, ids: &[UniqueId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let doomed: HashSet<UniqueId> = ids.iter().copied().collect();
        let now = time::now();
        let before = self.custom_icons.len();

        let mut removed = Vec::new();
        self.custom_icons.retain(|icon| {
            let keep = !doomed.contains(&icon.uuid);
            if !keep {
                removed.push(icon.uuid);
            }
            keep
        });
        for id in removed {
            self.add_deleted_object(id, now);
        }

        self.fix_custom_icon_refs();
        before - self.custom_icons.len()
    }

    /// Clears custom icon references of groups, entries and history items
    /// that name no existing icon. Returns the number of cleared references.
    pub fn fix_custom_icon_refs(&mut self) -> usize {
        let known: HashSet<UniqueId> = self.custom_icons.iter().map(|i| i.uuid).collect();
        let mut cleared = 0;
        for g in self.tree.all_groups_mut() {
            if !g.custom_icon.is_zero() && !known.contains(&g.custom_icon) {
                g.custom_icon = UniqueId::ZERO;
                cleared += 1;
            }
        }
        for e in self.tree.all_entries_mut() {
            cleared += e.fix_custom_icon_refs(&known);
        }
        cleared
    }

    /// Prunes the history of every entry according to the database's
    /// history policy. Returns `true` if anything was removed.
    pub fn maintain_backups(&mut self) -> bool {
        let policy = self.meta.history_policy;
        let mut removed = false;
        for e in self.tree.all_entries_mut() {
            removed |= e.maintain_backups(&policy);
        }
        removed
    }

    /// Switches protection of a standard field and re-stores every value of
    /// that field, history included.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `field` is not a standard field.
    pub fn enable_string_field_protection(&mut self, field: &str, protect: bool) -> CoreResult<()> {
        if !fields::is_standard(field) {
            return Err(CoreError::invalid_argument(format!(
                "{field} is not a standard field"
            )));
        }
        self.meta.memory_protection.set(field, protect);
        let changed = self
            .tree
            .all_entries_mut()
            .map(|e| e.set_field_protection(field, protect))
            .filter(|c| *c)
            .count();
        debug!(field, protect, changed, "updated field protection");
        Ok(())
    }

    /// Checks the tree invariants plus uniqueness of custom icons.
    ///
    /// Repeated tombstones are not a violation; see
    /// [`Database::collapse_deleted_objects`].
    ///
    /// # Errors
    ///
    /// The first violation found.
    pub fn check_invariants(&self) -> CoreResult<()> {
        self.tree.validate()?;

        let mut seen = HashSet::with_capacity(self.custom_icons.len());
        for icon in &self.custom_icons {
            if icon.uuid.is_zero() || !seen.insert(icon.uuid) {
                return Err(CoreError::DuplicateUuid { uuid: icon.uuid });
            }
        }
        Ok(())
    }

    /// Adds an entry to `parent`, storing standard fields with the
    /// database's protection settings.
    ///
    /// # Errors
    ///
    /// See [`Tree::add_entry`].
    pub fn add_entry(&mut self, parent: UniqueId, mut entry: Entry) -> CoreResult<UniqueId> {
        for field in fields::STANDARD {
            if let Some(protect) = self.meta.memory_protection.get(field) {
                entry.set_field_protection(field, protect);
            }
        }
        self.tree.add_entry(parent, entry)
    }
}

/// Progress of the triangular duplicate scan at row `i` of `n`.
fn scan_progress(i: usize, n: usize) -> u32 {
    let (n, i) = (n as u64, i as u64);
    let total = (n * n) / 2;
    if total == 0 {
        return 0;
    }
    let current = (i * n).saturating_sub((i * i) / 2);
    u32::try_from((current * 100 / total).min(100)).unwrap_or(100)
}

/// Visible-content equality used by duplicate detection: protection flags
/// are ignored and a missing standard field equals an empty one.
fn entries_duplicate(a: &Entry, b: &Entry) -> bool {
    let standard = [fields::TITLE, fields::USER_NAME, fields::URL, fields::NOTES, fields::PASSWORD];
    for field in standard {
        if !a.get_string_safe(field).equals(&b.get_string_safe(field), false) {
            return false;
        }
    }

    let custom = |e: &Entry| {
        e.strings
            .iter()
            .filter(|(k, _)| !fields::is_standard(k))
            .count()
    };
    if custom(a) != custom(b) {
        return false;
    }
    for (key, va) in a.strings.iter().filter(|(k, _)| !fields::is_standard(k)) {
        match b.get_string(key) {
            Some(vb) if vb.equals(va, false) => {}
            _ => return false,
        }
    }

    a.binaries.len() == b.binaries.len()
        && a.binaries
            .iter()
            .all(|(key, va)| b.binaries.get(key).is_some_and(|vb| vb.equals(va, false)))
}
