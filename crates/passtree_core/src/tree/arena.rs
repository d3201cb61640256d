//! Arena holding the groups and entries of one tree.

use super::compare::{CompareOptions, ProtectionCompareMode};
use super::group::MAX_DEPTH;
use super::traverse::NodeKind;
use super::{Entry, Group};
use crate::error::{CoreError, CoreResult};
use crate::id::UniqueId;
use crate::time::Timestamp;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A tree of groups and entries.
///
/// Nodes live in two maps keyed by identifier; containment is expressed
/// by ordered child-id lists on each group plus a parent id lookup, so
/// there are no owning back-pointers. Groups and entries share one
/// identifier namespace. Every mutating operation re-checks the
/// invariants it could break (unique ids, acyclic containment, bounded
/// depth) before changing anything.
#[derive(Debug, Clone)]
pub struct Tree {
    root: UniqueId,
    groups: HashMap<UniqueId, Group>,
    entries: HashMap<UniqueId, Entry>,
}

impl Tree {
    /// Creates a tree whose root is `root`.
    ///
    /// Any child lists on `root` are dropped.
    #[must_use]
    pub fn new(root: Group) -> Self {
        let mut root = root.clone_shallow();
        if root.uuid().is_zero() {
            root.set_uuid(UniqueId::new());
        }
        let id = root.uuid();
        let mut groups = HashMap::new();
        groups.insert(id, root);
        Self {
            root: id,
            groups,
            entries: HashMap::new(),
        }
    }

    /// Creates a tree with a fresh root group named `name`.
    #[must_use]
    pub fn with_root_name(name: impl Into<String>, at: Timestamp) -> Self {
        Self::new(Group::new(name, at))
    }

    /// Identifier of the root group.
    #[inline]
    #[must_use]
    pub fn root_id(&self) -> UniqueId {
        self.root
    }

    /// The root group.
    #[must_use]
    pub fn root(&self) -> &Group {
        &self.groups[&self.root]
    }

    /// The root group, mutably.
    pub fn root_mut(&mut self) -> &mut Group {
        let root = self.root;
        self.groups
            .get_mut(&root)
            .unwrap_or_else(|| unreachable!("tree without root group"))
    }

    /// Returns a group by identifier.
    #[must_use]
    pub fn group(&self, id: UniqueId) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Returns a group by identifier, mutably.
    pub fn group_mut(&mut self, id: UniqueId) -> Option<&mut Group> {
        self.groups.get_mut(&id)
    }

    /// Returns an entry by identifier.
    #[must_use]
    pub fn entry(&self, id: UniqueId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// Returns an entry by identifier, mutably.
    pub fn entry_mut(&mut self, id: UniqueId) -> Option<&mut Entry> {
        self.entries.get_mut(&id)
    }

    /// All groups, root included, in no particular order.
    pub fn all_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// All groups, mutably, in no particular order.
    pub fn all_groups_mut(&mut self) -> impl Iterator<Item = &mut Group> {
        self.groups.values_mut()
    }

    /// All entries in no particular order.
    pub fn all_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// All entries, mutably, in no particular order.
    pub fn all_entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.values_mut()
    }

    /// Returns what kind of node `id` names, if any.
    #[must_use]
    pub fn kind_of(&self, id: UniqueId) -> Option<NodeKind> {
        if self.groups.contains_key(&id) {
            Some(NodeKind::Group)
        } else if self.entries.contains_key(&id) {
            Some(NodeKind::Entry)
        } else {
            None
        }
    }

    /// Returns `true` if a group or entry with this id exists.
    #[must_use]
    pub fn contains(&self, id: UniqueId) -> bool {
        self.kind_of(id).is_some()
    }

    /// Number of groups (root excluded) and entries.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        (self.groups.len() - 1, self.entries.len())
    }

    /// Parent of a group or entry.
    #[must_use]
    pub fn parent_of(&self, id: UniqueId) -> Option<UniqueId> {
        match self.kind_of(id)? {
            NodeKind::Group => self.groups[&id].parent(),
            NodeKind::Entry => self.entries[&id].parent(),
        }
    }

    /// Position of a node within its parent's child list.
    #[must_use]
    pub fn index_in_parent(&self, id: UniqueId) -> Option<usize> {
        let parent = self.group(self.parent_of(id)?)?;
        let list = match self.kind_of(id)? {
            NodeKind::Group => parent.groups(),
            NodeKind::Entry => parent.entries(),
        };
        list.iter().position(|c| *c == id)
    }

    /// Number of ancestors of a node; the root has depth 0.
    #[must_use]
    pub fn depth(&self, id: UniqueId) -> usize {
        let mut depth = 0;
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            depth += 1;
            current = self.group(p).and_then(Group::parent);
        }
        depth
    }

    /// Height of the group subtree below `id`; a group without subgroups
    /// has height 0.
    #[must_use]
    pub fn height(&self, id: UniqueId) -> usize {
        self.group(id).map_or(0, |g| {
            g.groups()
                .iter()
                .map(|sub| self.height(*sub) + 1)
                .max()
                .unwrap_or(0)
        })
    }

    /// Returns `true` if a group subtree of the given height fits below
    /// `target` without exceeding [`MAX_DEPTH`].
    #[must_use]
    pub fn can_add_group(&self, target: UniqueId, subtree_height: usize) -> bool {
        self.depth(target) + subtree_height < MAX_DEPTH
    }

    fn check_can_add_group(&self, target: UniqueId, subtree_height: usize) -> CoreResult<()> {
        if self.can_add_group(target, subtree_height) {
            Ok(())
        } else {
            Err(CoreError::StructureTooDeep {
                depth: self.depth(target) + subtree_height + 1,
                max: MAX_DEPTH,
            })
        }
    }

    /// Returns `true` if `container` is a proper ancestor of `id`.
    #[must_use]
    pub fn is_contained_in(&self, id: UniqueId, container: UniqueId) -> bool {
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            if p == container {
                return true;
            }
            current = self.group(p).and_then(Group::parent);
        }
        false
    }

    /// Finds a group within `scope`.
    ///
    /// `scope` itself matches. Without `recursive`, only direct children
    /// of `scope` are considered.
    #[must_use]
    pub fn find_group(&self, scope: UniqueId, id: UniqueId, recursive: bool) -> Option<&Group> {
        let group = self.group(id)?;
        if id == scope
            || group.parent() == Some(scope)
            || (recursive && self.is_contained_in(id, scope))
        {
            Some(group)
        } else {
            None
        }
    }

    /// Finds an entry within `scope`; see [`Tree::find_group`].
    #[must_use]
    pub fn find_entry(&self, scope: UniqueId, id: UniqueId, recursive: bool) -> Option<&Entry> {
        let entry = self.entry(id)?;
        if entry.parent() == Some(scope) || (recursive && self.is_contained_in(id, scope)) {
            Some(entry)
        } else {
            None
        }
    }

    /// All groups below `id`: the direct subgroups first, followed by the
    /// recursive lists of each subgroup in order.
    #[must_use]
    pub fn groups_recursive(&self, id: UniqueId) -> Vec<UniqueId> {
        let mut out = Vec::new();
        self.collect_groups(id, &mut out);
        out
    }

    fn collect_groups(&self, id: UniqueId, out: &mut Vec<UniqueId>) {
        if let Some(g) = self.group(id) {
            out.extend_from_slice(g.groups());
            for sub in g.groups() {
                self.collect_groups(*sub, out);
            }
        }
    }

    /// All entries below `id`: the group's own entries, then those of each
    /// subgroup in pre-order.
    #[must_use]
    pub fn entries_recursive(&self, id: UniqueId) -> Vec<UniqueId> {
        let mut out = Vec::new();
        self.collect_entries(id, &mut out);
        out
    }

    fn collect_entries(&self, id: UniqueId, out: &mut Vec<UniqueId>) {
        if let Some(g) = self.group(id) {
            out.extend_from_slice(g.entries());
            for sub in g.groups() {
                self.collect_entries(*sub, out);
            }
        }
    }

    fn parent_group(&self, parent: UniqueId) -> CoreResult<&Group> {
        self.group(parent).ok_or(CoreError::not_found(parent))
    }

    fn check_new_id(&self, id: UniqueId) -> CoreResult<()> {
        if id.is_zero() {
            return Err(CoreError::invalid_argument("object id must not be zero"));
        }
        if self.contains(id) {
            return Err(CoreError::DuplicateUuid { uuid: id });
        }
        Ok(())
    }

    fn check_index(len: usize, index: Option<usize>) -> CoreResult<()> {
        match index {
            Some(i) if i > len => Err(CoreError::invalid_argument(format!(
                "child index {i} beyond list length {len}"
            ))),
            _ => Ok(()),
        }
    }

    fn list_mut(&mut self, parent: UniqueId, kind: NodeKind) -> &mut Vec<UniqueId> {
        let group = self
            .groups
            .get_mut(&parent)
            .unwrap_or_else(|| unreachable!("parent {parent} checked before mutation"));
        match kind {
            NodeKind::Group => group.groups_mut(),
            NodeKind::Entry => group.entries_mut(),
        }
    }

    fn link(&mut self, parent: UniqueId, kind: NodeKind, id: UniqueId, index: Option<usize>) {
        let list = self.list_mut(parent, kind);
        match index {
            Some(i) => list.insert(i, id),
            None => list.push(id),
        }
    }

    fn unlink(&mut self, id: UniqueId, kind: NodeKind) {
        if let Some(parent) = self.parent_of(id) {
            self.list_mut(parent, kind).retain(|c| *c != id);
        }
    }

    /// Appends a childless group below `parent`.
    ///
    /// # Errors
    ///
    /// See [`Tree::add_group_at`].
    pub fn add_group(&mut self, parent: UniqueId, group: Group) -> CoreResult<UniqueId> {
        self.add_group_at(parent, group, None)
    }

    /// Inserts a childless group below `parent` at `index` (append if
    /// `None`).
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown parent, `DuplicateUuid` if the id is in
    /// use, `StructureTooDeep` if the depth limit would be exceeded and
    /// `InvalidArgument` for a group with children or an index out of
    /// range.
    pub fn add_group_at(
        &mut self,
        parent: UniqueId,
        mut group: Group,
        index: Option<usize>,
    ) -> CoreResult<UniqueId> {
        if !group.is_empty() {
            return Err(CoreError::invalid_argument(
                "group to add must not list children; use insert_subtree",
            ));
        }
        let id = group.uuid();
        self.check_new_id(id)?;
        let len = self.parent_group(parent)?.groups().len();
        Self::check_index(len, index)?;
        self.check_can_add_group(parent, 0)?;

        group.set_parent(Some(parent));
        self.groups.insert(id, group);
        self.link(parent, NodeKind::Group, id, index);
        Ok(id)
    }

    /// Appends an entry below `parent`.
    ///
    /// # Errors
    ///
    /// See [`Tree::add_entry_at`].
    pub fn add_entry(&mut self, parent: UniqueId, entry: Entry) -> CoreResult<UniqueId> {
        self.add_entry_at(parent, entry, None)
    }

    /// Inserts an entry below `parent` at `index` (append if `None`).
    ///
    /// History items are re-keyed to the entry's id.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown parent, `DuplicateUuid` if the id is in
    /// use and `InvalidArgument` for an index out of range.
    pub fn add_entry_at(
        &mut self,
        parent: UniqueId,
        mut entry: Entry,
        index: Option<usize>,
    ) -> CoreResult<UniqueId> {
        let id = entry.uuid();
        self.check_new_id(id)?;
        let len = self.parent_group(parent)?.entries().len();
        Self::check_index(len, index)?;

        entry.fix_history_uuids();
        entry.set_parent(Some(parent));
        self.entries.insert(id, entry);
        self.link(parent, NodeKind::Entry, id, index);
        Ok(id)
    }

    /// Grafts a whole tree below `parent`; its root becomes a subgroup.
    ///
    /// # Errors
    ///
    /// `DuplicateUuid` if any id of `subtree` is already in use, plus the
    /// errors of [`Tree::add_group_at`].
    pub fn insert_subtree(
        &mut self,
        parent: UniqueId,
        index: Option<usize>,
        subtree: Tree,
    ) -> CoreResult<()> {
        let len = self.parent_group(parent)?.groups().len();
        Self::check_index(len, index)?;
        for id in subtree.groups.keys().chain(subtree.entries.keys()) {
            self.check_new_id(*id)?;
        }
        self.check_can_add_group(parent, subtree.height(subtree.root))?;

        let Tree {
            root,
            groups,
            entries,
        } = subtree;
        self.groups.extend(groups);
        self.entries.extend(entries);
        if let Some(g) = self.groups.get_mut(&root) {
            g.set_parent(Some(parent));
        }
        self.link(parent, NodeKind::Group, root, index);
        Ok(())
    }

    /// Removes a group and everything below it, returning them as a tree.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group, `InvalidArgument` for the root.
    pub fn detach_group(&mut self, id: UniqueId) -> CoreResult<Tree> {
        if id == self.root {
            return Err(CoreError::invalid_argument("the root group cannot be detached"));
        }
        if self.group(id).is_none() {
            return Err(CoreError::not_found(id));
        }

        let group_ids = self.groups_recursive(id);
        let entry_ids = self.entries_recursive(id);
        self.unlink(id, NodeKind::Group);

        let mut groups = HashMap::with_capacity(group_ids.len() + 1);
        for gid in std::iter::once(id).chain(group_ids) {
            if let Some(g) = self.groups.remove(&gid) {
                groups.insert(gid, g);
            }
        }
        let mut entries = HashMap::with_capacity(entry_ids.len());
        for eid in entry_ids {
            if let Some(e) = self.entries.remove(&eid) {
                entries.insert(eid, e);
            }
        }
        if let Some(g) = groups.get_mut(&id) {
            g.set_parent(None);
        }

        Ok(Tree {
            root: id,
            groups,
            entries,
        })
    }

    /// Removes an entry from the tree and returns it.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown entry.
    pub fn detach_entry(&mut self, id: UniqueId) -> CoreResult<Entry> {
        if self.entry(id).is_none() {
            return Err(CoreError::not_found(id));
        }
        self.unlink(id, NodeKind::Entry);
        let mut entry = self
            .entries
            .remove(&id)
            .ok_or(CoreError::not_found(id))?;
        entry.set_parent(None);
        Ok(entry)
    }

    /// Moves a group below `new_parent` at `index` (append if `None`).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for the root, for a move into the group's own
    /// subtree or for an index out of range; `StructureTooDeep` if the
    /// subtree would end up too deep; `NotFound` for unknown ids.
    pub fn move_group(
        &mut self,
        id: UniqueId,
        new_parent: UniqueId,
        index: Option<usize>,
    ) -> CoreResult<()> {
        if id == self.root {
            return Err(CoreError::invalid_argument("the root group cannot be moved"));
        }
        let old_parent = self
            .group(id)
            .ok_or(CoreError::not_found(id))?
            .parent();
        let target = self.parent_group(new_parent)?;
        if new_parent == id || self.is_contained_in(new_parent, id) {
            return Err(CoreError::invalid_argument(format!(
                "moving group {id} below {new_parent} would create a cycle"
            )));
        }
        let len = target.groups().len() - usize::from(old_parent == Some(new_parent));
        Self::check_index(len, index)?;
        self.check_can_add_group(new_parent, self.height(id))?;

        self.unlink(id, NodeKind::Group);
        self.link(new_parent, NodeKind::Group, id, index);
        if let Some(g) = self.groups.get_mut(&id) {
            g.set_parent(Some(new_parent));
        }
        Ok(())
    }

    /// Moves an entry below `new_parent` at `index` (append if `None`).
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids, `InvalidArgument` for an index out of
    /// range.
    pub fn move_entry(
        &mut self,
        id: UniqueId,
        new_parent: UniqueId,
        index: Option<usize>,
    ) -> CoreResult<()> {
        let old_parent = self
            .entry(id)
            .ok_or(CoreError::not_found(id))?
            .parent();
        let target = self.parent_group(new_parent)?;
        let len = target.entries().len() - usize::from(old_parent == Some(new_parent));
        Self::check_index(len, index)?;

        self.unlink(id, NodeKind::Entry);
        self.link(new_parent, NodeKind::Entry, id, index);
        if let Some(e) = self.entries.get_mut(&id) {
            e.set_parent(Some(new_parent));
        }
        Ok(())
    }

    /// Replaces the order of a group's subgroups.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `order` is a permutation of the current
    /// list.
    pub fn set_group_order(&mut self, parent: UniqueId, order: Vec<UniqueId>) -> CoreResult<()> {
        self.set_order(parent, NodeKind::Group, order)
    }

    /// Replaces the order of a group's entries.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `order` is a permutation of the current
    /// list.
    pub fn set_entry_order(&mut self, parent: UniqueId, order: Vec<UniqueId>) -> CoreResult<()> {
        self.set_order(parent, NodeKind::Entry, order)
    }

    fn set_order(
        &mut self,
        parent: UniqueId,
        kind: NodeKind,
        order: Vec<UniqueId>,
    ) -> CoreResult<()> {
        let group = self.parent_group(parent)?;
        let current = match kind {
            NodeKind::Group => group.groups(),
            NodeKind::Entry => group.entries(),
        };
        let before: HashSet<_> = current.iter().collect();
        let after: HashSet<_> = order.iter().collect();
        if current.len() != order.len() || before != after {
            return Err(CoreError::invalid_argument(format!(
                "new child order of {parent} is not a permutation"
            )));
        }
        *self.list_mut(parent, kind) = order;
        Ok(())
    }

    /// Updates access (and modification) times of a group, optionally
    /// also of every ancestor.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group.
    pub fn touch_group(
        &mut self,
        id: UniqueId,
        modified: bool,
        at: Timestamp,
        touch_parents: bool,
    ) -> CoreResult<()> {
        let group = self.groups.get_mut(&id).ok_or(CoreError::not_found(id))?;
        group.touch(modified, at);
        let parent = group.parent();
        if touch_parents {
            self.touch_ancestors(parent, modified, at);
        }
        Ok(())
    }

    /// Updates access (and modification) times of an entry, optionally
    /// also of every ancestor group.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown entry.
    pub fn touch_entry(
        &mut self,
        id: UniqueId,
        modified: bool,
        at: Timestamp,
        touch_parents: bool,
    ) -> CoreResult<()> {
        let entry = self.entries.get_mut(&id).ok_or(CoreError::not_found(id))?;
        entry.touch(modified, at);
        let parent = entry.parent();
        if touch_parents {
            self.touch_ancestors(parent, modified, at);
        }
        Ok(())
    }

    fn touch_ancestors(&mut self, mut current: Option<UniqueId>, modified: bool, at: Timestamp) {
        while let Some(id) = current {
            let Some(group) = self.groups.get_mut(&id) else {
                break;
            };
            group.touch(modified, at);
            current = group.parent();
        }
    }

    /// Copy of the tree keeping only identifiers, child order and
    /// location-changed times.
    #[must_use]
    pub fn clone_structure(&self) -> Tree {
        let groups = self
            .groups
            .iter()
            .map(|(id, g)| {
                let mut copy = Group::with_uuid(*id, "", g.times.location_changed);
                copy.set_parent(g.parent());
                *copy.groups_mut() = g.groups().to_vec();
                *copy.entries_mut() = g.entries().to_vec();
                (*id, copy)
            })
            .collect();
        let entries = self
            .entries
            .iter()
            .map(|(id, e)| {
                let mut copy = Entry::with_uuid(*id, e.times.location_changed);
                copy.set_parent(e.parent());
                (*id, copy)
            })
            .collect();
        Tree {
            root: self.root,
            groups,
            entries,
        }
    }

    /// Deep copy of the subtree rooted at `id` as a standalone tree.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group.
    pub fn subtree(&self, id: UniqueId) -> CoreResult<Tree> {
        if self.group(id).is_none() {
            return Err(CoreError::not_found(id));
        }
        let mut groups = HashMap::new();
        for gid in std::iter::once(id).chain(self.groups_recursive(id)) {
            groups.insert(gid, self.groups[&gid].clone());
        }
        let entries = self
            .entries_recursive(id)
            .into_iter()
            .map(|eid| (eid, self.entries[&eid].clone()))
            .collect();
        if let Some(g) = groups.get_mut(&id) {
            g.set_parent(None);
        }
        Ok(Tree {
            root: id,
            groups,
            entries,
        })
    }

    /// Deep copy of a group subtree in which every group and entry has a
    /// fresh identifier and is marked as created at `at`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group.
    pub fn duplicate_group(&self, id: UniqueId, at: Timestamp) -> CoreResult<Tree> {
        let mut copy = self.subtree(id)?;
        copy.create_new_item_uuids(true, true, true);
        for g in copy.groups.values_mut() {
            g.times.creation = at;
            g.times.last_access = at;
        }
        for e in copy.entries.values_mut() {
            e.times.creation = at;
            e.times.last_access = at;
        }
        Ok(copy)
    }

    /// Copies the properties of `template` onto group `id`; see
    /// [`Group::assign_properties`].
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group.
    pub fn assign_group_properties(
        &mut self,
        id: UniqueId,
        template: &Group,
        only_if_newer: bool,
        assign_location_changed: bool,
    ) -> CoreResult<()> {
        let group = self.groups.get_mut(&id).ok_or(CoreError::not_found(id))?;
        group.assign_properties(template, only_if_newer, assign_location_changed);
        Ok(())
    }

    /// Assigns fresh identifiers to groups and/or entries.
    ///
    /// With `include_root` the root group is re-keyed as well (when
    /// `new_groups` is set). Entry history items follow their entry.
    pub fn create_new_item_uuids(&mut self, new_groups: bool, new_entries: bool, include_root: bool) {
        let mut remap: HashMap<UniqueId, UniqueId> = HashMap::new();
        if new_groups {
            for id in self.groups.keys() {
                if *id != self.root || include_root {
                    remap.insert(*id, UniqueId::new());
                }
            }
        }
        if new_entries {
            for id in self.entries.keys() {
                remap.insert(*id, UniqueId::new());
            }
        }
        if remap.is_empty() {
            return;
        }
        let map = |id: UniqueId| remap.get(&id).copied().unwrap_or(id);

        let groups = std::mem::take(&mut self.groups)
            .into_values()
            .map(|mut g| {
                let id = map(g.uuid());
                g.set_uuid(id);
                g.set_parent(g.parent().map(map));
                for child in g.groups_mut().iter_mut() {
                    *child = map(*child);
                }
                for child in g.entries_mut().iter_mut() {
                    *child = map(*child);
                }
                (id, g)
            })
            .collect();
        let entries = std::mem::take(&mut self.entries)
            .into_values()
            .map(|mut e| {
                let id = map(e.uuid());
                e.set_uuid(id, true);
                e.set_parent(e.parent().map(map));
                (id, e)
            })
            .collect();

        self.root = map(self.root);
        self.groups = groups;
        self.entries = entries;
        debug!(remapped = remap.len(), "assigned new object ids");
    }

    /// Recursive comparison of group `id` with group `other_id` of `other`.
    #[must_use]
    pub fn equals_group(
        &self,
        id: UniqueId,
        other: &Tree,
        other_id: UniqueId,
        options: CompareOptions,
        mode: ProtectionCompareMode,
    ) -> bool {
        let (Some(a), Some(b)) = (self.group(id), other.group(other_id)) else {
            return false;
        };
        if !a.equals_properties(b, options) {
            return false;
        }
        if options.properties_only {
            return true;
        }

        if a.entries().len() != b.entries().len() || a.groups().len() != b.groups().len() {
            return false;
        }
        let entries_equal = a.entries().iter().zip(b.entries()).all(|(ea, eb)| {
            match (self.entry(*ea), other.entry(*eb)) {
                (Some(ea), Some(eb)) => ea.equals(eb, options, mode),
                _ => false,
            }
        });
        entries_equal
            && a.groups()
                .iter()
                .zip(b.groups())
                .all(|(ga, gb)| self.equals_group(*ga, other, *gb, options, mode))
    }

    /// Checks every structural invariant.
    ///
    /// # Errors
    ///
    /// `DuplicateUuid` if an id occurs twice, `InvariantViolation` for
    /// broken parent links, unreachable or dangling nodes, a zero id, a
    /// history item with a foreign id or nested history, and
    /// `StructureTooDeep` for groups nested beyond [`MAX_DEPTH`].
    pub fn validate(&self) -> CoreResult<()> {
        let root = self
            .groups
            .get(&self.root)
            .ok_or_else(|| CoreError::invariant("root group missing"))?;
        if root.parent().is_some() {
            return Err(CoreError::invariant("root group has a parent"));
        }
        if let Some(id) = self.groups.keys().find(|id| self.entries.contains_key(id)) {
            return Err(CoreError::DuplicateUuid { uuid: *id });
        }

        let mut seen: HashSet<UniqueId> = HashSet::with_capacity(self.groups.len() + self.entries.len());
        let mut stack = vec![(self.root, 0usize)];
        seen.insert(self.root);

        while let Some((gid, depth)) = stack.pop() {
            let group = &self.groups[&gid];
            if group.uuid() != gid || gid.is_zero() {
                return Err(CoreError::invariant(format!("group key {gid} does not match its id")));
            }
            if depth > MAX_DEPTH {
                return Err(CoreError::StructureTooDeep {
                    depth,
                    max: MAX_DEPTH,
                });
            }

            for eid in group.entries() {
                if !seen.insert(*eid) {
                    return Err(CoreError::DuplicateUuid { uuid: *eid });
                }
                let entry = self.entries.get(eid).ok_or_else(|| {
                    CoreError::invariant(format!("group {gid} lists missing entry {eid}"))
                })?;
                if entry.uuid() != *eid || eid.is_zero() {
                    return Err(CoreError::invariant(format!("entry key {eid} does not match its id")));
                }
                if entry.parent() != Some(gid) {
                    return Err(CoreError::invariant(format!("entry {eid} has a stale parent link")));
                }
                for item in entry.history() {
                    if item.uuid() != *eid {
                        return Err(CoreError::invariant(format!(
                            "history item of {eid} carries id {}",
                            item.uuid()
                        )));
                    }
                    if !item.history().is_empty() {
                        return Err(CoreError::invariant(format!("history item of {eid} has nested history")));
                    }
                }
            }

            for sub in group.groups() {
                if !seen.insert(*sub) {
                    return Err(CoreError::DuplicateUuid { uuid: *sub });
                }
                let child = self.groups.get(sub).ok_or_else(|| {
                    CoreError::invariant(format!("group {gid} lists missing group {sub}"))
                })?;
                if child.parent() != Some(gid) {
                    return Err(CoreError::invariant(format!("group {sub} has a stale parent link")));
                }
                stack.push((*sub, depth + 1));
            }
        }

        if seen.len() != self.groups.len() + self.entries.len() {
            return Err(CoreError::invariant(format!(
                "{} objects are not reachable from the root",
                self.groups.len() + self.entries.len() - seen.len()
            )));
        }
        Ok(())
    }

    /// Builds a tree from its nodes; parent links are derived from the
    /// groups' child lists and the result is validated.
    ///
    /// # Errors
    ///
    /// Any error of [`Tree::validate`].
    pub fn from_parts(root: UniqueId, groups: Vec<Group>, entries: Vec<Entry>) -> CoreResult<Tree> {
        let mut group_map = HashMap::with_capacity(groups.len());
        for mut g in groups {
            let id = g.uuid();
            g.set_parent(None);
            if group_map.insert(id, g).is_some() {
                return Err(CoreError::DuplicateUuid { uuid: id });
            }
        }
        let mut entry_map = HashMap::with_capacity(entries.len());
        for mut e in entries {
            let id = e.uuid();
            e.set_parent(None);
            if entry_map.insert(id, e).is_some() {
                return Err(CoreError::DuplicateUuid { uuid: id });
            }
        }

        let mut links: Vec<(UniqueId, NodeKind, UniqueId)> = Vec::new();
        for (gid, g) in &group_map {
            links.extend(g.groups().iter().map(|c| (*c, NodeKind::Group, *gid)));
            links.extend(g.entries().iter().map(|c| (*c, NodeKind::Entry, *gid)));
        }
        let mut linked: HashSet<UniqueId> = HashSet::with_capacity(links.len());
        for (child, kind, parent) in links {
            if !linked.insert(child) {
                return Err(CoreError::DuplicateUuid { uuid: child });
            }
            match kind {
                NodeKind::Group => {
                    if let Some(g) = group_map.get_mut(&child) {
                        g.set_parent(Some(parent));
                    }
                }
                NodeKind::Entry => {
                    if let Some(e) = entry_map.get_mut(&child) {
                        e.set_parent(Some(parent));
                    }
                }
            }
        }

        let tree = Tree {
            root,
            groups: group_map,
            entries: entry_map,
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Splits the tree into its root id and nodes in pre-order.
    #[must_use]
    pub fn into_parts(self) -> (UniqueId, Vec<Group>, Vec<Entry>) {
        let order: Vec<(NodeKind, UniqueId)> = self
            .pre_order()
            .map(|(node, _)| (node.kind(), node.uuid()))
            .collect();
        let Tree {
            root,
            mut groups,
            mut entries,
        } = self;
        let mut out_groups = Vec::with_capacity(groups.len());
        let mut out_entries = Vec::with_capacity(entries.len());
        for (kind, id) in order {
            match kind {
                NodeKind::Group => out_groups.extend(groups.remove(&id)),
                NodeKind::Entry => out_entries.extend(entries.remove(&id)),
            }
        }
        (root, out_groups, out_entries)
    }
}

#[derive(Serialize)]
struct TreeReprRef<'a> {
    root: UniqueId,
    groups: Vec<&'a Group>,
    entries: Vec<&'a Entry>,
}

#[derive(Deserialize)]
struct TreeRepr {
    root: UniqueId,
    groups: Vec<Group>,
    entries: Vec<Entry>,
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut groups = Vec::with_capacity(self.groups.len());
        let mut entries = Vec::with_capacity(self.entries.len());
        for (node, _) in self.pre_order() {
            match node {
                super::NodeRef::Group(g) => groups.push(g),
                super::NodeRef::Entry(e) => entries.push(e),
            }
        }
        TreeReprRef {
            root: self.root,
            groups,
            entries,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = TreeRepr::deserialize(deserializer)?;
        Tree::from_parts(repr.root, repr.groups, repr.entries).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;

    fn sample() -> (Tree, UniqueId, UniqueId, UniqueId) {
        let now = time::now();
        let mut tree = Tree::with_root_name("Root", now);
        let root = tree.root_id();
        let a = tree.add_group(root, Group::new("A", now)).unwrap();
        let b = tree.add_group(a, Group::new("B", now)).unwrap();
        tree.add_entry(root, Entry::new(now)).unwrap();
        tree.add_entry(b, Entry::new(now)).unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn duplicate_ids_are_rejected_across_kinds() {
        let (mut tree, root, a, _) = sample();
        let now = time::now();
        let err = tree.add_entry(root, Entry::with_uuid(a, now)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateUuid { uuid } if uuid == a));
        let err = tree.add_group(root, Group::with_uuid(a, "dup", now)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateUuid { .. }));
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let (mut tree, _, a, b) = sample();
        assert!(tree.move_group(a, b, None).is_err());
        assert!(tree.move_group(a, a, None).is_err());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn move_group_reparents() {
        let (mut tree, root, a, b) = sample();
        tree.move_group(b, root, Some(0)).unwrap();
        assert_eq!(tree.root().groups(), &[b, a]);
        assert_eq!(tree.group(b).unwrap().parent(), Some(root));
        assert!(tree.group(a).unwrap().groups().is_empty());
        tree.validate().unwrap();
    }

    #[test]
    fn depth_limit() {
        let now = time::now();
        let mut tree = Tree::with_root_name("Root", now);
        let mut parent = tree.root_id();
        for i in 0..MAX_DEPTH {
            parent = tree.add_group(parent, Group::new(format!("g{i}"), now)).unwrap();
        }
        assert_eq!(tree.depth(parent), MAX_DEPTH);
        let err = tree.add_group(parent, Group::new("too deep", now)).unwrap_err();
        assert!(err.is_structural_limit());
        // entries have no depth limit
        tree.add_entry(parent, Entry::new(now)).unwrap();
        tree.validate().unwrap();
    }

    #[test]
    fn move_respects_depth_of_moved_subtree() {
        let now = time::now();
        let mut tree = Tree::with_root_name("Root", now);
        let root = tree.root_id();
        let mut deep = root;
        for i in 0..MAX_DEPTH - 1 {
            deep = tree.add_group(deep, Group::new(format!("d{i}"), now)).unwrap();
        }
        let x = tree.add_group(root, Group::new("x", now)).unwrap();
        tree.add_group(x, Group::new("y", now)).unwrap();
        assert_eq!(tree.height(x), 1);

        let err = tree.move_group(x, deep, None).unwrap_err();
        assert!(err.is_structural_limit());
    }

    #[test]
    fn recursive_listings_follow_group_order() {
        let now = time::now();
        let mut tree = Tree::with_root_name("Root", now);
        let root = tree.root_id();
        let g1 = tree.add_group(root, Group::new("1", now)).unwrap();
        let g2 = tree.add_group(root, Group::new("2", now)).unwrap();
        let g11 = tree.add_group(g1, Group::new("1.1", now)).unwrap();
        let e_root = tree.add_entry(root, Entry::new(now)).unwrap();
        let e2 = tree.add_entry(g2, Entry::new(now)).unwrap();
        let e11 = tree.add_entry(g11, Entry::new(now)).unwrap();

        assert_eq!(tree.groups_recursive(root), vec![g1, g2, g11]);
        assert_eq!(tree.entries_recursive(root), vec![e_root, e11, e2]);
        assert!(tree.is_contained_in(e11, g1));
        assert!(!tree.is_contained_in(e11, g2));
        assert!(tree.find_entry(g1, e11, true).is_some());
        assert!(tree.find_entry(g1, e11, false).is_none());
        assert!(tree.find_group(root, root, false).is_some());
    }

    #[test]
    fn detach_and_reinsert_subtree() {
        let (mut tree, root, a, _) = sample();
        let (groups, entries) = tree.counts();
        let sub = tree.detach_group(a).unwrap();
        assert_eq!(tree.counts(), (groups - 2, entries - 1));
        sub.validate().unwrap();
        tree.validate().unwrap();

        tree.insert_subtree(root, None, sub).unwrap();
        assert_eq!(tree.counts(), (groups, entries));
        tree.validate().unwrap();
    }

    #[test]
    fn duplicate_group_gets_fresh_ids() {
        let (mut tree, root, a, _) = sample();
        let later = time::now() + chrono::Duration::hours(2);
        let copy = tree.duplicate_group(a, later).unwrap();
        assert_ne!(copy.root_id(), a);
        assert_eq!(copy.root().times.creation, later);
        copy.validate().unwrap();
        tree.insert_subtree(root, None, copy).unwrap();
        tree.validate().unwrap();
        assert_eq!(tree.counts(), (4, 3));
    }

    #[test]
    fn create_new_item_uuids_rekeys_everything() {
        let (mut tree, root, a, _) = sample();
        let before: HashSet<_> = tree.pre_order().map(|(n, _)| n.uuid()).collect();
        tree.create_new_item_uuids(true, true, true);
        tree.validate().unwrap();
        assert_ne!(tree.root_id(), root);
        assert!(tree.group(a).is_none());
        assert!(tree.pre_order().all(|(n, _)| !before.contains(&n.uuid())));
    }

    #[test]
    fn set_order_requires_permutation() {
        let now = time::now();
        let mut tree = Tree::with_root_name("Root", now);
        let root = tree.root_id();
        let ids: Vec<_> = (0..3)
            .map(|_| tree.add_entry(root, Entry::new(now)).unwrap())
            .collect();
        tree.set_entry_order(root, vec![ids[2], ids[0], ids[1]]).unwrap();
        assert_eq!(tree.root().entries(), &[ids[2], ids[0], ids[1]]);
        assert!(tree.set_entry_order(root, vec![ids[0], ids[1]]).is_err());
        assert!(tree.set_entry_order(root, vec![ids[0], ids[0], ids[1]]).is_err());
    }

    #[test]
    fn touch_bubbles_to_parents() {
        let (mut tree, root, a, b) = sample();
        let entry = tree.group(b).unwrap().entries()[0];
        let later = time::now() + chrono::Duration::hours(1);
        tree.touch_entry(entry, true, later, true).unwrap();
        for g in [b, a, root] {
            assert_eq!(tree.group(g).unwrap().times.last_modification, later);
        }
    }

    #[test]
    fn equals_group_compares_children() {
        let (tree, root, _, b) = sample();
        let copy = tree.clone();
        let opts = CompareOptions::new();
        assert!(tree.equals_group(root, &copy, root, opts, ProtectionCompareMode::Full));

        let mut changed = tree.clone();
        changed.group_mut(b).unwrap().name = "renamed".into();
        assert!(!tree.equals_group(root, &changed, root, opts, ProtectionCompareMode::None));
        assert!(tree.equals_group(
            root,
            &changed,
            root,
            opts.properties_only(),
            ProtectionCompareMode::None
        ));
    }

    #[test]
    fn parts_roundtrip_preserves_order() {
        let (tree, root, ..) = sample();
        let order: Vec<_> = tree.pre_order().map(|(n, _)| n.uuid()).collect();
        let (r, groups, entries) = tree.into_parts();
        let rebuilt = Tree::from_parts(r, groups, entries).unwrap();
        assert_eq!(rebuilt.root_id(), root);
        let rebuilt_order: Vec<_> = rebuilt.pre_order().map(|(n, _)| n.uuid()).collect();
        assert_eq!(order, rebuilt_order);
        rebuilt.validate().unwrap();
    }

    #[test]
    fn parts_with_a_child_listed_twice_are_rejected() {
        let (tree, root, _, b) = sample();
        let (r, mut groups, entries) = tree.into_parts();
        let dup = groups.iter().find(|g| g.uuid() == b).unwrap().entries()[0];
        let root_pos = groups.iter().position(|g| g.uuid() == root).unwrap();
        groups[root_pos].entries_mut().push(dup);
        assert!(matches!(
            Tree::from_parts(r, groups, entries),
            Err(CoreError::DuplicateUuid { uuid }) if uuid == dup
        ));
    }
}
