//! Position snapshots of a tree.
//!
//! A pool numbers every node of a tree so that "what came after X in the
//! other replica" can be answered in O(1). Siblings get consecutive ids and
//! every sibling run is followed by one unused id, so walking forward or
//! backward from an id stays inside the node's own sibling list.

use passtree_core::time::Timestamp;
use passtree_core::{NodeKind, Tree, UniqueId};
use std::collections::HashMap;

/// Id of the root group in every pool.
pub const ROOT_POOL_ID: u64 = 2;

/// What a pool remembers about one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolItem {
    /// Node identifier.
    pub uuid: UniqueId,
    /// Group or entry.
    pub kind: NodeKind,
    /// Parent at snapshot time; `None` for the root.
    pub parent: Option<UniqueId>,
    /// Location-changed time at snapshot time.
    pub location_changed: Timestamp,
    /// Previous parent at snapshot time.
    pub previous_parent: UniqueId,
}

/// Immutable id-numbered snapshot of a tree.
#[derive(Debug, Clone, Default)]
pub struct ObjectPool {
    ids: HashMap<UniqueId, u64>,
    items: HashMap<u64, PoolItem>,
}

impl ObjectPool {
    /// Snapshots `tree`.
    #[must_use]
    pub fn from_tree(tree: &Tree) -> Self {
        let mut pool = Self::default();
        let root = tree.root();
        pool.insert(
            ROOT_POOL_ID,
            PoolItem {
                uuid: root.uuid(),
                kind: NodeKind::Group,
                parent: None,
                location_changed: root.times.location_changed,
                previous_parent: root.previous_parent,
            },
        );
        let mut free = ROOT_POOL_ID + 2;
        pool.add_children(tree, root.uuid(), &mut free);
        pool
    }

    fn add_children(&mut self, tree: &Tree, group: UniqueId, free: &mut u64) {
        let Some(g) = tree.group(group) else {
            return;
        };

        for &id in g.entries() {
            if let Some(e) = tree.entry(id) {
                self.insert(
                    *free,
                    PoolItem {
                        uuid: id,
                        kind: NodeKind::Entry,
                        parent: Some(group),
                        location_changed: e.times.location_changed,
                        previous_parent: e.previous_parent,
                    },
                );
                *free += 1;
            }
        }
        *free += 1;

        for &id in g.groups() {
            if let Some(sub) = tree.group(id) {
                self.insert(
                    *free,
                    PoolItem {
                        uuid: id,
                        kind: NodeKind::Group,
                        parent: Some(group),
                        location_changed: sub.times.location_changed,
                        previous_parent: sub.previous_parent,
                    },
                );
                *free += 1;
            }
        }
        *free += 1;

        for &id in g.groups() {
            self.add_children(tree, id, free);
        }
    }

    fn insert(&mut self, id: u64, item: PoolItem) {
        self.ids.insert(item.uuid, id);
        self.items.insert(id, item);
    }

    /// Returns the pool id of `uuid`, or 0 if the node was not in the tree.
    #[must_use]
    pub fn id_of(&self, uuid: UniqueId) -> u64 {
        self.ids.get(&uuid).copied().unwrap_or(0)
    }

    /// Returns the node numbered `id`.
    #[must_use]
    pub fn item_at(&self, id: u64) -> Option<&PoolItem> {
        self.items.get(&id)
    }

    /// Returns the node with identifier `uuid`.
    #[must_use]
    pub fn item_of(&self, uuid: UniqueId) -> Option<&PoolItem> {
        self.ids.get(&uuid).and_then(|id| self.items.get(id))
    }

    /// Returns the node with identifier `uuid` if it has the given kind.
    #[must_use]
    pub fn item_of_kind(&self, uuid: UniqueId, kind: NodeKind) -> Option<&PoolItem> {
        self.item_of(uuid).filter(|item| item.kind == kind)
    }

    /// Number of nodes in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the snapshot holds no node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passtree_core::{Entry, Group};
    use passtree_testkit::ts;

    #[test]
    fn siblings_are_consecutive_and_runs_are_separated() {
        let mut tree = Tree::with_root_name("root", ts(0));
        let root = tree.root_id();
        let e1 = tree.add_entry(root, Entry::new(ts(0))).unwrap();
        let e2 = tree.add_entry(root, Entry::new(ts(0))).unwrap();
        let g1 = tree.add_group(root, Group::new("a", ts(0))).unwrap();
        let g2 = tree.add_group(root, Group::new("b", ts(0))).unwrap();
        let inner = tree.add_entry(g1, Entry::new(ts(0))).unwrap();

        let pool = ObjectPool::from_tree(&tree);
        assert_eq!(pool.len(), 6);
        assert_eq!(pool.id_of(root), ROOT_POOL_ID);
        assert_eq!(pool.id_of(e1), 4);
        assert_eq!(pool.id_of(e2), 5);
        assert!(pool.item_at(6).is_none());
        assert_eq!(pool.id_of(g1), 7);
        assert_eq!(pool.id_of(g2), 8);
        assert!(pool.item_at(9).is_none());
        assert_eq!(pool.id_of(inner), 10);
        assert_eq!(pool.item_of(inner).unwrap().parent, Some(g1));
        assert_eq!(pool.id_of(UniqueId::new()), 0);
        assert!(pool.item_of_kind(g1, NodeKind::Entry).is_none());
    }
}
