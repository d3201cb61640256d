//! Insertion positions for objects new to the local tree.

use crate::pool::ObjectPool;
use passtree_core::UniqueId;
use std::collections::HashMap;

/// Index in `siblings` at which `id` should be inserted so that it keeps
/// its neighbours from the source tree. `None` means append.
///
/// The nearest following source sibling that is present locally wins;
/// failing that, the nearest preceding one.
pub(crate) fn best_index(siblings: &[UniqueId], id: UniqueId, source: &ObjectPool) -> Option<usize> {
    let id_src = source.id_of(id);
    if id_src == 0 {
        return None;
    }

    let index: HashMap<UniqueId, usize> = siblings
        .iter()
        .enumerate()
        .map(|(i, uuid)| (*uuid, i))
        .collect();

    let mut next = id_src + 1;
    while let Some(item) = source.item_at(next) {
        if let Some(&i) = index.get(&item.uuid) {
            return Some(i);
        }
        next += 1;
    }

    let mut prev = id_src - 1;
    while let Some(item) = source.item_at(prev) {
        if let Some(&i) = index.get(&item.uuid) {
            return Some(i + 1);
        }
        prev -= 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use passtree_core::{Entry, Tree};
    use passtree_testkit::ts;

    fn source_with(n: usize) -> (Tree, Vec<UniqueId>) {
        let mut tree = Tree::with_root_name("root", ts(0));
        let root = tree.root_id();
        let ids = (0..n)
            .map(|_| tree.add_entry(root, Entry::new(ts(0))).unwrap())
            .collect();
        (tree, ids)
    }

    #[test]
    fn inserts_before_following_neighbour() {
        let (tree, ids) = source_with(3);
        let pool = ObjectPool::from_tree(&tree);
        // locally: [a, c]; b goes between them
        let local = [ids[0], ids[2]];
        assert_eq!(best_index(&local, ids[1], &pool), Some(1));
    }

    #[test]
    fn falls_back_to_preceding_neighbour() {
        let (tree, ids) = source_with(3);
        let pool = ObjectPool::from_tree(&tree);
        let local = [UniqueId::new(), ids[0]];
        assert_eq!(best_index(&local, ids[2], &pool), Some(2));
    }

    #[test]
    fn unknown_objects_are_appended() {
        let (tree, ids) = source_with(2);
        let pool = ObjectPool::from_tree(&tree);
        assert_eq!(best_index(&[UniqueId::new()], ids[0], &pool), None);
        assert_eq!(best_index(&ids, UniqueId::new(), &pool), None);
    }
}
