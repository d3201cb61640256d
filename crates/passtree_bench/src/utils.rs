//! Benchmark utilities.

use passtree_core::{Database, Group, Timestamp, UniqueId};
use passtree_testkit::fixtures::{account, edit_title, move_entry, ts};
use rand::seq::SliceRandom;
use rand::Rng;

/// Generate a random alphanumeric string of `len` characters.
pub fn random_text(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

/// Database with `groups` top-level groups holding `per_group` entries each.
///
/// Returns the database and the group ids in order.
pub fn wide_database(groups: usize, per_group: usize) -> (Database, Vec<UniqueId>) {
    let mut db = Database::new("bench", ts(0));
    let root = db.tree.root_id();
    let mut ids = Vec::with_capacity(groups);
    for g in 0..groups {
        let gid = db
            .tree
            .add_group(root, Group::new(format!("group {g}"), ts(0)))
            .unwrap();
        for _ in 0..per_group {
            let e = account(&random_text(12), &random_text(8), &random_text(16), ts(0));
            db.tree.add_entry(gid, e).unwrap();
        }
        ids.push(gid);
    }
    (db, ids)
}

/// Applies `edits` title changes and `moves` cross-group moves at random.
pub fn diverge(db: &mut Database, groups: &[UniqueId], edits: usize, moves: usize, at: Timestamp) {
    let mut rng = rand::thread_rng();
    let entries: Vec<UniqueId> = db.tree.all_entries().map(|e| e.uuid()).collect();
    for id in entries.choose_multiple(&mut rng, edits) {
        edit_title(db, *id, &random_text(12), at);
    }
    for id in entries.choose_multiple(&mut rng, moves) {
        if let Some(target) = groups.choose(&mut rng) {
            if db.tree.parent_of(*id) != Some(*target) {
                move_entry(db, *id, *target, at).unwrap();
            }
        }
    }
}

/// Reverses every entry list and marks the lists as moved at `at`.
pub fn reverse_all_lists(db: &mut Database, groups: &[UniqueId], at: Timestamp) {
    for gid in groups {
        let mut order = db.tree.group(*gid).unwrap().entries().to_vec();
        order.reverse();
        for id in &order {
            db.tree.entry_mut(*id).unwrap().times.location_changed = at;
        }
        db.tree.set_entry_order(*gid, order).unwrap();
    }
}

/// Database whose entries come in `copies` identical copies each.
pub fn duplicated_database(distinct: usize, copies: usize) -> Database {
    let mut db = Database::new("bench", ts(0));
    let root = db.tree.root_id();
    for _ in 0..distinct {
        let e = account(&random_text(12), &random_text(8), &random_text(16), ts(0));
        for _ in 0..copies {
            db.tree.add_entry(root, e.duplicate(ts(0))).unwrap();
        }
    }
    db
}
